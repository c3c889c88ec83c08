//! Static genre → background color table.
//!
//! 35 genres with visually distinct colors. Lookups are case-insensitive:
//! keys are stored lowercase and the query is normalized before the probe,
//! so behavior does not depend on a case-folding container.

use phf::phf_map;

/// Fallback color for genres missing from the table.
pub const DEFAULT_GENRE_COLOR: &str = "#808080";

static GENRE_COLORS: phf::Map<&'static str, &'static str> = phf_map! {
    // Popular genres (30)
    "rock" => "#E63946",
    "pop" => "#FF69B4",
    "hip-hop" => "#FFD700",
    "r&b" => "#9B59B6",
    "country" => "#D2691E",
    "jazz" => "#6B5B95",
    "blues" => "#4169E1",
    "electronic" => "#00CED1",
    "dance" => "#FF1493",
    "house" => "#32CD32",
    "techno" => "#008B8B",
    "classical" => "#1E3A5F",
    "reggae" => "#228B22",
    "soul" => "#8B0000",
    "funk" => "#FF8C00",
    "disco" => "#DA70D6",
    "metal" => "#2F4F4F",
    "punk" => "#FF00FF",
    "alternative" => "#2E8B57",
    "indie" => "#DAA520",
    "folk" => "#808000",
    "latin" => "#FF6347",
    "rap" => "#B8860B",
    "gospel" => "#FFE4B5",
    "world" => "#8B4513",
    "ambient" => "#87CEEB",
    "new wave" => "#7B68EE",
    "grunge" => "#556B2F",
    "ska" => "#20B2AA",
    "synthpop" => "#FF1493",

    // French genres (5)
    "chanson" => "#0055A4",
    "variete francaise" => "#3B5998",
    "french pop" => "#FF69B4",
    "french hip-hop" => "#FFD700",
    "musette" => "#EF4135",
};

/// Look up the hex color for a genre, if the genre is known.
pub fn color_for(genre: &str) -> Option<&'static str> {
    GENRE_COLORS.get(genre.trim().to_lowercase().as_str()).copied()
}

/// Hex color for a genre, falling back to [`DEFAULT_GENRE_COLOR`] for
/// unknown genres.
pub fn color_or_default(genre: &str) -> &'static str {
    color_for(genre).unwrap_or(DEFAULT_GENRE_COLOR)
}

/// CSS `rgba(...)` string for a genre color with the given alpha, used by
/// the browser-facing boundary for translucent swatches.
pub fn rgba_string(genre: &str, alpha: f64) -> String {
    let hex = color_or_default(genre);
    let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(128);
    let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(128);
    let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(128);
    format!("rgba({},{},{},{:.2})", r, g, b, alpha)
}

/// Number of genres in the table.
pub fn genre_count() -> usize {
    GENRE_COLORS.len()
}
