//! Card data model.

use serde::{Deserialize, Serialize};

use crate::genres;

/// Everything needed to render one card's two faces.
///
/// Immutable once constructed. The QR bytes and album URL are inputs only;
/// the renderer never mutates them, and two values with identical fields
/// render byte-identical bitmaps (given the same resolved album art).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    /// Song title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Release year (validated upstream; only stringified here)
    pub year: i32,
    /// Music genre
    pub genre: String,
    /// Pre-rendered QR code PNG bytes; absent means the front renders
    /// without a QR image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_data: Option<Vec<u8>>,
    /// Background hex color (`#RRGGBB` or `#RRGGBBAA`); absent means white
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Album art URL; absent means the back renders without art
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    /// Album name appended to the bottom bar when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
}

impl CardData {
    /// Create a card with the required display fields.
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        year: i32,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            artist: artist.into().trim().to_string(),
            year,
            genre: genre.into().trim().to_string(),
            ..Default::default()
        }
    }

    /// Attach pre-rendered QR PNG bytes.
    pub fn with_qr_code(mut self, png: Vec<u8>) -> Self {
        self.qr_code_data = Some(png);
        self
    }

    /// Set an explicit background color.
    pub fn with_background_color(mut self, hex: impl Into<String>) -> Self {
        self.background_color = Some(hex.into());
        self
    }

    /// Derive the background color from the genre table.
    pub fn with_genre_color(mut self) -> Self {
        self.background_color = Some(genres::color_or_default(&self.genre).to_string());
        self
    }

    /// Attach album metadata for the back face.
    pub fn with_album(mut self, image_url: impl Into<String>, name: impl Into<String>) -> Self {
        self.album_image_url = Some(image_url.into());
        self.album_name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_display_fields() {
        let card = CardData::new("  Hey Jude ", " The Beatles ", 1968, " Rock ");
        assert_eq!(card.title, "Hey Jude");
        assert_eq!(card.artist, "The Beatles");
        assert_eq!(card.genre, "Rock");
        assert_eq!(card.year, 1968);
        assert!(card.qr_code_data.is_none());
        assert!(card.background_color.is_none());
    }

    #[test]
    fn test_with_genre_color_uses_table() {
        let card = CardData::new("Song", "Artist", 2001, "Rock").with_genre_color();
        assert_eq!(card.background_color.as_deref(), Some("#E63946"));
    }

    #[test]
    fn test_with_genre_color_unknown_genre() {
        let card = CardData::new("Song", "Artist", 2001, "Obscure").with_genre_color();
        assert_eq!(card.background_color.as_deref(), Some("#808080"));
    }

    #[test]
    fn test_serde_round_trip() {
        let card = CardData::new("Song", "Artist", 1999, "Pop")
            .with_background_color("#FF69B4")
            .with_album("https://example.com/a.jpg", "Album");
        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"backgroundColor\""));
        let back: CardData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }
}
