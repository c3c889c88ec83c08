//! Font loading, text measurement, and glyph rasterization.
//!
//! Cards use one sans-serif family in three variants (regular, bold,
//! italic), resolved once from the system font database. Measurement and
//! drawing share the same shaping pass so a measured run centers exactly
//! where it is drawn.
//!
//! Shaping is left-to-right Latin only; runs are shaped per segment with
//! `rustybuzz` and glyph outlines are filled into the target pixmap with
//! `tiny-skia`.

use std::sync::Arc;

use log::debug;
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Transform};
use ttf_parser::{GlyphId, OutlineBuilder};

use crate::color::Rgba;
use crate::error::{Error, Result};

/// Sans-serif families probed in order; the first installed one wins.
const SANS_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
    "FreeSans",
    "Ubuntu",
    "Cantarell",
];

/// A text style variant on the card face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontVariant {
    /// Regular weight, upright
    Regular,
    /// Bold weight, upright
    Bold,
    /// Regular weight, italic
    Italic,
}

/// Font bytes plus the face index inside the file.
#[derive(Clone)]
struct LoadedFont {
    data: Arc<Vec<u8>>,
    index: u32,
}

/// The resolved card font family.
pub struct FontLibrary {
    regular: LoadedFont,
    bold: LoadedFont,
    italic: LoadedFont,
}

impl FontLibrary {
    /// Resolve the card fonts from the system font database.
    ///
    /// Bold/italic fall back to the regular face when the family does not
    /// ship those variants; a system with no usable sans-serif face at all
    /// is an error.
    pub fn from_system() -> Result<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self::from_database(&db)
    }

    /// Resolve the card fonts from a caller-provided database.
    pub fn from_database(db: &fontdb::Database) -> Result<Self> {
        let regular = query_font(db, fontdb::Weight::NORMAL, fontdb::Style::Normal)
            .ok_or_else(|| Error::Font("no sans-serif font face available".to_string()))?;
        let bold = query_font(db, fontdb::Weight::BOLD, fontdb::Style::Normal)
            .unwrap_or_else(|| regular.clone());
        let italic = query_font(db, fontdb::Weight::NORMAL, fontdb::Style::Italic)
            .unwrap_or_else(|| regular.clone());

        Ok(Self {
            regular,
            bold,
            italic,
        })
    }

    fn font(&self, variant: FontVariant) -> &LoadedFont {
        match variant {
            FontVariant::Regular => &self.regular,
            FontVariant::Bold => &self.bold,
            FontVariant::Italic => &self.italic,
        }
    }

    /// Measure the advance width of `text` at `size_px`.
    pub fn measure(&self, text: &str, variant: FontVariant, size_px: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let font = self.font(variant);
        let Some(face) = rustybuzz::Face::from_slice(&font.data, font.index) else {
            return 0.0;
        };
        let upem = face.units_per_em().max(1) as f32;

        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.set_direction(rustybuzz::Direction::LeftToRight);
        buffer.push_str(text);
        let shaped = rustybuzz::shape(&face, &[], buffer);

        let advance_units: i32 = shaped.glyph_positions().iter().map(|p| p.x_advance).sum();
        advance_units as f32 / upem * size_px
    }

    /// Draw `text` with its baseline origin at `(x, baseline_y)` and return
    /// the run's advance width.
    pub fn draw_text(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline_y: f32,
        variant: FontVariant,
        size_px: f32,
        color: Rgba,
    ) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let font = self.font(variant);
        let Some(hb_face) = rustybuzz::Face::from_slice(&font.data, font.index) else {
            return 0.0;
        };
        let Ok(outline_face) = ttf_parser::Face::parse(&font.data, font.index) else {
            return 0.0;
        };
        let upem = hb_face.units_per_em().max(1) as f32;
        let scale = size_px / upem;

        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.set_direction(rustybuzz::Direction::LeftToRight);
        buffer.push_str(text);
        let shaped = rustybuzz::shape(&hb_face, &[], buffer);

        let mut paint = Paint::default();
        paint.set_color(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
        paint.anti_alias = true;

        let mut pen_x = x;
        for (info, pos) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
            let gid = GlyphId(info.glyph_id as u16);
            let origin_x = pen_x + pos.x_offset as f32 * scale;
            let origin_y = baseline_y - pos.y_offset as f32 * scale;

            if gid.0 != 0 {
                if let Some(path) = glyph_path(&outline_face, gid, origin_x, origin_y, scale) {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
            pen_x += pos.x_advance as f32 * scale;
        }

        debug!("drew '{}' at ({:.1},{:.1}) width {:.1}px", text, x, baseline_y, pen_x - x);
        pen_x - x
    }
}

fn query_font(
    db: &fontdb::Database,
    weight: fontdb::Weight,
    style: fontdb::Style,
) -> Option<LoadedFont> {
    let mut families: Vec<fontdb::Family<'_>> =
        SANS_FAMILIES.iter().map(|name| fontdb::Family::Name(name)).collect();
    families.push(fontdb::Family::SansSerif);

    let query = fontdb::Query {
        families: &families,
        weight,
        stretch: fontdb::Stretch::Normal,
        style,
    };

    let id = db.query(&query).or_else(|| {
        // Degraded environments (containers without font packages) may
        // still have some face installed under another family.
        db.faces().next().map(|info| info.id)
    })?;

    db.with_face_data(id, |data, index| LoadedFont {
        data: Arc::new(data.to_vec()),
        index,
    })
}

/// Build the filled outline of one glyph, scaled from font units into
/// pixels with the y axis flipped for raster coordinates.
fn glyph_path(face: &ttf_parser::Face<'_>, gid: GlyphId, origin_x: f32, origin_y: f32, scale: f32) -> Option<Path> {
    let mut builder = GlyphPathBuilder {
        builder: PathBuilder::new(),
        origin_x,
        origin_y,
        scale,
    };
    face.outline_glyph(gid, &mut builder)?;
    builder.builder.finish()
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn map_x(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn map_y(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.map_x(x), self.map_y(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.map_x(x), self.map_y(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder
            .quad_to(self.map_x(x1), self.map_y(y1), self.map_x(x), self.map_y(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.map_x(x1),
            self.map_y(y1),
            self.map_x(x2),
            self.map_y(y2),
            self.map_x(x),
            self.map_y(y),
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
