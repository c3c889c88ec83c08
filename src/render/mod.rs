//! Card rasterization.
//!
//! Produces exact-size bitmaps for a card's two faces. This is the single
//! source of truth for card visuals: the preview endpoints PNG-encode the
//! bitmaps and the PDF exporter embeds the same pixmaps, so the two
//! surfaces can never drift apart.
//!
//! ## Geometry
//!
//! Cards are 85 mm x 55 mm rendered at 300 DPI (1004 x 650 px). The front
//! is a 40 mm QR square over a bold genre label; the back is two 10 mm
//! translucent black bars (year/genre on top, artist/title/album at the
//! bottom) around a 32 mm album art square.

mod fonts;

pub use fonts::{FontLibrary, FontVariant};

use std::sync::Arc;

use log::warn;
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Rect, Transform};

use crate::card::CardData;
use crate::color::{contrast_text_color, parse_hex_color, Rgba};
use crate::error::{Error, Result};
use crate::fetch::{decode_image_to_pixmap, ImageCache};

/// Render DPI for card bitmaps.
pub const DPI: f32 = 300.0;

const MM_PER_INCH: f32 = 25.4;

/// Physical card width in millimetres.
pub const CARD_WIDTH_MM: f32 = 85.0;
/// Physical card height in millimetres.
pub const CARD_HEIGHT_MM: f32 = 55.0;

const QR_SIZE_MM: f32 = 40.0;
const BAR_HEIGHT_MM: f32 = 10.0;
const ALBUM_ART_SIZE_MM: f32 = 32.0;
const TOP_SPACER_MM: f32 = 2.0;
const QR_TEXT_SPACER_MM: f32 = 1.5;
const PADDING_HORIZONTAL_MM: f32 = 2.0;

/// The bars on the back are always black at 70% opacity, independent of
/// the card background.
const BAR_ALPHA: u8 = 0xB3;

/// Convert millimetres to pixels at the render DPI.
pub fn mm_to_px(mm: f32) -> u32 {
    (mm * DPI / MM_PER_INCH).round() as u32
}

/// Convert a point size to pixels at the render DPI.
pub fn pt_to_px(pt: f32) -> f32 {
    pt * DPI / 72.0
}

/// Card bitmap dimensions in pixels.
pub fn card_pixel_size() -> (u32, u32) {
    (mm_to_px(CARD_WIDTH_MM), mm_to_px(CARD_HEIGHT_MM))
}

/// One text segment of a composed bar run.
struct Segment<'a> {
    text: &'a str,
    variant: FontVariant,
    size_px: f32,
}

/// Renders card faces into pixel-accurate bitmaps.
pub struct CardRenderer {
    fonts: FontLibrary,
    images: Arc<ImageCache>,
}

impl CardRenderer {
    /// Create a renderer using system fonts and the given art cache.
    pub fn new(images: Arc<ImageCache>) -> Result<Self> {
        Ok(Self {
            fonts: FontLibrary::from_system()?,
            images,
        })
    }

    /// Create a renderer with an explicit font library.
    pub fn with_fonts(fonts: FontLibrary, images: Arc<ImageCache>) -> Self {
        Self { fonts, images }
    }

    /// Render the front face as PNG bytes.
    ///
    /// Front shows the QR code centered with the genre label below it.
    pub fn render_front(&self, card: &CardData) -> Result<Vec<u8>> {
        encode_png(self.render_front_pixmap(card)?)
    }

    /// Render the back face as PNG bytes.
    ///
    /// Back shows the year/genre bar, centered album art, and the
    /// artist/title/album bar.
    pub fn render_back(&self, card: &CardData) -> Result<Vec<u8>> {
        encode_png(self.render_back_pixmap(card)?)
    }

    /// Render the front face as a raw pixmap (used directly by the PDF
    /// exporter).
    pub fn render_front_pixmap(&self, card: &CardData) -> Result<Pixmap> {
        let (width, height) = card_pixel_size();
        let mut pixmap = new_card_pixmap(width, height, card.background_color.as_deref())?;

        let qr_size = mm_to_px(QR_SIZE_MM);
        let qr_x = (width - qr_size) / 2;
        let qr_y = mm_to_px(TOP_SPACER_MM);

        if let Some(qr_bytes) = card.qr_code_data.as_deref().filter(|b| !b.is_empty()) {
            match decode_image_to_pixmap(qr_bytes) {
                Some(qr_pixmap) => {
                    draw_into_square(&mut pixmap, &qr_pixmap, qr_x, qr_y, qr_size, FilterQuality::Nearest);
                },
                None => {
                    // Corrupt QR bytes degrade to a blank region; the card
                    // itself still renders.
                    warn!("QR bytes for '{}' did not decode; leaving region blank", card.title);
                },
            }
        }

        if !card.genre.trim().is_empty() {
            let size_px = pt_to_px(11.0);
            let text_color = contrast_text_color(card.background_color.as_deref());
            let text_width = self.fonts.measure(&card.genre, FontVariant::Bold, size_px);
            let text_x = (width as f32 - text_width) / 2.0;
            let baseline = (qr_y + qr_size + mm_to_px(QR_TEXT_SPACER_MM)) as f32 + size_px;
            self.fonts
                .draw_text(&mut pixmap, &card.genre, text_x, baseline, FontVariant::Bold, size_px, text_color);
        }

        Ok(pixmap)
    }

    /// Render the back face as a raw pixmap (used directly by the PDF
    /// exporter).
    pub fn render_back_pixmap(&self, card: &CardData) -> Result<Pixmap> {
        let (width, height) = card_pixel_size();
        let mut pixmap = new_card_pixmap(width, height, card.background_color.as_deref())?;

        let bar_height = mm_to_px(BAR_HEIGHT_MM);
        fill_bar(&mut pixmap, 0, width, bar_height);

        // Top bar: bold year, separator, genre.
        let year_text = card.year.to_string();
        let top_segments = [
            Segment {
                text: &year_text,
                variant: FontVariant::Bold,
                size_px: pt_to_px(11.0),
            },
            Segment {
                text: "  |  ",
                variant: FontVariant::Regular,
                size_px: pt_to_px(10.0),
            },
            Segment {
                text: &card.genre,
                variant: FontVariant::Regular,
                size_px: pt_to_px(10.0),
            },
        ];
        let top_baseline = bar_height as f32 / 2.0 + pt_to_px(11.0) / 3.0;
        self.draw_centered_run(&mut pixmap, &top_segments, width, top_baseline, 0.0);

        // Album art centered between the bars.
        if let Some(url) = card.album_image_url.as_deref() {
            if let Some(art) = self.images.get(url) {
                let art_size = mm_to_px(ALBUM_ART_SIZE_MM);
                let art_x = (width - art_size) / 2;
                let art_y = bar_height + (height - 2 * bar_height - art_size) / 2;
                draw_into_square(&mut pixmap, &art, art_x, art_y, art_size, FilterQuality::Bilinear);
            }
        }

        // Bottom bar: artist - title [- album].
        let bottom_bar_y = height - bar_height;
        fill_bar(&mut pixmap, bottom_bar_y, width, bar_height);

        let size_9 = pt_to_px(9.0);
        let mut bottom_segments = vec![
            Segment {
                text: &card.artist,
                variant: FontVariant::Bold,
                size_px: size_9,
            },
            Segment {
                text: " - ",
                variant: FontVariant::Regular,
                size_px: size_9,
            },
            Segment {
                text: &card.title,
                variant: FontVariant::Regular,
                size_px: size_9,
            },
        ];
        if let Some(album) = card.album_name.as_deref().filter(|a| !a.trim().is_empty()) {
            bottom_segments.push(Segment {
                text: " - ",
                variant: FontVariant::Regular,
                size_px: size_9,
            });
            bottom_segments.push(Segment {
                text: album,
                variant: FontVariant::Italic,
                size_px: size_9,
            });
        }
        let bottom_baseline = bottom_bar_y as f32 + bar_height as f32 / 2.0 + size_9 / 3.0;
        let min_x = mm_to_px(PADDING_HORIZONTAL_MM) as f32;
        self.draw_centered_run(&mut pixmap, &bottom_segments, width, bottom_baseline, min_x);

        Ok(pixmap)
    }

    /// Draw a run of differently styled segments centered as a whole:
    /// per-segment widths are measured at each segment's own font, the run
    /// starts at `(card_width - total) / 2` (clamped to `min_x`), and the
    /// cursor advances by each measured width.
    fn draw_centered_run(
        &self,
        pixmap: &mut Pixmap,
        segments: &[Segment<'_>],
        card_width: u32,
        baseline: f32,
        min_x: f32,
    ) {
        let widths: Vec<f32> = segments
            .iter()
            .map(|s| self.fonts.measure(s.text, s.variant, s.size_px))
            .collect();
        let total: f32 = widths.iter().sum();
        let mut x = ((card_width as f32 - total) / 2.0).max(min_x);

        for (segment, width) in segments.iter().zip(&widths) {
            self.fonts.draw_text(
                pixmap,
                segment.text,
                x,
                baseline,
                segment.variant,
                segment.size_px,
                Rgba::WHITE,
            );
            x += width;
        }
    }
}

fn new_card_pixmap(width: u32, height: u32, background: Option<&str>) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Render(format!("invalid card dimensions {}x{}", width, height)))?;
    let bg = parse_hex_color(background, Rgba::WHITE);
    pixmap.fill(
        Color::from_rgba8(bg.r, bg.g, bg.b, bg.a),
    );
    Ok(pixmap)
}

fn fill_bar(pixmap: &mut Pixmap, y: u32, width: u32, height: u32) {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(Color::from_rgba8(0, 0, 0, BAR_ALPHA));
    if let Some(rect) = Rect::from_xywh(0.0, y as f32, width as f32, height as f32) {
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

/// Stretch a source pixmap into a destination square. The destination is
/// already square and sources are square-ish (QR codes, album covers), so
/// a plain stretch is the fitting rule.
fn draw_into_square(
    pixmap: &mut Pixmap,
    source: &Pixmap,
    dest_x: u32,
    dest_y: u32,
    dest_size: u32,
    quality: FilterQuality,
) {
    if source.width() == 0 || source.height() == 0 {
        return;
    }
    let sx = dest_size as f32 / source.width() as f32;
    let sy = dest_size as f32 / source.height() as f32;
    let paint = PixmapPaint {
        quality,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        source.as_ref(),
        &paint,
        Transform::from_row(sx, 0.0, 0.0, sy, dest_x as f32, dest_y as f32),
        None,
    );
}

fn encode_png(pixmap: Pixmap) -> Result<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| Error::PngEncode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ImageFetcher;

    struct NoFetcher;

    impl ImageFetcher for NoFetcher {
        fn fetch(&self, _url: &str) -> std::result::Result<Vec<u8>, String> {
            Err("offline".to_string())
        }
    }

    fn renderer() -> Option<CardRenderer> {
        CardRenderer::new(Arc::new(ImageCache::new(Box::new(NoFetcher)))).ok()
    }

    fn sample_card() -> CardData {
        CardData::new("Bohemian Rhapsody", "Queen", 1975, "Rock").with_background_color("#E63946")
    }

    #[test]
    fn test_card_pixel_size_at_300_dpi() {
        assert_eq!(card_pixel_size(), (1004, 650));
    }

    #[test]
    fn test_mm_to_px_rounding() {
        assert_eq!(mm_to_px(QR_SIZE_MM), 472);
        assert_eq!(mm_to_px(BAR_HEIGHT_MM), 118);
        assert_eq!(mm_to_px(ALBUM_ART_SIZE_MM), 378);
        assert_eq!(mm_to_px(TOP_SPACER_MM), 24);
    }

    #[test]
    fn test_pt_to_px() {
        assert!((pt_to_px(9.0) - 37.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_front_renders_without_qr() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let png = renderer.render_front(&sample_card()).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (1004, 650));
    }

    #[test]
    fn test_front_survives_corrupt_qr_bytes() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let card = sample_card().with_qr_code(b"definitely not a png".to_vec());
        let png = renderer.render_front(&card).unwrap();
        assert!(!png.is_empty());
    }

    #[test]
    fn test_back_renders_without_album_art() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        // The fetcher is offline, so art resolution degrades to "no art".
        let card = sample_card().with_album("https://img.example/cover.jpg", "A Night at the Opera");
        let png = renderer.render_back(&card).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (1004, 650));
    }

    #[test]
    fn test_render_is_deterministic() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let card = sample_card().with_qr_code(crate::qr::track_qr_png("T1").unwrap());
        assert_eq!(renderer.render_front(&card).unwrap(), renderer.render_front(&card).unwrap());
        assert_eq!(renderer.render_back(&card).unwrap(), renderer.render_back(&card).unwrap());
    }

    #[test]
    fn test_background_color_fills_card() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let card = CardData::new("T", "A", 2000, "Rock").with_background_color("#0000FF");
        let pixmap = renderer.render_front_pixmap(&card).unwrap();
        // Bottom-left corner is outside the QR and text regions.
        let px = pixmap.pixel(2, 647).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (0, 0, 255));
    }

    #[test]
    fn test_back_bar_darkens_background() {
        let Some(renderer) = renderer() else {
            eprintln!("skipping: no system fonts installed");
            return;
        };
        let card = CardData::new("T", "A", 2000, "Rock").with_background_color("#FFFFFF");
        let pixmap = renderer.render_back_pixmap(&card).unwrap();
        // 70% black over white is roughly 30% gray; sample near the bar's
        // left edge, away from any text.
        let bar_px = pixmap.pixel(4, 10).unwrap();
        assert!(bar_px.red() < 100, "bar should darken the background");
        // Center region keeps the background.
        let center_px = pixmap.pixel(4, 325).unwrap();
        assert_eq!(center_px.red(), 255);
    }
}
