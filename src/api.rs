//! High-level engine tying the renderer, caches, and exporter together.
//!
//! [`CardEngine`] is the composition root the HTTP layer talks to: it owns
//! the image cache, the renderer, and the preview cache, and implements
//! the preview and export boundary contracts. Caches are constructed here
//! and passed down explicitly; nothing in the crate reaches for globals.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::card::CardData;
use crate::error::{Error, Result};
use crate::export::{CuttingLineStyle, ExportedPdf, PdfExporter};
use crate::fetch::ImageCache;
use crate::preview::PreviewCache;
use crate::qr;
use crate::render::CardRenderer;

/// Request payload for the single-card preview endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Spotify track ID for QR code generation
    pub track_id: String,
    /// Song title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Release year
    pub year: i32,
    /// Music genre
    pub genre: String,
    /// Background color in hex format (e.g. `#FF6B6B`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// One card of an export request, as assembled by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCard {
    /// Spotify track ID for QR code generation
    pub track_id: String,
    /// Song title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Release year
    pub year: i32,
    /// Music genre
    pub genre: String,
    /// Album art URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    /// Album name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
}

/// Request payload for the PDF export boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Cards to include, already filtered by the frontend
    pub cards: Vec<ExportCard>,
    /// Genre → hex color mapping from frontend customization
    pub genre_colors: HashMap<String, String>,
    /// Cutting line style preference
    #[serde(default)]
    pub cutting_lines: CuttingLineStyle,
}

/// Composition root for previews and exports.
pub struct CardEngine {
    renderer: CardRenderer,
    previews: PreviewCache,
}

impl CardEngine {
    /// Create an engine with the standard HTTP art fetcher, system fonts,
    /// and default preview expirations.
    pub fn new() -> Result<Self> {
        let images = Arc::new(ImageCache::with_http_fetcher());
        Ok(Self {
            renderer: CardRenderer::new(images)?,
            previews: PreviewCache::new(),
        })
    }

    /// Create an engine from explicitly constructed parts (tests inject a
    /// stub fetcher and short cache expirations this way).
    pub fn with_parts(renderer: CardRenderer, previews: PreviewCache) -> Self {
        Self { renderer, previews }
    }

    /// The shared card renderer.
    pub fn renderer(&self) -> &CardRenderer {
        &self.renderer
    }

    /// Render (or serve from cache) a front-face preview PNG.
    pub fn front_preview(&self, request: &PreviewRequest) -> Result<Vec<u8>> {
        let key = PreviewCache::front_key(&request.track_id, request.background_color.as_deref());
        self.previews.try_get_or_create(&key, || {
            let mut card = CardData::new(
                request.title.clone(),
                request.artist.clone(),
                request.year,
                request.genre.clone(),
            )
            .with_qr_code(qr::track_qr_png(&request.track_id)?);
            if let Some(color) = &request.background_color {
                card = card.with_background_color(color.clone());
            }
            self.renderer.render_front(&card)
        })
    }

    /// Render (or serve from cache) a back-face preview PNG.
    ///
    /// Previews show no album art, so the cache key needs no album input.
    pub fn back_preview(&self, request: &PreviewRequest) -> Result<Vec<u8>> {
        let key = PreviewCache::back_key(
            &request.track_id,
            request.year,
            request.background_color.as_deref(),
        );
        self.previews.try_get_or_create(&key, || {
            let mut card = CardData::new(
                request.title.clone(),
                request.artist.clone(),
                request.year,
                request.genre.clone(),
            );
            if let Some(color) = &request.background_color {
                card = card.with_background_color(color.clone());
            }
            self.renderer.render_back(&card)
        })
    }

    /// Assemble card data for an export request and produce the PDF.
    ///
    /// Rejects empty requests before any rendering happens.
    pub fn export(&self, request: &ExportRequest) -> Result<ExportedPdf> {
        if request.cards.is_empty() {
            return Err(Error::NoCards);
        }

        let mut cards = Vec::with_capacity(request.cards.len());
        for export_card in &request.cards {
            let mut card = CardData::new(
                export_card.title.clone(),
                export_card.artist.clone(),
                export_card.year,
                export_card.genre.clone(),
            )
            .with_qr_code(qr::track_qr_png(&export_card.track_id)?);

            if let Some(color) = request.genre_colors.get(&export_card.genre) {
                card = card.with_background_color(color.clone());
            }
            if let Some(url) = &export_card.album_image_url {
                card.album_image_url = Some(url.clone());
            }
            if let Some(name) = &export_card.album_name {
                card.album_name = Some(name.clone());
            }

            cards.push(card);
        }

        PdfExporter::new(&self.renderer).export(&cards, request.cutting_lines)
    }
}

/// Download filename for an export: `hitster-cards-{count}-{date}.pdf`.
pub fn export_filename(card_count: usize) -> String {
    format!(
        "hitster-cards-{}-{}.pdf",
        card_count,
        chrono::Local::now().format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ImageFetcher;

    struct OfflineFetcher;

    impl ImageFetcher for OfflineFetcher {
        fn fetch(&self, _url: &str) -> std::result::Result<Vec<u8>, String> {
            Err("offline".to_string())
        }
    }

    fn engine() -> Option<CardEngine> {
        let images = Arc::new(ImageCache::new(Box::new(OfflineFetcher)));
        let renderer = match CardRenderer::new(images) {
            Ok(renderer) => renderer,
            Err(_) => {
                eprintln!("skipping: no system fonts installed");
                return None;
            },
        };
        Some(CardEngine::with_parts(renderer, PreviewCache::new()))
    }

    fn preview_request(color: Option<&str>) -> PreviewRequest {
        PreviewRequest {
            track_id: "T1".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            year: 1999,
            genre: "Pop".to_string(),
            background_color: color.map(str::to_string),
        }
    }

    #[test]
    fn test_front_preview_is_stable_across_calls() {
        let Some(engine) = engine() else { return };
        let request = preview_request(Some("#FF69B4"));
        let first = engine.front_preview(&request).unwrap();
        let second = engine.front_preview(&request).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_previews_differ_per_background_color() {
        let Some(engine) = engine() else { return };
        let white = engine.front_preview(&preview_request(Some("#FFFFFF"))).unwrap();
        let black = engine.front_preview(&preview_request(Some("#000000"))).unwrap();
        assert_ne!(white, black);
    }

    #[test]
    fn test_back_preview_renders_png() {
        let Some(engine) = engine() else { return };
        let png = engine.back_preview(&preview_request(None)).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_engine_export_rejects_empty_request() {
        let Some(engine) = engine() else { return };
        let request = ExportRequest {
            cards: Vec::new(),
            genre_colors: HashMap::new(),
            cutting_lines: CuttingLineStyle::None,
        };
        assert!(matches!(engine.export(&request), Err(Error::NoCards)));
    }

    #[test]
    fn test_engine_export_applies_genre_colors() {
        let Some(engine) = engine() else { return };
        let request = ExportRequest {
            cards: vec![ExportCard {
                track_id: "T1".to_string(),
                title: "Song".to_string(),
                artist: "Artist".to_string(),
                year: 1999,
                genre: "Rock".to_string(),
                album_image_url: None,
                album_name: None,
            }],
            genre_colors: HashMap::from([("Rock".to_string(), "#E63946".to_string())]),
            cutting_lines: CuttingLineStyle::None,
        };
        let exported = engine.export(&request).unwrap();
        assert_eq!(exported.pages, 2);
        assert!(exported.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_export_filename_shape() {
        let name = export_filename(42);
        assert!(name.starts_with("hitster-cards-42-"));
        assert!(name.ends_with(".pdf"));
        // hitster-cards-42-YYYY-MM-DD.pdf
        assert_eq!(name.len(), "hitster-cards-42-".len() + 10 + 4);
    }

    #[test]
    fn test_export_request_deserializes_kebab_style() {
        let json = r##"{
            "cards": [{"trackId": "T1", "title": "Song", "artist": "Artist", "year": 1991, "genre": "Rock"}],
            "genreColors": {"Rock": "#E63946"},
            "cuttingLines": "edge-only"
        }"##;
        let request: ExportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.cards.len(), 1);
        assert_eq!(request.cutting_lines, CuttingLineStyle::EdgeOnly);
        assert_eq!(request.genre_colors.get("Rock").map(String::as_str), Some("#E63946"));
    }

    #[test]
    fn test_export_request_cutting_lines_default_none() {
        let json = r#"{"cards": [], "genreColors": {}}"#;
        let request: ExportRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.cutting_lines, CuttingLineStyle::None);
    }

    #[test]
    fn test_preview_request_camel_case() {
        let json = r##"{"trackId": "T1", "title": "S", "artist": "A", "year": 2000, "genre": "Pop", "backgroundColor": "#FF69B4"}"##;
        let request: PreviewRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.background_color.as_deref(), Some("#FF69B4"));
    }
}
