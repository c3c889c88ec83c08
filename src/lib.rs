//! # Cardstock
//!
//! Rendering and print-layout engine for Hitster-style song cards: takes
//! matched song data, rasterizes pixel-accurate card faces (a QR-coded
//! front and a metadata back), and tiles them onto duplex-ready A4 sheets
//! as a PDF.
//!
//! ## Components
//!
//! - **Color model** ([`color`]): forgiving hex parsing and the
//!   dark/light luminance split that picks contrasting text colors.
//! - **Card renderer** ([`render`]): fixed 300-DPI geometry (85 mm x
//!   55 mm → 1004 x 650 px), measured-run text centering, QR and album art
//!   placement. The single source of truth for card visuals.
//! - **Image cache** ([`fetch`]): URL-addressed album art cache with
//!   permanent negative entries and an injectable fetch capability.
//! - **PDF export** ([`export`] + [`writer`]): 2 x 5 sheet layout with
//!   mirrored back pages for short-edge duplex printing, optional cutting
//!   guides, and a from-scratch PDF serializer.
//! - **Preview cache** ([`preview`]): sliding/absolute TTL memoization
//!   for the interactive preview endpoints.
//! - **Engine** ([`api`]): the composition root wiring it all together.
//!
//! ## Quick start
//!
//! ```ignore
//! use cardstock::{CardData, CuttingLineStyle};
//! use cardstock::api::CardEngine;
//!
//! let engine = CardEngine::new()?;
//! let cards = vec![
//!     CardData::new("Bohemian Rhapsody", "Queen", 1975, "Rock")
//!         .with_qr_code(cardstock::qr::track_qr_png("4u...")?)
//!         .with_genre_color(),
//! ];
//! let pdf = cardstock::export::PdfExporter::new(engine.renderer())
//!     .export(&cards, CuttingLineStyle::Complete)?;
//! std::fs::write("cards.pdf", &pdf.bytes)?;
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Color parsing and genre tables
pub mod color;
pub mod genres;

// Card model
pub mod card;

// QR code generation
pub mod qr;

// Album art fetching and caching
pub mod fetch;

// Card rasterization
pub mod render;

// Preview memoization
pub mod preview;

// PDF generation
pub mod export;
pub mod writer;

// High-level engine
pub mod api;

// Re-exports
pub use card::CardData;
pub use error::{Error, Result};
pub use export::{CuttingLineStyle, ExportedPdf, PdfExporter};
pub use fetch::{HttpImageFetcher, ImageCache, ImageFetcher};
pub use preview::PreviewCache;
pub use render::CardRenderer;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
