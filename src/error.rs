//! Error types for the card engine.
//!
//! Recoverable conditions (malformed colors, failed album-art fetches,
//! corrupt optional QR bytes) are absorbed where they occur and never show
//! up here; only resource-level failures propagate to callers.

/// Result type alias for card engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while rendering cards or exporting sheets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable font could be located for rendering card text
    #[error("Font error: {0}")]
    Font(String),

    /// A card bitmap could not be produced
    #[error("Render error: {0}")]
    Render(String),

    /// QR code generation failed
    #[error("QR code error: {0}")]
    Qr(String),

    /// PNG encoding of a rendered card failed
    #[error("PNG encoding error: {0}")]
    PngEncode(String),

    /// Export was invoked with an empty card list
    #[error("No cards provided for export")]
    NoCards,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
