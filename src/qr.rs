//! QR code generation for Spotify track links.
//!
//! Produces the opaque PNG bytes the card renderer treats as a pre-rendered
//! square image. Modules are drawn directly into an RGBA buffer; no scaling
//! pass, so output is crisp at any print DPI.

use crate::error::{Error, Result};

/// Options for QR code generation.
#[derive(Debug, Clone)]
pub struct QrOptions {
    /// Pixels per QR module
    pub module_pixels: u32,
    /// Quiet zone (border) in modules
    pub quiet_zone: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            // 10 px/module yields roughly a 330 px image, plenty for the
            // 40 mm square on an 85 mm card.
            module_pixels: 10,
            quiet_zone: 4,
        }
    }
}

impl QrOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pixels per module.
    pub fn module_pixels(mut self, px: u32) -> Self {
        self.module_pixels = px.max(1);
        self
    }

    /// Set the quiet zone width in modules.
    pub fn quiet_zone(mut self, modules: u32) -> Self {
        self.quiet_zone = modules;
        self
    }
}

/// The public Spotify URL encoded on a card front.
pub fn track_url(track_id: &str) -> String {
    format!("https://open.spotify.com/track/{}", track_id)
}

/// Generate the QR PNG for a Spotify track with default options.
pub fn track_qr_png(track_id: &str) -> Result<Vec<u8>> {
    qr_png(&track_url(track_id), &QrOptions::default())
}

/// Generate a QR code PNG for arbitrary data.
///
/// Uses error correction level Q (~25%) so the code stays scannable after
/// printing and cutting.
pub fn qr_png(data: &str, options: &QrOptions) -> Result<Vec<u8>> {
    use qrcode::{EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(data, EcLevel::Q)
        .map_err(|e| Error::Qr(format!("QR encoding error: {}", e)))?;

    let qr_width = code.width();
    let module_px = options.module_pixels as usize;
    let quiet_px = options.quiet_zone as usize * module_px;
    let size = qr_width * module_px + 2 * quiet_px;

    let mut img = image::RgbaImage::from_pixel(size as u32, size as u32, image::Rgba([255, 255, 255, 255]));

    for (y, row) in code.to_colors().chunks(qr_width).enumerate() {
        for (x, &module) in row.iter().enumerate() {
            if module == qrcode::Color::Dark {
                let start_x = quiet_px + x * module_px;
                let start_y = quiet_px + y * module_px;
                for dy in 0..module_px {
                    for dx in 0..module_px {
                        img.put_pixel((start_x + dx) as u32, (start_y + dy) as u32, image::Rgba([0, 0, 0, 255]));
                    }
                }
            }
        }
    }

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Error::Qr(format!("PNG encoding error: {}", e)))?;

    Ok(buf)
}
