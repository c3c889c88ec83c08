//! Album art fetching and process-wide image caching.
//!
//! The cache is content-addressed by URL and records failures permanently:
//! a URL that 404s once returns `None` for the rest of the process without
//! another network call. Entries are never evicted; the expected working
//! set (one image per distinct album in a playlist) stays small.
//!
//! Fetching goes through the [`ImageFetcher`] trait so tests can substitute
//! a deterministic stub for the network.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tiny_skia::Pixmap;

/// Hard cap on a fetched image body; covers any realistic album art.
const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Network timeout for a single art fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One-method capability for fetching image bytes from a URL.
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource, returning its raw bytes or a display-able error.
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String>;
}

/// HTTP fetcher with a bounded timeout.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
}

impl HttpImageFetcher {
    /// Create a fetcher with the standard 10 s timeout.
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(FETCH_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .build();
        Self { agent }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.agent.get(url).call().map_err(|e| e.to_string())?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| e.to_string())?;
        Ok(bytes)
    }
}

/// Process-wide cache of decoded album art, keyed by URL.
///
/// `get` returns `None` both for URLs that were never valid images and for
/// URLs whose fetch failed; the failure is cached so the renderer does not
/// hammer a dead endpoint once per card.
pub struct ImageCache {
    fetcher: Box<dyn ImageFetcher>,
    entries: Mutex<HashMap<String, Option<Arc<Pixmap>>>>,
}

impl ImageCache {
    /// Create a cache backed by the given fetcher.
    pub fn new(fetcher: Box<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create a cache backed by the standard HTTP fetcher.
    pub fn with_http_fetcher() -> Self {
        Self::new(Box::new(HttpImageFetcher::new()))
    }

    /// Get the decoded bitmap for a URL, fetching on first request.
    ///
    /// Blank URLs resolve to `None` without touching the cache. Concurrent
    /// first requests for the same URL may both fetch; the map write is
    /// atomic and the first completed write sticks.
    pub fn get(&self, url: &str) -> Option<Arc<Pixmap>> {
        if url.trim().is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.lock().unwrap().get(url) {
            return entry.clone();
        }

        // Fetch and decode outside the lock so a slow host does not stall
        // unrelated cache hits.
        let resolved = match self.fetcher.fetch(url) {
            Ok(bytes) => match decode_image_to_pixmap(&bytes) {
                Some(pixmap) => {
                    debug!("cached album art from {} ({} bytes)", url, bytes.len());
                    Some(Arc::new(pixmap))
                },
                None => {
                    warn!("album art at {} did not decode; caching negative result", url);
                    None
                },
            },
            Err(err) => {
                warn!("album art fetch from {} failed ({}); caching negative result", url, err);
                None
            },
        };

        self.entries
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(resolved)
            .clone()
    }

    /// Number of cached entries (positive and negative).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the cache holds no entries yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Decode image bytes into a premultiplied-alpha pixmap.
pub(crate) fn decode_image_to_pixmap(data: &[u8]) -> Option<Pixmap> {
    let decoded = image::load_from_memory(data).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;

    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        response: std::result::Result<Vec<u8>, String>,
    }

    impl CountingFetcher {
        fn ok(bytes: Vec<u8>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Ok(bytes),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Err(message.to_string()),
            }
        }
    }

    impl ImageFetcher for &'static CountingFetcher {
        fn fetch(&self, _url: &str) -> std::result::Result<Vec<u8>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_successful_fetch_is_cached() {
        static FETCHER: std::sync::OnceLock<CountingFetcher> = std::sync::OnceLock::new();
        let fetcher = FETCHER.get_or_init(|| CountingFetcher::ok(tiny_png()));
        let cache = ImageCache::new(Box::new(fetcher));

        let first = cache.get("https://img.example/a.png");
        assert!(first.is_some());
        let second = cache.get("https://img.example/a.png");
        assert!(second.is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_fetch_is_negatively_cached() {
        static FETCHER: std::sync::OnceLock<CountingFetcher> = std::sync::OnceLock::new();
        let fetcher = FETCHER.get_or_init(|| CountingFetcher::failing("status 404"));
        let cache = ImageCache::new(Box::new(fetcher));

        assert!(cache.get("https://img.example/missing.png").is_none());
        assert!(cache.get("https://img.example/missing.png").is_none());
        assert!(cache.get("https://img.example/missing.png").is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_undecodable_body_is_negatively_cached() {
        static FETCHER: std::sync::OnceLock<CountingFetcher> = std::sync::OnceLock::new();
        let fetcher = FETCHER.get_or_init(|| CountingFetcher::ok(b"not an image".to_vec()));
        let cache = ImageCache::new(Box::new(fetcher));

        assert!(cache.get("https://img.example/garbage").is_none());
        assert!(cache.get("https://img.example/garbage").is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blank_url_short_circuits() {
        static FETCHER: std::sync::OnceLock<CountingFetcher> = std::sync::OnceLock::new();
        let fetcher = FETCHER.get_or_init(|| CountingFetcher::ok(vec![]));
        let cache = ImageCache::new(Box::new(fetcher));

        assert!(cache.get("").is_none());
        assert!(cache.get("   ").is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_decode_image_to_pixmap_dimensions() {
        let pixmap = decode_image_to_pixmap(&tiny_png()).unwrap();
        assert_eq!(pixmap.width(), 4);
        assert_eq!(pixmap.height(), 4);
    }
}
