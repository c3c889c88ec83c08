//! Image XObjects for embedding card bitmaps.
//!
//! Per PDF spec Section 8.9 images are XObjects. Card pixmaps are embedded
//! as Flate-compressed DeviceRGB data; when a card background carries
//! alpha, the alpha channel rides along as a DeviceGray soft mask.

use std::collections::HashMap;
use std::io::Write;

use tiny_skia::Pixmap;

use super::object::{Object, ObjectRef};
use crate::error::{Error, Result};

/// A rasterized image ready to be registered as a PDF XObject.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Flate-compressed RGB24 pixel data
    data: Vec<u8>,
    /// Flate-compressed 8-bit alpha data, present only when any pixel is
    /// not fully opaque
    soft_mask: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Build an XObject from a premultiplied-alpha pixmap.
    pub fn from_pixmap(pixmap: &Pixmap) -> Result<Self> {
        let pixel_count = (pixmap.width() * pixmap.height()) as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        let mut translucent = false;

        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgb.push(c.red());
            rgb.push(c.green());
            rgb.push(c.blue());
            alpha.push(c.alpha());
            if c.alpha() != 255 {
                translucent = true;
            }
        }

        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            data: compress(&rgb)?,
            soft_mask: if translucent { Some(compress(&alpha)?) } else { None },
        })
    }

    /// Whether this image carries an alpha soft mask.
    pub fn has_soft_mask(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Compressed RGB payload.
    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Compressed alpha payload, if any.
    pub(crate) fn soft_mask_data(&self) -> Option<&[u8]> {
        self.soft_mask.as_deref()
    }

    /// Build the image XObject stream dictionary.
    pub(crate) fn xobject_dict(&self, smask: Option<ObjectRef>) -> HashMap<String, Object> {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert("ColorSpace".to_string(), Object::Name("DeviceRGB".to_string()));
        dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
        if let Some(mask_ref) = smask {
            dict.insert("SMask".to_string(), Object::Reference(mask_ref));
        }
        dict
    }

    /// Build the soft mask stream dictionary.
    pub(crate) fn soft_mask_dict(&self) -> HashMap<String, Object> {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert("ColorSpace".to_string(), Object::Name("DeviceGray".to_string()));
        dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
        dict
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Render(format!("image compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::Render(format!("image compression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    #[test]
    fn test_opaque_pixmap_has_no_soft_mask() {
        let mut pixmap = Pixmap::new(8, 8).unwrap();
        pixmap.fill(Color::from_rgba8(200, 10, 10, 255));
        let image = ImageXObject::from_pixmap(&pixmap).unwrap();
        assert!(!image.has_soft_mask());
        assert_eq!((image.width, image.height), (8, 8));
    }

    #[test]
    fn test_translucent_pixmap_gets_soft_mask() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        pixmap.fill(Color::from_rgba8(0, 0, 0, 128));
        let image = ImageXObject::from_pixmap(&pixmap).unwrap();
        assert!(image.has_soft_mask());
    }

    #[test]
    fn test_xobject_dict_entries() {
        let mut pixmap = Pixmap::new(2, 3).unwrap();
        pixmap.fill(Color::WHITE);
        let image = ImageXObject::from_pixmap(&pixmap).unwrap();
        let dict = image.xobject_dict(None);
        assert_eq!(dict.get("Width"), Some(&Object::Integer(2)));
        assert_eq!(dict.get("Height"), Some(&Object::Integer(3)));
        assert_eq!(dict.get("Filter"), Some(&Object::Name("FlateDecode".to_string())));
        assert!(!dict.contains_key("SMask"));

        let with_mask = image.xobject_dict(Some(ObjectRef::new(9, 0)));
        assert_eq!(with_mask.get("SMask"), Some(&Object::Reference(ObjectRef::new(9, 0))));
    }

    #[test]
    fn test_data_round_trips_through_flate() {
        use std::io::Read;

        let mut pixmap = Pixmap::new(2, 2).unwrap();
        pixmap.fill(Color::from_rgba8(1, 2, 3, 255));
        let image = ImageXObject::from_pixmap(&pixmap).unwrap();

        let mut decoder = flate2::read::ZlibDecoder::new(image.data());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }
}
