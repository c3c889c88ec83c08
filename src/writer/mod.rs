//! PDF writing module for generating sheet documents.
//!
//! ## Architecture
//!
//! ```text
//! card pixmaps + guide geometry
//!     ↓
//! [PdfWriter / PageBuilder] (pages, image XObjects)
//!     ↓
//! [ContentStreamBuilder] (operators → content stream bytes)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! The exporter in [`crate::export`] drives this module; nothing here knows
//! about cards, only about pages, images, and strokes.

mod content_stream;
mod image_xobject;
mod object;
mod object_serializer;
mod pdf_writer;

pub use content_stream::{ContentStreamBuilder, ContentStreamOp};
pub use image_xobject::ImageXObject;
pub use object::{Object, ObjectRef};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PageBuilder, PdfWriter, PdfWriterConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _serializer = ObjectSerializer::new();
        let _builder = ContentStreamBuilder::new();
        let _writer = PdfWriter::new();
    }
}
