//! PDF document writer.
//!
//! Assembles complete PDF documents with proper structure: header, body,
//! xref table, and trailer. Pages collect content stream operators and
//! image XObjects through a [`PageBuilder`]; `finish()` serializes the
//! whole document to bytes.

use std::collections::HashMap;
use std::io::Write;

use super::content_stream::ContentStreamBuilder;
use super::image_xobject::ImageXObject;
use super::object::{Object, ObjectRef};
use super::object_serializer::ObjectSerializer;
use crate::error::Result;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Creator application
    pub creator: Option<String>,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            creator: Some("cardstock".to_string()),
        }
    }
}

impl PdfWriterConfig {
    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A page being built.
pub struct PageBuilder<'a> {
    writer: &'a mut PdfWriter,
    page_index: usize,
}

impl<'a> PageBuilder<'a> {
    /// Direct access to the page's content stream builder.
    pub fn content(&mut self) -> &mut ContentStreamBuilder {
        &mut self.writer.pages[self.page_index].content
    }

    /// Register an image on this page and paint it into the given
    /// rectangle (PDF coordinates, origin bottom-left).
    pub fn add_image(&mut self, image: ImageXObject, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        let resource_id = format!("Im{}", self.writer.next_image_number);
        self.writer.next_image_number += 1;

        let page = &mut self.writer.pages[self.page_index];
        page.content.draw_image(&resource_id, x, y, width, height);
        page.images.push((resource_id, image));
        self
    }

    /// Finish building this page and return to the writer.
    pub fn finish(self) -> &'a mut PdfWriter {
        self.writer
    }
}

struct PageData {
    width: f32,
    height: f32,
    content: ContentStreamBuilder,
    images: Vec<(String, ImageXObject)>,
}

/// PDF document writer.
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<PageData>,
    next_image_number: u32,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            next_image_number: 1,
        }
    }

    /// Add a page with the given dimensions in points.
    pub fn add_page(&mut self, width: f32, height: f32) -> PageBuilder<'_> {
        let page_index = self.pages.len();
        self.pages.push(PageData {
            width,
            height,
            content: ContentStreamBuilder::new(),
            images: Vec::new(),
        });
        PageBuilder {
            writer: self,
            page_index,
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the complete PDF document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer::new();
        let mut output = Vec::new();
        let mut xref_offsets: Vec<(u32, usize)> = Vec::new();

        // Object ids are assigned up front: catalog, pages tree, then per
        // page the page object, its content stream, and its image
        // XObjects (each possibly followed by a soft mask), and finally
        // the Info dictionary.
        let mut next_id: u32 = 1;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let catalog_id = alloc();
        let pages_id = alloc();

        struct PagePlan<'p> {
            page_id: u32,
            content_id: u32,
            // (resource name, xobject id, smask id, image)
            images: Vec<(&'p str, u32, Option<u32>, &'p ImageXObject)>,
        }

        let mut plans: Vec<PagePlan<'_>> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let page_id = alloc();
            let content_id = alloc();
            let mut images = Vec::with_capacity(page.images.len());
            for (name, image) in &page.images {
                let xobject_id = alloc();
                let smask_id = if image.has_soft_mask() { Some(alloc()) } else { None };
                images.push((name.as_str(), xobject_id, smask_id, image));
            }
            plans.push(PagePlan {
                page_id,
                content_id,
                images,
            });
        }
        let info_id = alloc();
        let total_objects = next_id;

        // Header with binary marker.
        writeln!(output, "%PDF-{}", self.config.version)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        // Catalog.
        let catalog_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", ObjectSerializer::reference(pages_id, 0)),
        ]);
        xref_offsets.push((catalog_id, output.len()));
        output.extend_from_slice(&serializer.serialize_indirect(catalog_id, 0, &catalog_obj));

        // Pages tree.
        let kids: Vec<Object> = plans
            .iter()
            .map(|plan| Object::Reference(ObjectRef::new(plan.page_id, 0)))
            .collect();
        let pages_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", ObjectSerializer::integer(self.pages.len() as i64)),
        ]);
        xref_offsets.push((pages_id, output.len()));
        output.extend_from_slice(&serializer.serialize_indirect(pages_id, 0, &pages_obj));

        // Pages, content streams, and images.
        for (page, plan) in self.pages.iter().zip(&plans) {
            let mut xobjects = HashMap::new();
            for (name, xobject_id, _, _) in &plan.images {
                xobjects.insert(name.to_string(), Object::Reference(ObjectRef::new(*xobject_id, 0)));
            }

            let mut resources = HashMap::new();
            if !xobjects.is_empty() {
                resources.insert("XObject".to_string(), Object::Dictionary(xobjects));
            }

            let page_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Page")),
                ("Parent", ObjectSerializer::reference(pages_id, 0)),
                (
                    "MediaBox",
                    ObjectSerializer::rect(0.0, 0.0, page.width as f64, page.height as f64),
                ),
                ("Contents", ObjectSerializer::reference(plan.content_id, 0)),
                ("Resources", Object::Dictionary(resources)),
            ]);
            xref_offsets.push((plan.page_id, output.len()));
            output.extend_from_slice(&serializer.serialize_indirect(plan.page_id, 0, &page_obj));

            let content_obj = Object::Stream {
                dict: HashMap::new(),
                data: bytes::Bytes::from(page.content.build()?),
            };
            xref_offsets.push((plan.content_id, output.len()));
            output.extend_from_slice(&serializer.serialize_indirect(plan.content_id, 0, &content_obj));

            for (_, xobject_id, smask_id, image) in &plan.images {
                let smask_ref = smask_id.map(|id| ObjectRef::new(id, 0));
                let image_obj = Object::Stream {
                    dict: image.xobject_dict(smask_ref),
                    data: bytes::Bytes::copy_from_slice(image.data()),
                };
                xref_offsets.push((*xobject_id, output.len()));
                output.extend_from_slice(&serializer.serialize_indirect(*xobject_id, 0, &image_obj));

                if let (Some(id), Some(mask_data)) = (*smask_id, image.soft_mask_data()) {
                    let mask_obj = Object::Stream {
                        dict: image.soft_mask_dict(),
                        data: bytes::Bytes::copy_from_slice(mask_data),
                    };
                    xref_offsets.push((id, output.len()));
                    output.extend_from_slice(&serializer.serialize_indirect(id, 0, &mask_obj));
                }
            }
        }

        // Info dictionary.
        let mut info_entries = Vec::new();
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::string(title)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::string(creator)));
        }
        let info_obj = ObjectSerializer::dict(info_entries);
        xref_offsets.push((info_id, output.len()));
        output.extend_from_slice(&serializer.serialize_indirect(info_id, 0, &info_obj));

        // Cross-reference table. Ids were assigned sequentially in write
        // order, so the offsets are already sorted by id.
        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", total_objects)?;
        writeln!(output, "0000000000 65535 f ")?;
        for (_, offset) in &xref_offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        // Trailer.
        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(total_objects as i64)),
            ("Root", ObjectSerializer::reference(catalog_id, 0)),
            ("Info", ObjectSerializer::reference(info_id, 0)),
        ]);
        writeln!(output, "trailer")?;
        output.extend_from_slice(&serializer.serialize(&trailer));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        Ok(output)
    }

    /// Build the PDF and write it to a file.
    pub fn save(self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}
