//! Sheet layout and PDF export.
//!
//! Tiles cards onto A4 sheets for double-sided printing: each sheet is a
//! front page in row-major order plus a back page with every row's column
//! order reversed, so fronts and backs line up after a short-edge flip.
//! Optional cutting guides are stroked beneath the card bitmaps.

use log::info;
use serde::{Deserialize, Serialize};

use crate::card::CardData;
use crate::error::{Error, Result};
use crate::render::{CardRenderer, CARD_HEIGHT_MM, CARD_WIDTH_MM};
use crate::writer::{ImageXObject, PdfWriter, PdfWriterConfig};

/// Cards per row.
pub const COLUMNS: usize = 2;
/// Rows per sheet.
pub const ROWS: usize = 5;
/// Cards per sheet (one physical page's worth before duplex pairing).
pub const CARDS_PER_SHEET: usize = COLUMNS * ROWS;

/// A4 page width in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 page height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;

/// Horizontal margin centering the grid: (210 - 2*85) / 2 = 20 mm.
pub const HORIZONTAL_MARGIN_MM: f32 = (PAGE_WIDTH_MM - COLUMNS as f32 * CARD_WIDTH_MM) / 2.0;
/// Vertical margin centering the grid: (297 - 5*55) / 2 = 11 mm.
pub const VERTICAL_MARGIN_MM: f32 = (PAGE_HEIGHT_MM - ROWS as f32 * CARD_HEIGHT_MM) / 2.0;

/// How far cutting guides extend past the occupied grid, in millimetres.
const GUIDE_EXTENSION_MM: f32 = 3.0;
/// Hairline width for cutting guides, in points.
const GUIDE_LINE_WIDTH_PT: f32 = 0.4;
/// Hairline width for card cell borders, in points.
const BORDER_LINE_WIDTH_PT: f32 = 0.25;

/// Cutting line style options for PDF export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CuttingLineStyle {
    /// No cutting lines; light card borders only
    #[default]
    None,
    /// A frame around the occupied grid only
    EdgeOnly,
    /// Full grid lines at every row and column boundary
    Complete,
}

/// A finished export: the document bytes plus its physical page count.
#[derive(Debug, Clone)]
pub struct ExportedPdf {
    /// The complete PDF document
    pub bytes: Vec<u8>,
    /// Number of physical pages (2 per sheet)
    pub pages: usize,
}

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Physical pages needed for `card_count` cards (front + back per sheet).
pub fn page_count(card_count: usize) -> usize {
    card_count.div_ceil(CARDS_PER_SHEET) * 2
}

/// Card slot assignment for one page: for each of the 10 grid cells in
/// drawing order, the index into the sheet's card slice, or `None` for an
/// empty cell. Back pages reverse each row's column order so the sheet
/// lines up under its front after a short-edge flip.
fn sheet_slots(slice_len: usize, mirrored: bool) -> Vec<Option<usize>> {
    let mut slots = Vec::with_capacity(CARDS_PER_SHEET);
    for row in 0..ROWS {
        for col in 0..COLUMNS {
            let source_col = if mirrored { COLUMNS - 1 - col } else { col };
            let index = row * COLUMNS + source_col;
            slots.push((index < slice_len).then_some(index));
        }
    }
    slots
}

/// One cutting guide segment in millimetres, measured from the page's
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GuideLine {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// Compute the guide segments for a sheet holding `slice_len` cards.
///
/// Guides lie exactly on cell boundaries and only span the rows that
/// actually hold cards, extended [`GUIDE_EXTENSION_MM`] past the occupied
/// region at both ends.
fn cutting_guides(style: CuttingLineStyle, slice_len: usize) -> Vec<GuideLine> {
    if style == CuttingLineStyle::None || slice_len == 0 {
        return Vec::new();
    }

    let rows_with_cards = slice_len.div_ceil(COLUMNS);
    let grid_width = COLUMNS as f32 * CARD_WIDTH_MM;
    let occupied_height = rows_with_cards as f32 * CARD_HEIGHT_MM;

    let column_boundaries: Vec<usize> = match style {
        CuttingLineStyle::EdgeOnly => vec![0, COLUMNS],
        CuttingLineStyle::Complete => (0..=COLUMNS).collect(),
        CuttingLineStyle::None => unreachable!(),
    };
    let row_boundaries: Vec<usize> = match style {
        CuttingLineStyle::EdgeOnly => vec![0, rows_with_cards],
        CuttingLineStyle::Complete => (0..=rows_with_cards).collect(),
        CuttingLineStyle::None => unreachable!(),
    };

    let mut lines = Vec::new();
    for col in column_boundaries {
        let x = HORIZONTAL_MARGIN_MM + col as f32 * CARD_WIDTH_MM;
        lines.push(GuideLine {
            x1: x,
            y1: VERTICAL_MARGIN_MM - GUIDE_EXTENSION_MM,
            x2: x,
            y2: VERTICAL_MARGIN_MM + occupied_height + GUIDE_EXTENSION_MM,
        });
    }
    for row in row_boundaries {
        let y = VERTICAL_MARGIN_MM + row as f32 * CARD_HEIGHT_MM;
        lines.push(GuideLine {
            x1: HORIZONTAL_MARGIN_MM - GUIDE_EXTENSION_MM,
            y1: y,
            x2: HORIZONTAL_MARGIN_MM + grid_width + GUIDE_EXTENSION_MM,
            y2: y,
        });
    }
    lines
}

/// Which face of the cards a page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageFace {
    Front,
    Back,
}

/// Exports card lists as duplex-ready A4 sheet documents.
///
/// Cells reuse the card renderer's pixmaps directly, so exported cards are
/// visually identical to standalone previews of the same data.
pub struct PdfExporter<'a> {
    renderer: &'a CardRenderer,
}

impl<'a> PdfExporter<'a> {
    /// Create an exporter borrowing the shared renderer.
    pub fn new(renderer: &'a CardRenderer) -> Self {
        Self { renderer }
    }

    /// Export cards as a PDF byte stream.
    ///
    /// Returns [`Error::NoCards`] for an empty list rather than emitting a
    /// zero-page document.
    pub fn export(&self, cards: &[CardData], cutting_lines: CuttingLineStyle) -> Result<ExportedPdf> {
        if cards.is_empty() {
            return Err(Error::NoCards);
        }

        let total_sheets = cards.len().div_ceil(CARDS_PER_SHEET);
        let mut writer =
            PdfWriter::with_config(PdfWriterConfig::default().with_title("Hitster Cards"));

        for sheet in 0..total_sheets {
            let start = sheet * CARDS_PER_SHEET;
            let end = (start + CARDS_PER_SHEET).min(cards.len());
            let slice = &cards[start..end];

            self.emit_page(&mut writer, slice, PageFace::Front, cutting_lines)?;
            self.emit_page(&mut writer, slice, PageFace::Back, cutting_lines)?;
        }

        let pages = total_sheets * 2;
        let bytes = writer.finish()?;
        info!("exported {} cards as {} pages ({} bytes)", cards.len(), pages, bytes.len());

        Ok(ExportedPdf { bytes, pages })
    }

    /// Export cards and write the document to `path`.
    ///
    /// The document is fully assembled in memory first, so a failing write
    /// never leaves a partial file behind as an apparent success.
    pub fn export_to_file(
        &self,
        cards: &[CardData],
        cutting_lines: CuttingLineStyle,
        path: impl AsRef<std::path::Path>,
    ) -> Result<usize> {
        let exported = self.export(cards, cutting_lines)?;
        std::fs::write(path, &exported.bytes)?;
        Ok(exported.pages)
    }

    fn emit_page(
        &self,
        writer: &mut PdfWriter,
        slice: &[CardData],
        face: PageFace,
        cutting_lines: CuttingLineStyle,
    ) -> Result<()> {
        let page_width = mm_to_pt(PAGE_WIDTH_MM);
        let page_height = mm_to_pt(PAGE_HEIGHT_MM);
        let card_width = mm_to_pt(CARD_WIDTH_MM);
        let card_height = mm_to_pt(CARD_HEIGHT_MM);

        let mut page = writer.add_page(page_width, page_height);

        // Guides go down first so card content layers over them.
        let guides = cutting_guides(cutting_lines, slice.len());
        if !guides.is_empty() {
            page.content()
                .set_stroke_rgb(0.0, 0.0, 0.0)
                .set_line_width(GUIDE_LINE_WIDTH_PT);
            for line in &guides {
                page.content().stroke_line(
                    mm_to_pt(line.x1),
                    page_height - mm_to_pt(line.y1),
                    mm_to_pt(line.x2),
                    page_height - mm_to_pt(line.y2),
                );
            }
        }

        let slots = sheet_slots(slice.len(), face == PageFace::Back);
        for (cell, slot) in slots.iter().enumerate() {
            let row = cell / COLUMNS;
            let col = cell % COLUMNS;
            let x = mm_to_pt(HORIZONTAL_MARGIN_MM + col as f32 * CARD_WIDTH_MM);
            // PDF origin is bottom-left; cell origin is its lower edge.
            let y = page_height
                - mm_to_pt(VERTICAL_MARGIN_MM + (row + 1) as f32 * CARD_HEIGHT_MM);

            match slot {
                Some(index) => {
                    let card = &slice[*index];
                    let pixmap = match face {
                        PageFace::Front => self.renderer.render_front_pixmap(card)?,
                        PageFace::Back => self.renderer.render_back_pixmap(card)?,
                    };
                    page.add_image(ImageXObject::from_pixmap(&pixmap)?, x, y, card_width, card_height);
                    page.content()
                        .set_stroke_rgb(0.878, 0.878, 0.878)
                        .set_line_width(BORDER_LINE_WIDTH_PT)
                        .stroke_rect(x, y, card_width, card_height);
                },
                None => {
                    // Placeholder cell: lighter border, no fill.
                    page.content()
                        .set_stroke_rgb(0.933, 0.933, 0.933)
                        .set_line_width(BORDER_LINE_WIDTH_PT)
                        .stroke_rect(x, y, card_width, card_height);
                },
            }
        }

        page.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_math() {
        assert_eq!(page_count(1), 2);
        assert_eq!(page_count(10), 2);
        assert_eq!(page_count(11), 4);
        assert_eq!(page_count(25), 6);
    }

    #[test]
    fn test_margins_center_the_grid() {
        assert!((HORIZONTAL_MARGIN_MM - 20.0).abs() < f32::EPSILON);
        assert!((VERTICAL_MARGIN_MM - 11.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_front_slots_are_row_major() {
        let slots = sheet_slots(4, false);
        assert_eq!(&slots[..4], &[Some(0), Some(1), Some(2), Some(3)]);
        assert!(slots[4..].iter().all(Option::is_none));
    }

    #[test]
    fn test_back_slots_mirror_each_row() {
        // Front A B / C D must come back as B A / D C.
        let slots = sheet_slots(4, true);
        assert_eq!(&slots[..4], &[Some(1), Some(0), Some(3), Some(2)]);
    }

    #[test]
    fn test_back_slots_partial_row() {
        // Front A B / C _ mirrors to B A / _ C.
        let slots = sheet_slots(3, true);
        assert_eq!(&slots[..4], &[Some(1), Some(0), None, Some(2)]);
    }

    #[test]
    fn test_no_guides_for_style_none() {
        assert!(cutting_guides(CuttingLineStyle::None, 10).is_empty());
    }

    #[test]
    fn test_complete_guides_cover_occupied_rows_only() {
        // 3 cards fill 2 of 5 rows: horizontal boundaries at 0, 1, and 2
        // card heights, vertical lines spanning only that height.
        let lines = cutting_guides(CuttingLineStyle::Complete, 3);
        let verticals: Vec<_> = lines.iter().filter(|l| l.x1 == l.x2).collect();
        let horizontals: Vec<_> = lines.iter().filter(|l| l.y1 == l.y2).collect();

        assert_eq!(verticals.len(), 3);
        assert_eq!(horizontals.len(), 3);

        let expected_ys: Vec<f32> = (0..=2)
            .map(|r| VERTICAL_MARGIN_MM + r as f32 * CARD_HEIGHT_MM)
            .collect();
        for (line, expected) in horizontals.iter().zip(&expected_ys) {
            assert!((line.y1 - expected).abs() < 0.001);
        }

        for line in &verticals {
            assert!((line.y1 - (VERTICAL_MARGIN_MM - 3.0)).abs() < 0.001);
            let occupied_bottom = VERTICAL_MARGIN_MM + 2.0 * CARD_HEIGHT_MM;
            assert!((line.y2 - (occupied_bottom + 3.0)).abs() < 0.001);
        }
    }

    #[test]
    fn test_edge_only_guides_frame_the_grid() {
        let lines = cutting_guides(CuttingLineStyle::EdgeOnly, 10);
        assert_eq!(lines.len(), 4);

        let verticals: Vec<_> = lines.iter().filter(|l| l.x1 == l.x2).collect();
        let xs: Vec<f32> = verticals.iter().map(|l| l.x1).collect();
        assert!((xs[0] - HORIZONTAL_MARGIN_MM).abs() < 0.001);
        assert!((xs[1] - (HORIZONTAL_MARGIN_MM + 2.0 * CARD_WIDTH_MM)).abs() < 0.001);
    }

    #[test]
    fn test_guides_extend_three_mm_horizontally() {
        let lines = cutting_guides(CuttingLineStyle::Complete, 10);
        let horizontal = lines.iter().find(|l| l.y1 == l.y2).unwrap();
        assert!((horizontal.x1 - (HORIZONTAL_MARGIN_MM - 3.0)).abs() < 0.001);
        assert!((horizontal.x2 - (HORIZONTAL_MARGIN_MM + 170.0 + 3.0)).abs() < 0.001);
    }

    #[test]
    fn test_cutting_line_style_serde_names() {
        assert_eq!(serde_json::to_string(&CuttingLineStyle::EdgeOnly).unwrap(), "\"edge-only\"");
        assert_eq!(
            serde_json::from_str::<CuttingLineStyle>("\"complete\"").unwrap(),
            CuttingLineStyle::Complete
        );
        assert_eq!(CuttingLineStyle::default(), CuttingLineStyle::None);
    }

    #[test]
    fn test_mm_to_pt() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 0.001);
        assert!((mm_to_pt(PAGE_WIDTH_MM) - 595.27563).abs() < 0.01);
    }
}
