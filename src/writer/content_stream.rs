//! PDF content stream builder.
//!
//! Builds the operator stream for one page. The exporter needs a small
//! operator set: stroked rectangles and lines for borders and cutting
//! guides, and transformed image XObject paints for the card bitmaps.

use std::io::Write;

use crate::error::Result;

/// A single PDF content stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate transformation matrix (cm)
    Transform(f32, f32, f32, f32, f32, f32),
    /// Set stroke color in DeviceRGB (RG)
    SetStrokeRgb(f32, f32, f32),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Rectangle path (re)
    Rect(f32, f32, f32, f32),
    /// Begin a path (m)
    MoveTo(f32, f32),
    /// Line segment (l)
    LineTo(f32, f32),
    /// Stroke the current path (S)
    Stroke,
    /// Paint a named XObject (Do)
    PaintXObject(String),
}

/// Builder collecting operators for one page's content stream.
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    ops: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw operator.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Set the stroke color from 0..=1 RGB components.
    pub fn set_stroke_rgb(&mut self, r: f32, g: f32, b: f32) -> &mut Self {
        self.op(ContentStreamOp::SetStrokeRgb(r, g, b))
    }

    /// Set the stroke line width in points.
    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Stroke a rectangle outline.
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.op(ContentStreamOp::Rect(x, y, width, height));
        self.op(ContentStreamOp::Stroke)
    }

    /// Stroke a straight line segment.
    pub fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x1, y1));
        self.op(ContentStreamOp::LineTo(x2, y2));
        self.op(ContentStreamOp::Stroke)
    }

    /// Paint an image XObject scaled into the given rectangle.
    ///
    /// Image space is the unit square, so the transform scales by the
    /// target extent and translates to the lower-left corner.
    pub fn draw_image(&mut self, resource_id: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.op(ContentStreamOp::SaveState);
        self.op(ContentStreamOp::Transform(width, 0.0, 0.0, height, x, y));
        self.op(ContentStreamOp::PaintXObject(resource_id.to_string()));
        self.op(ContentStreamOp::RestoreState)
    }

    /// Number of collected operators.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no operators were collected.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Serialize the collected operators to content stream bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for op in &self.ops {
            Self::write_op(&mut out, op)?;
        }
        Ok(out)
    }

    fn write_op(w: &mut Vec<u8>, op: &ContentStreamOp) -> Result<()> {
        match op {
            ContentStreamOp::SaveState => writeln!(w, "q")?,
            ContentStreamOp::RestoreState => writeln!(w, "Q")?,
            ContentStreamOp::Transform(a, b, c, d, e, f) => {
                writeln!(w, "{} {} {} {} {} {} cm", fmt(*a), fmt(*b), fmt(*c), fmt(*d), fmt(*e), fmt(*f))?
            },
            ContentStreamOp::SetStrokeRgb(r, g, b) => {
                writeln!(w, "{} {} {} RG", fmt(*r), fmt(*g), fmt(*b))?
            },
            ContentStreamOp::SetLineWidth(width) => writeln!(w, "{} w", fmt(*width))?,
            ContentStreamOp::Rect(x, y, width, height) => {
                writeln!(w, "{} {} {} {} re", fmt(*x), fmt(*y), fmt(*width), fmt(*height))?
            },
            ContentStreamOp::MoveTo(x, y) => writeln!(w, "{} {} m", fmt(*x), fmt(*y))?,
            ContentStreamOp::LineTo(x, y) => writeln!(w, "{} {} l", fmt(*x), fmt(*y))?,
            ContentStreamOp::Stroke => writeln!(w, "S")?,
            ContentStreamOp::PaintXObject(name) => writeln!(w, "/{} Do", name)?,
        }
        Ok(())
    }
}

/// Format a coordinate with fixed precision, trimming trailing zeros.
fn fmt(value: f32) -> String {
    let formatted = format!("{:.3}", value);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}
