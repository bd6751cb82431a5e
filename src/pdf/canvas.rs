use crate::fonts::FontRole;

pub type Rgb = [u8; 3];

/// One positioned drawing operation. Coordinates are PDF user space:
/// origin bottom-left, y growing upwards, text positioned by its baseline.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: FontRole,
        color: Rgb,
        text: String,
        /// Advance width of `text` at `size`, as measured during layout.
        width: f32,
    },
    /// Translucent text rotated counter-clockwise by `angle` degrees about its origin.
    Watermark {
        x: f32,
        y: f32,
        size: f32,
        font: FontRole,
        color: Rgb,
        text: String,
        angle: f32,
        opacity: f32,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
        line_width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        line_width: f32,
    },
    /// Index into the prepared image list of the layout.
    Image {
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Display list of a single page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageCanvas {
    ops: Vec<DrawOp>,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub(crate) fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn text(
        &mut self,
        x: f32,
        y: f32,
        font: FontRole,
        size: f32,
        color: Rgb,
        text: impl Into<String>,
        width: f32,
    ) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y,
            size,
            font,
            color,
            text,
            width,
        });
    }

    pub(crate) fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    pub(crate) fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
        line_width: f32,
    ) {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y,
            width,
            height,
            color,
            line_width,
        });
    }

    pub(crate) fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, line_width: f32) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            color,
            line_width,
        });
    }

    /// All text drawn on the page, one op per line, in drawing order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            let text = match op {
                DrawOp::Text { text, .. } | DrawOp::Watermark { text, .. } => text,
                _ => continue,
            };
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(text);
        }
        out
    }

    pub fn has_watermark(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, DrawOp::Watermark { .. }))
    }

    /// Images on this page as `(index, x, y, width, height)`.
    pub fn images(&self) -> impl Iterator<Item = (usize, f32, f32, f32, f32)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            DrawOp::Image {
                index,
                x,
                y,
                width,
                height,
            } => Some((index, x, y, width, height)),
            _ => None,
        })
    }
}
