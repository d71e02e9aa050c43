use std::sync::Arc;

use kurbo::{Affine, BezPath, Rect};

use crate::foundation::color::Color;
use crate::foundation::geometry::WindingRule;

/// Decoded, premultiplied RGBA8 pixels ready for the canvas.
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl Bitmap {
    /// Decode from encoded image bytes (PNG, JPEG, ...), premultiplying.
    pub fn decode(bytes: &[u8]) -> crate::foundation::error::EaselResult<Self> {
        use anyhow::Context as _;

        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);

        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Intrinsic size in points (1 pixel = 1 point).
    pub fn size(&self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width), f64::from(self.height))
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Horizontal text alignment within a graphic's bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
}

/// Style applied to a run of canvas text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    /// CSS-style family source list; `None` falls back to `sans-serif`.
    pub family: Option<String>,
    pub size: f64,
    pub color: Color,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: None,
            size: 12.0,
            color: Color::BLACK,
            align: TextAlign::Start,
        }
    }
}

/// The graphics context aspects draw against.
///
/// Implementations are stateful: `push_opacity`/`push_transform` open layers
/// that a later `pop` closes, in strict LIFO order. The draw pass enforces
/// the pairing via deferred completions.
pub trait Canvas {
    fn fill_path(&mut self, path: &BezPath, rule: WindingRule, color: Color);

    /// Fill the path's silhouette with a gaussian blur applied. Shadows use
    /// this; the path arrives already offset.
    fn fill_path_blurred(&mut self, path: &BezPath, color: Color, blur_radius: f64);

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dest: Rect);

    /// Lay out and draw text inside `bounds`, breaking lines at its width.
    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect);

    fn push_opacity(&mut self, alpha: f64);

    fn push_transform(&mut self, transform: Affine);

    fn pop(&mut self);
}

/// A single operation captured by [`RecordingCanvas`].
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasOp {
    FillPath {
        path: BezPath,
        rule: WindingRule,
        color: Color,
    },
    FillPathBlurred {
        path: BezPath,
        color: Color,
        blur_radius: f64,
    },
    DrawBitmap {
        dest: Rect,
        width: u32,
        height: u32,
    },
    DrawText {
        text: String,
        color: Color,
        bounds: Rect,
    },
    PushOpacity(f64),
    PushTransform(Affine),
    Pop,
}

/// Canvas that records operations instead of producing pixels.
///
/// Draw-order and occlusion behavior are asserted against the op log rather
/// than against rendered pixels.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    ops: Vec<CanvasOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<CanvasOp> {
        self.ops
    }
}

impl Canvas for RecordingCanvas {
    fn fill_path(&mut self, path: &BezPath, rule: WindingRule, color: Color) {
        self.ops.push(CanvasOp::FillPath {
            path: path.clone(),
            rule,
            color,
        });
    }

    fn fill_path_blurred(&mut self, path: &BezPath, color: Color, blur_radius: f64) {
        self.ops.push(CanvasOp::FillPathBlurred {
            path: path.clone(),
            color,
            blur_radius,
        });
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dest: Rect) {
        self.ops.push(CanvasOp::DrawBitmap {
            dest,
            width: bitmap.width,
            height: bitmap.height,
        });
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect) {
        self.ops.push(CanvasOp::DrawText {
            text: text.to_string(),
            color: style.color,
            bounds,
        });
    }

    fn push_opacity(&mut self, alpha: f64) {
        self.ops.push(CanvasOp::PushOpacity(alpha));
    }

    fn push_transform(&mut self, transform: Affine) {
        self.ops.push(CanvasOp::PushTransform(transform));
    }

    fn pop(&mut self) {
        self.ops.push(CanvasOp::Pop);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
