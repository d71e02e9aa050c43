use std::sync::Arc;

use kurbo::{Affine, BezPath, PathEl, Rect, Shape};

use crate::foundation::color::Color;
use crate::foundation::error::{EaselError, EaselResult};
use crate::foundation::geometry::WindingRule;
use crate::render::canvas::{Bitmap, Canvas, TextStyle};
use crate::render::text::TextLayouter;

/// A rendered frame: premultiplied RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FramePixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

enum LayerEntry {
    Opacity,
    Transform(Affine),
}

/// CPU canvas rendering into a premultiplied RGBA8 pixmap.
pub struct CpuCanvas {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    transform: Affine,
    stack: Vec<LayerEntry>,
    text: TextLayouter,
    font_data: Option<vello_cpu::peniko::FontData>,
}

impl CpuCanvas {
    pub fn new(width: u32, height: u32) -> EaselResult<Self> {
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| EaselError::render("canvas width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| EaselError::render("canvas height exceeds u16"))?;
        Ok(Self {
            width: width_u16,
            height: height_u16,
            ctx: vello_cpu::RenderContext::new(width_u16, height_u16),
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            text: TextLayouter::new(),
            font_data: None,
        })
    }

    /// Register a font for text drawing. Returns the family name.
    pub fn register_font(&mut self, bytes: Vec<u8>) -> EaselResult<String> {
        let family = self.text.register_font(bytes)?;
        if self.font_data.is_none()
            && let Some(font_bytes) = self.text.default_font_bytes()
        {
            self.font_data = Some(vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font_bytes.as_ref().clone()),
                0,
            ));
        }
        Ok(family)
    }

    /// Finish the frame and read back its pixels.
    pub fn into_pixels(mut self) -> FramePixels {
        self.ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.render_to_pixmap(&mut pixmap);
        FramePixels {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: pixmap.data_as_u8_slice().to_vec(),
        }
    }

    fn sync_transform(&mut self) {
        self.ctx.set_transform(affine_to_cpu(self.transform));
    }

    fn set_color_paint(&mut self, color: Color) {
        let [r, g, b, a] = color.to_rgba8();
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    }
}

impl Canvas for CpuCanvas {
    fn fill_path(&mut self, path: &BezPath, rule: WindingRule, color: Color) {
        self.ctx.set_fill_rule(match rule {
            WindingRule::NonZero => vello_cpu::peniko::Fill::NonZero,
            WindingRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
        });
        self.sync_transform();
        self.set_color_paint(color);
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
    }

    fn fill_path_blurred(&mut self, path: &BezPath, color: Color, blur_radius: f64) {
        if blur_radius <= 0.0 {
            self.fill_path(path, WindingRule::NonZero, color);
            return;
        }
        let radius = blur_radius.ceil().min(64.0) as u32;
        let pad = f64::from(radius) * 2.0;
        let bounds = path.bounding_box().inflate(pad, pad);
        let w = bounds.width().ceil() as u32;
        let h = bounds.height().ceil() as u32;
        let (Ok(w16), Ok(h16)) = (u16::try_from(w.max(1)), u16::try_from(h.max(1))) else {
            // Silhouette too large to buffer; draw it sharp rather than not
            // at all.
            self.fill_path(path, WindingRule::NonZero, color);
            return;
        };

        // Pass 1: rasterize the silhouette alone.
        let mut local = vello_cpu::RenderContext::new(w16, h16);
        local.set_transform(affine_to_cpu(Affine::translate((-bounds.x0, -bounds.y0))));
        let [r, g, b, a] = color.to_rgba8();
        local.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        local.fill_path(&bezpath_to_cpu(path));
        local.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        local.render_to_pixmap(&mut pixmap);

        // Pass 2: blur and composite back as an image.
        let sigma = (blur_radius / 2.0).max(0.1) as f32;
        let blurred = match blur_rgba8_premul(pixmap.data_as_u8_slice(), w, h, radius, sigma) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(%err, "shadow blur failed; drawing sharp silhouette");
                self.fill_path(path, WindingRule::NonZero, color);
                return;
            }
        };
        pixmap.data_as_u8_slice_mut().copy_from_slice(&blurred);
        let image = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.ctx.set_transform(affine_to_cpu(
            self.transform * Affine::translate((bounds.x0, bounds.y0)),
        ));
        self.ctx.set_paint(image);
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, dest: Rect) {
        let (Ok(w16), Ok(h16)) = (
            u16::try_from(bitmap.width.max(1)),
            u16::try_from(bitmap.height.max(1)),
        ) else {
            tracing::warn!("bitmap exceeds pixmap limits; skipping");
            return;
        };
        let expected = bitmap.width as usize * bitmap.height as usize * 4;
        if bitmap.rgba8_premul.len() != expected {
            tracing::warn!("bitmap byte length mismatch; skipping");
            return;
        }
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        pixmap
            .data_as_u8_slice_mut()
            .copy_from_slice(&bitmap.rgba8_premul);
        let image = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        let natural = bitmap.size();
        let scale = Affine::scale_non_uniform(
            dest.width() / natural.width,
            dest.height() / natural.height,
        );
        self.ctx.set_transform(affine_to_cpu(
            self.transform * Affine::translate((dest.x0, dest.y0)) * scale,
        ));
        self.ctx.set_paint(image);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            natural.width,
            natural.height,
        ));
    }

    fn draw_text(&mut self, text: &str, style: &TextStyle, bounds: Rect) {
        let Some(font) = self.font_data.clone() else {
            // No registered font: degrade to drawing nothing.
            return;
        };
        let Some(layout) = self
            .text
            .layout(text, style, Some(bounds.width() as f32))
        else {
            return;
        };
        self.ctx.set_transform(affine_to_cpu(
            self.transform * Affine::translate((bounds.x0, bounds.y0)),
        ));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    fn push_opacity(&mut self, alpha: f64) {
        self.ctx
            .push_opacity_layer(alpha.clamp(0.0, 1.0) as f32);
        self.stack.push(LayerEntry::Opacity);
    }

    fn push_transform(&mut self, transform: Affine) {
        self.stack.push(LayerEntry::Transform(self.transform));
        self.transform = self.transform * transform;
    }

    fn pop(&mut self) {
        match self.stack.pop() {
            Some(LayerEntry::Opacity) => self.ctx.pop_layer(),
            Some(LayerEntry::Transform(previous)) => self.transform = previous,
            None => {
                debug_assert!(false, "pop() without matching push");
            }
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(c, p) => out.quad_to(point_to_cpu(c), point_to_cpu(p)),
            PathEl::CurveTo(c1, c2, p) => {
                out.curve_to(point_to_cpu(c1), point_to_cpu(c2), point_to_cpu(p))
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Two-pass gaussian blur over premultiplied RGBA8, fixed-point weights.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> EaselResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| EaselError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(EaselError::render(
            "blur expects src matching width*height*4",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> EaselResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(EaselError::render("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(EaselError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Make the weights sum to exactly one in Q16.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let mid_val = i64::from(weights[mid]);
        weights[mid] = (mid_val + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
