use std::sync::Arc;

use crate::foundation::error::{EaselError, EaselResult};
use crate::render::canvas::{TextAlign, TextStyle};

/// Per-glyph color brush carried through parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Stateful helper building parley text layouts from registered font bytes.
///
/// The core ships no fonts; the host registers the faces it wants available
/// and text degrades to drawing nothing until one is registered.
pub struct TextLayouter {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    default_family: Option<String>,
    font_bytes: Option<Arc<Vec<u8>>>,
}

impl Default for TextLayouter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayouter {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            default_family: None,
            font_bytes: None,
        }
    }

    /// Register a font from raw bytes; the first registered face becomes the
    /// fallback family. Returns the detected family name.
    pub fn register_font(&mut self, bytes: Vec<u8>) -> EaselResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            EaselError::resource("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| EaselError::resource("registered font family has no name"))?
            .to_string();
        if self.default_family.is_none() {
            self.default_family = Some(family_name.clone());
            self.font_bytes = Some(Arc::new(bytes));
        }
        Ok(family_name)
    }

    pub fn has_font(&self) -> bool {
        self.default_family.is_some()
    }

    /// Bytes of the fallback face, for glyph rendering.
    pub fn default_font_bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.font_bytes.clone()
    }

    /// Shape and lay out `text`, breaking lines at `max_width` and applying
    /// the style's alignment. `None` when no usable font is registered.
    pub fn layout(
        &mut self,
        text: &str,
        style: &TextStyle,
        max_width: Option<f32>,
    ) -> Option<parley::Layout<TextBrush>> {
        let family = style
            .family
            .clone()
            .or_else(|| self.default_family.clone())?;
        let size = style.size as f32;
        if !size.is_finite() || size <= 0.0 {
            return None;
        }
        let [r, g, b, a] = style.color.to_rgba8();
        let brush = TextBrush { r, g, b, a };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        let alignment = match style.align {
            TextAlign::Start => parley::Alignment::Start,
            TextAlign::Center => parley::Alignment::Center,
            TextAlign::End => parley::Alignment::End,
        };
        match max_width {
            Some(w) => {
                layout.break_all_lines(Some(w));
                layout.align(Some(w), alignment, parley::AlignmentOptions::default());
            }
            None => {
                layout.break_all_lines(None);
                layout.align(None, alignment, parley::AlignmentOptions::default());
            }
        }
        Some(layout)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
