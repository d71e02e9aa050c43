use kurbo::{Rect, Size};

use crate::foundation::error::{EaselError, EaselResult};
use crate::render::canvas::Bitmap;

/// Where the bitmap sits inside the graphic's bounds when it doesn't fill
/// them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageAlignment {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

/// How the bitmap is sized into the graphic's bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageScaling {
    /// Natural size, positioned by alignment.
    None,
    /// Fill the bounds exactly, ignoring the aspect ratio.
    Stretch,
    /// Largest proportional size that fits entirely inside the bounds.
    #[default]
    ProportionallyFit,
    /// Smallest proportional size that covers the bounds entirely.
    ProportionallyFill,
}

/// Bitmap rendered inside the graphic's bounds.
///
/// The decoded bitmap is runtime-only state: archives carry the source path,
/// and a load failure leaves the last-known-good pixels (or none) in place
/// while the rest of the graphic keeps drawing.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ImageAspect {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub alignment: ImageAlignment,
    pub scaling: ImageScaling,
    #[serde(skip)]
    bitmap: Option<Bitmap>,
}

impl PartialEq for ImageAspect {
    fn eq(&self, other: &Self) -> bool {
        // Runtime pixels are excluded; equality is over persisted fields.
        self.active == other.active
            && self.source == other.source
            && self.alignment == other.alignment
            && self.scaling == other.scaling
    }
}

impl ImageAspect {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            active: true,
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn set_bitmap(&mut self, bitmap: Option<Bitmap>) {
        self.bitmap = bitmap;
    }

    /// (Re)load the bitmap from `source`.
    ///
    /// On failure the previous bitmap, if any, stays in place so the aspect
    /// keeps answering bounds and hit-tests from its last-known-good state.
    pub fn load(&mut self) -> EaselResult<()> {
        let Some(source) = self.source.clone() else {
            return Err(EaselError::resource("image aspect has no source path"));
        };
        let bytes = std::fs::read(&source).map_err(|err| {
            tracing::warn!(source = %source, %err, "image source unreadable; keeping previous bitmap");
            EaselError::resource(format!("cannot read image '{source}': {err}"))
        })?;
        let bitmap = Bitmap::decode(&bytes).map_err(|err| {
            tracing::warn!(source = %source, %err, "image decode failed; keeping previous bitmap");
            err
        })?;
        self.bitmap = Some(bitmap);
        Ok(())
    }

    /// Destination rect for the bitmap within `bounds`.
    pub(crate) fn destination_rect(&self, bounds: Rect) -> Option<Rect> {
        let bitmap = self.bitmap.as_ref()?;
        let natural = bitmap.size();
        if natural.width <= 0.0 || natural.height <= 0.0 {
            return None;
        }

        let size = match self.scaling {
            ImageScaling::None => natural,
            ImageScaling::Stretch => bounds.size(),
            ImageScaling::ProportionallyFit => {
                let scale =
                    (bounds.width() / natural.width).min(bounds.height() / natural.height);
                Size::new(natural.width * scale, natural.height * scale)
            }
            ImageScaling::ProportionallyFill => {
                let scale =
                    (bounds.width() / natural.width).max(bounds.height() / natural.height);
                Size::new(natural.width * scale, natural.height * scale)
            }
        };

        let x = match self.alignment {
            ImageAlignment::TopLeft | ImageAlignment::Left | ImageAlignment::BottomLeft => {
                bounds.x0
            }
            ImageAlignment::Top | ImageAlignment::Center | ImageAlignment::Bottom => {
                bounds.x0 + (bounds.width() - size.width) / 2.0
            }
            ImageAlignment::TopRight | ImageAlignment::Right | ImageAlignment::BottomRight => {
                bounds.x1 - size.width
            }
        };
        let y = match self.alignment {
            ImageAlignment::TopLeft | ImageAlignment::Top | ImageAlignment::TopRight => bounds.y0,
            ImageAlignment::Left | ImageAlignment::Center | ImageAlignment::Right => {
                bounds.y0 + (bounds.height() - size.height) / 2.0
            }
            ImageAlignment::BottomLeft | ImageAlignment::Bottom | ImageAlignment::BottomRight => {
                bounds.y1 - size.height
            }
        };

        Some(Rect::new(x, y, x + size.width, y + size.height))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/image.rs"]
mod tests;
