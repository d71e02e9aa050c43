use kurbo::{Rect, Vec2};

use crate::foundation::color::Color;

/// Soft drop shadow under the graphic.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shadow {
    pub active: bool,
    pub color: Color,
    pub offset: Vec2,
    pub blur_radius: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            active: true,
            color: Color::gray(0.0, 0.25),
            offset: Vec2::new(0.0, -4.0),
            blur_radius: 10.0,
        }
    }
}

impl Shadow {
    /// Bounds grown to cover the blurred, offset silhouette.
    ///
    /// Inset by -(blur + 2) to cover the blur falloff, shift by the offset,
    /// then union with the input so the un-shadowed side stays covered.
    pub(crate) fn expanded_bounds(&self, bounds: Rect) -> Rect {
        let grown = bounds.inflate(self.blur_radius + 2.0, self.blur_radius + 2.0) + self.offset;
        bounds.union(grown)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/shadow.rs"]
mod tests;
