use kurbo::Rect;

/// Mirrored, faded rendition of the graphic drawn beneath it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Reflection {
    /// Off by default; the primary accessor creates it ready to enable.
    pub active: bool,
    /// Constant opacity applied to the mirrored rendition.
    pub fade: f64,
    /// Vertical gap between the graphic and its reflection.
    pub gap: f64,
}

impl Default for Reflection {
    fn default() -> Self {
        Self {
            active: false,
            fade: 0.3,
            gap: 2.0,
        }
    }
}

impl Reflection {
    /// Bounds grown downward to cover the mirrored copy.
    pub(crate) fn expanded_bounds(&self, bounds: Rect) -> Rect {
        let mirrored = Rect::new(
            bounds.x0,
            bounds.y1 + self.gap,
            bounds.x1,
            bounds.y1 + self.gap + bounds.height(),
        );
        bounds.union(mirrored)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/reflection.rs"]
mod tests;
