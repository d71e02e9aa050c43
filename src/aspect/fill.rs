use crate::foundation::color::Color;
use crate::foundation::geometry::WindingRule;

/// Solid-color interior fill.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fill {
    pub active: bool,
    pub color: Color,
    pub winding_rule: WindingRule,
}

impl Default for Fill {
    fn default() -> Self {
        Self {
            active: true,
            color: Color::WHITE,
            winding_rule: WindingRule::NonZero,
        }
    }
}

impl Fill {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/fill.rs"]
mod tests;
