/// Uniform transparency applied to everything the graphic draws.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Opacity {
    pub active: bool,
    value: f64,
}

impl Default for Opacity {
    fn default() -> Self {
        Self {
            active: true,
            value: 1.0,
        }
    }
}

impl Opacity {
    pub fn new(value: f64) -> Self {
        Self {
            active: true,
            value: value.clamp(0.0, 1.0),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/opacity.rs"]
mod tests;
