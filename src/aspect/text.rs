use crate::render::canvas::TextStyle;

/// Text laid out and drawn inside the graphic's bounds.
///
/// Shaping happens at the canvas: the aspect carries only the model data, so
/// missing fonts degrade at draw time without touching the scene graph.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TextAspect {
    pub active: bool,
    pub text: String,
    pub style: TextStyle,
    #[serde(skip)]
    editing: bool,
}

impl PartialEq for TextAspect {
    fn eq(&self, other: &Self) -> bool {
        // The in-place editing flag is runtime state.
        self.active == other.active && self.text == other.text && self.style == other.style
    }
}

impl TextAspect {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            active: true,
            text: text.into(),
            style: TextStyle::default(),
            editing: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn begin_editing(&mut self) -> bool {
        self.editing = true;
        true
    }

    pub(crate) fn end_editing(&mut self) {
        self.editing = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/text.rs"]
mod tests;
