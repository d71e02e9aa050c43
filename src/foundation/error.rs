/// Convenience alias used throughout the crate.
pub type EaselResult<T> = Result<T, EaselError>;

#[derive(thiserror::Error, Debug)]
/// Error taxonomy for the drawing core.
///
/// Rendering and hit-testing never surface errors; only structural edits,
/// resource loading, and archival do.
pub enum EaselError {
    /// A value failed validation (bad dash pattern, bad color string, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// A structural edit would violate a scene invariant (cycle, missing
    /// aspect, duplicate layer name, ...).
    #[error("structure error: {0}")]
    Structure(String),

    /// An external resource could not be loaded (image file, font).
    #[error("resource error: {0}")]
    Resource(String),

    /// A document archive could not be read or written.
    #[error("archive error: {0}")]
    Archive(String),

    /// A render surface could not be produced.
    #[error("render error: {0}")]
    Render(String),

    /// Any other error, preserved with its source chain.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EaselError {
    /// Build a [`EaselError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`EaselError::Structure`].
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// Build a [`EaselError::Resource`].
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`EaselError::Archive`].
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Build a [`EaselError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
