use crate::aspect::Aspect;
use crate::aspect::analysis::PathAnalysis;
use crate::aspect::fill::Fill;
use crate::aspect::image::ImageAspect;
use crate::aspect::opacity::Opacity;
use crate::aspect::priority::AspectPriority;
use crate::aspect::reflection::Reflection;
use crate::aspect::shadow::Shadow;
use crate::aspect::stroke::Stroke;
use crate::aspect::text::TextAspect;

/// Closed set of aspect variants, keyed by a stable string identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectKind {
    Fill,
    Stroke,
    Shadow,
    Opacity,
    Reflection,
    Image,
    Text,
    PathAnalysis,
}

/// One registry row: identifier, default slot, and factory.
struct Registration {
    kind: AspectKind,
    identifier: &'static str,
    default_priority: AspectPriority,
    factory: fn() -> Aspect,
}

/// The static registry: every built-in aspect kind with its identifier and
/// default priority. Decode and the primary-aspect accessors both resolve
/// through this table.
static REGISTRY: &[Registration] = &[
    Registration {
        kind: AspectKind::Fill,
        identifier: "fill",
        default_priority: AspectPriority::Background,
        factory: || Aspect::Fill(Fill::default()),
    },
    Registration {
        kind: AspectKind::Stroke,
        identifier: "stroke",
        default_priority: AspectPriority::Foreground,
        factory: || Aspect::Stroke(Stroke::default()),
    },
    Registration {
        kind: AspectKind::Shadow,
        identifier: "shadow",
        default_priority: AspectPriority::BeforeBackground,
        factory: || Aspect::Shadow(Shadow::default()),
    },
    Registration {
        kind: AspectKind::Opacity,
        identifier: "opacity",
        default_priority: AspectPriority::BeforeBackground,
        factory: || Aspect::Opacity(Opacity::default()),
    },
    Registration {
        kind: AspectKind::Reflection,
        identifier: "reflection",
        default_priority: AspectPriority::BeforeBackground,
        factory: || Aspect::Reflection(Reflection::default()),
    },
    Registration {
        kind: AspectKind::Image,
        identifier: "image",
        default_priority: AspectPriority::Background,
        factory: || Aspect::Image(ImageAspect::default()),
    },
    Registration {
        kind: AspectKind::Text,
        identifier: "text",
        default_priority: AspectPriority::AfterBackground,
        factory: || Aspect::Text(TextAspect::default()),
    },
    Registration {
        kind: AspectKind::PathAnalysis,
        identifier: "path-analysis",
        default_priority: AspectPriority::AfterForeground,
        factory: || Aspect::PathAnalysis(PathAnalysis::new()),
    },
];

impl AspectKind {
    /// All registered kinds in registration order.
    pub fn all() -> impl Iterator<Item = AspectKind> {
        REGISTRY.iter().map(|r| r.kind)
    }

    fn registration(self) -> &'static Registration {
        REGISTRY
            .iter()
            .find(|r| r.kind == self)
            .expect("every AspectKind is registered")
    }

    pub fn identifier(self) -> &'static str {
        self.registration().identifier
    }

    /// Resolve an identifier back to a kind, if registered.
    pub fn for_identifier(identifier: &str) -> Option<AspectKind> {
        REGISTRY
            .iter()
            .find(|r| r.identifier == identifier)
            .map(|r| r.kind)
    }

    /// The slot an aspect of this kind occupies unless placed explicitly.
    pub fn default_priority(self) -> AspectPriority {
        self.registration().default_priority
    }

    /// Build a default instance of this kind.
    pub fn instantiate(self) -> Aspect {
        (self.registration().factory)()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/registry.rs"]
mod tests;
