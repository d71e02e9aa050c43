/// Compositing slot an aspect occupies on its graphic.
///
/// Slots draw strictly back-to-front in the order below and hit-test in the
/// reverse order. Subgraphics render in the `Children` slot, so `Before*`/
/// `After*` slots let an aspect sit on either side of the graphic's own
/// band.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AspectPriority {
    BeforeBackground,
    Background,
    AfterBackground,
    BeforeChildren,
    Children,
    AfterChildren,
    BeforeForeground,
    Foreground,
    AfterForeground,
}

impl AspectPriority {
    /// Number of slots.
    pub const COUNT: usize = 9;

    /// All slots in draw order (back to front).
    pub const ALL: [AspectPriority; Self::COUNT] = [
        AspectPriority::BeforeBackground,
        AspectPriority::Background,
        AspectPriority::AfterBackground,
        AspectPriority::BeforeChildren,
        AspectPriority::Children,
        AspectPriority::AfterChildren,
        AspectPriority::BeforeForeground,
        AspectPriority::Foreground,
        AspectPriority::AfterForeground,
    ];

    pub const FIRST: AspectPriority = AspectPriority::BeforeBackground;
    pub const LAST: AspectPriority = AspectPriority::AfterForeground;

    /// Stable slot index for per-priority storage.
    pub fn index(self) -> usize {
        match self {
            AspectPriority::BeforeBackground => 0,
            AspectPriority::Background => 1,
            AspectPriority::AfterBackground => 2,
            AspectPriority::BeforeChildren => 3,
            AspectPriority::Children => 4,
            AspectPriority::AfterChildren => 5,
            AspectPriority::BeforeForeground => 6,
            AspectPriority::Foreground => 7,
            AspectPriority::AfterForeground => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AspectPriority::BeforeBackground => "before-background",
            AspectPriority::Background => "background",
            AspectPriority::AfterBackground => "after-background",
            AspectPriority::BeforeChildren => "before-children",
            AspectPriority::Children => "children",
            AspectPriority::AfterChildren => "after-children",
            AspectPriority::BeforeForeground => "before-foreground",
            AspectPriority::Foreground => "foreground",
            AspectPriority::AfterForeground => "after-foreground",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/priority.rs"]
mod tests;
