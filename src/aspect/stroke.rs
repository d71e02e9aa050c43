use std::fmt;
use std::str::FromStr;

use crate::foundation::color::Color;
use crate::foundation::error::{EaselError, EaselResult};
use crate::foundation::geometry::{LineCap, LineJoin, StrokeGeometry};

/// Dash segments plus a phase offset into the pattern.
///
/// The string form is the classic space-separated on/off run list, e.g.
/// `"1 1 2 1"`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DashPattern {
    pub segments: Vec<f64>,
    #[serde(default)]
    pub phase: f64,
}

impl DashPattern {
    pub fn new(segments: Vec<f64>) -> EaselResult<Self> {
        let pattern = Self {
            segments,
            phase: 0.0,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> EaselResult<()> {
        if self.segments.is_empty() {
            return Err(EaselError::validation("dash pattern must not be empty"));
        }
        if self.segments.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(EaselError::validation(
                "dash segments must be finite and >= 0",
            ));
        }
        if self.segments.iter().all(|s| *s == 0.0) {
            return Err(EaselError::validation(
                "dash pattern needs at least one segment > 0",
            ));
        }
        Ok(())
    }
}

impl FromStr for DashPattern {
    type Err = EaselError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| EaselError::validation(format!("invalid dash segment '{tok}'")))
            })
            .collect::<EaselResult<Vec<_>>>()?;
        Self::new(segments)
    }
}

impl fmt::Display for DashPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        Ok(())
    }
}

/// Outline stroke along the graphic's path.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub active: bool,
    pub color: Color,
    pub width: f64,
    pub miter_limit: f64,
    pub join: LineJoin,
    pub cap: LineCap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<DashPattern>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            active: true,
            color: Color::BLACK,
            width: 1.0,
            miter_limit: 10.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
            dash: None,
        }
    }
}

impl Stroke {
    /// Minimum effective width for point hit-testing, so hairlines stay
    /// clickable.
    pub(crate) const MIN_HIT_WIDTH: f64 = 5.0;

    pub fn with_width(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Stroke geometry with the width floored at the graphic's `error`, the
    /// way the renderer will actually produce it.
    pub(crate) fn geometry(&self, error: f64) -> StrokeGeometry {
        let (dash_segments, dash_phase) = match &self.dash {
            Some(dash) => (dash.segments.clone(), dash.phase),
            None => (Vec::new(), 0.0),
        };
        StrokeGeometry {
            width: self.width.max(error),
            join: self.join,
            cap: self.cap,
            miter_limit: self.miter_limit.max(1.0),
            dash_segments,
            dash_phase,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/stroke.rs"]
mod tests;
