use kurbo::{BezPath, PathEl, Point};

/// Kind of path element an annotation describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Move,
    Line,
    Quad,
    Cubic,
    Close,
}

/// Derived per-segment geometry: the element kind, its endpoint, and the
/// incoming direction at that endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentAnnotation {
    pub kind: SegmentKind,
    pub endpoint: Point,
    pub angle: f64,
}

/// Derived geometry annotations drawn over the graphic.
///
/// Never archived: the annotations are recomputed from the path, and the
/// cache is dropped whenever the owner's shape changes.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PathAnalysis {
    pub active: bool,
    #[serde(skip)]
    annotations: Option<Vec<SegmentAnnotation>>,
}

impl PartialEq for PathAnalysis {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active
    }
}

impl PathAnalysis {
    /// Side length of the square markers drawn at segment endpoints.
    pub(crate) const MARKER_SIZE: f64 = 3.0;

    pub fn new() -> Self {
        Self {
            active: true,
            annotations: None,
        }
    }

    /// Cached annotations, computing them on first use.
    pub fn annotations(&mut self, path: &BezPath) -> &[SegmentAnnotation] {
        if self.annotations.is_none() {
            self.annotations = Some(Self::compute(path));
        }
        self.annotations.as_deref().unwrap_or_default()
    }

    pub(crate) fn invalidate(&mut self) {
        self.annotations = None;
    }

    pub(crate) fn cached(&self) -> Option<&[SegmentAnnotation]> {
        self.annotations.as_deref()
    }

    pub(crate) fn compute(path: &BezPath) -> Vec<SegmentAnnotation> {
        let mut annotations = Vec::new();
        let mut current = Point::ZERO;
        let mut subpath_start = Point::ZERO;

        for el in path.elements() {
            let (kind, from, to) = match *el {
                PathEl::MoveTo(p) => {
                    subpath_start = p;
                    (SegmentKind::Move, current, p)
                }
                PathEl::LineTo(p) => (SegmentKind::Line, current, p),
                PathEl::QuadTo(c, p) => (SegmentKind::Quad, c, p),
                PathEl::CurveTo(_, c2, p) => (SegmentKind::Cubic, c2, p),
                PathEl::ClosePath => (SegmentKind::Close, current, subpath_start),
            };
            let d = to - from;
            let angle = if d.hypot() > 0.0 { d.y.atan2(d.x) } else { 0.0 };
            annotations.push(SegmentAnnotation {
                kind,
                endpoint: to,
                angle,
            });
            current = to;
        }

        annotations
    }
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/analysis.rs"]
mod tests;
