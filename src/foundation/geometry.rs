use kurbo::{BezPath, Cap, Join, Line, ParamCurve, PathEl, Point, Rect, Shape, Stroke, StrokeOpts};

/// Fill rule used when testing point containment against a closed path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindingRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// Line join style for stroked paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Line cap style for stroked paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineJoin {
    pub(crate) fn to_kurbo(self) -> Join {
        match self {
            LineJoin::Miter => Join::Miter,
            LineJoin::Round => Join::Round,
            LineJoin::Bevel => Join::Bevel,
        }
    }
}

impl LineCap {
    pub(crate) fn to_kurbo(self) -> Cap {
        match self {
            LineCap::Butt => Cap::Butt,
            LineCap::Round => Cap::Round,
            LineCap::Square => Cap::Square,
        }
    }
}

/// Stroke parameters consumed by [`expand_stroke`].
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeGeometry {
    pub width: f64,
    pub join: LineJoin,
    pub cap: LineCap,
    pub miter_limit: f64,
    /// Dash segments and phase; empty segments means solid.
    pub dash_segments: Vec<f64>,
    pub dash_phase: f64,
}

impl StrokeGeometry {
    pub fn solid(width: f64) -> Self {
        Self {
            width,
            join: LineJoin::default(),
            cap: LineCap::default(),
            miter_limit: 10.0,
            dash_segments: Vec::new(),
            dash_phase: 0.0,
        }
    }
}

/// Does `point` fall inside `path` under the given fill rule?
pub fn path_contains_point(path: &BezPath, rule: WindingRule, point: Point) -> bool {
    let winding = path.winding(point);
    match rule {
        WindingRule::NonZero => winding != 0,
        WindingRule::EvenOdd => winding % 2 != 0,
    }
}

/// Expand a path to the outline of its stroke.
///
/// Hit-testing and bounds for stroked geometry run on this outline so that
/// "what is drawn is what is hit" holds for wide and dashed strokes alike.
pub fn expand_stroke(path: &BezPath, geometry: &StrokeGeometry, tolerance: f64) -> BezPath {
    let mut style = Stroke::new(geometry.width.max(0.0))
        .with_join(geometry.join.to_kurbo())
        .with_caps(geometry.cap.to_kurbo())
        .with_miter_limit(geometry.miter_limit.max(1.0));
    if !geometry.dash_segments.is_empty() {
        style = style.with_dashes(geometry.dash_phase, geometry.dash_segments.iter().copied());
    }
    kurbo::stroke(
        path.elements().iter().copied(),
        &style,
        &StrokeOpts::default(),
        tolerance,
    )
}

/// Flatten a path into line segments at the given tolerance.
pub fn flatten_to_lines(path: &BezPath, tolerance: f64) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut subpath_start: Option<Point> = None;
    let mut current: Option<Point> = None;

    kurbo::flatten(
        path.elements().iter().copied(),
        tolerance,
        |el| match el {
            PathEl::MoveTo(p) => {
                subpath_start = Some(p);
                current = Some(p);
            }
            PathEl::LineTo(p) => {
                if let Some(from) = current {
                    lines.push(Line::new(from, p));
                }
                current = Some(p);
            }
            PathEl::ClosePath => {
                if let (Some(from), Some(start)) = (current, subpath_start) {
                    lines.push(Line::new(from, start));
                }
                current = subpath_start;
            }
            // flatten only emits moves, lines, and closes
            _ => {}
        },
    );

    lines
}

/// Does `rect` touch the path?
///
/// `filled` decides whether the interior counts: a rect fully inside a filled
/// path intersects it, while the same rect misses a bare outline.
pub fn rect_intersects_path(
    rect: Rect,
    path: &BezPath,
    rule: WindingRule,
    filled: bool,
    tolerance: f64,
) -> bool {
    let lines = flatten_to_lines(path, tolerance);
    for line in &lines {
        if line_intersects_rect(*line, rect) {
            return true;
        }
    }
    if filled {
        // No edge crossing: either disjoint or one contains the other.
        return path_contains_point(path, rule, rect.center());
    }
    false
}

/// Segment-vs-rect test: either endpoint inside, or a crossing of any edge.
pub fn line_intersects_rect(line: Line, rect: Rect) -> bool {
    if rect.contains(line.p0) || rect.contains(line.p1) {
        return true;
    }
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    for i in 0..4 {
        let edge = Line::new(corners[i], corners[(i + 1) % 4]);
        if segments_intersect(line, edge).is_some() {
            return true;
        }
    }
    false
}

/// Intersection point of two segments, if they cross.
pub fn segments_intersect(a: Line, b: Line) -> Option<Point> {
    let d1 = a.p1 - a.p0;
    let d2 = b.p1 - b.p0;
    let denom = d1.x * d2.y - d1.y * d2.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let delta = b.p0 - a.p0;
    let t = (delta.x * d2.y - delta.y * d2.x) / denom;
    let u = (delta.x * d1.y - delta.y * d1.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a.eval(t))
    } else {
        None
    }
}

/// Where does the path's outline cross `line`, preferring the crossing
/// nearest `line.p1`?
///
/// Links attach at this point: the line runs from a graphic's interior out to
/// the far endpoint, and the connector should start where it leaves the
/// shape.
pub fn path_intersection_with_line(path: &BezPath, line: Line, tolerance: f64) -> Option<Point> {
    let mut best: Option<(f64, Point)> = None;
    for seg in flatten_to_lines(path, tolerance) {
        if let Some(hit) = segments_intersect(line, seg) {
            let dist = (hit - line.p1).hypot();
            if best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, hit));
            }
        }
    }
    best.map(|(_, p)| p)
}

/// Tangent angle (radians) at the start of the path's first segment.
pub fn angle_at_start(path: &BezPath, tolerance: f64) -> Option<f64> {
    let lines = flatten_to_lines(path, tolerance);
    lines.first().map(|l| {
        let d = l.p1 - l.p0;
        d.y.atan2(d.x)
    })
}

/// Tangent angle (radians) at the end of the path's last segment.
pub fn angle_at_end(path: &BezPath, tolerance: f64) -> Option<f64> {
    let lines = flatten_to_lines(path, tolerance);
    lines.last().map(|l| {
        let d = l.p1 - l.p0;
        d.y.atan2(d.x)
    })
}

/// True when `point` lies within `tolerance` of `target` on both axes.
///
/// Handle hits use a square test so the hot zone matches the square handle
/// adornment the host draws.
pub fn point_near(point: Point, target: Point, tolerance: f64) -> bool {
    (point.x - target.x).abs() <= tolerance && (point.y - target.y).abs() <= tolerance
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/geometry.rs"]
mod tests;
