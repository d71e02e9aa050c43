use std::collections::BTreeSet;

use kurbo::{Affine, BezPath, Ellipse, PathEl, Point, Rect, Shape, Vec2};

use crate::aspect::priority::AspectPriority;
use crate::aspect::registry::AspectKind;
use crate::aspect::{Aspect, AspectFilter, DrawCompletion};
use crate::foundation::color::Color;
use crate::foundation::error::{EaselError, EaselResult};
use crate::foundation::geometry::{StrokeGeometry, WindingRule, expand_stroke, point_near};
use crate::foundation::math::RandomSequence;
use crate::render::canvas::Canvas;
use crate::scene::arena::{GraphicArena, GraphicId};
use crate::scene::handle::Handle;
use crate::scene::page::PageId;

/// A pointer event handed in by the external tool layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub location: Point,
    pub click_count: u8,
}

impl PointerEvent {
    pub fn at(location: Point) -> Self {
        Self {
            location,
            click_count: 1,
        }
    }
}

/// Autoresizing flags applied to subgraphics when their parent's frame
/// changes. Flagged components flex; unflagged ones stay fixed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct AutosizeMask(pub u8);

impl AutosizeMask {
    pub const NONE: AutosizeMask = AutosizeMask(0x00);
    pub const MIN_X: AutosizeMask = AutosizeMask(0x01);
    pub const WIDTH: AutosizeMask = AutosizeMask(0x02);
    pub const MAX_X: AutosizeMask = AutosizeMask(0x04);
    pub const MIN_Y: AutosizeMask = AutosizeMask(0x08);
    pub const HEIGHT: AutosizeMask = AutosizeMask(0x10);
    pub const MAX_Y: AutosizeMask = AutosizeMask(0x20);
    pub const ALL: AutosizeMask = AutosizeMask(0x3f);

    pub fn contains(self, other: AutosizeMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AutosizeMask {
    type Output = AutosizeMask;

    fn bitor(self, rhs: AutosizeMask) -> AutosizeMask {
        AutosizeMask(self.0 | rhs.0)
    }
}

/// The closed set of graphic kinds.
///
/// Rectangle and Ellipse reconstruct their path from the frame, so they
/// never archive it; Pen's path is authoritative; Link derives its path from
/// the graphics it connects.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphicShape {
    Rectangle,
    Ellipse,
    Pen,
    Link {
        source: Option<GraphicId>,
        destination: Option<GraphicId>,
    },
}

impl GraphicShape {
    /// Same concrete kind, ignoring per-instance data like link endpoints.
    pub fn same_kind(&self, other: &GraphicShape) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Clone, Debug)]
struct TrackingState {
    handle: Handle,
    original_frame: Rect,
    original_path: BezPath,
    last_point: Point,
}

/// A node in the drawing's scene graph.
///
/// Owns its path and aspect stacks; everything across graphics (children,
/// related graphics, link endpoints) is an id resolved through the arena.
/// Clones share nothing; callers duplicating into a document clear the
/// containment fields by re-adding through the document.
#[derive(Clone, Debug)]
pub struct Graphic {
    id: GraphicId,
    shape: GraphicShape,
    path: BezPath,
    frame: Rect,
    bounds: Rect,
    bounds_dirty: bool,
    aspects: [Vec<Aspect>; AspectPriority::COUNT],
    subgraphics: Vec<GraphicId>,
    supergraphic: Option<GraphicId>,
    related: BTreeSet<GraphicId>,
    page: Option<PageId>,
    layer: Option<String>,
    /// Skip this graphic during drawing (used while the host redraws it in a
    /// new position).
    pub ignore: bool,
    editing: bool,
    autosize_subgraphics: bool,
    autoresizing_mask: AutosizeMask,
    random: RandomSequence,
    flatness: f64,
    tracking: Option<TrackingState>,
}

impl Graphic {
    /// Padding added around the bounds so handle adornment redraws too.
    pub(crate) const HANDLE_ADORNMENT: f64 = 4.0;
    /// Half-size of a handle's hit zone.
    pub(crate) const HANDLE_TOLERANCE: f64 = 4.0;
    const DEFAULT_FLATNESS: f64 = 1.0;

    pub fn new(shape: GraphicShape, frame: Rect) -> Self {
        let mut graphic = Self {
            id: GraphicId(0),
            shape,
            path: BezPath::new(),
            frame,
            bounds: Rect::ZERO,
            bounds_dirty: true,
            aspects: Default::default(),
            subgraphics: Vec::new(),
            supergraphic: None,
            related: BTreeSet::new(),
            page: None,
            layer: None,
            ignore: false,
            editing: false,
            autosize_subgraphics: false,
            autoresizing_mask: AutosizeMask::NONE,
            random: RandomSequence::new(0),
            flatness: Self::DEFAULT_FLATNESS,
            tracking: None,
        };
        graphic.rebuild_path_from_frame();
        graphic
    }

    /// A freeform Pen graphic owning the given path.
    pub fn with_path(path: BezPath) -> Self {
        let frame = path.bounding_box();
        let mut graphic = Self::new(GraphicShape::Pen, frame);
        graphic.path = path;
        graphic.bounds_dirty = true;
        graphic
    }

    // MARK: identity and containment

    pub fn id(&self) -> GraphicId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: GraphicId) {
        self.id = id;
    }

    pub fn shape(&self) -> &GraphicShape {
        &self.shape
    }

    pub(crate) fn shape_mut(&mut self) -> &mut GraphicShape {
        &mut self.shape
    }

    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub(crate) fn set_page_and_layer(&mut self, page: Option<PageId>, layer: Option<String>) {
        self.page = page;
        self.layer = layer;
    }

    pub(crate) fn set_layer_name(&mut self, layer: String) {
        self.layer = Some(layer);
    }

    // MARK: path and frame

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// Replace the path outright (Pen editing, link rerouting). The frame
    /// follows the path.
    pub fn set_path(&mut self, path: BezPath) {
        self.path = path;
        self.frame = self.path.bounding_box();
        self.note_bounds_are_dirty();
        self.inform_aspects_of_shape_change();
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Move/resize the frame. Shapes that derive their path from the frame
    /// rebuild it; freeform paths are mapped proportionally.
    pub fn set_frame(&mut self, frame: Rect) {
        let old = self.frame;
        self.frame = frame;
        match self.shape {
            GraphicShape::Rectangle | GraphicShape::Ellipse => self.rebuild_path_from_frame(),
            GraphicShape::Pen | GraphicShape::Link { .. } => {
                let transform = if old.width() != 0.0 && old.height() != 0.0 {
                    Affine::translate((frame.x0, frame.y0))
                        * Affine::scale_non_uniform(
                            frame.width() / old.width(),
                            frame.height() / old.height(),
                        )
                        * Affine::translate((-old.x0, -old.y0))
                } else {
                    Affine::translate((frame.x0 - old.x0, frame.y0 - old.y0))
                };
                self.path = transform * std::mem::take(&mut self.path);
            }
        }
        self.note_bounds_are_dirty();
        self.inform_aspects_of_shape_change();
    }

    pub fn set_frame_origin(&mut self, origin: Point) {
        self.set_frame(self.frame.with_origin(origin));
    }

    pub fn set_frame_size(&mut self, size: kurbo::Size) {
        self.set_frame(self.frame.with_size(size));
    }

    pub fn move_frame_by(&mut self, delta: Vec2) {
        self.set_frame(self.frame + delta);
    }

    /// Whether archives must carry the path verbatim.
    pub fn should_encode_path(&self) -> bool {
        matches!(self.shape, GraphicShape::Pen | GraphicShape::Link { .. })
    }

    fn rebuild_path_from_frame(&mut self) {
        match self.shape {
            GraphicShape::Rectangle => {
                self.path = self.frame.to_path(0.1);
            }
            GraphicShape::Ellipse => {
                self.path = Ellipse::from_rect(self.frame).to_path(0.1);
            }
            GraphicShape::Pen | GraphicShape::Link { .. } => {}
        }
    }

    pub fn centroid(&self) -> Point {
        self.frame.center()
    }

    // MARK: flatness / error

    /// Allowed error when curves flatten into segments for hit-testing.
    /// Larger values trade precision for speed.
    pub fn flatness(&self) -> f64 {
        self.flatness
    }

    pub fn set_flatness(&mut self, flatness: f64) {
        self.flatness = flatness.max(0.01);
    }

    /// Hit slop derived from the flatness.
    pub fn error(&self) -> f64 {
        self.flatness.max(0.1)
    }

    // MARK: bounds

    /// Authoritative bounds: base path bounds unioned with every active,
    /// expanding aspect's adjustment. Recomputed lazily after
    /// [`Graphic::note_bounds_are_dirty`]; idempotent between mutations.
    pub fn bounds(&mut self) -> Rect {
        if self.bounds_dirty {
            self.update_bounds();
        }
        self.bounds
    }

    pub fn bounds_are_dirty(&self) -> bool {
        self.bounds_dirty
    }

    pub fn update_bounds(&mut self) {
        let base = self.path.bounding_box();
        let mut bounds = base;
        for slot in &self.aspects {
            for aspect in slot {
                if aspect.active() && aspect.bounds_expands_graphic_bounds() {
                    bounds = bounds.union(aspect.bounds_for_graphic_bounds(base));
                }
            }
        }
        self.bounds = bounds;
        self.bounds_dirty = false;
    }

    pub fn note_bounds_are_dirty(&mut self) {
        self.bounds_dirty = true;
    }

    /// Minimal redraw rect for this graphic alone, padded for handle
    /// adornment. Related graphics are unioned in at the document level.
    pub fn dirty_bounds(&mut self) -> Rect {
        self.bounds()
            .inflate(Self::HANDLE_ADORNMENT, Self::HANDLE_ADORNMENT)
    }

    // MARK: aspects

    /// Attach at the kind's default priority.
    pub fn add_aspect(&mut self, aspect: Aspect) {
        let priority = aspect.kind().default_priority();
        self.add_aspect_with_priority(aspect, priority);
    }

    pub fn add_aspect_with_priority(&mut self, aspect: Aspect, priority: AspectPriority) {
        self.aspects[priority.index()].push(aspect);
        self.note_bounds_are_dirty();
    }

    pub fn aspects_with_priority(&self, priority: AspectPriority) -> &[Aspect] {
        &self.aspects[priority.index()]
    }

    /// All aspects, back-to-front, with their slots.
    pub fn aspects(&self) -> impl Iterator<Item = (AspectPriority, &Aspect)> {
        AspectPriority::ALL
            .into_iter()
            .flat_map(move |p| self.aspects[p.index()].iter().map(move |a| (p, a)))
    }

    pub fn aspects_mut(&mut self) -> impl Iterator<Item = &mut Aspect> {
        self.aspects.iter_mut().flatten()
    }

    pub fn first_aspect_of_kind(&self, kind: AspectKind) -> Option<&Aspect> {
        self.aspects().find(|(_, a)| a.kind() == kind).map(|(_, a)| a)
    }

    pub fn first_aspect_of_kind_mut(&mut self, kind: AspectKind) -> Option<&mut Aspect> {
        self.aspects_mut().find(|a| a.kind() == kind)
    }

    pub fn has_aspect_of_kind(&self, kind: AspectKind) -> bool {
        self.first_aspect_of_kind(kind).is_some()
    }

    pub fn has_aspect_of_kind_with_priority(
        &self,
        kind: AspectKind,
        priority: AspectPriority,
    ) -> bool {
        self.aspects[priority.index()]
            .iter()
            .any(|a| a.kind() == kind)
    }

    /// Detach the first aspect equal to `aspect`.
    pub fn remove_aspect(&mut self, aspect: &Aspect) -> EaselResult<Aspect> {
        for slot in &mut self.aspects {
            if let Some(index) = slot.iter().position(|a| a == aspect) {
                let mut removed = slot.remove(index);
                removed.end_editing();
                self.note_bounds_are_dirty();
                return Ok(removed);
            }
        }
        Err(EaselError::structure(
            "cannot remove an aspect the graphic does not hold",
        ))
    }

    pub fn remove_all_aspects(&mut self) {
        for slot in &mut self.aspects {
            slot.clear();
        }
        self.note_bounds_are_dirty();
    }

    /// Move every aspect off `other` onto this graphic, slot by slot.
    pub fn take_aspects_from(&mut self, other: &mut Graphic) {
        for priority in AspectPriority::ALL {
            let moved = std::mem::take(&mut other.aspects[priority.index()]);
            self.aspects[priority.index()].extend(moved);
        }
        other.note_bounds_are_dirty();
        self.note_bounds_are_dirty();
    }

    /// The one canonical aspect of `kind`, created (at the kind's default
    /// priority) on first access. Every graphic effectively has a stroke,
    /// fill, shadow, reflection, and text aspect, active or not.
    pub fn primary_aspect_of_kind(&mut self, kind: AspectKind) -> &mut Aspect {
        let mut found: Option<(usize, usize)> = None;
        'search: for priority in AspectPriority::ALL {
            for (index, aspect) in self.aspects[priority.index()].iter().enumerate() {
                if aspect.kind() == kind {
                    found = Some((priority.index(), index));
                    break 'search;
                }
            }
        }
        let (slot, index) = match found {
            Some(position) => position,
            None => {
                let slot = kind.default_priority().index();
                self.aspects[slot].push(kind.instantiate());
                self.bounds_dirty = true;
                (slot, self.aspects[slot].len() - 1)
            }
        };
        &mut self.aspects[slot][index]
    }

    pub fn primary_stroke(&mut self) -> &mut crate::aspect::stroke::Stroke {
        match self.primary_aspect_of_kind(AspectKind::Stroke) {
            Aspect::Stroke(stroke) => stroke,
            _ => unreachable!("primary aspect lookup returned the wrong kind"),
        }
    }

    pub fn primary_fill(&mut self) -> &mut crate::aspect::fill::Fill {
        match self.primary_aspect_of_kind(AspectKind::Fill) {
            Aspect::Fill(fill) => fill,
            _ => unreachable!("primary aspect lookup returned the wrong kind"),
        }
    }

    pub fn primary_shadow(&mut self) -> &mut crate::aspect::shadow::Shadow {
        match self.primary_aspect_of_kind(AspectKind::Shadow) {
            Aspect::Shadow(shadow) => shadow,
            _ => unreachable!("primary aspect lookup returned the wrong kind"),
        }
    }

    pub fn primary_reflection(&mut self) -> &mut crate::aspect::reflection::Reflection {
        match self.primary_aspect_of_kind(AspectKind::Reflection) {
            Aspect::Reflection(reflection) => reflection,
            _ => unreachable!("primary aspect lookup returned the wrong kind"),
        }
    }

    pub fn primary_text(&mut self) -> &mut crate::aspect::text::TextAspect {
        match self.primary_aspect_of_kind(AspectKind::Text) {
            Aspect::Text(text) => text,
            _ => unreachable!("primary aspect lookup returned the wrong kind"),
        }
    }

    /// Tell every aspect the path changed so cached derived state drops.
    pub fn inform_aspects_of_shape_change(&mut self) {
        let path = &self.path;
        for slot in &mut self.aspects {
            for aspect in slot {
                aspect.graphic_did_change_shape(path);
            }
        }
    }

    // MARK: drawing

    /// Draw all active aspects back-to-front, subgraphics in the Children
    /// band, then run collected completions in LIFO order.
    pub fn draw(&self, arena: &GraphicArena, canvas: &mut dyn Canvas) {
        self.draw_filtered(arena, canvas, &|_, _| true);
    }

    pub fn draw_filtered(
        &self,
        arena: &GraphicArena,
        canvas: &mut dyn Canvas,
        filter: AspectFilter<'_>,
    ) {
        if self.ignore {
            return;
        }
        let mut completions: Vec<DrawCompletion<'_>> = Vec::new();
        for priority in AspectPriority::ALL {
            for aspect in &self.aspects[priority.index()] {
                if aspect.active()
                    && filter(aspect, priority)
                    && let Some(completion) =
                        aspect.draw(self, arena, &self.path, canvas, priority)
                {
                    completions.push(completion);
                }
            }
            if priority == AspectPriority::Children {
                for sub_id in &self.subgraphics {
                    if let Some(sub) = arena.get(*sub_id) {
                        sub.draw_filtered(arena, canvas, filter);
                    }
                }
            }
        }
        for completion in completions.into_iter().rev() {
            completion(canvas);
        }
    }

    /// Would drawing this graphic emit any pixels?
    pub fn renders_to_canvas(&self) -> bool {
        self.aspects()
            .any(|(_, a)| a.active() && a.renders_to_canvas())
    }

    /// Placeholder rendition for graphics that would otherwise be invisible:
    /// a light hairline outline of the path.
    pub fn draw_ghost(&self, canvas: &mut dyn Canvas) {
        let outline = expand_stroke(&self.path, &StrokeGeometry::solid(1.0), self.flatness);
        canvas.fill_path(&outline, WindingRule::NonZero, Color::GHOST_GRAY);
    }

    // MARK: hit-testing

    /// Topmost aspect under `point`: bands front-to-back, insertion order
    /// within a band. Must agree with visual stacking.
    pub fn hit_aspect_at_point(&self, point: Point) -> Option<(AspectPriority, usize)> {
        for priority in AspectPriority::ALL.into_iter().rev() {
            for (index, aspect) in self.aspects[priority.index()].iter().enumerate() {
                if aspect.active() && aspect.is_point(self, point, &self.path, priority) {
                    return Some((priority, index));
                }
            }
        }
        None
    }

    pub fn is_hit_by_point(&self, point: Point) -> bool {
        self.hit_aspect_at_point(point).is_some()
    }

    pub fn is_hit_by_rect(&self, rect: Rect) -> bool {
        for priority in AspectPriority::ALL.into_iter().rev() {
            for aspect in &self.aspects[priority.index()] {
                if aspect.active() && aspect.does_rect_intersect(self, rect, &self.path, priority) {
                    return true;
                }
            }
        }
        false
    }

    // MARK: handles

    /// Frame handle within tolerance of `point`, or `Missed`.
    pub fn handle_for_point(&self, point: Point) -> Handle {
        let tolerance = Self::HANDLE_TOLERANCE + self.error();
        for handle in Handle::FRAME_HANDLES {
            if let Some(location) = handle.location_in_frame(self.frame)
                && point_near(point, location, tolerance)
            {
                return handle;
            }
        }
        Handle::Missed
    }

    /// Indexed path handle (element point or control point) near `point`,
    /// or `Missed`.
    pub fn path_handle_for_point(&self, point: Point) -> Handle {
        let tolerance = Self::HANDLE_TOLERANCE + self.error();
        for (element, el) in self.path.elements().iter().enumerate() {
            let points: &[Point] = match el {
                PathEl::MoveTo(p) => &[*p],
                PathEl::LineTo(p) => &[*p],
                PathEl::QuadTo(c, p) => &[*c, *p],
                PathEl::CurveTo(c1, c2, p) => &[*c1, *c2, *p],
                PathEl::ClosePath => &[],
            };
            for (index, candidate) in points.iter().enumerate() {
                if point_near(point, *candidate, tolerance) {
                    return Handle::Indexed {
                        element,
                        point: index,
                    };
                }
            }
        }
        Handle::Missed
    }

    pub fn path_handle_from_event(&self, event: &PointerEvent) -> Handle {
        self.path_handle_for_point(event.location)
    }

    pub fn location_of_handle(&self, handle: Handle) -> Option<Point> {
        match handle {
            Handle::Center => Some(self.frame.center()),
            Handle::Indexed { element, point } => {
                let el = self.path.elements().get(element)?;
                let points: &[Point] = match el {
                    PathEl::MoveTo(p) => &[*p],
                    PathEl::LineTo(p) => &[*p],
                    PathEl::QuadTo(c, p) => &[*c, *p],
                    PathEl::CurveTo(c1, c2, p) => &[*c1, *c2, *p],
                    PathEl::ClosePath => &[],
                };
                points.get(point).copied()
            }
            _ => handle.location_in_frame(self.frame),
        }
    }

    /// Drag `handle` to `point`, returning the handle that now tracks the
    /// drag (it flips when the drag crosses the frame).
    pub fn set_handle_location(&mut self, handle: Handle, point: Point) -> Handle {
        match handle {
            Handle::Missed => Handle::Missed,
            Handle::Center => {
                let delta = point - self.frame.center();
                self.move_frame_by(delta);
                Handle::Center
            }
            Handle::Indexed { element, point: point_index } => {
                self.set_path_point(element, point_index, point);
                handle
            }
            _ => self.drag_frame_handle(handle, point),
        }
    }

    pub fn move_handle_by(&mut self, handle: Handle, delta: Vec2) -> Handle {
        match self.location_of_handle(handle) {
            Some(location) => self.set_handle_location(handle, location + delta),
            None => Handle::Missed,
        }
    }

    fn set_path_point(&mut self, element: usize, point_index: usize, point: Point) {
        if let Some(el) = self.path.elements().get(element).copied() {
            let replaced = match (el, point_index) {
                (PathEl::MoveTo(_), 0) => Some(PathEl::MoveTo(point)),
                (PathEl::LineTo(_), 0) => Some(PathEl::LineTo(point)),
                (PathEl::QuadTo(_, p), 0) => Some(PathEl::QuadTo(point, p)),
                (PathEl::QuadTo(c, _), 1) => Some(PathEl::QuadTo(c, point)),
                (PathEl::CurveTo(_, c2, p), 0) => Some(PathEl::CurveTo(point, c2, p)),
                (PathEl::CurveTo(c1, _, p), 1) => Some(PathEl::CurveTo(c1, point, p)),
                (PathEl::CurveTo(c1, c2, _), 2) => Some(PathEl::CurveTo(c1, c2, point)),
                _ => None,
            };
            if let Some(new_el) = replaced {
                let mut elements = self.path.elements().to_vec();
                elements[element] = new_el;
                self.path = BezPath::from_vec(elements);
                self.frame = self.path.bounding_box();
                self.note_bounds_are_dirty();
                self.inform_aspects_of_shape_change();
            }
        }
    }

    fn drag_frame_handle(&mut self, handle: Handle, point: Point) -> Handle {
        let f = self.frame;
        let (mut x0, mut y0, mut x1, mut y1) = (f.x0, f.y0, f.x1, f.y1);
        match handle {
            Handle::TopLeft => {
                x0 = point.x;
                y0 = point.y;
            }
            Handle::TopCenter => y0 = point.y,
            Handle::TopRight => {
                x1 = point.x;
                y0 = point.y;
            }
            Handle::Left => x0 = point.x,
            Handle::Right => x1 = point.x,
            Handle::BottomLeft => {
                x0 = point.x;
                y1 = point.y;
            }
            Handle::BottomCenter => y1 = point.y,
            Handle::BottomRight => {
                x1 = point.x;
                y1 = point.y;
            }
            _ => return handle,
        }

        let mut out = handle;
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            out = out.mirrored_x();
        }
        if y0 > y1 {
            std::mem::swap(&mut y0, &mut y1);
            out = out.mirrored_y();
        }
        self.set_frame(Rect::new(x0, y0, x1, y1));
        out
    }

    // MARK: mouse tracking

    /// Locate a handle under the event and enter tracking. Returns false
    /// (and stays idle) when no handle is within tolerance.
    pub fn track_mouse(&mut self, event: &PointerEvent) -> bool {
        let handle = self.handle_for_point(event.location);
        if handle.is_missed() {
            return false;
        }
        self.tracking = Some(TrackingState {
            handle,
            original_frame: self.frame,
            original_path: self.path.clone(),
            last_point: event.location,
        });
        true
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking.is_some()
    }

    pub fn tracked_handle(&self) -> Option<Handle> {
        self.tracking.as_ref().map(|t| t.handle)
    }

    /// The frame as it was when tracking began.
    pub fn tracking_original_frame(&self) -> Option<Rect> {
        self.tracking.as_ref().map(|t| t.original_frame)
    }

    /// Advance the drag to `current`. Returns false when not tracking.
    pub fn continue_tracking(&mut self, current: Point) -> bool {
        let Some(state) = self.tracking.as_ref() else {
            return false;
        };
        let handle = state.handle;
        let delta = current - state.last_point;
        let updated = self.move_handle_by(handle, delta);
        if let Some(state) = self.tracking.as_mut() {
            state.handle = updated;
            state.last_point = current;
        }
        true
    }

    /// Finish the drag: final move, bounds recompute, shape-change fan-out
    /// to aspects. The document fans out to related graphics.
    pub fn stop_tracking(&mut self, stop: Point) {
        if self.tracking.is_some() {
            self.continue_tracking(stop);
            self.tracking = None;
            self.update_bounds();
            self.inform_aspects_of_shape_change();
        }
    }

    /// Abort the drag, reverting to the pre-drag frame and path.
    pub fn cancel_tracking(&mut self) {
        if let Some(state) = self.tracking.take() {
            self.path = state.original_path;
            self.frame = state.original_frame;
            self.note_bounds_are_dirty();
            self.inform_aspects_of_shape_change();
        }
    }

    // MARK: aspect editing

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Enter editing on the topmost aspect under the event that accepts it.
    pub fn begin_aspect_editing_from_event(&mut self, event: &PointerEvent) -> bool {
        let mut target = None;
        'search: for priority in AspectPriority::ALL.into_iter().rev() {
            for (index, aspect) in self.aspects[priority.index()].iter().enumerate() {
                if aspect.active()
                    && aspect.accepts_edit()
                    && aspect.is_point(self, event.location, &self.path, priority)
                {
                    target = Some((priority.index(), index));
                    break 'search;
                }
            }
        }
        let Some((slot, index)) = target else {
            return false;
        };
        if self.aspects[slot][index].begin_editing_from_event(event) {
            self.editing = true;
            true
        } else {
            false
        }
    }

    /// Leave aspect editing (called by the page/tool, or on focus loss).
    pub fn end_editing(&mut self) {
        for aspect in self.aspects_mut() {
            aspect.end_editing();
        }
        self.editing = false;
    }

    // MARK: subgraphics

    pub fn subgraphics(&self) -> &[GraphicId] {
        &self.subgraphics
    }

    pub fn supergraphic(&self) -> Option<GraphicId> {
        self.supergraphic
    }

    pub(crate) fn push_subgraphic_id(&mut self, id: GraphicId) {
        self.subgraphics.push(id);
    }

    pub(crate) fn remove_subgraphic_id(&mut self, id: GraphicId) {
        self.subgraphics.retain(|sub| *sub != id);
    }

    pub(crate) fn set_supergraphic(&mut self, id: Option<GraphicId>) {
        self.supergraphic = id;
    }

    pub fn autosize_subgraphics(&self) -> bool {
        self.autosize_subgraphics
    }

    pub fn set_autosize_subgraphics(&mut self, flag: bool) {
        self.autosize_subgraphics = flag;
    }

    pub fn autoresizing_mask(&self) -> AutosizeMask {
        self.autoresizing_mask
    }

    pub fn set_autoresizing_mask(&mut self, mask: AutosizeMask) {
        self.autoresizing_mask = mask;
    }

    // MARK: related graphics

    pub fn related_graphics(&self) -> &BTreeSet<GraphicId> {
        &self.related
    }

    pub(crate) fn insert_related_id(&mut self, id: GraphicId) {
        self.related.insert(id);
    }

    pub(crate) fn remove_related_id(&mut self, id: GraphicId) {
        self.related.remove(&id);
    }

    // MARK: randomness

    pub fn seed(&self) -> u64 {
        self.random.seed()
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.random.reseed(seed);
    }

    pub fn reset_random_sequence(&mut self) {
        self.random.reset();
    }

    pub fn random_in_range(&mut self, low: i64, high: i64) -> i64 {
        self.random.next_in_range(low, high)
    }

    // MARK: equality

    /// Deep equality: same shape kind, frame, path, and aspect stacks.
    /// Identity, containment, and runtime flags are excluded.
    pub fn is_equal_to_graphic(&self, other: &Graphic) -> bool {
        self.shape.same_kind(&other.shape)
            && self.frame == other.frame
            && self.path.elements() == other.path.elements()
            && self.aspects == other.aspects
    }
}

/// New frame for an autosized subgraphic after its parent resized.
///
/// Each axis splits into min margin / size / max margin. Components flagged
/// in the mask flex, sharing the parent's size delta proportionally to their
/// own sizes (equally when all flexible components are zero); unflagged
/// components hold their size, and with nothing flexible the extra lands in
/// the max margin.
pub fn autosized_frame(
    child: Rect,
    old_parent: Rect,
    new_parent: Rect,
    mask: AutosizeMask,
) -> Rect {
    fn resize_axis(
        child_min: f64,
        child_size: f64,
        old_min: f64,
        old_size: f64,
        new_min: f64,
        new_size: f64,
        flex_min: bool,
        flex_size: bool,
        flex_max: bool,
    ) -> (f64, f64) {
        let min_margin = child_min - old_min;
        let max_margin = (old_min + old_size) - (child_min + child_size);
        let delta = new_size - old_size;

        let mut parts = [min_margin, child_size, max_margin];
        let flexible = [flex_min, flex_size, flex_max];
        let flex_total: f64 = parts
            .iter()
            .zip(flexible)
            .filter(|(_, f)| *f)
            .map(|(p, _)| p.max(0.0))
            .sum();
        let flex_count = flexible.iter().filter(|f| **f).count();

        if flex_count == 0 {
            // Nothing flexes: content pins to the min side.
            parts[2] += delta;
        } else if flex_total > 0.0 {
            for (part, flex) in parts.iter_mut().zip(flexible) {
                if flex {
                    *part += delta * (part.max(0.0) / flex_total);
                }
            }
        } else {
            let share = delta / flex_count as f64;
            for (part, flex) in parts.iter_mut().zip(flexible) {
                if flex {
                    *part += share;
                }
            }
        }

        (new_min + parts[0], parts[1].max(0.0))
    }

    let (x, width) = resize_axis(
        child.x0,
        child.width(),
        old_parent.x0,
        old_parent.width(),
        new_parent.x0,
        new_parent.width(),
        mask.contains(AutosizeMask::MIN_X),
        mask.contains(AutosizeMask::WIDTH),
        mask.contains(AutosizeMask::MAX_X),
    );
    let (y, height) = resize_axis(
        child.y0,
        child.height(),
        old_parent.y0,
        old_parent.height(),
        new_parent.y0,
        new_parent.height(),
        mask.contains(AutosizeMask::MIN_Y),
        mask.contains(AutosizeMask::HEIGHT),
        mask.contains(AutosizeMask::MAX_Y),
    );

    Rect::new(x, y, x + width, y + height)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/graphic.rs"]
mod tests;
