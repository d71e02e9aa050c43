//! Stackable rendering behaviors attached to graphics.
//!
//! Every visual contribution of a graphic (fill, stroke, shadow, ...) is an
//! aspect occupying a priority slot. Slots draw back-to-front and hit-test
//! front-to-back, so stacking on screen and stacking under the cursor always
//! agree.

pub mod analysis;
pub mod fill;
pub mod image;
pub mod opacity;
pub mod priority;
pub mod reflection;
pub mod registry;
pub mod shadow;
pub mod stroke;
pub mod text;

use kurbo::{Affine, BezPath, Point, Rect, Shape, Size};

use crate::aspect::analysis::PathAnalysis;
use crate::aspect::fill::Fill;
use crate::aspect::image::ImageAspect;
use crate::aspect::opacity::Opacity;
use crate::aspect::priority::AspectPriority;
use crate::aspect::reflection::Reflection;
use crate::aspect::registry::AspectKind;
use crate::aspect::shadow::Shadow;
use crate::aspect::stroke::Stroke;
use crate::aspect::text::TextAspect;
use crate::foundation::color::Color;
use crate::foundation::geometry::{
    WindingRule, expand_stroke, path_contains_point, rect_intersects_path,
};
use crate::render::canvas::Canvas;
use crate::scene::arena::GraphicArena;
use crate::scene::graphic::{Graphic, PointerEvent};

/// Deferred action collected during a draw pass and run after it.
///
/// Aspects that need multi-pass compositing (opacity layers, reflections)
/// return one of these; the graphic runs them in LIFO order so nested layer
/// push/pop pairs close correctly.
pub type DrawCompletion<'a> = Box<dyn FnOnce(&mut dyn Canvas) + 'a>;

/// Predicate selecting which aspects participate in a draw pass.
pub type AspectFilter<'a> = &'a dyn Fn(&Aspect, AspectPriority) -> bool;

/// The closed set of rendering behaviors a graphic can stack.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Aspect {
    Fill(Fill),
    Stroke(Stroke),
    Shadow(Shadow),
    Opacity(Opacity),
    Reflection(Reflection),
    Image(ImageAspect),
    Text(TextAspect),
    PathAnalysis(PathAnalysis),
}

impl Aspect {
    pub fn kind(&self) -> AspectKind {
        match self {
            Aspect::Fill(_) => AspectKind::Fill,
            Aspect::Stroke(_) => AspectKind::Stroke,
            Aspect::Shadow(_) => AspectKind::Shadow,
            Aspect::Opacity(_) => AspectKind::Opacity,
            Aspect::Reflection(_) => AspectKind::Reflection,
            Aspect::Image(_) => AspectKind::Image,
            Aspect::Text(_) => AspectKind::Text,
            Aspect::PathAnalysis(_) => AspectKind::PathAnalysis,
        }
    }

    pub fn active(&self) -> bool {
        match self {
            Aspect::Fill(a) => a.active,
            Aspect::Stroke(a) => a.active,
            Aspect::Shadow(a) => a.active,
            Aspect::Opacity(a) => a.active,
            Aspect::Reflection(a) => a.active,
            Aspect::Image(a) => a.active,
            Aspect::Text(a) => a.active,
            Aspect::PathAnalysis(a) => a.active,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        match self {
            Aspect::Fill(a) => a.active = active,
            Aspect::Stroke(a) => a.active = active,
            Aspect::Shadow(a) => a.active = active,
            Aspect::Opacity(a) => a.active = active,
            Aspect::Reflection(a) => a.active = active,
            Aspect::Image(a) => a.active = active,
            Aspect::Text(a) => a.active = active,
            Aspect::PathAnalysis(a) => a.active = active,
        }
    }

    /// Derived-only aspects never appear in archives; decode simply never
    /// sees them.
    pub fn should_archive(&self) -> bool {
        !matches!(self, Aspect::PathAnalysis(_))
    }

    /// Render this aspect's contribution for the given slot.
    ///
    /// Failures degrade to drawing nothing; this never raises through the
    /// draw pass.
    pub fn draw<'a>(
        &'a self,
        graphic: &'a Graphic,
        arena: &'a GraphicArena,
        path: &'a BezPath,
        canvas: &mut dyn Canvas,
        _priority: AspectPriority,
    ) -> Option<DrawCompletion<'a>> {
        match self {
            Aspect::Fill(fill) => {
                if fill.color.is_visible() {
                    canvas.fill_path(path, fill.winding_rule, fill.color);
                }
                None
            }
            Aspect::Stroke(stroke) => {
                if stroke.width > 0.0 && stroke.color.is_visible() {
                    let outline = expand_stroke(
                        path,
                        &stroke.geometry(graphic.error()),
                        graphic.flatness(),
                    );
                    canvas.fill_path(&outline, WindingRule::NonZero, stroke.color);
                }
                None
            }
            Aspect::Shadow(shadow) => {
                if shadow.color.is_visible() {
                    let silhouette = Affine::translate(shadow.offset) * path.clone();
                    canvas.fill_path_blurred(&silhouette, shadow.color, shadow.blur_radius);
                }
                None
            }
            Aspect::Opacity(opacity) => {
                if opacity.value() < 1.0 {
                    canvas.push_opacity(opacity.value());
                    Some(Box::new(|canvas: &mut dyn Canvas| canvas.pop()))
                } else {
                    None
                }
            }
            Aspect::Reflection(reflection) => {
                let fade = reflection.fade.clamp(0.0, 1.0);
                if fade <= 0.0 {
                    return None;
                }
                let gap = reflection.gap;
                Some(Box::new(move |canvas: &mut dyn Canvas| {
                    let bounds = path.bounding_box();
                    let flip = Affine::translate((0.0, 2.0 * bounds.y1 + gap)) * Affine::FLIP_Y;
                    canvas.push_transform(flip);
                    canvas.push_opacity(fade);
                    graphic.draw_filtered(arena, canvas, &|aspect, _| {
                        !matches!(aspect, Aspect::Reflection(_) | Aspect::Shadow(_))
                    });
                    canvas.pop();
                    canvas.pop();
                }))
            }
            Aspect::Image(image) => {
                if let Some(dest) = image.destination_rect(path.bounding_box())
                    && let Some(bitmap) = image.bitmap()
                {
                    canvas.draw_bitmap(bitmap, dest);
                }
                None
            }
            Aspect::Text(text) => {
                if !text.text.is_empty() {
                    canvas.draw_text(&text.text, &text.style, path.bounding_box());
                }
                None
            }
            Aspect::PathAnalysis(analysis) => {
                let computed;
                let annotations = match analysis.cached() {
                    Some(cached) => cached,
                    None => {
                        computed = PathAnalysis::compute(path);
                        &computed
                    }
                };
                let mut markers = BezPath::new();
                let size = Size::new(PathAnalysis::MARKER_SIZE, PathAnalysis::MARKER_SIZE);
                for annotation in annotations {
                    let marker = Rect::from_center_size(annotation.endpoint, size);
                    for el in marker.to_path(0.1).elements() {
                        markers.push(*el);
                    }
                }
                if !markers.elements().is_empty() {
                    canvas.fill_path(&markers, WindingRule::NonZero, PathAnalysis::MARKER_COLOR);
                }
                None
            }
        }
    }

    /// The geometry this aspect actually occupies for the given slot.
    ///
    /// Hit-testing and bounds run on this path: a stroke expands to its
    /// outline, everything else passes the base path through.
    pub fn render_path(
        &self,
        graphic: &Graphic,
        path: &BezPath,
        _priority: AspectPriority,
    ) -> BezPath {
        match self {
            Aspect::Stroke(stroke) => expand_stroke(
                path,
                &stroke.geometry(graphic.error()),
                graphic.flatness(),
            ),
            _ => path.clone(),
        }
    }

    /// Point hit predicate for this aspect against the given path.
    pub fn is_point(
        &self,
        graphic: &Graphic,
        point: Point,
        path: &BezPath,
        priority: AspectPriority,
    ) -> bool {
        match self {
            Aspect::Fill(fill) => path_contains_point(path, fill.winding_rule, point),
            Aspect::Stroke(stroke) => {
                // Hairline strokes stay clickable: hit with a floor width.
                let mut geom = stroke.geometry(graphic.error());
                geom.width = geom.width.max(Stroke::MIN_HIT_WIDTH);
                let outline = expand_stroke(path, &geom, graphic.flatness());
                path_contains_point(&outline, WindingRule::NonZero, point)
            }
            _ => {
                let rendered = self.render_path(graphic, path, priority);
                path_contains_point(&rendered, WindingRule::NonZero, point)
            }
        }
    }

    /// Rect intersection predicate for this aspect against the given path.
    pub fn does_rect_intersect(
        &self,
        graphic: &Graphic,
        rect: Rect,
        path: &BezPath,
        priority: AspectPriority,
    ) -> bool {
        match self {
            Aspect::Fill(fill) => {
                rect_intersects_path(rect, path, fill.winding_rule, true, graphic.flatness())
            }
            Aspect::Stroke(stroke) => {
                let outline = expand_stroke(
                    path,
                    &stroke.geometry(graphic.error()),
                    graphic.flatness(),
                );
                rect_intersects_path(rect, &outline, WindingRule::NonZero, true, graphic.flatness())
            }
            _ => {
                let rendered = self.render_path(graphic, path, priority);
                rect_intersects_path(
                    rect,
                    &rendered,
                    WindingRule::NonZero,
                    true,
                    graphic.flatness(),
                )
            }
        }
    }

    /// Bounds of this aspect's rendition of `path`.
    pub fn bounds_for_path(&self, graphic: &Graphic, path: &BezPath) -> Rect {
        match self {
            Aspect::Stroke(stroke) => expand_stroke(
                path,
                &stroke.geometry(graphic.error()),
                graphic.flatness(),
            )
            .bounding_box(),
            Aspect::Shadow(shadow) => shadow.expanded_bounds(path.bounding_box()),
            Aspect::Reflection(reflection) => reflection.expanded_bounds(path.bounding_box()),
            _ => path.bounding_box(),
        }
    }

    /// Whether this aspect can paint outside the base path's bounds.
    ///
    /// Cheap test consulted before [`Aspect::bounds_for_graphic_bounds`] is
    /// folded into the graphic's cached bounds.
    pub fn bounds_expands_graphic_bounds(&self) -> bool {
        matches!(
            self,
            Aspect::Stroke(_) | Aspect::Shadow(_) | Aspect::Reflection(_)
        )
    }

    /// Grow `bounds` to cover this aspect's overdraw. Identity for aspects
    /// that stay inside the base bounds.
    pub fn bounds_for_graphic_bounds(&self, bounds: Rect) -> Rect {
        match self {
            Aspect::Stroke(stroke) => bounds.inflate(stroke.width / 2.0, stroke.width / 2.0),
            Aspect::Shadow(shadow) => shadow.expanded_bounds(bounds),
            Aspect::Reflection(reflection) => reflection.expanded_bounds(bounds),
            _ => bounds,
        }
    }

    /// Will invoking [`Aspect::draw`] emit pixels for this instance?
    ///
    /// The host synthesizes a ghost rendition for graphics where no active
    /// aspect answers true.
    pub fn renders_to_canvas(&self) -> bool {
        match self {
            Aspect::Fill(fill) => fill.color.is_visible(),
            Aspect::Stroke(stroke) => stroke.width > 0.0 && stroke.color.is_visible(),
            Aspect::Shadow(shadow) => shadow.color.is_visible(),
            // Opacity and reflection only modulate other aspects' pixels.
            Aspect::Opacity(_) => false,
            Aspect::Reflection(_) => false,
            Aspect::Image(image) => image.bitmap().is_some(),
            Aspect::Text(text) => !text.text.is_empty(),
            Aspect::PathAnalysis(_) => true,
        }
    }

    /// Does this aspect support in-place editing?
    pub fn accepts_edit(&self) -> bool {
        matches!(self, Aspect::Text(_))
    }

    /// Start in-place editing from the given event, if supported.
    pub fn begin_editing_from_event(&mut self, _event: &PointerEvent) -> bool {
        match self {
            Aspect::Text(text) => text.begin_editing(),
            _ => false,
        }
    }

    /// Leave in-place editing.
    pub fn end_editing(&mut self) {
        if let Aspect::Text(text) = self {
            text.end_editing();
        }
    }

    /// The owner's path changed; drop cached derived state.
    pub fn graphic_did_change_shape(&mut self, _path: &BezPath) {
        if let Aspect::PathAnalysis(analysis) = self {
            analysis.invalidate();
        }
    }

    /// About to join a page.
    pub fn will_add_to_page(&mut self) {}

    /// Joined a page; resources may now resolve.
    pub fn did_add_to_page(&mut self) {
        if let Aspect::Image(image) = self
            && image.bitmap().is_none()
            && image.source.is_some()
        {
            // Missing files degrade silently; the aspect just won't render.
            let _ = image.load();
        }
    }

    /// About to leave its page.
    pub fn will_remove_from_page(&mut self) {
        self.end_editing();
    }

    /// Left its page.
    pub fn did_remove_from_page(&mut self) {}
}

impl PathAnalysis {
    pub(crate) const MARKER_COLOR: Color = Color::rgba(0.25, 0.45, 0.95, 1.0);
}

#[cfg(test)]
#[path = "../../tests/unit/aspect/mod.rs"]
mod tests;
