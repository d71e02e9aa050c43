//! Easel is the scene-graph core of a desktop vector drawing application.
//!
//! A drawing is a [`Document`] owning pages, layers, and an arena of
//! [`Graphic`]s. Each graphic owns a kurbo path plus an ordered stack of
//! [`Aspect`]s (fill, stroke, shadow, opacity, reflection, image, text),
//! attached at [`AspectPriority`] slots that draw back-to-front and hit-test
//! front-to-back.
//!
//! # Flow overview
//!
//! 1. **Edit**: tools mutate graphics through [`Document`] entry points;
//!    every structural mutation registers its inverse with the undo manager
//!    and broadcasts a [`Change`].
//! 2. **Invalidate**: mutations fold dirty bounds (including related
//!    graphics, e.g. connected links) into the page's coalesced update rect.
//! 3. **Draw**: the host hands a [`Canvas`] to [`Document::draw_page`];
//!    aspects render in priority order with deferred completions for
//!    multi-pass compositing. [`CpuCanvas`] rasterizes to premultiplied
//!    RGBA8; [`RecordingCanvas`] captures the op stream for tests.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Single ownership**: every cross-graphic reference is a [`GraphicId`]
//!   into the document's arena, cleared on teardown.
//! - **Draw never fails**: a missing image or font degrades to drawing
//!   nothing; errors surface only from structural edits and archival.
#![forbid(unsafe_code)]

mod aspect;
mod document;
mod foundation;
mod render;
mod scene;

pub use aspect::analysis::{PathAnalysis, SegmentAnnotation, SegmentKind};
pub use aspect::fill::Fill;
pub use aspect::image::{ImageAlignment, ImageAspect, ImageScaling};
pub use aspect::opacity::Opacity;
pub use aspect::priority::AspectPriority;
pub use aspect::reflection::Reflection;
pub use aspect::registry::AspectKind;
pub use aspect::shadow::Shadow;
pub use aspect::stroke::{DashPattern, Stroke};
pub use aspect::text::TextAspect;
pub use aspect::{Aspect, AspectFilter, DrawCompletion};
pub use document::archive::{
    ARCHIVE_VERSION, AspectSlotArchive, DocumentArchive, GraphicArchive, PageArchive,
    PageLayerArchive,
};
pub use document::notify::{Change, ChangeNotifier, ChangeObserver, ObserverToken};
pub use document::storage::{Document, DocumentSettings, DrawOptions};
pub use document::undo::{UndoAction, UndoGroup, UndoManager};
pub use foundation::color::Color;
pub use foundation::error::{EaselError, EaselResult};
pub use foundation::geometry::{
    LineCap, LineJoin, StrokeGeometry, WindingRule, angle_at_end, angle_at_start, expand_stroke,
    flatten_to_lines, path_contains_point, path_intersection_with_line, point_near,
    rect_intersects_path,
};
pub use foundation::math::RandomSequence;
pub use render::canvas::{Bitmap, Canvas, CanvasOp, RecordingCanvas, TextAlign, TextStyle};
pub use render::cpu::{CpuCanvas, FramePixels};
pub use render::text::{TextBrush, TextLayouter};
pub use scene::arena::{GraphicArena, GraphicId};
pub use scene::graphic::{
    AutosizeMask, Graphic, GraphicShape, PointerEvent, autosized_frame,
};
pub use scene::handle::Handle;
pub use scene::layer::Layer;
pub use scene::page::{GuestDrawer, GuestDrawerToken, Page, PageId};
