use std::collections::BTreeMap;
use std::fmt;

use kurbo::Rect;

use crate::foundation::color::Color;
use crate::render::canvas::Canvas;
use crate::scene::arena::GraphicId;

/// Stable identity of a page within its document.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Token returned by [`Page::add_guest_drawer`], used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GuestDrawerToken(u64);

/// Overlay callback owned by an outside collaborator, invoked after all
/// layer and graphic drawing with the dirty rect being redrawn.
pub type GuestDrawer = Box<dyn FnMut(&mut dyn Canvas, Rect)>;

/// One render surface of the document.
///
/// Holds the per-layer z-ordered graphic lists (keyed by layer name, end of
/// list = top of stack), accumulates a single coalesced update rect between
/// redraws, and carries the guest-drawer registry. Drawing itself happens at
/// the document, which owns the arena.
pub struct Page {
    id: PageId,
    pub paper_color: Color,
    pub paper_size: kurbo::Size,
    buckets: BTreeMap<String, Vec<GraphicId>>,
    update_rect: Option<Rect>,
    has_scheduled_update: bool,
    will_change_capture: BTreeMap<GraphicId, Rect>,
    guest_drawers: Vec<(GuestDrawerToken, GuestDrawer)>,
    next_guest_token: u64,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("layers", &self.buckets.keys().collect::<Vec<_>>())
            .field("update_rect", &self.update_rect)
            .field("guest_drawers", &self.guest_drawers.len())
            .finish()
    }
}

impl Page {
    pub fn new(id: PageId) -> Self {
        Self {
            id,
            paper_color: Color::WHITE,
            // US Letter in points.
            paper_size: kurbo::Size::new(612.0, 792.0),
            buckets: BTreeMap::new(),
            update_rect: None,
            has_scheduled_update: false,
            will_change_capture: BTreeMap::new(),
            guest_drawers: Vec::new(),
            next_guest_token: 0,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    // MARK: layer buckets

    /// Append to the top of the layer's z-order.
    pub(crate) fn insert_graphic(&mut self, layer: &str, id: GraphicId) {
        self.buckets.entry(layer.to_string()).or_default().push(id);
    }

    /// Insert at a specific z position within the layer (clamped).
    pub(crate) fn insert_graphic_at(&mut self, layer: &str, id: GraphicId, index: usize) {
        let bucket = self.buckets.entry(layer.to_string()).or_default();
        let index = index.min(bucket.len());
        bucket.insert(index, id);
    }

    pub(crate) fn remove_graphic(&mut self, layer: &str, id: GraphicId) -> bool {
        match self.buckets.get_mut(layer) {
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|g| *g != id);
                before != bucket.len()
            }
            None => false,
        }
    }

    /// Graphic ids on the layer, bottom to top. Empty for unknown layers.
    pub fn graphics_for_layer(&self, layer: &str) -> &[GraphicId] {
        self.buckets.get(layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_graphic(&self, layer: &str, id: GraphicId) -> bool {
        self.graphics_for_layer(layer).contains(&id)
    }

    /// Every graphic on the page, in bucket order.
    pub fn all_graphics(&self) -> impl Iterator<Item = GraphicId> + '_ {
        self.buckets.values().flatten().copied()
    }

    /// Bucket contents by layer name.
    pub fn layer_buckets(&self) -> impl Iterator<Item = (&str, &[GraphicId])> {
        self.buckets.iter().map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Re-key a bucket when its layer is renamed.
    pub(crate) fn rename_layer_bucket(&mut self, old: &str, new: &str) {
        if let Some(bucket) = self.buckets.remove(old) {
            self.buckets.entry(new.to_string()).or_default().extend(bucket);
        }
    }

    pub(crate) fn layer_bucket_is_empty(&self, layer: &str) -> bool {
        self.graphics_for_layer(layer).is_empty()
    }

    // MARK: incremental update accumulation

    /// Capture a graphic's dirty bounds before it mutates. The first capture
    /// per graphic wins until the change completes.
    pub fn graphic_will_change(&mut self, id: GraphicId, current_dirty: Rect) {
        self.will_change_capture.entry(id).or_insert(current_dirty);
    }

    /// Fold the pre-mutation capture and the new dirty bounds into the
    /// pending update rect. Returns true exactly once per pending redraw, so
    /// callers schedule a single coalesced repaint however many graphics
    /// changed.
    pub fn graphic_did_change(&mut self, id: GraphicId, new_dirty: Rect) -> bool {
        let mut dirty = new_dirty;
        if let Some(before) = self.will_change_capture.remove(&id) {
            dirty = dirty.union(before);
        }
        self.merge_update_rect(dirty)
    }

    pub(crate) fn merge_update_rect(&mut self, rect: Rect) -> bool {
        self.update_rect = Some(match self.update_rect {
            Some(pending) => pending.union(rect),
            None => rect,
        });
        if self.has_scheduled_update {
            false
        } else {
            self.has_scheduled_update = true;
            true
        }
    }

    /// The pending redraw rect, if any, without clearing it.
    pub fn update_rect(&self) -> Option<Rect> {
        self.update_rect
    }

    /// Hand the coalesced rect to the host redraw and reset the guard.
    pub fn take_update_rect(&mut self) -> Option<Rect> {
        self.has_scheduled_update = false;
        self.update_rect.take()
    }

    // MARK: guest drawers

    /// Register an overlay callback run after all layer/graphic drawing.
    /// Guests run in registration order; no further ordering is guaranteed.
    pub fn add_guest_drawer(&mut self, drawer: GuestDrawer) -> GuestDrawerToken {
        self.next_guest_token += 1;
        let token = GuestDrawerToken(self.next_guest_token);
        self.guest_drawers.push((token, drawer));
        token
    }

    /// Unregister by token. Unknown tokens are ignored.
    pub fn remove_guest_drawer(&mut self, token: GuestDrawerToken) -> bool {
        let before = self.guest_drawers.len();
        self.guest_drawers.retain(|(t, _)| *t != token);
        before != self.guest_drawers.len()
    }

    pub fn guest_drawer_count(&self) -> usize {
        self.guest_drawers.len()
    }

    pub(crate) fn run_guest_drawers(&mut self, canvas: &mut dyn Canvas, dirty: Rect) {
        for (_, drawer) in &mut self.guest_drawers {
            drawer(canvas, dirty);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/page.rs"]
mod tests;
