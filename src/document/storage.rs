use std::collections::BTreeSet;

use kurbo::{BezPath, Line, Point, Rect, Shape, Vec2};

use crate::document::notify::{Change, ChangeNotifier, ChangeObserver, ObserverToken};
use crate::document::undo::{UndoAction, UndoManager};
use crate::foundation::color::Color;
use crate::foundation::error::{EaselError, EaselResult};
use crate::foundation::geometry::{WindingRule, path_intersection_with_line};
use crate::render::canvas::Canvas;
use crate::scene::arena::{GraphicArena, GraphicId};
use crate::scene::graphic::{Graphic, GraphicShape, autosized_frame};
use crate::scene::layer::Layer;
use crate::scene::page::{Page, PageId};

/// Grid and snap-mark configuration, plus their colors.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentSettings {
    pub grid_color: Color,
    pub grid_spacing: f64,
    pub grid_enabled: bool,
    pub grid_visible: bool,
    pub mark_color: Color,
    pub horizontal_marks: Vec<f64>,
    pub vertical_marks: Vec<f64>,
    pub marks_enabled: bool,
    pub marks_visible: bool,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            grid_color: Color::rgba(0.75, 0.8, 0.95, 1.0),
            grid_spacing: 18.0,
            grid_enabled: false,
            grid_visible: false,
            mark_color: Color::rgba(0.4, 0.8, 0.9, 1.0),
            horizontal_marks: Vec::new(),
            vertical_marks: Vec::new(),
            marks_enabled: false,
            marks_visible: false,
        }
    }
}

/// Options for a page draw pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawOptions {
    /// Printing suppresses grid, marks, ghost renditions, guest overlays,
    /// and non-printable layers.
    pub printing: bool,
    /// The rect being redrawn, handed to guest drawers. Defaults to the
    /// whole paper.
    pub dirty_rect: Option<Rect>,
}

#[derive(Clone, Copy, Debug)]
enum LinkEnd {
    Source,
    Destination,
}

/// Everything needed to resurrect a removed graphic on undo.
pub(crate) struct RestoreEntry {
    graphic: Graphic,
    page: Option<PageId>,
    layer: Option<String>,
    index: Option<usize>,
    severed_links: Vec<(GraphicId, LinkEnd)>,
    was_selected: bool,
}

/// The document: sole owner of graphics, pages, layers, selection, and the
/// undo/notification machinery.
///
/// Every structural mutation flows through a method here so that inverse
/// registration, dirty-region capture, and change broadcasting stay in one
/// place. Undo replay calls the same methods.
pub struct Document {
    arena: GraphicArena,
    pages: Vec<Page>,
    next_page_id: u64,
    layers: Vec<Layer>,
    active_layer: Option<String>,
    selection: BTreeSet<GraphicId>,
    focused_group: Option<GraphicId>,
    pub settings: DocumentSettings,
    /// Cascading offset applied to repeated pastes.
    pub copy_delta: Vec2,
    pub copy_offset: Vec2,
    undo: UndoManager,
    notifier: ChangeNotifier,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            arena: GraphicArena::new(),
            pages: Vec::new(),
            next_page_id: 0,
            layers: Vec::new(),
            active_layer: None,
            selection: BTreeSet::new(),
            focused_group: None,
            settings: DocumentSettings::default(),
            copy_delta: Vec2::ZERO,
            copy_offset: Vec2::ZERO,
            undo: UndoManager::new(),
            notifier: ChangeNotifier::new(),
        }
    }

    // MARK: accessors

    pub fn arena(&self) -> &GraphicArena {
        &self.arena
    }

    pub fn graphic(&self, id: GraphicId) -> Option<&Graphic> {
        self.arena.get(id)
    }

    /// Direct mutable access for the tool protocol (`track_mouse` and
    /// friends). Structural edits should use the document methods instead so
    /// undo and dirty-region bookkeeping see them.
    pub fn graphic_mut(&mut self, id: GraphicId) -> Option<&mut Graphic> {
        self.arena.get_mut(id)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id() == id)
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id() == id)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn active_layer(&self) -> Option<&str> {
        self.active_layer.as_deref()
    }

    pub fn set_active_layer(&mut self, name: &str) -> EaselResult<()> {
        if self.layer(name).is_none() {
            return Err(EaselError::structure(format!("no layer named '{name}'")));
        }
        self.active_layer = Some(name.to_string());
        Ok(())
    }

    // MARK: pages

    pub fn add_page(&mut self) -> PageId {
        self.next_page_id += 1;
        let id = PageId(self.next_page_id);
        self.pages.push(Page::new(id));
        self.undo.register(
            "Add Page",
            Box::new(move |doc| {
                let _ = doc.remove_page(id);
            }),
        );
        self.notifier.post(Change::PagesChanged);
        id
    }

    /// Remove an empty page. Pages still holding graphics refuse.
    pub fn remove_page(&mut self, id: PageId) -> EaselResult<()> {
        let Some(index) = self.pages.iter().position(|p| p.id() == id) else {
            return Err(EaselError::structure(format!("no page {id}")));
        };
        if self.pages[index].all_graphics().next().is_some() {
            return Err(EaselError::structure(format!(
                "page {id} still holds graphics"
            )));
        }
        let page = self.pages.remove(index);
        let (paper_color, paper_size) = (page.paper_color, page.paper_size);
        self.undo.register(
            "Remove Page",
            Box::new(move |doc| {
                doc.insert_page_at(index, id, paper_color, paper_size);
            }),
        );
        self.notifier.post(Change::PagesChanged);
        Ok(())
    }

    pub(crate) fn insert_page_at(
        &mut self,
        index: usize,
        id: PageId,
        paper_color: Color,
        paper_size: kurbo::Size,
    ) {
        let mut page = Page::new(id);
        page.paper_color = paper_color;
        page.paper_size = paper_size;
        let index = index.min(self.pages.len());
        self.pages.insert(index, page);
        self.next_page_id = self.next_page_id.max(id.0);
        self.undo.register(
            "Add Page",
            Box::new(move |doc| {
                let _ = doc.remove_page(id);
            }),
        );
        self.notifier.post(Change::PagesChanged);
    }

    // MARK: layers

    pub fn add_layer(&mut self, name: &str) -> EaselResult<()> {
        if self.layer(name).is_some() {
            return Err(EaselError::structure(format!(
                "layer '{name}' already exists"
            )));
        }
        self.layers.push(Layer::new(name));
        if self.active_layer.is_none() {
            self.active_layer = Some(name.to_string());
        }
        let name = name.to_string();
        self.undo.register(
            "Add Layer",
            Box::new(move |doc| {
                let _ = doc.remove_layer(&name);
            }),
        );
        self.notifier.post(Change::LayersChanged);
        Ok(())
    }

    /// Remove a layer no page bucket still uses.
    pub fn remove_layer(&mut self, name: &str) -> EaselResult<Layer> {
        let Some(index) = self.layers.iter().position(|l| l.name == name) else {
            return Err(EaselError::structure(format!("no layer named '{name}'")));
        };
        if self.pages.iter().any(|p| !p.layer_bucket_is_empty(name)) {
            return Err(EaselError::structure(format!(
                "layer '{name}' still holds graphics"
            )));
        }
        let layer = self.layers.remove(index);
        if self.active_layer.as_deref() == Some(name) {
            self.active_layer = self.layers.first().map(|l| l.name.clone());
        }
        let restored = layer.clone();
        self.undo.register(
            "Remove Layer",
            Box::new(move |doc| {
                doc.insert_layer_at(index, restored);
            }),
        );
        self.notifier.post(Change::LayersChanged);
        Ok(layer)
    }

    pub(crate) fn insert_layer_at(&mut self, index: usize, layer: Layer) {
        let name = layer.name.clone();
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        if self.active_layer.is_none() {
            self.active_layer = Some(name.clone());
        }
        self.undo.register(
            "Add Layer",
            Box::new(move |doc| {
                let _ = doc.remove_layer(&name);
            }),
        );
        self.notifier.post(Change::LayersChanged);
    }

    /// Rename a layer, re-keying every page bucket and graphic back-ref.
    pub fn rename_layer(&mut self, old: &str, new: &str) -> EaselResult<()> {
        if old == new {
            return Ok(());
        }
        if self.layer(new).is_some() {
            return Err(EaselError::structure(format!(
                "layer '{new}' already exists"
            )));
        }
        let Some(layer) = self.layers.iter_mut().find(|l| l.name == old) else {
            return Err(EaselError::structure(format!("no layer named '{old}'")));
        };
        layer.name = new.to_string();
        for page in &mut self.pages {
            page.rename_layer_bucket(old, new);
        }
        for (_, graphic) in self.arena.iter_mut() {
            if graphic.layer() == Some(old) {
                graphic.set_layer_name(new.to_string());
            }
        }
        if self.active_layer.as_deref() == Some(old) {
            self.active_layer = Some(new.to_string());
        }
        let (old, new) = (old.to_string(), new.to_string());
        self.undo.register(
            "Rename Layer",
            Box::new(move |doc| {
                let _ = doc.rename_layer(&new, &old);
            }),
        );
        self.notifier.post(Change::LayersChanged);
        Ok(())
    }

    pub fn set_layer_locked(&mut self, name: &str, locked: bool) -> EaselResult<()> {
        self.set_layer_flag(name, locked, |l| &mut l.locked, "Lock Layer", false)
    }

    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> EaselResult<()> {
        self.set_layer_flag(name, visible, |l| &mut l.visible, "Hide Layer", true)
    }

    pub fn set_layer_printable(&mut self, name: &str, printable: bool) -> EaselResult<()> {
        self.set_layer_flag(name, printable, |l| &mut l.printable, "Set Layer Printable", false)
    }

    fn set_layer_flag(
        &mut self,
        name: &str,
        value: bool,
        field: fn(&mut Layer) -> &mut bool,
        undo_name: &str,
        repaints: bool,
    ) -> EaselResult<()> {
        let Some(layer) = self.layers.iter_mut().find(|l| l.name == name) else {
            return Err(EaselError::structure(format!("no layer named '{name}'")));
        };
        let slot = field(layer);
        let old = *slot;
        if old == value {
            return Ok(());
        }
        *slot = value;
        let name = name.to_string();
        self.undo.register(
            undo_name,
            Box::new(move |doc| {
                let _ = doc.set_layer_flag(&name, old, field, "Set Layer Flag", repaints);
            }),
        );
        if repaints {
            self.mark_all_pages_dirty();
        }
        self.notifier.post(Change::LayersChanged);
        Ok(())
    }

    /// Editability gate used by tools before touching a graphic.
    pub fn layer_is_locked_or_not_visible(&self, id: GraphicId) -> bool {
        let Some(layer_name) = self.arena.get(id).and_then(|g| g.layer()) else {
            return false;
        };
        match self.layers.iter().find(|l| l.name == layer_name) {
            Some(layer) => layer.locked || !layer.visible,
            None => false,
        }
    }

    fn mark_all_pages_dirty(&mut self) {
        for page in &mut self.pages {
            let paper = Rect::from_origin_size(Point::ORIGIN, page.paper_size);
            page.merge_update_rect(paper);
        }
    }

    // MARK: graphics

    pub fn add_graphic(
        &mut self,
        graphic: Graphic,
        page: PageId,
        layer: &str,
    ) -> EaselResult<GraphicId> {
        self.add_graphic_selecting(graphic, page, layer, false, false)
    }

    /// Insert at the top of the layer's z-order, optionally updating the
    /// selection. Locked layers accept graphics; the lock gates tool edits,
    /// not insertion.
    #[tracing::instrument(skip(self, graphic))]
    pub fn add_graphic_selecting(
        &mut self,
        mut graphic: Graphic,
        page: PageId,
        layer: &str,
        select: bool,
        extend_selection: bool,
    ) -> EaselResult<GraphicId> {
        if self.page(page).is_none() {
            return Err(EaselError::structure(format!("no page {page}")));
        }
        if self.layer(layer).is_none() {
            return Err(EaselError::structure(format!("no layer named '{layer}'")));
        }
        for aspect in graphic.aspects_mut() {
            aspect.will_add_to_page();
        }
        let id = self.arena.insert(graphic);
        if let Some(g) = self.arena.get_mut(id) {
            g.set_page_and_layer(Some(page), Some(layer.to_string()));
            for aspect in g.aspects_mut() {
                aspect.did_add_to_page();
            }
        }
        if let Some(p) = self.page_mut(page) {
            p.insert_graphic(layer, id);
        }
        self.mark_graphic_dirty(id);
        if select {
            if !extend_selection {
                self.selection.clear();
            }
            self.selection.insert(id);
            self.notifier.post(Change::SelectionChanged);
        }
        self.notifier.post(Change::GraphicAdded(id));
        self.undo.register(
            "Add Graphic",
            Box::new(move |doc| {
                let _ = doc.remove_graphic(id);
            }),
        );
        Ok(id)
    }

    /// Remove a graphic and its subtree, severing every cross-reference:
    /// related back-refs, link endpoints, selection, focused group, page
    /// buckets.
    #[tracing::instrument(skip(self))]
    pub fn remove_graphic(&mut self, id: GraphicId) -> EaselResult<()> {
        if !self.arena.contains(id) {
            return Err(EaselError::structure(format!("no graphic {id}")));
        }
        let dirty = self.dirty_bounds_with_related(id);
        let page_id = self.arena.get(id).and_then(|g| g.page());
        let entries = self.detach_tree(id);
        if let Some(pid) = page_id
            && let Some(page) = self.page_mut(pid)
        {
            page.merge_update_rect(dirty);
        }
        self.undo.register(
            "Remove Graphic",
            Box::new(move |doc| {
                doc.restore_entries(entries);
            }),
        );
        self.notifier.post(Change::GraphicRemoved(id));
        Ok(())
    }

    fn detach_tree(&mut self, root: GraphicId) -> Vec<RestoreEntry> {
        // Subtree in parent-before-child order.
        let mut order = vec![root];
        let mut i = 0;
        while i < order.len() {
            if let Some(g) = self.arena.get(order[i]) {
                order.extend(g.subgraphics().iter().copied());
            }
            i += 1;
        }

        // Detach the root from its parent, if it has one outside the tree.
        let root_parent = self.arena.get(root).and_then(|g| g.supergraphic());
        if let Some(sup) = root_parent
            && let Some(parent) = self.arena.get_mut(sup)
        {
            parent.remove_subgraphic_id(root);
        }

        let mut entries = Vec::new();
        for gid in order {
            let (page_id, layer_name) = match self.arena.get(gid) {
                Some(g) => (g.page(), g.layer().map(String::from)),
                None => (None, None),
            };
            let mut index = None;
            if let (Some(pid), Some(layer)) = (page_id, layer_name.as_deref())
                && let Some(page) = self.page_mut(pid)
            {
                index = page.graphics_for_layer(layer).iter().position(|g| *g == gid);
                page.remove_graphic(layer, gid);
            }
            let was_selected = self.selection.remove(&gid);
            if was_selected {
                self.notifier.post(Change::SelectionChanged);
            }
            if self.focused_group == Some(gid) {
                self.focused_group = None;
            }

            // Sever related back-references and any link endpoint pointing
            // here, so no dangling hit-test or redraw target remains.
            let related: Vec<GraphicId> = self
                .arena
                .get(gid)
                .map(|g| g.related_graphics().iter().copied().collect())
                .unwrap_or_default();
            let mut severed_links = Vec::new();
            for rid in related {
                if let Some(other) = self.arena.get_mut(rid) {
                    other.remove_related_id(gid);
                    if let GraphicShape::Link {
                        source,
                        destination,
                    } = other.shape_mut()
                    {
                        if *source == Some(gid) {
                            *source = None;
                            severed_links.push((rid, LinkEnd::Source));
                        }
                        if *destination == Some(gid) {
                            *destination = None;
                            severed_links.push((rid, LinkEnd::Destination));
                        }
                    }
                }
            }
            for (rid, _) in &severed_links {
                self.update_link_path(*rid);
            }

            if let Some(mut graphic) = self.arena.remove(gid) {
                for aspect in graphic.aspects_mut() {
                    aspect.will_remove_from_page();
                    aspect.did_remove_from_page();
                }
                graphic.set_page_and_layer(None, None);
                entries.push(RestoreEntry {
                    graphic,
                    page: page_id,
                    layer: layer_name,
                    index,
                    severed_links,
                    was_selected,
                });
            }
        }
        entries
    }

    /// Undo counterpart of [`Document::remove_graphic`]: resurrect a
    /// detached subtree, then re-wire cross-references in a second pass.
    pub(crate) fn restore_entries(&mut self, entries: Vec<RestoreEntry>) {
        let root = entries.first().map(|e| e.graphic.id());
        let mut rewire = Vec::new();

        for entry in entries {
            let id = entry.graphic.id();
            let related: Vec<GraphicId> =
                entry.graphic.related_graphics().iter().copied().collect();
            let supergraphic = entry.graphic.supergraphic();
            if let Err(err) = self.arena.insert_with_id(id, entry.graphic) {
                tracing::warn!(%id, %err, "skipping graphic that could not be restored");
                continue;
            }
            if let (Some(pid), Some(layer)) = (entry.page, entry.layer.as_deref()) {
                if let Some(page) = self.page_mut(pid) {
                    match entry.index {
                        Some(index) => page.insert_graphic_at(layer, id, index),
                        None => page.insert_graphic(layer, id),
                    }
                }
                if let Some(g) = self.arena.get_mut(id) {
                    g.set_page_and_layer(Some(pid), Some(layer.to_string()));
                }
            }
            if let Some(g) = self.arena.get_mut(id) {
                for aspect in g.aspects_mut() {
                    aspect.will_add_to_page();
                    aspect.did_add_to_page();
                }
            }
            if let Some(sup) = supergraphic
                && let Some(parent) = self.arena.get_mut(sup)
                && !parent.subgraphics().contains(&id)
            {
                parent.push_subgraphic_id(id);
            }
            rewire.push((id, related, entry.severed_links, entry.was_selected));
        }

        for (id, related, severed_links, was_selected) in rewire {
            for rid in related {
                if let Some(other) = self.arena.get_mut(rid) {
                    other.insert_related_id(id);
                }
            }
            for (rid, end) in severed_links {
                if let Some(other) = self.arena.get_mut(rid) {
                    if let GraphicShape::Link {
                        source,
                        destination,
                    } = other.shape_mut()
                    {
                        match end {
                            LinkEnd::Source => *source = Some(id),
                            LinkEnd::Destination => *destination = Some(id),
                        }
                    }
                    self.update_link_path(rid);
                }
            }
            if was_selected {
                self.selection.insert(id);
                self.notifier.post(Change::SelectionChanged);
            }
            self.mark_graphic_dirty(id);
            self.notifier.post(Change::GraphicAdded(id));
        }

        if let Some(root) = root {
            self.undo.register(
                "Remove Graphic",
                Box::new(move |doc| {
                    let _ = doc.remove_graphic(root);
                }),
            );
        }
    }

    /// Resize through the document so undo, dirty regions, autosizing, and
    /// link rerouting all happen.
    pub fn set_graphic_frame(&mut self, id: GraphicId, frame: Rect) -> EaselResult<()> {
        let Some(graphic) = self.arena.get(id) else {
            return Err(EaselError::structure(format!("no graphic {id}")));
        };
        let old_frame = graphic.frame();
        if old_frame == frame {
            return Ok(());
        }
        // Autosize recursion folds every child's inverse into one group so a
        // single undo restores the exact pre-resize frames.
        let opened_group = !self.undo.has_open_group();
        if opened_group {
            self.undo.begin_group("Change Frame");
        }
        self.graphic_will_change(id);

        let (autosize, children) = {
            let g = self.arena.get(id).map(|g| {
                (g.autosize_subgraphics(), g.subgraphics().to_vec())
            });
            g.unwrap_or((false, Vec::new()))
        };
        if let Some(g) = self.arena.get_mut(id) {
            g.set_frame(frame);
        }
        if autosize {
            for child in children {
                if let Some((child_frame, mask)) = self
                    .arena
                    .get(child)
                    .map(|c| (c.frame(), c.autoresizing_mask()))
                {
                    let resized = autosized_frame(child_frame, old_frame, frame, mask);
                    let _ = self.set_graphic_frame(child, resized);
                }
            }
        }
        self.refresh_related_links(id);
        self.graphic_did_change(id);
        self.undo.register(
            "Change Frame",
            Box::new(move |doc| {
                let _ = doc.set_graphic_frame(id, old_frame);
            }),
        );
        if opened_group {
            self.undo.end_group();
        }
        Ok(())
    }

    pub fn move_graphic_by(&mut self, id: GraphicId, delta: Vec2) -> EaselResult<()> {
        let Some(graphic) = self.arena.get(id) else {
            return Err(EaselError::structure(format!("no graphic {id}")));
        };
        let frame = graphic.frame();
        self.set_graphic_frame(id, frame + delta)
    }

    /// Wrap up an interactive drag driven through `graphic_mut`: recompute
    /// bounds, reroute links, merge dirty regions, and register the undo for
    /// the whole gesture.
    pub fn finish_tracking(&mut self, id: GraphicId, stop: Point) -> EaselResult<()> {
        let Some(graphic) = self.arena.get(id) else {
            return Err(EaselError::structure(format!("no graphic {id}")));
        };
        let original = graphic.tracking_original_frame();
        self.graphic_will_change(id);
        if let Some(g) = self.arena.get_mut(id) {
            g.stop_tracking(stop);
        }
        self.refresh_related_links(id);
        self.graphic_did_change(id);
        if let Some(old_frame) = original {
            self.undo.register(
                "Move",
                Box::new(move |doc| {
                    let _ = doc.set_graphic_frame(id, old_frame);
                }),
            );
        }
        Ok(())
    }

    // MARK: subgraphics

    /// Is `id` inside the subtree rooted at `ancestor`?
    pub fn is_descendant_of(&self, id: GraphicId, ancestor: GraphicId) -> bool {
        let mut current = self.arena.get(id).and_then(|g| g.supergraphic());
        while let Some(sup) = current {
            if sup == ancestor {
                return true;
            }
            current = self.arena.get(sup).and_then(|g| g.supergraphic());
        }
        false
    }

    /// Nest `child` under `parent`. The child leaves direct page iteration;
    /// its super-graphic owns it now.
    pub fn add_subgraphic(&mut self, parent: GraphicId, child: GraphicId) -> EaselResult<()> {
        if parent == child {
            return Err(EaselError::structure("a graphic cannot contain itself"));
        }
        if !self.arena.contains(parent) || !self.arena.contains(child) {
            return Err(EaselError::structure("both graphics must be in the document"));
        }
        if self.is_descendant_of(parent, child) {
            return Err(EaselError::structure(
                "nesting would create a containment cycle",
            ));
        }

        // Leave the page bucket; sub-graphics are excluded from direct page
        // iteration.
        let (child_page, child_layer) = match self.arena.get(child) {
            Some(g) => (g.page(), g.layer().map(String::from)),
            None => (None, None),
        };
        if let (Some(pid), Some(layer)) = (child_page, child_layer.as_deref())
            && let Some(page) = self.page_mut(pid)
        {
            page.remove_graphic(layer, child);
        }
        let old_parent = self.arena.get(child).and_then(|g| g.supergraphic());
        if let Some(old_parent) = old_parent
            && let Some(old) = self.arena.get_mut(old_parent)
        {
            old.remove_subgraphic_id(child);
        }
        if self.selection.remove(&child) {
            self.notifier.post(Change::SelectionChanged);
        }

        if let Some(g) = self.arena.get_mut(child) {
            g.set_supergraphic(Some(parent));
            g.set_page_and_layer(None, None);
        }
        if let Some(p) = self.arena.get_mut(parent) {
            p.push_subgraphic_id(child);
            p.note_bounds_are_dirty();
        }
        self.mark_graphic_dirty(parent);
        self.notifier.post(Change::GraphicChanged(parent));
        self.undo.register(
            "Group",
            Box::new(move |doc| {
                let _ = doc.remove_from_supergraphic(child);
            }),
        );
        Ok(())
    }

    /// Detach `child` from its super-graphic, returning it to the parent's
    /// page and layer at the top of the z-order.
    pub fn remove_from_supergraphic(&mut self, child: GraphicId) -> EaselResult<()> {
        let Some(parent) = self.arena.get(child).and_then(|g| g.supergraphic()) else {
            return Err(EaselError::structure(format!(
                "graphic {child} has no super-graphic"
            )));
        };
        let (parent_page, parent_layer) = match self.arena.get(parent) {
            Some(g) => (g.page(), g.layer().map(String::from)),
            None => (None, None),
        };
        if let Some(p) = self.arena.get_mut(parent) {
            p.remove_subgraphic_id(child);
            p.note_bounds_are_dirty();
        }
        if let Some(g) = self.arena.get_mut(child) {
            g.set_supergraphic(None);
            g.set_page_and_layer(parent_page, parent_layer.clone());
        }
        if let (Some(pid), Some(layer)) = (parent_page, parent_layer.as_deref())
            && let Some(page) = self.page_mut(pid)
        {
            page.insert_graphic(layer, child);
        }
        self.mark_graphic_dirty(parent);
        self.mark_graphic_dirty(child);
        self.notifier.post(Change::GraphicChanged(parent));
        self.undo.register(
            "Ungroup",
            Box::new(move |doc| {
                let _ = doc.add_subgraphic(parent, child);
            }),
        );
        Ok(())
    }

    // MARK: related graphics and links

    /// Symmetric, non-owning cross-reference between two graphics.
    pub fn relate_graphics(&mut self, a: GraphicId, b: GraphicId) -> EaselResult<()> {
        if a == b || !self.arena.contains(a) || !self.arena.contains(b) {
            return Err(EaselError::structure(
                "related graphics must be two distinct document graphics",
            ));
        }
        if let Some(g) = self.arena.get_mut(a) {
            g.insert_related_id(b);
        }
        if let Some(g) = self.arena.get_mut(b) {
            g.insert_related_id(a);
        }
        Ok(())
    }

    pub fn unrelate_graphics(&mut self, a: GraphicId, b: GraphicId) {
        if let Some(g) = self.arena.get_mut(a) {
            g.remove_related_id(b);
        }
        if let Some(g) = self.arena.get_mut(b) {
            g.remove_related_id(a);
        }
    }

    /// Create a link graphic connecting two graphics, on the given page and
    /// layer.
    pub fn add_link(
        &mut self,
        source: GraphicId,
        destination: GraphicId,
        page: PageId,
        layer: &str,
    ) -> EaselResult<GraphicId> {
        let link = Graphic::new(
            GraphicShape::Link {
                source: None,
                destination: None,
            },
            Rect::ZERO,
        );
        let opened_group = !self.undo.has_open_group();
        if opened_group {
            self.undo.begin_group("Add Link");
        }
        let result = self
            .add_graphic(link, page, layer)
            .and_then(|id| self.connect_link(id, Some(source), Some(destination)).map(|_| id));
        if opened_group {
            self.undo.end_group();
        }
        result
    }

    /// Point a link at new endpoints, maintaining related-set symmetry and
    /// recomputing the connector path.
    pub fn connect_link(
        &mut self,
        link: GraphicId,
        source: Option<GraphicId>,
        destination: Option<GraphicId>,
    ) -> EaselResult<()> {
        let Some(graphic) = self.arena.get(link) else {
            return Err(EaselError::structure(format!("no graphic {link}")));
        };
        let GraphicShape::Link {
            source: old_source,
            destination: old_destination,
        } = graphic.shape().clone()
        else {
            return Err(EaselError::structure(format!("graphic {link} is not a link")));
        };
        for endpoint in [source, destination].into_iter().flatten() {
            if endpoint == link || !self.arena.contains(endpoint) {
                return Err(EaselError::structure(
                    "link endpoints must be other document graphics",
                ));
            }
        }

        for old in [old_source, old_destination].into_iter().flatten() {
            self.unrelate_graphics(link, old);
        }
        if let Some(g) = self.arena.get_mut(link)
            && let GraphicShape::Link {
                source: s,
                destination: d,
            } = g.shape_mut()
        {
            *s = source;
            *d = destination;
        }
        for endpoint in [source, destination].into_iter().flatten() {
            self.relate_graphics(link, endpoint)?;
        }
        self.update_link_path(link);
        self.graphic_did_change(link);
        self.undo.register(
            "Connect Link",
            Box::new(move |doc| {
                let _ = doc.connect_link(link, old_source, old_destination);
            }),
        );
        Ok(())
    }

    /// Recompute a link's path: a segment between its endpoints' edges,
    /// attached where each shape's outline crosses the center line.
    pub(crate) fn update_link_path(&mut self, link: GraphicId) {
        let Some(graphic) = self.arena.get(link) else {
            return;
        };
        let GraphicShape::Link {
            source: Some(src),
            destination: Some(dst),
        } = graphic.shape()
        else {
            return;
        };
        let (src, dst) = (*src, *dst);
        let (Some(src_g), Some(dst_g)) = (self.arena.get(src), self.arena.get(dst)) else {
            return;
        };
        let src_center = src_g.centroid();
        let dst_center = dst_g.centroid();
        let tolerance = src_g.flatness();
        let start =
            path_intersection_with_line(src_g.path(), Line::new(src_center, dst_center), tolerance)
                .unwrap_or(src_center);
        let end =
            path_intersection_with_line(dst_g.path(), Line::new(dst_center, src_center), tolerance)
                .unwrap_or(dst_center);
        let mut path = BezPath::new();
        path.move_to(start);
        path.line_to(end);
        if let Some(g) = self.arena.get_mut(link) {
            g.set_path(path);
        }
        self.mark_graphic_dirty(link);
    }

    fn refresh_related_links(&mut self, id: GraphicId) {
        let related: Vec<GraphicId> = self
            .arena
            .get(id)
            .map(|g| g.related_graphics().iter().copied().collect())
            .unwrap_or_default();
        for rid in related {
            let is_link = matches!(
                self.arena.get(rid).map(|g| g.shape()),
                Some(GraphicShape::Link { .. })
            );
            if is_link {
                self.update_link_path(rid);
            }
        }
    }

    // MARK: dirty regions

    /// Capture a graphic's pre-mutation dirty bounds on its page.
    pub fn graphic_will_change(&mut self, id: GraphicId) {
        let dirty = self.dirty_bounds_with_related(id);
        let pid = self.arena.get(id).and_then(|g| g.page());
        if let Some(pid) = pid
            && let Some(page) = self.page_mut(pid)
        {
            page.graphic_will_change(id, dirty);
        }
    }

    /// Fold the post-mutation dirty bounds into the page's pending update
    /// rect and broadcast the change.
    pub fn graphic_did_change(&mut self, id: GraphicId) {
        let dirty = self.dirty_bounds_with_related(id);
        let pid = self.arena.get(id).and_then(|g| g.page());
        if let Some(pid) = pid
            && let Some(page) = self.page_mut(pid)
        {
            page.graphic_did_change(id, dirty);
        }
        self.notifier.post(Change::GraphicChanged(id));
    }

    /// The graphic's dirty bounds unioned with those of every related
    /// graphic; moving a shape must also repaint its connected links.
    pub fn dirty_bounds_with_related(&mut self, id: GraphicId) -> Rect {
        let Some(graphic) = self.arena.get_mut(id) else {
            return Rect::ZERO;
        };
        let mut rect = graphic.dirty_bounds();
        let related: Vec<GraphicId> = graphic.related_graphics().iter().copied().collect();
        for rid in related {
            if let Some(other) = self.arena.get_mut(rid) {
                rect = rect.union(other.dirty_bounds());
            }
        }
        rect
    }

    fn mark_graphic_dirty(&mut self, id: GraphicId) {
        let Some(graphic) = self.arena.get_mut(id) else {
            return;
        };
        let dirty = graphic.dirty_bounds();
        let page = graphic.page();
        if let Some(pid) = page
            && let Some(p) = self.page_mut(pid)
        {
            p.merge_update_rect(dirty);
        }
    }

    // MARK: hit-testing

    /// Graphics under `point`, topmost first: layers front-to-back, graphics
    /// within a layer front-to-back, subgraphics before their parent.
    pub fn graphics_hit_by_point(&self, page: PageId, point: Point) -> Vec<GraphicId> {
        let mut hits = Vec::new();
        let Some(p) = self.page(page) else {
            return hits;
        };
        for layer in self.layers.iter().rev() {
            if !layer.visible {
                continue;
            }
            for id in p.graphics_for_layer(&layer.name).iter().rev() {
                self.hit_by_point_recursive(*id, point, &mut hits);
            }
        }
        hits
    }

    fn hit_by_point_recursive(&self, id: GraphicId, point: Point, hits: &mut Vec<GraphicId>) {
        let Some(graphic) = self.arena.get(id) else {
            return;
        };
        for sub in graphic.subgraphics().iter().rev() {
            self.hit_by_point_recursive(*sub, point, hits);
        }
        if graphic.is_hit_by_point(point) {
            hits.push(id);
        }
    }

    /// Graphics intersecting `rect`, topmost first (rubber-band selection).
    pub fn graphics_hit_by_rect(&self, page: PageId, rect: Rect) -> Vec<GraphicId> {
        let mut hits = Vec::new();
        let Some(p) = self.page(page) else {
            return hits;
        };
        for layer in self.layers.iter().rev() {
            if !layer.visible {
                continue;
            }
            for id in p.graphics_for_layer(&layer.name).iter().rev() {
                self.hit_by_rect_recursive(*id, rect, &mut hits);
            }
        }
        hits
    }

    fn hit_by_rect_recursive(&self, id: GraphicId, rect: Rect, hits: &mut Vec<GraphicId>) {
        let Some(graphic) = self.arena.get(id) else {
            return;
        };
        for sub in graphic.subgraphics().iter().rev() {
            self.hit_by_rect_recursive(*sub, rect, hits);
        }
        if graphic.is_hit_by_rect(rect) {
            hits.push(id);
        }
    }

    // MARK: drawing

    /// Draw one page: paper, grid and marks (screen only), layers bottom to
    /// top, ghost renditions for invisible graphics, then guest overlays.
    #[tracing::instrument(skip(self, canvas, options))]
    pub fn draw_page(
        &mut self,
        page: PageId,
        canvas: &mut dyn Canvas,
        options: &DrawOptions,
    ) -> EaselResult<()> {
        let Some(page_index) = self.pages.iter().position(|p| p.id() == page) else {
            return Err(EaselError::structure(format!("no page {page}")));
        };
        let paper_color = self.pages[page_index].paper_color;
        let paper = Rect::from_origin_size(Point::ORIGIN, self.pages[page_index].paper_size);
        canvas.fill_path(&paper.to_path(0.1), WindingRule::NonZero, paper_color);

        if !options.printing {
            if self.settings.grid_visible && self.settings.grid_spacing >= 1.0 {
                let grid = grid_paths(paper, self.settings.grid_spacing);
                canvas.fill_path(&grid, WindingRule::NonZero, self.settings.grid_color);
            }
            if self.settings.marks_visible {
                let marks = mark_paths(
                    paper,
                    &self.settings.horizontal_marks,
                    &self.settings.vertical_marks,
                );
                if !marks.elements().is_empty() {
                    canvas.fill_path(&marks, WindingRule::NonZero, self.settings.mark_color);
                }
            }
        }

        for layer in &self.layers {
            if !layer.visible {
                continue;
            }
            if options.printing && !layer.printable {
                continue;
            }
            for id in self.pages[page_index].graphics_for_layer(&layer.name) {
                let Some(graphic) = self.arena.get(*id) else {
                    continue;
                };
                if graphic.ignore {
                    continue;
                }
                if graphic.renders_to_canvas() {
                    graphic.draw(&self.arena, canvas);
                } else if !options.printing {
                    graphic.draw_ghost(canvas);
                }
            }
        }

        if !options.printing {
            let dirty = options.dirty_rect.unwrap_or(paper);
            self.pages[page_index].run_guest_drawers(canvas, dirty);
        }
        Ok(())
    }

    // MARK: selection

    pub fn selection(&self) -> &BTreeSet<GraphicId> {
        &self.selection
    }

    pub fn is_selected(&self, id: GraphicId) -> bool {
        self.selection.contains(&id)
    }

    pub fn select_graphic(&mut self, id: GraphicId, extend: bool) -> EaselResult<()> {
        if !self.arena.contains(id) {
            return Err(EaselError::structure(format!("no graphic {id}")));
        }
        if !extend {
            self.selection.clear();
        }
        self.selection.insert(id);
        self.notifier.post(Change::SelectionChanged);
        Ok(())
    }

    pub fn deselect_graphic(&mut self, id: GraphicId) {
        if self.selection.remove(&id) {
            self.notifier.post(Change::SelectionChanged);
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.notifier.post(Change::SelectionChanged);
        }
    }

    pub(crate) fn restore_selection(&mut self, selection: BTreeSet<GraphicId>) {
        self.selection = selection;
    }

    // MARK: focused group

    pub fn focused_group(&self) -> Option<GraphicId> {
        self.focused_group
    }

    /// Enter a group for in-place editing of its subgraphics.
    pub fn enter_group(&mut self, id: GraphicId) -> EaselResult<()> {
        if !self.arena.contains(id) {
            return Err(EaselError::structure(format!("no graphic {id}")));
        }
        self.focused_group = Some(id);
        Ok(())
    }

    pub fn exit_group(&mut self) {
        self.focused_group = None;
    }

    pub(crate) fn set_focused_group(&mut self, id: Option<GraphicId>) {
        self.focused_group = id;
    }

    // MARK: notifications

    pub fn add_observer(&mut self, observer: ChangeObserver) -> ObserverToken {
        self.notifier.add_observer(observer)
    }

    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        self.notifier.remove_observer(token)
    }

    pub fn notifications_are_disabled(&self) -> bool {
        self.notifier.is_disabled()
    }

    pub fn disable_notifications(&mut self) {
        self.notifier.disable();
    }

    /// Re-enable; leaving the outermost scope flushes one consolidated
    /// notification with the batch's net effect.
    pub fn enable_notifications(&mut self) {
        self.notifier.enable();
    }

    /// Run a batch of edits with notifications buffered, flushing one
    /// consolidated notification at the end.
    pub fn batch_edits<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.notifier.disable();
        let result = f(self);
        self.notifier.enable();
        result
    }

    // MARK: undo

    /// Register an inverse action for a mutation a collaborator performed
    /// through direct access.
    pub fn register_undo(&mut self, name: &str, action: UndoAction) {
        self.undo.register(name, action);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_name(&self) -> Option<&str> {
        self.undo.undo_name()
    }

    pub fn redo_name(&self) -> Option<&str> {
        self.undo.redo_name()
    }

    pub fn begin_undo_group(&mut self, name: &str) {
        self.undo.begin_group(name);
    }

    pub fn end_undo_group(&mut self) {
        self.undo.end_group();
    }

    /// Run edits without recording inverses (bulk import, archive restore).
    pub fn with_undo_disabled<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.undo.disable();
        let result = f(self);
        self.undo.enable();
        result
    }

    /// Replay the most recent undo group. Registrations made during the
    /// replay build the matching redo group.
    pub fn undo(&mut self) -> bool {
        let Some(group) = self.undo.take_undo_group() else {
            return false;
        };
        self.undo.begin_replay_undo(group.name.clone());
        self.notifier.disable();
        for action in group.actions.into_iter().rev() {
            action(self);
        }
        self.notifier.enable();
        self.undo.finish_replay();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(group) = self.undo.take_redo_group() else {
            return false;
        };
        self.undo.begin_replay_redo(group.name.clone());
        self.notifier.disable();
        for action in group.actions.into_iter().rev() {
            action(self);
        }
        self.notifier.enable();
        self.undo.finish_replay();
        true
    }

    // MARK: archive plumbing

    pub(crate) fn arena_mut(&mut self) -> &mut GraphicArena {
        &mut self.arena
    }

    pub(crate) fn push_page_raw(&mut self, page: Page) {
        self.next_page_id = self.next_page_id.max(page.id().0);
        self.pages.push(page);
    }

    pub(crate) fn push_layer_raw(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub(crate) fn set_active_layer_raw(&mut self, name: Option<String>) {
        self.active_layer = name;
    }
}

/// Thin filled lines every `spacing` points across the paper.
fn grid_paths(paper: Rect, spacing: f64) -> BezPath {
    const HAIRLINE: f64 = 0.25;
    let mut path = BezPath::new();
    let mut x = paper.x0 + spacing;
    while x < paper.x1 {
        append_rect(&mut path, Rect::new(x - HAIRLINE, paper.y0, x + HAIRLINE, paper.y1));
        x += spacing;
    }
    let mut y = paper.y0 + spacing;
    while y < paper.y1 {
        append_rect(&mut path, Rect::new(paper.x0, y - HAIRLINE, paper.x1, y + HAIRLINE));
        y += spacing;
    }
    path
}

/// Full-bleed snap-mark lines at the stored offsets.
fn mark_paths(paper: Rect, horizontal: &[f64], vertical: &[f64]) -> BezPath {
    const HAIRLINE: f64 = 0.35;
    let mut path = BezPath::new();
    for &y in horizontal {
        if (paper.y0..=paper.y1).contains(&y) {
            append_rect(&mut path, Rect::new(paper.x0, y - HAIRLINE, paper.x1, y + HAIRLINE));
        }
    }
    for &x in vertical {
        if (paper.x0..=paper.x1).contains(&x) {
            append_rect(&mut path, Rect::new(x - HAIRLINE, paper.y0, x + HAIRLINE, paper.y1));
        }
    }
    path
}

fn append_rect(path: &mut BezPath, rect: Rect) {
    for el in rect.to_path(0.1).elements() {
        path.push(*el);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/storage.rs"]
mod tests;
