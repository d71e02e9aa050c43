//! Versioned JSON archival of the whole document.
//!
//! Encoding filters out derived-only aspects and runtime state; decoding
//! tolerates missing optional keys and runs a second resolution pass over
//! the loaded object graph, dropping (with a warning) any reference that
//! doesn't resolve.

use std::collections::BTreeSet;

use kurbo::{BezPath, Rect, Size, Vec2};

use crate::aspect::Aspect;
use crate::aspect::priority::AspectPriority;
use crate::document::storage::{Document, DocumentSettings};
use crate::foundation::color::Color;
use crate::foundation::error::{EaselError, EaselResult};
use crate::scene::arena::GraphicId;
use crate::scene::graphic::{AutosizeMask, Graphic, GraphicShape};
use crate::scene::layer::Layer;
use crate::scene::page::{Page, PageId};

/// Current archive format version. Decode refuses anything newer.
pub const ARCHIVE_VERSION: u32 = 1;

fn default_flatness() -> f64 {
    1.0
}

fn default_paper_size() -> Size {
    Size::new(612.0, 792.0)
}

fn zero_vec2() -> Vec2 {
    Vec2::ZERO
}

/// Serialized form of a whole document.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct DocumentArchive {
    pub version: u32,
    #[serde(default)]
    pub settings: DocumentSettings,
    #[serde(default = "zero_vec2")]
    pub copy_delta: Vec2,
    #[serde(default = "zero_vec2")]
    pub copy_offset: Vec2,
    #[serde(default)]
    pub active_layer: Option<String>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub pages: Vec<PageArchive>,
    #[serde(default)]
    pub graphics: Vec<GraphicArchive>,
    #[serde(default)]
    pub selection: Vec<GraphicId>,
    #[serde(default)]
    pub focused_group: Option<GraphicId>,
}

/// Serialized form of a page: paper plus per-layer z-ordered id lists.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageArchive {
    pub id: PageId,
    pub paper_color: Color,
    #[serde(default = "default_paper_size")]
    pub paper_size: Size,
    #[serde(default)]
    pub layers: Vec<PageLayerArchive>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageLayerArchive {
    pub layer: String,
    pub graphics: Vec<GraphicId>,
}

/// One priority slot's archived aspects.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AspectSlotArchive {
    pub priority: AspectPriority,
    pub aspects: Vec<Aspect>,
}

/// Serialized form of a graphic. The path appears only for shapes whose
/// path cannot be reconstructed (`should_encode_path`).
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct GraphicArchive {
    pub id: GraphicId,
    pub shape: GraphicShape,
    pub frame: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub aspects: Vec<AspectSlotArchive>,
    #[serde(default)]
    pub subgraphics: Vec<GraphicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supergraphic: Option<GraphicId>,
    #[serde(default)]
    pub related: Vec<GraphicId>,
    #[serde(default)]
    pub autosize_subgraphics: bool,
    #[serde(default)]
    pub autoresizing_mask: AutosizeMask,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_flatness")]
    pub flatness: f64,
}

impl GraphicArchive {
    pub fn from_graphic(graphic: &Graphic) -> Self {
        let mut slots = Vec::new();
        for priority in AspectPriority::ALL {
            let aspects: Vec<Aspect> = graphic
                .aspects_with_priority(priority)
                .iter()
                .filter(|a| a.should_archive())
                .cloned()
                .collect();
            if !aspects.is_empty() {
                slots.push(AspectSlotArchive { priority, aspects });
            }
        }
        Self {
            id: graphic.id(),
            shape: graphic.shape().clone(),
            frame: graphic.frame(),
            path: graphic.should_encode_path().then(|| graphic.path().to_svg()),
            aspects: slots,
            subgraphics: graphic.subgraphics().to_vec(),
            supergraphic: graphic.supergraphic(),
            related: graphic.related_graphics().iter().copied().collect(),
            autosize_subgraphics: graphic.autosize_subgraphics(),
            autoresizing_mask: graphic.autoresizing_mask(),
            seed: graphic.seed(),
            flatness: graphic.flatness(),
        }
    }

    /// Rebuild the graphic itself; cross-references are returned for the
    /// caller's resolution pass.
    fn into_graphic(self) -> (Graphic, PendingRefs) {
        let mut graphic = Graphic::new(self.shape, self.frame);
        if let Some(d) = &self.path {
            match BezPath::from_svg(d) {
                Ok(path) => graphic.set_path(path),
                Err(err) => {
                    tracing::warn!(id = %self.id, %err, "invalid archived path; using frame-derived path");
                }
            }
        }
        for slot in self.aspects {
            for aspect in slot.aspects {
                graphic.add_aspect_with_priority(aspect, slot.priority);
            }
        }
        graphic.set_autosize_subgraphics(self.autosize_subgraphics);
        graphic.set_autoresizing_mask(self.autoresizing_mask);
        graphic.set_seed(self.seed);
        graphic.set_flatness(self.flatness);
        let refs = PendingRefs {
            id: self.id,
            subgraphics: self.subgraphics,
            supergraphic: self.supergraphic,
            related: self.related,
        };
        (graphic, refs)
    }
}

struct PendingRefs {
    id: GraphicId,
    subgraphics: Vec<GraphicId>,
    supergraphic: Option<GraphicId>,
    related: Vec<GraphicId>,
}

impl Document {
    pub fn to_archive(&self) -> DocumentArchive {
        let pages = self
            .pages()
            .iter()
            .map(|page| PageArchive {
                id: page.id(),
                paper_color: page.paper_color,
                paper_size: page.paper_size,
                layers: page
                    .layer_buckets()
                    .filter(|(_, ids)| !ids.is_empty())
                    .map(|(name, ids)| PageLayerArchive {
                        layer: name.to_string(),
                        graphics: ids.to_vec(),
                    })
                    .collect(),
            })
            .collect();
        let graphics = self
            .arena()
            .iter()
            .map(|(_, g)| GraphicArchive::from_graphic(g))
            .collect();
        DocumentArchive {
            version: ARCHIVE_VERSION,
            settings: self.settings.clone(),
            copy_delta: self.copy_delta,
            copy_offset: self.copy_offset,
            active_layer: self.active_layer().map(String::from),
            layers: self.layers().to_vec(),
            pages,
            graphics,
            selection: self.selection().iter().copied().collect(),
            focused_group: self.focused_group(),
        }
    }

    /// Rebuild a document from its archive.
    ///
    /// Loads all objects first, then resolves the cross-reference graph:
    /// dangling subgraphic/supergraphic/related/link/selection references
    /// are warned about and dropped, never fatal.
    #[tracing::instrument(skip(archive))]
    pub fn from_archive(archive: DocumentArchive) -> EaselResult<Document> {
        if archive.version == 0 || archive.version > ARCHIVE_VERSION {
            return Err(EaselError::archive(format!(
                "unsupported document version {}",
                archive.version
            )));
        }

        let mut doc = Document::new();
        doc.settings = archive.settings;
        doc.copy_delta = archive.copy_delta;
        doc.copy_offset = archive.copy_offset;
        for layer in archive.layers {
            doc.push_layer_raw(layer);
        }

        // Pass 1: load every graphic into the arena.
        let mut pending = Vec::new();
        for graphic_archive in archive.graphics {
            let id = graphic_archive.id;
            let (graphic, refs) = graphic_archive.into_graphic();
            if let Err(err) = doc.arena_mut().insert_with_id(id, graphic) {
                tracing::warn!(%id, %err, "skipping duplicate graphic in archive");
                continue;
            }
            pending.push(refs);
        }

        // Pass 2: resolve forward references now that every object exists.
        let known: BTreeSet<GraphicId> = doc.arena().ids().collect();
        for refs in pending {
            let id = refs.id;
            for sub in refs.subgraphics {
                if known.contains(&sub) {
                    if let Some(g) = doc.arena_mut().get_mut(id) {
                        g.push_subgraphic_id(sub);
                    }
                } else {
                    tracing::warn!(%id, %sub, "dropping dangling subgraphic reference");
                }
            }
            match refs.supergraphic {
                Some(sup) if known.contains(&sup) => {
                    if let Some(g) = doc.arena_mut().get_mut(id) {
                        g.set_supergraphic(Some(sup));
                    }
                }
                Some(sup) => {
                    tracing::warn!(%id, %sup, "dropping dangling supergraphic reference");
                }
                None => {}
            }
            for related in refs.related {
                if known.contains(&related) {
                    if let Some(g) = doc.arena_mut().get_mut(id) {
                        g.insert_related_id(related);
                    }
                    if let Some(other) = doc.arena_mut().get_mut(related) {
                        other.insert_related_id(id);
                    }
                } else {
                    tracing::warn!(%id, %related, "dropping dangling related reference");
                }
            }
            let mut drop_ends = Vec::new();
            if let Some(g) = doc.arena_mut().get_mut(id)
                && let GraphicShape::Link {
                    source,
                    destination,
                } = g.shape_mut()
            {
                if let Some(s) = source
                    && !known.contains(s)
                {
                    drop_ends.push(("source", *s));
                    *source = None;
                }
                if let Some(d) = destination
                    && !known.contains(d)
                {
                    drop_ends.push(("destination", *d));
                    *destination = None;
                }
            }
            for (end, target) in drop_ends {
                tracing::warn!(%id, end, %target, "dropping dangling link endpoint");
            }
        }

        // Pages and their buckets.
        for page_archive in archive.pages {
            let page_id = page_archive.id;
            let mut page = Page::new(page_id);
            page.paper_color = page_archive.paper_color;
            page.paper_size = page_archive.paper_size;
            for bucket in page_archive.layers {
                if doc.layer(&bucket.layer).is_none() {
                    tracing::warn!(layer = %bucket.layer, "dropping bucket for unknown layer");
                    continue;
                }
                for gid in bucket.graphics {
                    if !known.contains(&gid) {
                        tracing::warn!(%gid, "dropping dangling page bucket reference");
                        continue;
                    }
                    page.insert_graphic(&bucket.layer, gid);
                    if let Some(g) = doc.arena_mut().get_mut(gid) {
                        g.set_page_and_layer(Some(page_id), Some(bucket.layer.clone()));
                    }
                }
            }
            doc.push_page_raw(page);
        }

        let active = archive
            .active_layer
            .filter(|name| doc.layer(name).is_some())
            .or_else(|| doc.layers().first().map(|l| l.name.clone()));
        doc.set_active_layer_raw(active);

        let selection: BTreeSet<GraphicId> = archive
            .selection
            .into_iter()
            .filter(|id| {
                let ok = known.contains(id);
                if !ok {
                    tracing::warn!(%id, "dropping dangling selection reference");
                }
                ok
            })
            .collect();
        doc.restore_selection(selection);

        match archive.focused_group {
            Some(id) if known.contains(&id) => doc.set_focused_group(Some(id)),
            Some(id) => tracing::warn!(%id, "dropping dangling focused group reference"),
            None => {}
        }

        Ok(doc)
    }

    pub fn to_json(&self) -> EaselResult<String> {
        serde_json::to_string_pretty(&self.to_archive())
            .map_err(|err| EaselError::archive(format!("encode failed: {err}")))
    }

    pub fn from_json(json: &str) -> EaselResult<Document> {
        let archive: DocumentArchive = serde_json::from_str(json)
            .map_err(|err| EaselError::archive(format!("decode failed: {err}")))?;
        Self::from_archive(archive)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/archive.rs"]
mod tests;
