use std::collections::BTreeMap;

use crate::foundation::error::{EaselError, EaselResult};
use crate::foundation::math::stable_hash64;
use crate::scene::graphic::Graphic;

/// Stable identity of a graphic within its document.
///
/// Every cross-graphic reference (sub/super links, related graphics,
/// selection, page buckets) is an id into the arena, never a second owner.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct GraphicId(pub u64);

impl std::fmt::Display for GraphicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Sole owner of every graphic in a document.
#[derive(Debug, Default)]
pub struct GraphicArena {
    graphics: BTreeMap<GraphicId, Graphic>,
    next_id: u64,
}

impl GraphicArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a graphic, assigning it a fresh id (and a derived random seed
    /// if it doesn't carry one yet). Returns the id.
    pub fn insert(&mut self, mut graphic: Graphic) -> GraphicId {
        self.next_id += 1;
        let id = GraphicId(self.next_id);
        graphic.assign_id(id);
        if graphic.seed() == 0 {
            graphic.set_seed(stable_hash64(id.0, "graphic"));
        }
        self.graphics.insert(id, graphic);
        id
    }

    /// Insert a graphic under an id chosen by the caller (archive restore).
    pub fn insert_with_id(&mut self, id: GraphicId, mut graphic: Graphic) -> EaselResult<()> {
        if self.graphics.contains_key(&id) {
            return Err(EaselError::structure(format!(
                "graphic id {id} is already in use"
            )));
        }
        graphic.assign_id(id);
        self.next_id = self.next_id.max(id.0);
        self.graphics.insert(id, graphic);
        Ok(())
    }

    pub fn remove(&mut self, id: GraphicId) -> Option<Graphic> {
        self.graphics.remove(&id)
    }

    pub fn get(&self, id: GraphicId) -> Option<&Graphic> {
        self.graphics.get(&id)
    }

    pub fn get_mut(&mut self, id: GraphicId) -> Option<&mut Graphic> {
        self.graphics.get_mut(&id)
    }

    pub fn contains(&self, id: GraphicId) -> bool {
        self.graphics.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = GraphicId> + '_ {
        self.graphics.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GraphicId, &Graphic)> {
        self.graphics.iter().map(|(id, g)| (*id, g))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (GraphicId, &mut Graphic)> {
        self.graphics.iter_mut().map(|(id, g)| (*id, g))
    }

    pub fn len(&self) -> usize {
        self.graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphics.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/arena.rs"]
mod tests;
