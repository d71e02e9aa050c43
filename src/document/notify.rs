use std::fmt;

use crate::scene::arena::GraphicId;

/// One observable mutation of the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    GraphicAdded(GraphicId),
    GraphicRemoved(GraphicId),
    GraphicChanged(GraphicId),
    SelectionChanged,
    LayersChanged,
    PagesChanged,
    SettingsChanged,
}

/// Token returned by [`ChangeNotifier::add_observer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

/// Observer callback; receives one or more coalesced changes per delivery.
pub type ChangeObserver = Box<dyn FnMut(&[Change])>;

/// Change broadcast with a depth-counted disable scope.
///
/// While disabled, changes buffer; re-enabling flushes exactly one delivery
/// carrying the net effect of the batch (an add that was also removed inside
/// the batch cancels out entirely).
pub struct ChangeNotifier {
    observers: Vec<(ObserverToken, ChangeObserver)>,
    next_token: u64,
    disabled_depth: u32,
    pending: Vec<Change>,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observers.len())
            .field("disabled_depth", &self.disabled_depth)
            .field("pending", &self.pending)
            .finish()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_token: 0,
            disabled_depth: 0,
            pending: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: ChangeObserver) -> ObserverToken {
        self.next_token += 1;
        let token = ObserverToken(self.next_token);
        self.observers.push((token, observer));
        token
    }

    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(t, _)| *t != token);
        before != self.observers.len()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_depth > 0
    }

    /// Start (or deepen) a buffering scope.
    pub fn disable(&mut self) {
        self.disabled_depth += 1;
    }

    /// Leave a buffering scope; the outermost exit flushes one consolidated
    /// delivery.
    pub fn enable(&mut self) {
        if self.disabled_depth == 0 {
            debug_assert!(false, "enable() without matching disable()");
            return;
        }
        self.disabled_depth -= 1;
        if self.disabled_depth == 0 && !self.pending.is_empty() {
            let changes = coalesce(std::mem::take(&mut self.pending));
            if !changes.is_empty() {
                self.deliver(&changes);
            }
        }
    }

    pub fn post(&mut self, change: Change) {
        if self.disabled_depth > 0 {
            self.pending.push(change);
        } else {
            self.deliver(&[change]);
        }
    }

    fn deliver(&mut self, changes: &[Change]) {
        for (_, observer) in &mut self.observers {
            observer(changes);
        }
    }
}

/// Reduce a buffered run of changes to its net effect, preserving
/// first-occurrence order.
pub(crate) fn coalesce(pending: Vec<Change>) -> Vec<Change> {
    use std::collections::BTreeMap;

    #[derive(Clone, Copy, PartialEq)]
    enum Net {
        Added,
        Removed,
        Changed,
        Cancelled,
    }

    let mut per_graphic: BTreeMap<GraphicId, Net> = BTreeMap::new();
    for change in &pending {
        let (id, incoming) = match change {
            Change::GraphicAdded(id) => (*id, Net::Added),
            Change::GraphicRemoved(id) => (*id, Net::Removed),
            Change::GraphicChanged(id) => (*id, Net::Changed),
            _ => continue,
        };
        let net = per_graphic.entry(id).or_insert(incoming);
        *net = match (*net, incoming) {
            // Added then removed inside the batch: never happened.
            (Net::Added, Net::Removed) => Net::Cancelled,
            (Net::Added, _) => Net::Added,
            (Net::Removed, Net::Added) => Net::Changed,
            (Net::Removed, _) => Net::Removed,
            (Net::Changed, Net::Removed) => Net::Removed,
            (Net::Changed, _) => Net::Changed,
            (Net::Cancelled, Net::Added) => Net::Added,
            (Net::Cancelled, _) => Net::Cancelled,
        };
    }

    let mut out = Vec::new();
    let mut emitted: std::collections::BTreeSet<GraphicId> = std::collections::BTreeSet::new();
    for change in &pending {
        match change {
            Change::GraphicAdded(id) | Change::GraphicRemoved(id) | Change::GraphicChanged(id) => {
                if emitted.insert(*id) {
                    match per_graphic.get(id) {
                        Some(Net::Added) => out.push(Change::GraphicAdded(*id)),
                        Some(Net::Removed) => out.push(Change::GraphicRemoved(*id)),
                        Some(Net::Changed) => out.push(Change::GraphicChanged(*id)),
                        Some(Net::Cancelled) | None => {}
                    }
                }
            }
            other => {
                if !out.contains(other) {
                    out.push(*other);
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/document/notify.rs"]
mod tests;
