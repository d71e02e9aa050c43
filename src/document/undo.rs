use std::fmt;

use crate::document::storage::Document;

/// Inverse operation captured alongside a mutation.
///
/// Actions replay through the document's public mutation entry points, so
/// dirty-region and notification bookkeeping stay correct during undo.
pub type UndoAction = Box<dyn FnOnce(&mut Document)>;

/// A named run of inverse actions undone as a unit.
pub struct UndoGroup {
    pub name: String,
    pub actions: Vec<UndoAction>,
}

impl fmt::Debug for UndoGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoGroup")
            .field("name", &self.name)
            .field("actions", &self.actions.len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Replay {
    Idle,
    Undoing,
    Redoing,
}

/// Inverse-action stacks with grouping, a disable scope, and replay-aware
/// routing: registrations made while undoing land on the redo stack and vice
/// versa.
pub struct UndoManager {
    undo_stack: Vec<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    open_group: Option<UndoGroup>,
    replay: Replay,
    replay_group: Option<UndoGroup>,
    disabled_depth: u32,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("undo_stack", &self.undo_stack)
            .field("redo_stack", &self.redo_stack)
            .field("open_group", &self.open_group)
            .field("replay", &self.replay)
            .field("disabled_depth", &self.disabled_depth)
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open_group: None,
            replay: Replay::Idle,
            replay_group: None,
            disabled_depth: 0,
        }
    }

    /// Register the inverse of a mutation that is about to happen (or just
    /// happened). Dropped silently inside a disabled scope.
    pub fn register(&mut self, name: &str, action: UndoAction) {
        if self.disabled_depth > 0 {
            return;
        }
        match self.replay {
            Replay::Idle => {
                // A fresh edit invalidates anything redoable.
                self.redo_stack.clear();
                match &mut self.open_group {
                    Some(group) => group.actions.push(action),
                    None => self.undo_stack.push(UndoGroup {
                        name: name.to_string(),
                        actions: vec![action],
                    }),
                }
            }
            Replay::Undoing | Replay::Redoing => {
                if let Some(group) = &mut self.replay_group {
                    group.actions.push(action);
                }
            }
        }
    }

    /// Open a named group; registrations until [`UndoManager::end_group`]
    /// undo as one step.
    pub fn begin_group(&mut self, name: &str) {
        if self.open_group.is_none() {
            self.open_group = Some(UndoGroup {
                name: name.to_string(),
                actions: Vec::new(),
            });
        }
    }

    pub fn end_group(&mut self) {
        if let Some(group) = self.open_group.take()
            && !group.actions.is_empty()
        {
            self.undo_stack.push(group);
        }
    }

    pub fn has_open_group(&self) -> bool {
        self.open_group.is_some()
    }

    /// Suppress registration until the matching [`UndoManager::enable`].
    pub fn disable(&mut self) {
        self.disabled_depth += 1;
    }

    pub fn enable(&mut self) {
        if self.disabled_depth == 0 {
            debug_assert!(false, "enable() without matching disable()");
            return;
        }
        self.disabled_depth -= 1;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_depth > 0
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.open_group.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Name of the group [`Document::undo`] would replay next.
    pub fn undo_name(&self) -> Option<&str> {
        self.undo_stack.last().map(|g| g.name.as_str())
    }

    pub fn redo_name(&self) -> Option<&str> {
        self.redo_stack.last().map(|g| g.name.as_str())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open_group = None;
        self.replay_group = None;
    }

    // MARK: replay plumbing (driven by Document::undo / Document::redo)

    pub(crate) fn take_undo_group(&mut self) -> Option<UndoGroup> {
        self.end_group();
        self.undo_stack.pop()
    }

    pub(crate) fn take_redo_group(&mut self) -> Option<UndoGroup> {
        self.redo_stack.pop()
    }

    pub(crate) fn begin_replay_undo(&mut self, name: String) {
        self.replay = Replay::Undoing;
        self.replay_group = Some(UndoGroup {
            name,
            actions: Vec::new(),
        });
    }

    pub(crate) fn begin_replay_redo(&mut self, name: String) {
        self.replay = Replay::Redoing;
        self.replay_group = Some(UndoGroup {
            name,
            actions: Vec::new(),
        });
    }

    pub(crate) fn finish_replay(&mut self) {
        let group = self.replay_group.take();
        match self.replay {
            Replay::Undoing => {
                if let Some(group) = group
                    && !group.actions.is_empty()
                {
                    self.redo_stack.push(group);
                }
            }
            Replay::Redoing => {
                if let Some(group) = group
                    && !group.actions.is_empty()
                {
                    self.undo_stack.push(group);
                }
            }
            Replay::Idle => {}
        }
        self.replay = Replay::Idle;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/undo.rs"]
mod tests;
