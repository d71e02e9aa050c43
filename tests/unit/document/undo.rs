use super::*;

#[test]
fn registrations_form_single_action_groups_by_default() {
    let mut undo = UndoManager::new();
    assert!(!undo.can_undo());
    undo.register("First", Box::new(|_| {}));
    undo.register("Second", Box::new(|_| {}));
    assert!(undo.can_undo());
    assert_eq!(undo.undo_name(), Some("Second"));

    let group = undo.take_undo_group().unwrap();
    assert_eq!(group.name, "Second");
    assert_eq!(group.actions.len(), 1);
}

#[test]
fn open_groups_collect_registrations() {
    let mut undo = UndoManager::new();
    undo.begin_group("Drag");
    undo.register("ignored", Box::new(|_| {}));
    undo.register("ignored", Box::new(|_| {}));
    undo.end_group();

    let group = undo.take_undo_group().unwrap();
    assert_eq!(group.name, "Drag");
    assert_eq!(group.actions.len(), 2);
}

#[test]
fn empty_groups_are_discarded() {
    let mut undo = UndoManager::new();
    undo.begin_group("Nothing");
    undo.end_group();
    assert!(!undo.can_undo());
}

#[test]
fn disabled_scopes_drop_registrations() {
    let mut undo = UndoManager::new();
    undo.disable();
    assert!(undo.is_disabled());
    undo.register("Hidden", Box::new(|_| {}));
    undo.enable();
    assert!(!undo.is_disabled());
    assert!(!undo.can_undo());
}

#[test]
fn fresh_edits_clear_the_redo_stack() {
    let mut undo = UndoManager::new();
    undo.register("Edit", Box::new(|_| {}));
    let group = undo.take_undo_group().unwrap();

    // Simulate an undo replay registering the redo.
    undo.begin_replay_undo(group.name.clone());
    undo.register("Edit", Box::new(|_| {}));
    undo.finish_replay();
    assert!(undo.can_redo());
    assert_eq!(undo.redo_name(), Some("Edit"));

    undo.register("New Edit", Box::new(|_| {}));
    assert!(!undo.can_redo());
}

#[test]
fn clear_empties_everything() {
    let mut undo = UndoManager::new();
    undo.register("Edit", Box::new(|_| {}));
    undo.clear();
    assert!(!undo.can_undo());
    assert!(!undo.can_redo());
}
