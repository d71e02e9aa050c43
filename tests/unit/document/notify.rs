use super::*;
use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::arena::GraphicId;

fn recording_notifier() -> (ChangeNotifier, Rc<RefCell<Vec<Vec<Change>>>>) {
    let mut notifier = ChangeNotifier::new();
    let deliveries: Rc<RefCell<Vec<Vec<Change>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = deliveries.clone();
    notifier.add_observer(Box::new(move |changes| {
        sink.borrow_mut().push(changes.to_vec());
    }));
    (notifier, deliveries)
}

#[test]
fn posts_deliver_immediately_when_enabled() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.post(Change::GraphicAdded(GraphicId(1)));
    notifier.post(Change::SelectionChanged);
    assert_eq!(deliveries.borrow().len(), 2);
}

#[test]
fn batch_flushes_one_consolidated_delivery() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.disable();
    notifier.post(Change::GraphicRemoved(GraphicId(1)));
    notifier.post(Change::GraphicRemoved(GraphicId(2)));
    notifier.post(Change::GraphicRemoved(GraphicId(3)));
    notifier.post(Change::GraphicAdded(GraphicId(4)));
    notifier.post(Change::GraphicAdded(GraphicId(5)));
    assert!(deliveries.borrow().is_empty());
    notifier.enable();

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(
        deliveries[0],
        vec![
            Change::GraphicRemoved(GraphicId(1)),
            Change::GraphicRemoved(GraphicId(2)),
            Change::GraphicRemoved(GraphicId(3)),
            Change::GraphicAdded(GraphicId(4)),
            Change::GraphicAdded(GraphicId(5)),
        ]
    );
}

#[test]
fn add_then_remove_cancels_out() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.disable();
    notifier.post(Change::GraphicAdded(GraphicId(1)));
    notifier.post(Change::GraphicChanged(GraphicId(1)));
    notifier.post(Change::GraphicRemoved(GraphicId(1)));
    notifier.post(Change::SelectionChanged);
    notifier.enable();

    let deliveries = deliveries.borrow();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0], vec![Change::SelectionChanged]);
}

#[test]
fn repeated_changes_collapse() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.disable();
    notifier.post(Change::GraphicChanged(GraphicId(9)));
    notifier.post(Change::GraphicChanged(GraphicId(9)));
    notifier.post(Change::LayersChanged);
    notifier.post(Change::LayersChanged);
    notifier.enable();

    let deliveries = deliveries.borrow();
    assert_eq!(
        deliveries[0],
        vec![Change::GraphicChanged(GraphicId(9)), Change::LayersChanged]
    );
}

#[test]
fn nested_disable_flushes_at_the_outermost_exit() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.disable();
    notifier.disable();
    notifier.post(Change::PagesChanged);
    notifier.enable();
    assert!(deliveries.borrow().is_empty());
    notifier.enable();
    assert_eq!(deliveries.borrow().len(), 1);
}

#[test]
fn empty_batches_stay_silent() {
    let (mut notifier, deliveries) = recording_notifier();
    notifier.disable();
    notifier.enable();
    assert!(deliveries.borrow().is_empty());
}

#[test]
fn removed_observers_stop_receiving() {
    let mut notifier = ChangeNotifier::new();
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let token = notifier.add_observer(Box::new(move |_| {
        *sink.borrow_mut() += 1;
    }));
    notifier.post(Change::SelectionChanged);
    assert!(notifier.remove_observer(token));
    notifier.post(Change::SelectionChanged);
    assert_eq!(*count.borrow(), 1);
    assert!(!notifier.remove_observer(token));
}

#[test]
fn coalesce_keeps_net_effect_of_remove_then_add() {
    let out = coalesce(vec![
        Change::GraphicRemoved(GraphicId(1)),
        Change::GraphicAdded(GraphicId(1)),
    ]);
    assert_eq!(out, vec![Change::GraphicChanged(GraphicId(1))]);
}
