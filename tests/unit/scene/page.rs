use super::*;
use kurbo::Rect;

use crate::render::canvas::{CanvasOp, RecordingCanvas};

fn page() -> Page {
    Page::new(PageId(1))
}

#[test]
fn buckets_append_to_the_top_of_the_z_order() {
    let mut page = page();
    page.insert_graphic("ink", GraphicId(1));
    page.insert_graphic("ink", GraphicId(2));
    page.insert_graphic("guides", GraphicId(3));
    assert_eq!(page.graphics_for_layer("ink"), &[GraphicId(1), GraphicId(2)]);
    assert_eq!(page.graphics_for_layer("guides"), &[GraphicId(3)]);
    assert!(page.graphics_for_layer("missing").is_empty());
    assert!(page.contains_graphic("ink", GraphicId(2)));
}

#[test]
fn insert_at_clamps_and_preserves_neighbors() {
    let mut page = page();
    page.insert_graphic("ink", GraphicId(1));
    page.insert_graphic("ink", GraphicId(3));
    page.insert_graphic_at("ink", GraphicId(2), 1);
    page.insert_graphic_at("ink", GraphicId(4), 99);
    assert_eq!(
        page.graphics_for_layer("ink"),
        &[GraphicId(1), GraphicId(2), GraphicId(3), GraphicId(4)]
    );
}

#[test]
fn rename_re_keys_the_bucket_in_order() {
    let mut page = page();
    page.insert_graphic("old", GraphicId(1));
    page.insert_graphic("old", GraphicId(2));
    page.rename_layer_bucket("old", "new");
    assert!(page.graphics_for_layer("old").is_empty());
    assert_eq!(page.graphics_for_layer("new"), &[GraphicId(1), GraphicId(2)]);
}

#[test]
fn update_rect_coalesces_and_schedules_once() {
    let mut page = page();
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(50.0, 50.0, 60.0, 60.0);

    // First merge asks for a scheduled redraw; later ones ride along.
    assert!(page.merge_update_rect(a));
    assert!(!page.merge_update_rect(b));
    assert_eq!(page.update_rect(), Some(a.union(b)));

    assert_eq!(page.take_update_rect(), Some(a.union(b)));
    assert_eq!(page.take_update_rect(), None);
    // The guard resets once the host consumed the rect.
    assert!(page.merge_update_rect(a));
}

#[test]
fn will_change_capture_folds_the_pre_mutation_area() {
    let mut page = page();
    let before = Rect::new(0.0, 0.0, 10.0, 10.0);
    let after = Rect::new(100.0, 100.0, 110.0, 110.0);
    page.graphic_will_change(GraphicId(1), before);
    // The first capture wins while the mutation is in flight.
    page.graphic_will_change(GraphicId(1), Rect::new(3.0, 3.0, 4.0, 4.0));
    assert!(page.graphic_did_change(GraphicId(1), after));
    assert_eq!(page.update_rect(), Some(before.union(after)));
}

#[test]
fn guest_drawers_run_in_registration_order() {
    let mut page = page();
    let first = page.add_guest_drawer(Box::new(|canvas, _| canvas.push_opacity(0.25)));
    let _second = page.add_guest_drawer(Box::new(|canvas, _| canvas.push_opacity(0.75)));
    assert_eq!(page.guest_drawer_count(), 2);

    let mut canvas = RecordingCanvas::new();
    page.run_guest_drawers(&mut canvas, Rect::ZERO);
    assert_eq!(
        canvas.ops(),
        &[CanvasOp::PushOpacity(0.25), CanvasOp::PushOpacity(0.75)]
    );

    assert!(page.remove_guest_drawer(first));
    assert!(!page.remove_guest_drawer(first));
    assert_eq!(page.guest_drawer_count(), 1);
}
