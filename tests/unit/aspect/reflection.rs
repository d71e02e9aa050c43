use super::*;
use kurbo::Rect;

#[test]
fn created_inactive_with_a_soft_fade() {
    let reflection = Reflection::default();
    assert!(!reflection.active);
    assert!(reflection.fade > 0.0 && reflection.fade < 1.0);
}

#[test]
fn expanded_bounds_grow_downward_by_a_full_copy() {
    let reflection = Reflection {
        gap: 2.0,
        ..Reflection::default()
    };
    let bounds = Rect::new(0.0, 0.0, 40.0, 30.0);
    let expanded = reflection.expanded_bounds(bounds);
    assert_eq!(expanded, Rect::new(0.0, 0.0, 40.0, 62.0));
}
