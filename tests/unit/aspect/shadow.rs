use super::*;
use kurbo::{Rect, Vec2};

#[test]
fn defaults_match_the_soft_gray_drop() {
    let shadow = Shadow::default();
    assert!(shadow.active);
    assert_eq!(shadow.offset, Vec2::new(0.0, -4.0));
    assert_eq!(shadow.blur_radius, 10.0);
    assert!((shadow.color.a - 0.25).abs() < 1e-12);
}

#[test]
fn expanded_bounds_inflate_shift_and_union() {
    let shadow = Shadow {
        blur_radius: 10.0,
        offset: Vec2::new(0.0, -4.0),
        ..Shadow::default()
    };
    let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
    let expanded = shadow.expanded_bounds(bounds);
    // Inflate by blur + 2 = 12, shift by (0, -4), union with the original.
    assert_eq!(expanded, Rect::new(-12.0, -16.0, 112.0, 58.0));
}

#[test]
fn zero_blur_zero_offset_still_pads() {
    let shadow = Shadow {
        blur_radius: 0.0,
        offset: Vec2::ZERO,
        ..Shadow::default()
    };
    let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(shadow.expanded_bounds(bounds), Rect::new(-2.0, -2.0, 12.0, 12.0));
}
