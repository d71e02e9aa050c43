use super::*;

#[test]
fn value_is_clamped_to_unit_range() {
    let mut opacity = Opacity::new(1.5);
    assert_eq!(opacity.value(), 1.0);
    opacity.set_value(-0.5);
    assert_eq!(opacity.value(), 0.0);
    opacity.set_value(0.35);
    assert_eq!(opacity.value(), 0.35);
}

#[test]
fn default_is_fully_opaque_and_active() {
    let opacity = Opacity::default();
    assert!(opacity.active);
    assert_eq!(opacity.value(), 1.0);
}
