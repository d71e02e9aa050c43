use super::*;
use crate::foundation::color::Color;
use crate::foundation::geometry::WindingRule;

#[test]
fn defaults_are_an_active_white_nonzero_fill() {
    let fill = Fill::default();
    assert!(fill.active);
    assert_eq!(fill.color, Color::WHITE);
    assert_eq!(fill.winding_rule, WindingRule::NonZero);
}

#[test]
fn json_round_trip() {
    let fill = Fill {
        active: false,
        color: Color::rgba(0.2, 0.4, 0.6, 0.8),
        winding_rule: WindingRule::EvenOdd,
    };
    let json = serde_json::to_string(&fill).unwrap();
    let back: Fill = serde_json::from_str(&json).unwrap();
    assert_eq!(fill, back);
}
