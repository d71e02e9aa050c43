use super::*;

#[test]
fn editing_flag_is_runtime_only() {
    let mut a = TextAspect::new("hello");
    let b = TextAspect::new("hello");
    assert!(a.begin_editing());
    assert!(a.is_editing());
    assert_eq!(a, b);
    a.end_editing();
    assert!(!a.is_editing());
}

#[test]
fn json_round_trip_drops_editing() {
    let mut aspect = TextAspect::new("Now is the time for all good men to die.");
    aspect.style.size = 18.0;
    aspect.begin_editing();
    let json = serde_json::to_string(&aspect).unwrap();
    let back: TextAspect = serde_json::from_str(&json).unwrap();
    assert_eq!(aspect, back);
    assert!(!back.is_editing());
}
