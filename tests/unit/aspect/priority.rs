use super::*;

#[test]
fn slots_are_ordered_back_to_front() {
    assert_eq!(AspectPriority::ALL.len(), AspectPriority::COUNT);
    assert_eq!(AspectPriority::ALL[0], AspectPriority::FIRST);
    assert_eq!(AspectPriority::ALL[AspectPriority::COUNT - 1], AspectPriority::LAST);
    for (index, priority) in AspectPriority::ALL.into_iter().enumerate() {
        assert_eq!(priority.index(), index);
    }
    assert!(AspectPriority::Background < AspectPriority::Foreground);
    assert!(AspectPriority::BeforeChildren < AspectPriority::Children);
}

#[test]
fn string_conversion_round_trips() {
    for priority in AspectPriority::ALL {
        assert_eq!(AspectPriority::from_str(priority.as_str()), Some(priority));
    }
    assert_eq!(AspectPriority::from_str("sideways"), None);
}

#[test]
fn serde_uses_the_kebab_names() {
    let json = serde_json::to_string(&AspectPriority::AfterBackground).unwrap();
    assert_eq!(json, "\"after-background\"");
    let back: AspectPriority = serde_json::from_str("\"before-foreground\"").unwrap();
    assert_eq!(back, AspectPriority::BeforeForeground);
}
