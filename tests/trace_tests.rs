use screen_discovery::trace::logger::InteractionLogger;
use screen_discovery::trace::trace::{InteractionEvent, InteractionKind};

#[test]
fn events_are_appended_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/interactions.jsonl");

    let log = InteractionLogger::new(&path);
    log.log(
        InteractionEvent::now(InteractionKind::Click)
            .on_screen(".MainActivity")
            .with_target("Dome")
            .with_selector("//*[@text=\"Dome\"]"),
    );
    log.log(InteractionEvent::now(InteractionKind::Back).failed("no window"));

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "click");
    assert_eq!(lines[0]["screen"], ".MainActivity");
    assert_eq!(lines[0]["target"], "Dome");
    assert_eq!(lines[0]["success"], true);
    assert_eq!(lines[1]["kind"], "back");
    assert_eq!(lines[1]["success"], false);
    assert_eq!(lines[1]["detail"], "no window");
}

#[test]
fn reopening_appends_instead_of_truncating() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interactions.jsonl");

    InteractionLogger::new(&path).log(InteractionEvent::now(InteractionKind::Capture));
    InteractionLogger::new(&path).log(InteractionEvent::now(InteractionKind::Capture));

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn in_memory_logger_keeps_events_in_order() {
    let log = InteractionLogger::in_memory();
    log.log(InteractionEvent::now(InteractionKind::Wait).with_detail("1500 ms"));
    log.log(InteractionEvent::now(InteractionKind::Screenshot).with_target("01_home"));

    let events = log.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, InteractionKind::Wait);
    assert_eq!(events[0].detail.as_deref(), Some("1500 ms"));
    assert_eq!(events[1].target.as_deref(), Some("01_home"));
    assert!(events.iter().all(|e| e.success && e.timestamp_ms > 0));
}

#[test]
fn unwritable_path_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened as a log file.
    let log = InteractionLogger::new(dir.path());
    log.log(InteractionEvent::now(InteractionKind::Tap));

    assert_eq!(log.events().len(), 1);
}
