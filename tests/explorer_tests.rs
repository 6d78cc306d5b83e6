use std::time::Duration;

use screen_discovery::explorer::exploration::{ClickOutcome, ExplorationRun, Termination};
use screen_discovery::explorer::explorer::{explore, select_click_targets};
use screen_discovery::screen::screen_model::ElementKind;
use screen_discovery::session::mock::{MockInteraction, MockNode, MockSession};
use screen_discovery::trace::logger::InteractionLogger;
use screen_discovery::trace::trace::InteractionKind;

use crate::common::fixtures::{
    DOME_ACTIVITY, HOME_ACTIVITY, dome_app, many_buttons_app, quick_config, specimen_app,
};

mod common;

fn run(session: &mut MockSession, max_clicks: usize) -> ExplorationRun {
    explore(session, &quick_config(max_clicks), &InteractionLogger::in_memory()).unwrap()
}

// ============================================================================
// Basic traversal
// ============================================================================

#[test]
fn dome_click_reaches_harvest_menu() {
    let mut session = dome_app();
    let result = run(&mut session, 1);

    assert_eq!(result.visited_screens.len(), 2);
    assert_eq!(result.click_edges.len(), 1);

    let edge = &result.click_edges[0];
    assert_eq!(edge.from_screen_index, 0);
    assert_eq!(edge.to_screen_index, Some(1));
    assert_eq!(edge.outcome, ClickOutcome::Navigated);
    assert_eq!(edge.descriptor.text, "Dome");
    assert_eq!(edge.back_anomaly, None);

    let texts: Vec<&str> = result.visited_screens[1]
        .elements(ElementKind::Clickable)
        .iter()
        .map(|d| d.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Harvesting", "Media Moisture"]);
    assert_eq!(result.termination, Termination::Completed);
}

#[test]
fn click_count_is_bounded_by_max_clicks() {
    let mut session = many_buttons_app(50);
    let result = run(&mut session, 5);

    assert_eq!(result.click_edges.len(), 5);
    assert_eq!(result.visited_screens.len(), 6);
    assert_eq!(
        session.clicked_texts(),
        vec!["Item 1", "Item 2", "Item 3", "Item 4", "Item 5"]
    );
}

#[test]
fn zero_max_clicks_captures_only_the_start_screen() {
    let mut session = many_buttons_app(3);
    let result = run(&mut session, 0);

    assert_eq!(result.visited_screens.len(), 1);
    assert!(result.click_edges.is_empty());
    assert!(session.clicked_texts().is_empty());
}

#[test]
fn start_screen_is_captured_before_any_click() {
    let mut session = specimen_app();
    let result = run(&mut session, 5);

    assert_eq!(result.start_screen().screen_id, HOME_ACTIVITY);
    for edge in &result.click_edges {
        assert_eq!(edge.from_screen_index, 0);
        if let Some(to) = edge.to_screen_index {
            assert!(to > 0 && to < result.visited_screens.len());
        }
    }
}

#[test]
fn exploration_is_one_level_deep() {
    let mut session = specimen_app();
    let result = run(&mut session, 5);

    // Specimen and Settings are clicked from home; Dome on the Specimen screen never is.
    assert_eq!(session.clicked_texts(), vec!["Specimen", "Settings"]);
    assert_eq!(result.visited_screens.len(), 3);
    assert!(result.visited_screens.iter().all(|s| s.screen_id != DOME_ACTIVITY));
}

#[test]
fn back_and_settle_follow_every_navigation() {
    let mut session = dome_app();
    let mut config = quick_config(1);
    config.settle_ms = 250;
    explore(&mut session, &config, &InteractionLogger::in_memory()).unwrap();

    let kinds: Vec<&MockInteraction> = session.interactions.iter().collect();
    assert!(matches!(kinds[0], MockInteraction::Click { .. }));
    assert_eq!(kinds[1], &MockInteraction::Wait(Duration::from_millis(250)));
    assert_eq!(kinds[2], &MockInteraction::Back);
    assert_eq!(kinds[3], &MockInteraction::Wait(Duration::from_millis(250)));
    assert_eq!(session.current_screen(), Some("home"));
}

#[test]
fn unlabeled_clickables_are_not_clicked() {
    let mut session = MockSession::new()
        .screen(
            "home",
            ".Main",
            vec![
                MockNode::new("android.widget.ImageButton")
                    .clickable()
                    .resource_id("id/fab")
                    .navigates_to("other"),
                MockNode::button("Named").navigates_to("other"),
            ],
        )
        .screen("other", ".Other", vec![]);

    let result = run(&mut session, 5);
    assert_eq!(result.click_edges.len(), 1);
    assert_eq!(session.clicked_texts(), vec!["Named"]);
}

#[test]
fn icon_with_label_is_a_target() {
    let mut session = MockSession::new()
        .screen(
            "home",
            ".Main",
            vec![MockNode::new("android.widget.ImageButton")
                .clickable()
                .description("Menu")
                .navigates_to("menu")],
        )
        .screen("menu", ".Menu", vec![MockNode::label("Drawer")]);

    let result = run(&mut session, 5);
    assert_eq!(result.click_edges[0].outcome, ClickOutcome::Navigated);
    assert_eq!(
        result.click_edges[0].selector_used.as_deref(),
        Some("//*[@content-desc=\"Menu\"]")
    );
}

#[test]
fn select_click_targets_keeps_discovery_order() {
    let mut session = many_buttons_app(4);
    let result = run(&mut session, 0);

    let targets = select_click_targets(&result, 3);
    let texts: Vec<&str> = targets.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts, vec!["Item 1", "Item 2", "Item 3"]);
}

// ============================================================================
// Per-element failures
// ============================================================================

#[test]
fn click_without_navigation_is_unchanged() {
    let mut session = MockSession::new().screen(
        "home",
        ".Main",
        vec![MockNode::button("Toggle"), MockNode::button("Other")],
    );

    let result = run(&mut session, 5);

    assert_eq!(result.visited_screens.len(), 1);
    assert_eq!(result.click_edges.len(), 2);
    for edge in &result.click_edges {
        assert_eq!(edge.outcome, ClickOutcome::Unchanged);
        assert_eq!(edge.to_screen_index, None);
    }
    assert_eq!(session.back_count(), 0);
}

#[test]
fn element_that_cannot_be_relocated_is_not_found_and_run_continues() {
    let mut session = MockSession::new()
        .screen(
            "home",
            ".Main",
            vec![
                MockNode::button("Flaky").navigates_to("a"),
                MockNode::button("Stable").navigates_to("a"),
            ],
        )
        .screen("a", ".A", vec![MockNode::label("A")])
        .failing_query("Flaky");

    let result = run(&mut session, 5);

    // Discovery found Flaky through class queries, but its own selectors all fail.
    let outcomes: Vec<&ClickOutcome> = result.click_edges.iter().map(|e| &e.outcome).collect();
    assert_eq!(outcomes, vec![&ClickOutcome::NotFound, &ClickOutcome::Navigated]);
    assert_eq!(result.failed_edges().count(), 1);
    assert_eq!(result.termination, Termination::Completed);
}

#[test]
fn back_landing_elsewhere_is_recorded() {
    let mut session = dome_app().back_lands_on("dome");
    let result = run(&mut session, 1);

    let anomaly = result.click_edges[0].back_anomaly.as_ref().expect("anomaly recorded");
    assert_eq!(anomaly.expected_screen_id, HOME_ACTIVITY);
    assert_eq!(anomaly.actual_screen_id, DOME_ACTIVITY);
    assert_eq!(result.back_anomalies().count(), 1);
    assert_eq!(result.click_edges[0].outcome, ClickOutcome::Navigated);
}

#[test]
fn back_verification_can_be_disabled() {
    let mut session = dome_app().back_lands_on("dome");
    let mut config = quick_config(1);
    config.verify_back = false;

    let result = explore(&mut session, &config, &InteractionLogger::in_memory()).unwrap();
    assert_eq!(result.click_edges[0].back_anomaly, None);
}

// ============================================================================
// Session loss
// ============================================================================

#[test]
fn session_loss_aborts_with_partial_run() {
    let mut session = MockSession::new()
        .screen(
            "home",
            ".Main",
            vec![
                MockNode::button("First").navigates_to("a"),
                MockNode::button("Crash"),
                MockNode::button("Never"),
            ],
        )
        .screen("a", ".A", vec![MockNode::label("A")])
        .lose_session_on_click("Crash");

    let result = run(&mut session, 5);

    assert!(result.is_aborted());
    assert_eq!(result.visited_screens.len(), 2);
    assert_eq!(result.click_edges.len(), 2);
    assert_eq!(result.click_edges[0].outcome, ClickOutcome::Navigated);
    assert!(matches!(
        result.click_edges[1].outcome,
        ClickOutcome::SessionLost { .. }
    ));
    assert!(!session.clicked_texts().contains(&"Never".to_string()));
}

#[test]
fn session_loss_on_back_keeps_the_navigated_edge() {
    let mut session = dome_app().lose_session_on_back();

    let result = run(&mut session, 1);

    assert!(result.is_aborted());
    assert_eq!(result.visited_screens.len(), 2);
    assert_eq!(result.visited_screens[1].screen_id, DOME_ACTIVITY);
    assert_eq!(result.click_edges.len(), 1);

    let edge = &result.click_edges[0];
    assert_eq!(edge.outcome, ClickOutcome::Navigated);
    assert_eq!(edge.to_screen_index, Some(1));
    assert_eq!(edge.descriptor.text, "Dome");
    match &result.termination {
        Termination::Aborted { reason } => assert!(reason.contains("invalid session id")),
        other => panic!("unexpected termination: {:?}", other),
    }
}

#[test]
fn session_lost_before_start_capture_is_an_error() {
    let mut session = MockSession::new()
        .screen("home", ".Main", vec![MockNode::button("Crash")])
        .lose_session_on_click("Crash");
    // The first run kills the session; the second cannot capture its start screen.
    let first = run(&mut session, 1);
    assert!(first.is_aborted());

    let err = explore(&mut session, &quick_config(1), &InteractionLogger::in_memory()).unwrap_err();
    assert!(err.is_fatal());
}

// ============================================================================
// Interaction log and serialization
// ============================================================================

#[test]
fn every_remote_action_is_logged() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    explore(&mut session, &quick_config(1), &log).unwrap();

    let kinds: Vec<InteractionKind> = log.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InteractionKind::Capture,
            InteractionKind::Click,
            InteractionKind::Capture,
            InteractionKind::Back,
        ]
    );
}

#[test]
fn run_serializes_with_camel_case_fields() {
    let mut session = dome_app();
    let result = run(&mut session, 1);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["visitedScreens"].is_array());
    assert_eq!(json["clickEdges"][0]["toScreenIndex"], 1);
    assert_eq!(json["clickEdges"][0]["outcome"]["status"], "navigated");
    assert_eq!(json["visitedScreens"][0]["screenId"], HOME_ACTIVITY);
    assert!(json["visitedScreens"][0]["elementsByKind"]["clickable"].is_array());
    assert!(json["visitedScreens"][0]["elementsByKind"]["custom"].is_array());
    assert_eq!(json["termination"]["status"], "completed");

    let back: ExplorationRun = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}
