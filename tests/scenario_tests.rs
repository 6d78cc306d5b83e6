use std::time::Duration;

use screen_discovery::scenario::runner::ScenarioRunner;
use screen_discovery::scenario::scenario_model::{Assertion, Scenario, ScenarioStep, Target};
use screen_discovery::session::mock::{MockInteraction, MockNode, MockSession};
use screen_discovery::trace::logger::InteractionLogger;
use screen_discovery::trace::trace::InteractionKind;

use crate::common::fixtures::{DOME_ACTIVITY, SPECIMEN_ACTIVITY, dome_app, specimen_app};

mod common;

fn scenario(steps: Vec<ScenarioStep>) -> Scenario {
    Scenario {
        name: "test".to_string(),
        description: None,
        steps,
    }
}

fn click(text: &str) -> ScenarioStep {
    ScenarioStep::Click {
        target: Target::text(text),
    }
}

fn assert_step(assertions: Vec<Assertion>) -> ScenarioStep {
    ScenarioStep::Assert { assertions }
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn steps_parse_from_tagged_yaml() {
    let yaml = r#"
name: Tagged
steps:
  - action: click
    target:
      label: Menu
  - action: tap
    x: 10
    y: 20
  - action: back
  - action: wait
    duration_ms: 500
  - action: screenshot
    name: after
  - action: capture
  - action: assert
    assertions:
      - type: text_visible
        text: Hello
      - type: element_visible
        selector: "~Menu"
      - type: screen_is
        expected: .MainActivity
      - type: element_count
        selector: //android.widget.Button
        expected: 3
"#;
    let parsed: Scenario = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(parsed.description, None);
    assert_eq!(
        parsed.steps,
        vec![
            ScenarioStep::Click {
                target: Target::label("Menu")
            },
            ScenarioStep::Tap { x: 10, y: 20 },
            ScenarioStep::Back,
            ScenarioStep::Wait { duration_ms: 500 },
            ScenarioStep::Screenshot {
                name: "after".to_string()
            },
            ScenarioStep::Capture,
            assert_step(vec![
                Assertion::TextVisible {
                    text: "Hello".to_string()
                },
                Assertion::ElementVisible {
                    selector: "~Menu".to_string()
                },
                Assertion::ScreenIs {
                    expected: ".MainActivity".to_string()
                },
                Assertion::ElementCount {
                    selector: "//android.widget.Button".to_string(),
                    expected: 3
                },
            ]),
        ]
    );
}

#[test]
fn unknown_action_is_rejected() {
    let yaml = "name: Bad\nsteps:\n  - action: swipe\n";
    assert!(serde_yaml::from_str::<Scenario>(yaml).is_err());
}

#[test]
fn target_locators_put_explicit_selectors_first() {
    let target = Target {
        text: Some("Go".to_string()),
        selectors: vec!["//*[@text=\"Go\"]".to_string(), "~go".to_string()],
        ..Target::default()
    };

    assert_eq!(
        target.locators(),
        vec![
            "//*[@text=\"Go\"]",
            "~go",
            "android=new UiSelector().text(\"Go\")",
        ]
    );
    assert_eq!(target.describe(), "Go");
    assert_eq!(Target::default().describe(), "<empty target>");
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn walkthrough_scenario_passes_on_specimen_app() {
    let yaml = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/scenarios/specimen_walkthrough.yaml"
    ))
    .unwrap();
    let walkthrough: Scenario = serde_yaml::from_str(&yaml).unwrap();

    let mut session = specimen_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(&walkthrough, &mut session);

    assert!(result.passed, "error: {:?}", result.error);
    assert_eq!(result.steps_run, walkthrough.steps.len());
    assert_eq!(result.assertion_results.len(), 1);
    assert_eq!(result.snapshots.len(), 1);
    assert_eq!(result.snapshots[0].screen_id, ".MoistureActivity");
    assert_eq!(
        session.clicked_texts(),
        vec!["Specimen", "Dome", "Harvesting", "Media Moisture"]
    );
    // No screenshot directory: screenshots are taken but not saved.
    assert!(result.screenshots.is_empty());
}

#[test]
fn missing_target_stops_the_scenario() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![click("Nope"), click("Dome")]),
        &mut session,
    );

    assert!(!result.passed);
    assert_eq!(result.steps_run, 1);
    let error = result.error.unwrap();
    assert!(error.contains("Step 0 (click)"));
    assert!(error.contains("Nope"));
    assert!(session.clicked_texts().is_empty());
}

#[test]
fn hidden_target_is_not_clicked() {
    let mut session =
        MockSession::new().screen("home", ".Main", vec![MockNode::button("Ghost").hidden()]);
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(&scenario(vec![click("Ghost")]), &mut session);

    assert!(!result.passed);
    assert!(result.error.unwrap().contains("not displayed"));
    assert!(session.clicked_texts().is_empty());
}

#[test]
fn failed_assertion_stops_the_scenario() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![
            assert_step(vec![
                Assertion::TextVisible {
                    text: "Dome".to_string(),
                },
                Assertion::TextVisible {
                    text: "Harvesting".to_string(),
                },
            ]),
            click("Dome"),
        ]),
        &mut session,
    );

    assert!(!result.passed);
    assert_eq!(result.steps_run, 1);
    assert_eq!(result.assertion_results.len(), 2);
    assert!(result.assertion_results[0].passed);

    let failed: Vec<_> = result.failed_assertions().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].step_index, 0);
    assert_eq!(
        failed[0].message.as_deref(),
        Some("Text 'Harvesting' is not visible")
    );
    assert!(session.clicked_texts().is_empty());
}

#[test]
fn screen_and_count_assertions() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![
            click("Dome"),
            assert_step(vec![
                Assertion::ScreenIs {
                    expected: "Dome".to_string(),
                },
                Assertion::ElementCount {
                    selector: "//android.widget.Button".to_string(),
                    expected: 2,
                },
                Assertion::ElementVisible {
                    selector: "android=new UiSelector().text(\"Media Moisture\")".to_string(),
                },
            ]),
        ]),
        &mut session,
    );

    assert!(result.passed, "error: {:?}", result.error);
    assert_eq!(result.assertion_results[0].actual.as_deref(), Some(DOME_ACTIVITY));
    assert_eq!(result.assertion_results[1].actual.as_deref(), Some("2"));
}

#[test]
fn invalid_selector_fails_the_assertion_not_the_session() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![assert_step(vec![Assertion::ElementVisible {
            selector: "css=.button".to_string(),
        }])]),
        &mut session,
    );

    assert!(!result.passed);
    let outcome = &result.assertion_results[0];
    assert!(!outcome.passed);
    assert!(outcome.message.as_deref().unwrap().starts_with("Could not evaluate"));
}

#[test]
fn tap_back_and_wait_reach_the_session() {
    let mut session = specimen_app();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![
            ScenarioStep::Tap { x: 10, y: 320 },
            ScenarioStep::Wait { duration_ms: 200 },
            assert_step(vec![Assertion::ScreenIs {
                expected: SPECIMEN_ACTIVITY.to_string(),
            }]),
            ScenarioStep::Back,
        ]),
        &mut session,
    );

    assert!(result.passed, "error: {:?}", result.error);
    assert_eq!(
        session.interactions,
        vec![
            MockInteraction::Tap { x: 10, y: 320 },
            MockInteraction::Wait(Duration::from_millis(200)),
            MockInteraction::Back,
        ]
    );
    assert_eq!(session.current_screen(), Some("home"));
}

#[test]
fn screenshots_are_written_under_slugged_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    let runner = ScenarioRunner::new(&log).with_screenshot_dir(dir.path().join("shots"));

    let result = runner.run(
        &scenario(vec![ScenarioStep::Screenshot {
            name: "01 App Opened".to_string(),
        }]),
        &mut session,
    );

    assert!(result.passed);
    assert_eq!(result.screenshots, vec!["01_app_opened.png"]);
    let bytes = std::fs::read(dir.path().join("shots/01_app_opened.png")).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
}

#[test]
fn screenshot_failure_fails_the_step() {
    let mut session = dome_app().failing_screenshot();
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![ScenarioStep::Screenshot {
            name: "x".to_string(),
        }]),
        &mut session,
    );

    assert!(!result.passed);
    assert!(result.error.unwrap().contains("screenshot"));
}

#[test]
fn session_loss_is_reported_on_the_step() {
    let mut session = dome_app().lose_session_on_click("Dome");
    let log = InteractionLogger::in_memory();
    let result = ScenarioRunner::new(&log).run(
        &scenario(vec![click("Dome"), ScenarioStep::Back]),
        &mut session,
    );

    assert!(!result.passed);
    assert_eq!(result.steps_run, 1);
    assert!(result.error.unwrap().contains("invalid session id"));
}

#[test]
fn interactions_are_logged_with_targets() {
    let mut session = dome_app();
    let log = InteractionLogger::in_memory();
    ScenarioRunner::new(&log).run(
        &scenario(vec![click("Dome"), ScenarioStep::Capture, ScenarioStep::Back]),
        &mut session,
    );

    let events = log.events();
    let kinds: Vec<InteractionKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![InteractionKind::Click, InteractionKind::Capture, InteractionKind::Back]
    );
    assert_eq!(events[0].target.as_deref(), Some("Dome"));
    assert!(events[0].selector.is_some());
    assert_eq!(events[1].screen.as_deref(), Some(DOME_ACTIVITY));
}
