use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::scenario::scenario_model::{
    Assertion, AssertionResult, Scenario, ScenarioResult, ScenarioStep, Target,
};
use crate::screen::screen_model::ScreenSnapshot;
use crate::screen::selector::{LocateOutcome, try_locate, xpath_literal};
use crate::screen::snapshot::{DiscoveryConfig, capture_screen, file_slug};
use crate::session::driver::{AutomationSession, Locator};
use crate::session::error::SessionError;
use crate::trace::logger::InteractionLogger;
use crate::trace::trace::{InteractionEvent, InteractionKind};

/// Why a step stopped the scenario.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("no locator matched target '{0}'")]
    TargetNotFound(String),

    #[error("target '{0}' is not displayed")]
    TargetHidden(String),

    #[error("could not write screenshot '{path}': {source}")]
    ScreenshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} assertion(s) failed")]
    AssertionsFailed(usize),
}

/// Per-run mutable state.
#[derive(Debug, Default)]
struct RunState {
    assertion_results: Vec<AssertionResult>,
    screenshots: Vec<String>,
    snapshots: Vec<ScreenSnapshot>,
}

/// Executes a `Scenario` step by step against an automation session.
pub struct ScenarioRunner<'a> {
    discovery: DiscoveryConfig,
    screenshot_dir: Option<PathBuf>,
    log: &'a InteractionLogger,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(log: &'a InteractionLogger) -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            screenshot_dir: None,
            log,
        }
    }

    /// Options for snapshots taken by `capture` steps.
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Where `screenshot` steps write. Without a directory the screenshot
    /// is still taken but not saved.
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Run a scenario. Stops at the first failing step and records why.
    pub fn run(&self, scenario: &Scenario, session: &mut dyn AutomationSession) -> ScenarioResult {
        let started = Instant::now();
        let mut state = RunState::default();
        let mut error = None;
        let mut steps_run = 0;

        info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");

        for (i, step) in scenario.steps.iter().enumerate() {
            steps_run = i + 1;
            if let Err(e) = self.execute_step(step, i, session, &mut state) {
                warn!(scenario = %scenario.name, step = i, "step failed: {}", e);
                error = Some(format!("Step {} ({}) failed: {}", i, step.name(), e));
                break;
            }
        }

        let passed = error.is_none() && state.assertion_results.iter().all(|r| r.passed);
        ScenarioResult {
            scenario_name: scenario.name.clone(),
            passed,
            steps_run,
            assertion_results: state.assertion_results,
            screenshots: state.screenshots,
            snapshots: state.snapshots,
            error,
            duration_ms: started.elapsed().as_millis(),
        }
    }

    fn execute_step(
        &self,
        step: &ScenarioStep,
        step_index: usize,
        session: &mut dyn AutomationSession,
        state: &mut RunState,
    ) -> Result<(), StepError> {
        match step {
            ScenarioStep::Click { target } => self.click(target, session),

            ScenarioStep::Tap { x, y } => {
                let outcome = session.tap(*x, *y);
                self.log_result(
                    InteractionEvent::now(InteractionKind::Tap)
                        .with_detail(format!("({}, {})", x, y)),
                    &outcome,
                );
                Ok(outcome?)
            }

            ScenarioStep::Back => {
                let outcome = session.back();
                self.log_result(InteractionEvent::now(InteractionKind::Back), &outcome);
                Ok(outcome?)
            }

            ScenarioStep::Wait { duration_ms } => {
                session.wait(Duration::from_millis(*duration_ms));
                self.log.log(
                    InteractionEvent::now(InteractionKind::Wait)
                        .with_detail(format!("{} ms", duration_ms)),
                );
                Ok(())
            }

            ScenarioStep::Screenshot { name } => {
                if let Some(file) = self.screenshot(name, session)? {
                    state.screenshots.push(file);
                }
                Ok(())
            }

            ScenarioStep::Capture => {
                let snapshot = capture_screen(session, &self.discovery)?;
                self.log.log(
                    InteractionEvent::now(InteractionKind::Capture)
                        .on_screen(&snapshot.screen_id)
                        .with_detail(format!("{} elements", snapshot.element_count())),
                );
                state.snapshots.push(snapshot);
                Ok(())
            }

            ScenarioStep::Assert { assertions } => {
                let mut failures = 0;
                for assertion in assertions {
                    let result = self.evaluate(assertion, step_index, session)?;
                    if !result.passed {
                        failures += 1;
                    }
                    state.assertion_results.push(result);
                }
                if failures > 0 {
                    return Err(StepError::AssertionsFailed(failures));
                }
                Ok(())
            }
        }
    }

    fn click(&self, target: &Target, session: &mut dyn AutomationSession) -> Result<(), StepError> {
        let name = target.describe();

        let (element, selector) = match try_locate(session, &target.locators())? {
            LocateOutcome::Found { element, selector } => (element, selector),
            LocateOutcome::NotFound => {
                self.log.log(
                    InteractionEvent::now(InteractionKind::Locate)
                        .with_target(&name)
                        .failed("no selector matched"),
                );
                return Err(StepError::TargetNotFound(name));
            }
        };

        match session.is_displayed(&element) {
            Ok(true) => {}
            Ok(false) => return Err(StepError::TargetHidden(name)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            // Visibility could not be read; let the click decide.
            Err(_) => {}
        }

        let outcome = session.click(&element);
        self.log_result(
            InteractionEvent::now(InteractionKind::Click)
                .with_target(&name)
                .with_selector(&selector),
            &outcome,
        );
        Ok(outcome?)
    }

    fn screenshot(
        &self,
        name: &str,
        session: &mut dyn AutomationSession,
    ) -> Result<Option<String>, StepError> {
        let png = session.screenshot_png();
        self.log_result(
            InteractionEvent::now(InteractionKind::Screenshot).with_target(name),
            &png,
        );
        let png = png?;

        let Some(dir) = &self.screenshot_dir else {
            return Ok(None);
        };
        let file_name = format!("{}.png", file_slug(name));
        let path = dir.join(&file_name);
        write_file(&path, &png).map_err(|source| StepError::ScreenshotWrite {
            path: path.clone(),
            source,
        })?;
        Ok(Some(file_name))
    }

    /// Evaluate one assertion. Recoverable session errors fail the
    /// assertion; fatal ones stop the scenario.
    fn evaluate(
        &self,
        assertion: &Assertion,
        step_index: usize,
        session: &mut dyn AutomationSession,
    ) -> Result<AssertionResult, SessionError> {
        let checked = match assertion {
            Assertion::TextVisible { text } => {
                let locator = Locator::xpath(format!("//*[@text={}]", xpath_literal(text)));
                any_displayed(session, &locator).map(|visible| {
                    check(
                        visible,
                        Some(visible.to_string()),
                        format!("Text '{}' is not visible", text),
                    )
                })
            }

            Assertion::ElementVisible { selector } => match Locator::parse(selector) {
                Ok(locator) => any_displayed(session, &locator).map(|visible| {
                    check(
                        visible,
                        Some(visible.to_string()),
                        format!("Element '{}' is not visible", selector),
                    )
                }),
                Err(e) => Err(e),
            },

            Assertion::ScreenIs { expected } => session.current_screen_id().map(|id| {
                let passed = id.contains(expected.as_str());
                check(passed, Some(id), format!("Screen is not '{}'", expected))
            }),

            Assertion::ElementCount { selector, expected } => Locator::parse(selector)
                .and_then(|locator| session.find_elements(&locator))
                .map(|found| {
                    check(
                        found.len() == *expected,
                        Some(found.len().to_string()),
                        format!(
                            "Element '{}' count is {} but expected {}",
                            selector,
                            found.len(),
                            expected
                        ),
                    )
                }),
        };

        let (passed, actual, message) = match checked {
            Ok(result) => result,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => (false, None, Some(format!("Could not evaluate: {}", e))),
        };

        let event =
            InteractionEvent::now(InteractionKind::Assert).with_target(assertion.type_name());
        self.log.log(match &message {
            Some(m) if !passed => event.failed(m),
            _ => event,
        });

        Ok(AssertionResult {
            step_index,
            assertion: assertion.clone(),
            passed,
            actual,
            message,
        })
    }

    fn log_result<T>(&self, event: InteractionEvent, outcome: &Result<T, SessionError>) {
        match outcome {
            Ok(_) => self.log.log(event),
            Err(e) => self.log.log(event.failed(e)),
        }
    }
}

fn check(
    passed: bool,
    actual: Option<String>,
    failure: String,
) -> (bool, Option<String>, Option<String>) {
    let message = if passed { None } else { Some(failure) };
    (passed, actual, message)
}

/// Whether any node matched by `locator` is displayed.
fn any_displayed(
    session: &mut dyn AutomationSession,
    locator: &Locator,
) -> Result<bool, SessionError> {
    for element in session.find_elements(locator)? {
        match session.is_displayed(&element) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(false)
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}
