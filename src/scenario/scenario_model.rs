use serde::{Deserialize, Serialize};

use crate::screen::screen_model::ScreenSnapshot;
use crate::screen::selector::{SelectorSource, synthesize_selectors};

/// A fixed interaction sequence. Written by hand or produced by the
/// generator, stored as YAML and replayed by `ScenarioRunner`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    /// Human-readable name for this scenario
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered list of steps to execute
    pub steps: Vec<ScenarioStep>,
}

/// A single step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Re-locate an element and click it
    Click { target: Target },

    /// Generic touch gesture at absolute coordinates
    Tap { x: i64, y: i64 },

    /// Platform back navigation
    Back,

    /// Let the screen settle
    Wait { duration_ms: u64 },

    /// Save a screenshot under the given name
    Screenshot { name: String },

    /// Take a full discovery snapshot and keep it on the result
    Capture,

    /// Evaluate assertions against the current screen
    Assert { assertions: Vec<Assertion> },
}

impl ScenarioStep {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioStep::Click { .. } => "click",
            ScenarioStep::Tap { .. } => "tap",
            ScenarioStep::Back => "back",
            ScenarioStep::Wait { .. } => "wait",
            ScenarioStep::Screenshot { .. } => "screenshot",
            ScenarioStep::Capture => "capture",
            ScenarioStep::Assert { .. } => "assert",
        }
    }
}

/// How a step finds the element it acts on.
///
/// Explicit selectors are tried first, then selectors synthesised from
/// identifier, text and label in that order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
}

impl Target {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn selectors(selectors: Vec<String>) -> Self {
        Self {
            selectors,
            ..Self::default()
        }
    }

    /// Every locator to try, in order, without repeats.
    pub fn locators(&self) -> Vec<String> {
        let source = SelectorSource {
            identifier: self.identifier.as_deref().unwrap_or(""),
            text: self.text.as_deref().unwrap_or(""),
            accessibility_label: self.label.as_deref().unwrap_or(""),
            ..SelectorSource::default()
        };

        let mut locators = self.selectors.clone();
        for synthesized in synthesize_selectors(&source) {
            if !locators.contains(&synthesized) {
                locators.push(synthesized);
            }
        }
        locators
    }

    pub fn describe(&self) -> String {
        self.text
            .as_deref()
            .or(self.label.as_deref())
            .or(self.identifier.as_deref())
            .or(self.selectors.first().map(String::as_str))
            .unwrap_or("<empty target>")
            .to_string()
    }
}

/// A single check against the current screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// Some displayed node shows exactly this text
    TextVisible { text: String },

    /// The locator matches a displayed node
    ElementVisible { selector: String },

    /// Current screen id contains the expected fragment
    ScreenIs { expected: String },

    /// The locator matches exactly this many nodes
    ElementCount { selector: String, expected: usize },
}

impl Assertion {
    pub fn type_name(&self) -> &'static str {
        match self {
            Assertion::TextVisible { .. } => "TextVisible",
            Assertion::ElementVisible { .. } => "ElementVisible",
            Assertion::ScreenIs { .. } => "ScreenIs",
            Assertion::ElementCount { .. } => "ElementCount",
        }
    }
}

/// Result of evaluating a single assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssertionResult {
    /// Step this assertion belongs to (0-indexed)
    pub step_index: usize,

    pub assertion: Assertion,
    pub passed: bool,

    /// Actual value found, for debugging failures
    pub actual: Option<String>,

    pub message: Option<String>,
}

/// Result of running one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,

    /// No step failed and every assertion passed
    pub passed: bool,

    /// Steps executed, including the failing one
    pub steps_run: usize,

    pub assertion_results: Vec<AssertionResult>,

    /// File names of screenshots written during the run
    #[serde(default)]
    pub screenshots: Vec<String>,

    /// Snapshots taken by `capture` steps
    #[serde(default)]
    pub snapshots: Vec<ScreenSnapshot>,

    /// Why the run stopped early, if it did
    pub error: Option<String>,

    pub duration_ms: u128,
}

impl ScenarioResult {
    pub fn failed_assertions(&self) -> impl Iterator<Item = &AssertionResult> {
        self.assertion_results.iter().filter(|r| !r.passed)
    }
}
