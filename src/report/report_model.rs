use serde::{Deserialize, Serialize};

use crate::scenario::scenario_model::ScenarioResult;

// ============================================================================
// Suite report: aggregates ScenarioResult instances
// ============================================================================

/// Aggregated report for a batch of scenario runs.
///
/// Built via `from_results()`, consumed by the console, HTML, JUnit and
/// JSON renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite_name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Wall-clock duration of the whole suite in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub results: Vec<ScenarioResult>,
}

impl SuiteReport {
    /// Build a suite report, computing the pass/fail counts.
    pub fn from_results(suite_name: &str, results: Vec<ScenarioResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            suite_name: suite_name.to_string(),
            total,
            passed,
            failed: total - passed,
            duration_ms: None,
            results,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Output format for a suite report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Console,
    Html,
    Junit,
    Json,
}

impl ReportFormat {
    /// Parse a format name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "console" => Some(ReportFormat::Console),
            "html" => Some(ReportFormat::Html),
            "junit" | "xml" => Some(ReportFormat::Junit),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}
