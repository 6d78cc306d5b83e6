use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::screen::screen_model::{ElementDescriptor, ScreenSnapshot};
use crate::screen::snapshot::DiscoveryConfig;

// ============================================================================
// Explorer configuration
// ============================================================================

/// Configuration for a shallow exploration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Maximum number of start-screen elements to click (default 5)
    pub max_clicks: usize,

    /// Wait after each click and each back navigation, in ms (default 1500)
    pub settle_ms: u64,

    /// Check that back navigation returns to the start screen (default true)
    pub verify_back: bool,

    /// Options for every snapshot taken during the run
    pub discovery: DiscoveryConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_clicks: 5,
            settle_ms: 1500,
            verify_back: true,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl ExplorerConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ============================================================================
// Exploration run data model
// ============================================================================

/// What happened when one descriptor was clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Click led to a screen that differs from the origin
    Navigated,

    /// Same screen id and same structure after the click (toggle, no-op)
    Unchanged,

    /// None of the descriptor's selectors matched a live node
    NotFound,

    /// A node matched but is not on screen
    NotVisible,

    /// The click itself was rejected
    ClickFailed { error: String },

    /// The session died during this step; exploration stopped here
    SessionLost { error: String },
}

impl ClickOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, ClickOutcome::Navigated | ClickOutcome::Unchanged)
    }
}

/// Back navigation did not return to the origin screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackAnomaly {
    pub expected_screen_id: String,
    pub actual_screen_id: String,
}

/// One attempted click, linking the origin screen to what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEdge {
    pub from_screen_index: usize,
    pub descriptor: ElementDescriptor,

    /// Index of the snapshot the click produced; `None` when it produced
    /// no new screen or the attempt failed
    pub to_screen_index: Option<usize>,

    pub outcome: ClickOutcome,

    /// Selector that re-located the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector_used: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_anomaly: Option<BackAnomaly>,
}

impl ClickEdge {
    pub fn failed(
        from_screen_index: usize,
        descriptor: ElementDescriptor,
        outcome: ClickOutcome,
    ) -> Self {
        Self {
            from_screen_index,
            descriptor,
            to_screen_index: None,
            outcome,
            selector_used: None,
            back_anomaly: None,
        }
    }
}

/// How the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Aborted { reason: String },
}

/// Record of one shallow navigation traversal.
///
/// `visited_screens[0]` is the start screen, captured before any click.
/// Every edge's `from_screen_index` refers to an already-captured snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorationRun {
    pub visited_screens: Vec<ScreenSnapshot>,
    pub click_edges: Vec<ClickEdge>,
    pub termination: Termination,
}

impl ExplorationRun {
    /// Start a run from its already-captured start screen.
    pub fn new(start: ScreenSnapshot) -> Self {
        Self {
            visited_screens: vec![start],
            click_edges: Vec::new(),
            termination: Termination::Completed,
        }
    }

    pub fn start_screen(&self) -> &ScreenSnapshot {
        &self.visited_screens[0]
    }

    /// Append a snapshot and return its index.
    pub fn add_screen(&mut self, snapshot: ScreenSnapshot) -> usize {
        self.visited_screens.push(snapshot);
        self.visited_screens.len() - 1
    }

    pub fn add_edge(&mut self, edge: ClickEdge) {
        self.click_edges.push(edge);
    }

    pub fn screen_count(&self) -> usize {
        self.visited_screens.len()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.termination, Termination::Aborted { .. })
    }

    pub fn failed_edges(&self) -> impl Iterator<Item = &ClickEdge> {
        self.click_edges.iter().filter(|e| e.outcome.is_failure())
    }

    pub fn back_anomalies(&self) -> impl Iterator<Item = (&ClickEdge, &BackAnomaly)> {
        self.click_edges
            .iter()
            .filter_map(|e| e.back_anomaly.as_ref().map(|a| (e, a)))
    }
}
