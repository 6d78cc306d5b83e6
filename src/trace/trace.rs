use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of remote interaction recorded in the interaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Capture,
    Locate,
    Click,
    Tap,
    Back,
    Wait,
    Screenshot,
    Assert,
}

/// One line of the interaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub timestamp_ms: u128,
    pub kind: InteractionKind,

    /// Screen the interaction happened on
    pub screen: Option<String>,

    /// Human name of the element acted on
    pub target: Option<String>,

    /// Locator that resolved the target
    pub selector: Option<String>,

    pub success: bool,
    pub detail: Option<String>,
}

impl InteractionEvent {
    pub fn now(kind: InteractionKind) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            kind,
            screen: None,
            target: None,
            selector: None,
            success: true,
            detail: None,
        }
    }

    pub fn on_screen(mut self, screen: impl ToString) -> Self {
        self.screen = Some(screen.to_string());
        self
    }

    pub fn with_target(mut self, target: impl ToString) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_selector(mut self, selector: impl ToString) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn failed(mut self, reason: impl ToString) -> Self {
        self.success = false;
        self.detail = Some(reason.to_string());
        self
    }
}
