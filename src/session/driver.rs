use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::screen::screen_model::Bounds;
use crate::session::error::SessionError;

// ============================================================================
// AutomationSession trait: the remote device-automation surface
// ============================================================================

/// Capability surface of a live device-automation session.
///
/// Everything above this trait (discovery, exploration, scenarios) is
/// written against it, so the same code drives a real Appium server or a
/// scripted `MockSession`. Calls are strictly sequential; one caller owns
/// the session for its whole lifetime.
pub trait AutomationSession {
    /// Find all live nodes matching a locator. An empty result is not an error.
    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError>;

    /// Read a named attribute. `Ok(None)` when the node has no such attribute.
    fn attribute(&mut self, element: &ElementRef, name: &str)
    -> Result<Option<String>, SessionError>;

    /// Visible text of a node.
    fn text(&mut self, element: &ElementRef) -> Result<String, SessionError>;

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, SessionError>;

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, SessionError>;

    /// On-screen rectangle of a node.
    fn rect(&mut self, element: &ElementRef) -> Result<Bounds, SessionError>;

    fn click(&mut self, element: &ElementRef) -> Result<(), SessionError>;

    /// Single-finger tap at absolute screen coordinates.
    fn tap(&mut self, x: i64, y: i64) -> Result<(), SessionError>;

    /// Platform "navigate back".
    fn back(&mut self) -> Result<(), SessionError>;

    /// Capture the screen as PNG bytes.
    fn screenshot_png(&mut self) -> Result<Vec<u8>, SessionError>;

    /// Raw UI hierarchy dump.
    fn page_source(&mut self) -> Result<String, SessionError>;

    /// Opaque identifier of the currently loaded screen (Android activity).
    fn current_screen_id(&mut self) -> Result<String, SessionError>;

    /// Settle interval: a plain wait, used where the UI exposes no
    /// "transition complete" signal.
    fn wait(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Release the remote session. Must be safe to call more than once.
    fn quit(&mut self) -> Result<(), SessionError>;
}

// ============================================================================
// Element references
// ============================================================================

/// Opaque handle to a live node, valid only while the node is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        ElementRef(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Locators
// ============================================================================

/// Prefix of provider-native selector-builder locators.
pub const UI_AUTOMATOR_PREFIX: &str = "android=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// Structural path expression over the UI hierarchy
    XPath,
    /// `new UiSelector()...` builder expression
    UiAutomator,
    /// Content description
    AccessibilityId,
    /// Resource identifier
    Id,
}

impl LocatorStrategy {
    /// Strategy name as sent in a W3C `find elements` request.
    pub fn w3c_name(&self) -> &'static str {
        match self {
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::UiAutomator => "-android uiautomator",
            LocatorStrategy::AccessibilityId => "accessibility id",
            LocatorStrategy::Id => "id",
        }
    }
}

/// A parsed locator string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator {
            strategy: LocatorStrategy::XPath,
            value: value.into(),
        }
    }

    pub fn ui_automator(value: impl Into<String>) -> Self {
        Locator {
            strategy: LocatorStrategy::UiAutomator,
            value: value.into(),
        }
    }

    /// Parse a locator string.
    ///
    /// - `//...` or `(//...)[n]` is a structural path
    /// - `android=new UiSelector()...` is a selector-builder expression
    /// - `~label` is an accessibility id
    /// - `id=...` is a resource id
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let s = raw.trim();

        if let Some(rest) = s.strip_prefix(UI_AUTOMATOR_PREFIX) {
            if rest.is_empty() {
                return Err(SessionError::InvalidLocator(raw.to_string()));
            }
            return Ok(Locator::ui_automator(rest));
        }

        if let Some(rest) = s.strip_prefix('~') {
            if rest.is_empty() {
                return Err(SessionError::InvalidLocator(raw.to_string()));
            }
            return Ok(Locator {
                strategy: LocatorStrategy::AccessibilityId,
                value: rest.to_string(),
            });
        }

        if let Some(rest) = s.strip_prefix("id=") {
            if rest.is_empty() {
                return Err(SessionError::InvalidLocator(raw.to_string()));
            }
            return Ok(Locator {
                strategy: LocatorStrategy::Id,
                value: rest.to_string(),
            });
        }

        if s.starts_with("//") || s.starts_with("(//") {
            return Ok(Locator::xpath(s));
        }

        Err(SessionError::InvalidLocator(raw.to_string()))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            LocatorStrategy::XPath => write!(f, "{}", self.value),
            LocatorStrategy::UiAutomator => write!(f, "{}{}", UI_AUTOMATOR_PREFIX, self.value),
            LocatorStrategy::AccessibilityId => write!(f, "~{}", self.value),
            LocatorStrategy::Id => write!(f, "id={}", self.value),
        }
    }
}
