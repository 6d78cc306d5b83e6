use tracing::debug;

use crate::screen::screen_model::{ElementDescriptor, ElementKind};
use crate::session::driver::{AutomationSession, ElementRef, Locator, UI_AUTOMATOR_PREFIX};
use crate::session::error::SessionError;

// ============================================================================
// Selector synthesis
// ============================================================================

/// Identifying attributes a selector can be built from.
///
/// Borrowed from a descriptor (or a scenario target) so synthesis runs
/// before the descriptor itself is assembled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorSource<'a> {
    pub kind: Option<ElementKind>,
    pub identifier: &'a str,
    pub text: &'a str,
    pub accessibility_label: &'a str,
    pub class_name: &'a str,

    /// 1-based position among same-class siblings, for the input fallback
    pub position: Option<usize>,
}

impl<'a> SelectorSource<'a> {
    pub fn from_descriptor(descriptor: &'a ElementDescriptor, position: Option<usize>) -> Self {
        Self {
            kind: Some(descriptor.kind),
            identifier: &descriptor.identifier,
            text: &descriptor.text,
            accessibility_label: &descriptor.accessibility_label,
            class_name: &descriptor.class_name,
            position,
        }
    }
}

/// Produce locator strings for a node, most stable first.
///
/// Tiers: resource id, exact text, accessibility label, then (inputs only,
/// when none of the above exist and the class is known) a positional
/// fallback. Each tier emits a structural-path locator followed by the
/// equivalent `UiSelector` form. Tiers whose attribute is empty after
/// trimming are skipped.
pub fn synthesize_selectors(source: &SelectorSource<'_>) -> Vec<String> {
    let mut selectors = Vec::new();

    let identifier = source.identifier.trim();
    if !identifier.is_empty() {
        selectors.push(format!("//*[@resource-id={}]", xpath_literal(identifier)));
        selectors.push(format!(
            "{}new UiSelector().resourceId({})",
            UI_AUTOMATOR_PREFIX,
            java_literal(identifier)
        ));
    }

    let text = source.text.trim();
    if !text.is_empty() {
        selectors.push(format!("//*[@text={}]", xpath_literal(text)));
        selectors.push(format!(
            "{}new UiSelector().text({})",
            UI_AUTOMATOR_PREFIX,
            java_literal(text)
        ));
    }

    let label = source.accessibility_label.trim();
    if !label.is_empty() {
        selectors.push(format!("//*[@content-desc={}]", xpath_literal(label)));
        selectors.push(format!(
            "{}new UiSelector().description({})",
            UI_AUTOMATOR_PREFIX,
            java_literal(label)
        ));
    }

    // The position indexes the query that found the node, so it is only
    // meaningful together with the node's own class.
    let class = source.class_name.trim();
    if selectors.is_empty() && source.kind == Some(ElementKind::Input) && !class.is_empty() {
        if let Some(position) = source.position.filter(|p| *p > 0) {
            selectors.push(format!("(//{})[{}]", class, position));
            selectors.push(format!(
                "{}new UiSelector().className({}).instance({})",
                UI_AUTOMATOR_PREFIX,
                java_literal(class),
                position - 1
            ));
        }
    }

    selectors
}

/// Quote a value as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so values containing both quote kinds
/// are split and joined with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value
            .split('"')
            .map(|part| format!("\"{}\"", part))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Quote a value as a Java string literal for `UiSelector` expressions.
pub fn java_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

// ============================================================================
// Re-location
// ============================================================================

/// Result of trying a descriptor's selectors against the live screen.
#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome {
    /// First selector (in order) that matched, and the first node it matched
    Found { element: ElementRef, selector: String },
    NotFound,
}

/// Try selectors in order, stopping at the first that matches anything.
///
/// Invalid or failing selectors are skipped. Only a fatal session error
/// stops the search early.
pub fn try_locate(
    session: &mut dyn AutomationSession,
    selectors: &[String],
) -> Result<LocateOutcome, SessionError> {
    for raw in selectors {
        let locator = match Locator::parse(raw) {
            Ok(l) => l,
            Err(e) => {
                debug!("skipping selector: {}", e);
                continue;
            }
        };

        match session.find_elements(&locator) {
            Ok(found) => {
                if let Some(element) = found.into_iter().next() {
                    return Ok(LocateOutcome::Found {
                        element,
                        selector: raw.clone(),
                    });
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!(selector = %raw, "selector failed: {}", e),
        }
    }

    Ok(LocateOutcome::NotFound)
}
