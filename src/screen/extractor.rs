use tracing::debug;

use crate::screen::screen_model::{ElementDescriptor, ElementKind};
use crate::screen::selector::{SelectorSource, synthesize_selectors};
use crate::session::driver::{AutomationSession, ElementRef};
use crate::session::error::SessionError;

/// Build a descriptor for a live node.
///
/// Every attribute is read independently. A failed read leaves that field
/// at its default (empty string, zero bounds, `false`) and extraction moves
/// on. Never fails.
///
/// `position` is the node's 1-based index among the results of the query
/// that found it, used only for the positional input fallback selector.
pub fn extract_descriptor(
    session: &mut dyn AutomationSession,
    element: &ElementRef,
    kind: ElementKind,
    position: Option<usize>,
) -> ElementDescriptor {
    let mut descriptor = ElementDescriptor::empty(kind);

    descriptor.text = read_or_default(session.text(element), element, "text")
        .trim()
        .to_string();
    descriptor.accessibility_label = read_attribute(session, element, "content-desc");
    descriptor.identifier = read_attribute(session, element, "resource-id");
    descriptor.class_name = read_attribute(session, element, "class");
    descriptor.bounds = read_or_default(session.rect(element), element, "rect");
    descriptor.enabled = read_or_default(session.is_enabled(element), element, "enabled");
    descriptor.clickable = read_flag(session, element, "clickable");
    if kind == ElementKind::Checkbox {
        descriptor.checked = read_flag(session, element, "checked");
    }

    descriptor.selectors =
        synthesize_selectors(&SelectorSource::from_descriptor(&descriptor, position));
    descriptor
}

fn read_or_default<T: Default>(
    result: Result<T, SessionError>,
    element: &ElementRef,
    what: &str,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(element = %element, attribute = what, "read failed, using default: {}", e);
            T::default()
        }
    }
}

fn read_attribute(session: &mut dyn AutomationSession, element: &ElementRef, name: &str) -> String {
    read_or_default(session.attribute(element, name), element, name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn read_flag(session: &mut dyn AutomationSession, element: &ElementRef, name: &str) -> bool {
    read_attribute(session, element, name).eq_ignore_ascii_case("true")
}
