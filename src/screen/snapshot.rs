use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::screen::dedupe::push_unique;
use crate::screen::extractor::extract_descriptor;
use crate::screen::screen_model::{ElementDescriptor, ElementKind, ScreenSnapshot, UNKNOWN_SCREEN};
use crate::session::driver::{AutomationSession, Locator};
use crate::session::error::SessionError;

// ============================================================================
// Discovery configuration
// ============================================================================

/// Options for one discovery pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Upper bound on nodes processed per kind (default 20)
    pub max_per_kind: usize,

    /// Directory screenshots are written to; `None` disables capture
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_per_kind: 20,
            screenshot_dir: None,
        }
    }
}

/// Structural queries tried for each kind, in order.
///
/// Several alternatives per kind improve recall; their results are merged
/// through the duplicate filter.
pub fn kind_queries(kind: ElementKind) -> &'static [&'static str] {
    match kind {
        ElementKind::Clickable => &[
            "//*[@clickable=\"true\"]",
            "//android.widget.Button",
            "//*[contains(@resource-id,\"button\")]",
        ],
        ElementKind::Input => &[
            "//android.widget.EditText",
            "//android.widget.AutoCompleteTextView",
        ],
        ElementKind::Text => &["//android.widget.TextView"],
        ElementKind::Image => &["//android.widget.ImageView", "//android.widget.ImageButton"],
        ElementKind::List => &[
            "//android.widget.ListView",
            "//androidx.recyclerview.widget.RecyclerView",
            "//android.widget.GridView",
        ],
        ElementKind::Checkbox => &[
            "//android.widget.CheckBox",
            "//android.widget.Switch",
            "//android.widget.RadioButton",
        ],
        ElementKind::Scrollable => &["//*[@scrollable=\"true\"]", "//android.widget.ScrollView"],
        ElementKind::Custom => &[
            "//android.view.View",
            "//android.view.ViewGroup[@clickable=\"true\"]",
        ],
    }
}

// ============================================================================
// Snapshot builder
// ============================================================================

/// Run one full discovery pass over the screen currently loaded.
///
/// Builds a fresh snapshot on every call; no state survives between calls.
/// Recoverable failures (a kind's query, a visibility check, the screenshot,
/// the screen id) degrade the snapshot instead of failing it. Only a fatal
/// session error is returned.
pub fn capture_screen(
    session: &mut dyn AutomationSession,
    config: &DiscoveryConfig,
) -> Result<ScreenSnapshot, SessionError> {
    let captured_at = Utc::now();

    let screen_id = match session.current_screen_id() {
        Ok(id) if !id.trim().is_empty() => id,
        Ok(_) => UNKNOWN_SCREEN.to_string(),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("could not read screen id: {}", e);
            UNKNOWN_SCREEN.to_string()
        }
    };

    let mut elements_by_kind = BTreeMap::new();
    for kind in ElementKind::ALL {
        let elements = discover_kind(session, kind, config.max_per_kind)?;
        debug!(%kind, count = elements.len(), "discovered");
        elements_by_kind.insert(kind, elements);
    }

    let screenshot_ref = match &config.screenshot_dir {
        Some(dir) => save_screenshot(session, dir, &screen_id, &captured_at)?,
        None => None,
    };

    let snapshot = ScreenSnapshot {
        screen_id,
        captured_at,
        elements_by_kind,
        screenshot_ref,
    };
    info!(
        screen = %snapshot.screen_id,
        elements = snapshot.element_count(),
        "screen captured"
    );
    Ok(snapshot)
}

/// Query, filter and extract the elements of one kind.
fn discover_kind(
    session: &mut dyn AutomationSession,
    kind: ElementKind,
    max_per_kind: usize,
) -> Result<Vec<ElementDescriptor>, SessionError> {
    let mut elements = Vec::new();
    let mut processed = 0usize;

    'queries: for raw in kind_queries(kind) {
        if processed >= max_per_kind {
            break;
        }

        let locator = match Locator::parse(raw) {
            Ok(l) => l,
            Err(e) => {
                warn!(%kind, "skipping query: {}", e);
                continue;
            }
        };

        let found = match session.find_elements(&locator) {
            Ok(found) => found,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(%kind, query = %raw, "query failed: {}", e);
                continue;
            }
        };

        for (index, element) in found.iter().enumerate() {
            if processed >= max_per_kind {
                break 'queries;
            }
            processed += 1;

            match session.is_displayed(element) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(element = %element, "visibility check failed: {}", e);
                    continue;
                }
            }

            let descriptor = extract_descriptor(session, element, kind, Some(index + 1));
            push_unique(&mut elements, descriptor);
        }
    }

    Ok(elements)
}

/// Capture and save a screenshot. Returns the file name, or `None` when
/// capture or writing fails.
fn save_screenshot(
    session: &mut dyn AutomationSession,
    dir: &Path,
    screen_id: &str,
    captured_at: &DateTime<Utc>,
) -> Result<Option<String>, SessionError> {
    let png = match session.screenshot_png() {
        Ok(png) => png,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("screenshot failed: {}", e);
            return Ok(None);
        }
    };

    let stem = format!(
        "screen_{}_{}",
        captured_at.format("%Y%m%d_%H%M%S_%3f"),
        file_slug(screen_id)
    );
    let mut file_name = format!("{}.png", stem);
    let mut suffix = 2;
    while dir.join(&file_name).exists() {
        file_name = format!("{}_{}.png", stem, suffix);
        suffix += 1;
    }

    let written =
        std::fs::create_dir_all(dir).and_then(|_| std::fs::write(dir.join(&file_name), &png));
    match written {
        Ok(()) => Ok(Some(file_name)),
        Err(e) => {
            warn!(dir = %dir.display(), "could not write screenshot: {}", e);
            Ok(None)
        }
    }
}

/// Reduce a screen id to a safe file-name fragment.
pub fn file_slug(value: &str) -> String {
    let slug: String = value
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "screen".to_string()
    } else {
        trimmed.to_string()
    }
}
