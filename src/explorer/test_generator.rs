use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::scenario::scenario_model::{Assertion, Scenario, ScenarioStep, Target};
use crate::screen::screen_model::{ElementDescriptor, ElementKind, ScreenSnapshot, UNKNOWN_SCREEN};

use super::exploration::{ClickEdge, ClickOutcome, ExplorationRun};

/// Texts asserted per generated smoke scenario.
const MAX_ASSERTED_TEXTS: usize = 3;

// ============================================================================
// Page objects
// ============================================================================

/// Named handles onto one screen's elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageObject {
    pub name: String,
    pub screen_id: String,
    pub entries: Vec<PageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub name: String,
    pub kind: ElementKind,
    pub selectors: Vec<String>,
}

/// Everything generated from one exploration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub page_objects: Vec<PageObject>,
    pub scenarios: Vec<Scenario>,
}

/// Generate page objects and smoke scenarios from a completed run.
pub fn generate_plan(run: &ExplorationRun, settle_ms: u64) -> GeneratedPlan {
    GeneratedPlan {
        page_objects: generate_page_objects(run),
        scenarios: generate_scenarios(run, settle_ms),
    }
}

/// One page object per visited screen, in visit order.
pub fn generate_page_objects(run: &ExplorationRun) -> Vec<PageObject> {
    let mut taken = HashSet::new();
    run.visited_screens
        .iter()
        .map(|screen| {
            let name = unique_name(&mut taken, page_object_name(&screen.screen_id), "_");
            page_object(name, screen)
        })
        .collect()
}

fn page_object(name: String, screen: &ScreenSnapshot) -> PageObject {
    let mut taken = HashSet::new();
    let entries = screen
        .all_elements()
        .filter(|d| !d.selectors.is_empty())
        .filter_map(|d| {
            let base = entry_name(d)?;
            Some(PageEntry {
                name: unique_name(&mut taken, base, "_"),
                kind: d.kind,
                selectors: d.selectors.clone(),
            })
        })
        .collect();

    PageObject {
        name,
        screen_id: screen.screen_id.clone(),
        entries,
    }
}

/// `.MainActivity` becomes `MainActivityPage`.
pub fn page_object_name(screen_id: &str) -> String {
    let tail = if screen_id == UNKNOWN_SCREEN {
        "Unknown"
    } else {
        screen_id.rsplit(['.', '/', '$']).find(|s| !s.is_empty()).unwrap_or("")
    };

    let mut name: String = tail
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Screen");
    }
    if !name.ends_with("Page") {
        name.push_str("Page");
    }
    name
}

/// snake_case entry name from text, then label, then the identifier tail.
pub fn entry_name(descriptor: &ElementDescriptor) -> Option<String> {
    let identifier_tail = descriptor.identifier.rsplit('/').next().unwrap_or("");
    let source = [
        descriptor.text.as_str(),
        descriptor.accessibility_label.as_str(),
        identifier_tail,
    ]
    .into_iter()
    .map(snake_case)
    .find(|s| !s.is_empty())?;

    if source.starts_with(|c: char| c.is_ascii_digit()) {
        Some(format!("{}_{}", descriptor.kind, source))
    } else {
        Some(source)
    }
}

pub fn snake_case(value: &str) -> String {
    let mut out = String::new();
    for c in value.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Return `base`, or `base{sep}2`, `base{sep}3`… if already taken.
fn unique_name(taken: &mut HashSet<String>, base: String, sep: &str) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}{}{}", base, sep, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

// ============================================================================
// Smoke scenarios
// ============================================================================

/// One smoke scenario per click that reached a new screen.
pub fn generate_scenarios(run: &ExplorationRun, settle_ms: u64) -> Vec<Scenario> {
    run.click_edges
        .iter()
        .filter(|e| e.outcome == ClickOutcome::Navigated)
        .filter_map(|edge| {
            let origin = run.visited_screens.get(edge.from_screen_index)?;
            let target = run.visited_screens.get(edge.to_screen_index?)?;
            Some(generate_smoke_scenario(edge, origin, target, settle_ms))
        })
        .collect()
}

/// Click, settle, check the target screen shows what it showed during
/// exploration, go back.
pub fn generate_smoke_scenario(
    edge: &ClickEdge,
    origin: &ScreenSnapshot,
    target: &ScreenSnapshot,
    settle_ms: u64,
) -> Scenario {
    let descriptor = &edge.descriptor;
    let mut selectors = Vec::new();
    if let Some(used) = &edge.selector_used {
        selectors.push(used.clone());
    }
    for selector in &descriptor.selectors {
        if !selectors.contains(selector) {
            selectors.push(selector.clone());
        }
    }

    let mut steps = vec![
        ScenarioStep::Click {
            target: Target::selectors(selectors),
        },
        ScenarioStep::Wait {
            duration_ms: settle_ms,
        },
    ];

    let mut assertions = Vec::new();
    if target.screen_id != origin.screen_id && target.screen_id != UNKNOWN_SCREEN {
        assertions.push(Assertion::ScreenIs {
            expected: target.screen_id.clone(),
        });
    }
    let mut seen = HashSet::new();
    assertions.extend(
        target
            .visible_texts()
            .into_iter()
            .filter(|t| seen.insert(*t))
            .take(MAX_ASSERTED_TEXTS)
            .map(|t| Assertion::TextVisible {
                text: t.to_string(),
            }),
    );
    if !assertions.is_empty() {
        steps.push(ScenarioStep::Assert { assertions });
    }

    steps.push(ScenarioStep::Back);

    Scenario {
        name: format!(
            "Smoke: {} from {}",
            descriptor.display_name(),
            page_object_name(&origin.screen_id)
        ),
        description: Some(format!(
            "Navigate from {} to {} and back",
            origin.screen_id, target.screen_id
        )),
        steps,
    }
}
