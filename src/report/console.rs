use crate::explorer::exploration::{ClickOutcome, ExplorationRun, Termination};
use crate::report::report_model::SuiteReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a suite report for terminal output.
///
/// ```text
/// === Scenario Suite: walkthrough ===
///
/// ✓ PASS  Open specimen (6 steps, 2 assertions)
/// ✗ FAIL  Harvest dome (3 steps, 1 assertions)
///     [ERROR] Step 2 (click) failed: no locator matched target 'Harvesting'
///
/// === Results: 1 passed, 1 failed (2 total) ===
/// ```
pub fn format_console_report(report: &SuiteReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Scenario Suite: {} ===\n\n", report.suite_name));

    for result in &report.results {
        let marker = if result.passed {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        out.push_str(&format!(
            "{}  {} ({} steps, {} assertions)\n",
            marker,
            result.scenario_name,
            result.steps_run,
            result.assertion_results.len()
        ));

        if let Some(ref error) = result.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }

        for ar in result.failed_assertions() {
            let detail = ar.message.as_deref().unwrap_or("assertion failed");
            out.push_str(&format!(
                "    [FAIL] Step {}: {}: {}\n",
                ar.step_index,
                ar.assertion.type_name(),
                detail
            ));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));

    if let Some(ms) = report.duration_ms {
        out.push_str(&format!(" in {:.1}s", ms as f64 / 1000.0));
    }

    out.push_str(" ===\n");
    out
}

/// One-screen summary of an exploration run.
pub fn format_exploration_summary(run: &ExplorationRun) -> String {
    let mut out = String::new();
    let start = run.start_screen();

    out.push_str(&format!(
        "=== Exploration from {} ({} elements) ===\n\n",
        start.screen_id,
        start.element_count()
    ));

    for edge in &run.click_edges {
        let name = edge.descriptor.display_name();
        let line = match (&edge.outcome, edge.to_screen_index) {
            (ClickOutcome::Navigated, Some(to)) => {
                let screen = run
                    .visited_screens
                    .get(to)
                    .map(|s| s.screen_id.as_str())
                    .unwrap_or("?");
                format!("\u{2192} {}  \u{21d2} {}", name, screen)
            }
            (ClickOutcome::Unchanged, _) => format!("= {}  (no navigation)", name),
            (ClickOutcome::NotFound, _) => format!("\u{2717} {}  not found", name),
            (ClickOutcome::NotVisible, _) => format!("\u{2717} {}  not visible", name),
            (ClickOutcome::ClickFailed { error }, _) => {
                format!("\u{2717} {}  click failed: {}", name, error)
            }
            (ClickOutcome::SessionLost { error }, _) => {
                format!("\u{2717} {}  session lost: {}", name, error)
            }
            (ClickOutcome::Navigated, None) => format!("\u{2192} {}", name),
        };
        out.push_str(&format!("  {}\n", line));

        if let Some(anomaly) = &edge.back_anomaly {
            out.push_str(&format!(
                "      [WARN] back landed on {} instead of {}\n",
                anomaly.actual_screen_id, anomaly.expected_screen_id
            ));
        }
    }

    out.push_str(&format!(
        "\n=== {} screens, {} clicks, {} failed",
        run.screen_count(),
        run.click_edges.len(),
        run.failed_edges().count()
    ));
    if let Termination::Aborted { reason } = &run.termination {
        out.push_str(&format!(", ABORTED: {}", reason));
    }
    out.push_str(" ===\n");
    out
}
