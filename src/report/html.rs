use crate::explorer::exploration::{ClickOutcome, ExplorationRun, Termination};
use crate::report::artifacts::SCREENSHOT_SUBDIR;
use crate::report::report_model::SuiteReport;
use crate::screen::screen_model::ScreenSnapshot;

// ============================================================================
// HTML reporters: self-contained pages with inline CSS
// ============================================================================

const STYLE: &str = r#"body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; padding: 0; background: #f5f5f5; }
.header { color: white; padding: 20px 30px; }
.header h1 { margin: 0 0 8px 0; font-size: 24px; }
.header p { margin: 0; font-size: 16px; opacity: 0.9; }
.content { max-width: 1100px; margin: 20px auto; padding: 0 20px; }
.card { background: white; border-radius: 6px; padding: 16px 20px; margin-bottom: 12px; border-left: 4px solid #ccc; }
.card.pass { border-left-color: #4CAF50; }
.card.fail { border-left-color: #f44336; }
.card h3 { margin: 0 0 8px 0; font-size: 16px; }
.card p { margin: 4px 0; color: #666; font-size: 14px; }
.error { color: #f44336; font-weight: bold; }
.failures { margin: 8px 0 0 0; padding-left: 20px; }
.failures li { color: #c62828; font-size: 13px; margin-bottom: 4px; }
table { border-collapse: collapse; width: 100%; font-size: 13px; }
th, td { text-align: left; padding: 4px 8px; border-bottom: 1px solid #eee; vertical-align: top; }
td code { font-size: 12px; color: #555; }
img.shot { max-width: 270px; float: right; margin-left: 16px; border: 1px solid #ddd; }
"#;

const GREEN: &str = "#4CAF50";
const RED: &str = "#f44336";
const AMBER: &str = "#FF9800";

fn page(title: &str, header_color: &str, heading: &str, summary: &str, body: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
{style}</style>
</head>
<body>
<div class="header" style="background: {header_color}">
<h1>{heading}</h1>
<p>{summary}</p>
</div>
<div class="content">
{body}
</div>
</body>
</html>"##,
        title = escape_html(title),
        style = STYLE,
        header_color = header_color,
        heading = escape_html(heading),
        summary = escape_html(summary),
        body = body,
    )
}

// ============================================================================
// Scenario suite
// ============================================================================

/// Generate a self-contained HTML report for a scenario suite.
pub fn generate_html_report(report: &SuiteReport) -> String {
    let (color, status) = if report.all_passed() {
        (GREEN, "ALL SCENARIOS PASSED")
    } else {
        (RED, "SOME SCENARIOS FAILED")
    };

    let duration = report
        .duration_ms
        .map(|ms| format!(" in {:.1}s", ms as f64 / 1000.0))
        .unwrap_or_default();
    let summary = format!(
        "{}: {} passed, {} failed ({} total){}",
        report.suite_name, report.passed, report.failed, report.total, duration
    );

    let mut cases = String::new();
    for result in &report.results {
        let (class, marker) = if result.passed {
            ("pass", "\u{2713}")
        } else {
            ("fail", "\u{2717}")
        };

        cases.push_str(&format!(
            "<div class=\"card {}\">\n<h3>{} {}</h3>\n<p>Steps: {} | Assertions: {} | Screenshots: {}</p>\n",
            class,
            marker,
            escape_html(&result.scenario_name),
            result.steps_run,
            result.assertion_results.len(),
            result.screenshots.len(),
        ));

        if let Some(ref error) = result.error {
            cases.push_str(&format!("<p class=\"error\">Error: {}</p>\n", escape_html(error)));
        }

        let failed: Vec<_> = result.failed_assertions().collect();
        if !failed.is_empty() {
            cases.push_str("<ul class=\"failures\">\n");
            for ar in failed {
                let msg = ar.message.as_deref().unwrap_or("assertion failed");
                cases.push_str(&format!(
                    "<li>Step {}: {}</li>\n",
                    ar.step_index,
                    escape_html(msg)
                ));
            }
            cases.push_str("</ul>\n");
        }

        cases.push_str("</div>\n");
    }

    page(
        &format!("{} - Scenario Report", report.suite_name),
        color,
        status,
        &summary,
        &cases,
    )
}

// ============================================================================
// Screen inspection and exploration
// ============================================================================

/// HTML view of a single snapshot.
pub fn generate_snapshot_html(snapshot: &ScreenSnapshot) -> String {
    let summary = format!(
        "{} elements, captured {}",
        snapshot.element_count(),
        snapshot.captured_at.to_rfc3339()
    );
    page(
        &format!("{} - Screen", snapshot.screen_id),
        GREEN,
        &snapshot.screen_id,
        &summary,
        &screen_card(0, snapshot),
    )
}

/// HTML view of an exploration run: click table, then every screen.
pub fn generate_exploration_html(run: &ExplorationRun) -> String {
    let start = run.start_screen();
    let failed = run.failed_edges().count();
    let anomalies = run.back_anomalies().count();

    let (color, heading) = match &run.termination {
        Termination::Aborted { .. } => (RED, "EXPLORATION ABORTED".to_string()),
        Termination::Completed if failed > 0 || anomalies > 0 => {
            (AMBER, "EXPLORATION COMPLETED WITH ISSUES".to_string())
        }
        Termination::Completed => (GREEN, "EXPLORATION COMPLETED".to_string()),
    };

    let summary = format!(
        "{}: {} screens, {} clicks, {} failed, {} back anomalies",
        start.screen_id,
        run.screen_count(),
        run.click_edges.len(),
        failed,
        anomalies
    );

    let mut body = String::new();
    if let Termination::Aborted { reason } = &run.termination {
        body.push_str(&format!(
            "<div class=\"card fail\"><p class=\"error\">Session lost: {}</p></div>\n",
            escape_html(reason)
        ));
    }

    body.push_str("<div class=\"card\">\n<h3>Clicks</h3>\n<table>\n<tr><th>#</th><th>Element</th><th>Outcome</th><th>Screen</th><th>Selector</th></tr>\n");
    for (i, edge) in run.click_edges.iter().enumerate() {
        let outcome = match &edge.outcome {
            ClickOutcome::Navigated => "navigated".to_string(),
            ClickOutcome::Unchanged => "unchanged".to_string(),
            ClickOutcome::NotFound => "not found".to_string(),
            ClickOutcome::NotVisible => "not visible".to_string(),
            ClickOutcome::ClickFailed { error } => format!("click failed: {}", error),
            ClickOutcome::SessionLost { error } => format!("session lost: {}", error),
        };
        let mut screen = edge
            .to_screen_index
            .and_then(|to| run.visited_screens.get(to).map(|s| (to, s)))
            .map(|(to, s)| format!("<a href=\"#screen-{}\">{}</a>", to, escape_html(&s.screen_id)))
            .unwrap_or_default();
        if let Some(anomaly) = &edge.back_anomaly {
            screen.push_str(&format!(
                "<br><span class=\"error\">back landed on {}</span>",
                escape_html(&anomaly.actual_screen_id)
            ));
        }
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><code>{}</code></td></tr>\n",
            i + 1,
            escape_html(edge.descriptor.display_name()),
            escape_html(&outcome),
            screen,
            escape_html(edge.selector_used.as_deref().unwrap_or("")),
        ));
    }
    body.push_str("</table>\n</div>\n");

    for (index, snapshot) in run.visited_screens.iter().enumerate() {
        body.push_str(&screen_card(index, snapshot));
    }

    page(
        &format!("{} - Exploration Report", start.screen_id),
        color,
        &heading,
        &summary,
        &body,
    )
}

fn screen_card(index: usize, snapshot: &ScreenSnapshot) -> String {
    let mut card = format!(
        "<div class=\"card\" id=\"screen-{}\">\n<h3>[{}] {}</h3>\n",
        index,
        index,
        escape_html(&snapshot.screen_id)
    );

    if let Some(shot) = &snapshot.screenshot_ref {
        card.push_str(&format!(
            "<img class=\"shot\" src=\"{}/{}\" alt=\"{}\">\n",
            SCREENSHOT_SUBDIR,
            escape_html(shot),
            escape_html(&snapshot.screen_id)
        ));
    }

    card.push_str("<table>\n<tr><th>Kind</th><th>Name</th><th>Class</th><th>Bounds</th><th>Selector</th></tr>\n");
    for descriptor in snapshot.all_elements() {
        let b = descriptor.bounds;
        card.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{},{} {}x{}</td><td><code>{}</code></td></tr>\n",
            descriptor.kind,
            escape_html(descriptor.display_name()),
            escape_html(&descriptor.class_name),
            b.x,
            b.y,
            b.width,
            b.height,
            escape_html(descriptor.selectors.first().map(String::as_str).unwrap_or("")),
        ));
    }
    card.push_str("</table>\n<div style=\"clear: both\"></div>\n</div>\n");
    card
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
