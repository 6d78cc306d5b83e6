use crate::report::report_model::SuiteReport;

// ============================================================================
// JUnit XML reporter
// ============================================================================

/// Generate JUnit XML for CI systems.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <testsuite name="..." tests="2" failures="1" time="1.234">
///   <testcase name="Open specimen" classname="screen-discovery" />
///   <testcase name="Harvest dome" classname="screen-discovery">
///     <failure message="execution error" type="StepFailure">Error: ...</failure>
///   </testcase>
/// </testsuite>
/// ```
pub fn generate_junit_xml(report: &SuiteReport) -> String {
    let time_attr = report
        .duration_ms
        .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
        .unwrap_or_default();

    let mut cases = String::new();
    for result in &report.results {
        let case_time = format!("{:.3}", result.duration_ms as f64 / 1000.0);
        if result.passed {
            cases.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"screen-discovery\" time=\"{}\" />\n",
                escape_xml(&result.scenario_name),
                case_time
            ));
            continue;
        }

        let mut body_parts: Vec<String> = result
            .failed_assertions()
            .map(|ar| {
                let msg = ar.message.as_deref().unwrap_or("assertion failed");
                format!("Step {}: {}", ar.step_index, msg)
            })
            .collect();
        let failure_count = body_parts.len();

        if let Some(error) = &result.error {
            body_parts.push(format!("Error: {}", error));
        }

        let (message, kind) = if failure_count > 0 {
            (format!("{} assertion(s) failed", failure_count), "AssertionFailure")
        } else {
            ("execution error".to_string(), "StepFailure")
        };

        cases.push_str(&format!(
            "  <testcase name=\"{name}\" classname=\"screen-discovery\" time=\"{time}\">\n    <failure message=\"{message}\" type=\"{kind}\">{body}</failure>\n  </testcase>\n",
            name = escape_xml(&result.scenario_name),
            time = case_time,
            message = escape_xml(&message),
            kind = kind,
            body = escape_xml(&body_parts.join("\n")),
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\"{time}>\n{cases}</testsuite>\n",
        name = escape_xml(&report.suite_name),
        tests = report.total,
        failures = report.failed,
        time = time_attr,
        cases = cases,
    )
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
