use std::error::Error;
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::explorer::exploration::{ExplorationRun, ExplorerConfig, Termination};
use crate::explorer::explorer::explore;
use crate::explorer::test_generator::{GeneratedPlan, generate_plan};
use crate::report::artifacts::{ArtifactWriter, load_scenarios, render_suite};
use crate::report::console::format_exploration_summary;
use crate::report::report_model::{ReportFormat, SuiteReport};
use crate::scenario::runner::ScenarioRunner;
use crate::scenario::scenario_model::Scenario;
use crate::screen::screen_model::ScreenSnapshot;
use crate::screen::snapshot::{DiscoveryConfig, capture_screen};
use crate::session::capabilities::SessionConfig;
use crate::session::driver::AutomationSession;
use crate::session::with_session;
use crate::trace::logger::InteractionLogger;

type CmdResult<T> = Result<T, Box<dyn Error>>;

// ============================================================================
// inspect subcommand
// ============================================================================

/// Capture the current screen and write its snapshot artifacts.
pub fn inspect_session(
    session: &mut dyn AutomationSession,
    discovery: &DiscoveryConfig,
    writer: &ArtifactWriter,
) -> CmdResult<ScreenSnapshot> {
    let snapshot = capture_screen(session, discovery)?;
    writer.write_snapshot(&snapshot)?;
    Ok(snapshot)
}

pub fn cmd_inspect(
    session_config: &SessionConfig,
    discovery: &DiscoveryConfig,
    writer: &ArtifactWriter,
) -> CmdResult<()> {
    let snapshot = with_session(session_config, |session| {
        inspect_session(session, discovery, writer)
    })?;

    println!(
        "Captured {} ({} elements) into {}/",
        snapshot.screen_id,
        snapshot.element_count(),
        writer.root().display()
    );
    for (kind, elements) in &snapshot.elements_by_kind {
        println!("  {:<10} {}", kind.as_str(), elements.len());
    }
    Ok(())
}

// ============================================================================
// explore subcommand
// ============================================================================

/// Explore and write the run's artifacts, including a partial run.
pub fn explore_session(
    session: &mut dyn AutomationSession,
    config: &ExplorerConfig,
    writer: &ArtifactWriter,
) -> CmdResult<ExplorationRun> {
    let log = InteractionLogger::new(writer.interaction_log_path());
    let run = explore(session, config, &log)?;
    writer.write_exploration(&run)?;
    Ok(run)
}

/// Returns whether exploration completed without losing the session.
pub fn cmd_explore(
    session_config: &SessionConfig,
    config: &ExplorerConfig,
    writer: &ArtifactWriter,
) -> CmdResult<bool> {
    let run = with_session(session_config, |session| {
        explore_session(session, config, writer)
    })?;

    print!("{}", format_exploration_summary(&run));
    println!("Artifacts written to {}/", writer.root().display());
    Ok(!run.is_aborted())
}

// ============================================================================
// generate subcommand
// ============================================================================

/// Explore, then write page objects and smoke scenarios into `output`.
pub fn generate_session(
    session: &mut dyn AutomationSession,
    config: &ExplorerConfig,
    artifacts: &ArtifactWriter,
    output: &ArtifactWriter,
) -> CmdResult<GeneratedPlan> {
    let run = explore_session(session, config, artifacts)?;
    if run.is_aborted() {
        return Err(format!(
            "exploration aborted, nothing generated: {}",
            abort_reason(&run)
        )
        .into());
    }
    let plan = generate_plan(&run, config.settle_ms);
    output.write_plan(&plan)?;
    Ok(plan)
}

pub fn cmd_generate(
    session_config: &SessionConfig,
    config: &ExplorerConfig,
    artifacts: &ArtifactWriter,
    output_dir: &str,
) -> CmdResult<()> {
    let output = ArtifactWriter::new(output_dir);
    let plan = with_session(session_config, |session| {
        generate_session(session, config, artifacts, &output)
    })?;

    println!(
        "Generated {} page objects and {} scenarios in {}/",
        plan.page_objects.len(),
        plan.scenarios.len(),
        output_dir
    );
    Ok(())
}

fn abort_reason(run: &ExplorationRun) -> String {
    match &run.termination {
        Termination::Aborted { reason } => reason.clone(),
        Termination::Completed => String::new(),
    }
}

// ============================================================================
// run subcommand
// ============================================================================

/// Run every scenario in order on one session.
pub fn run_scenarios(
    session: &mut dyn AutomationSession,
    scenarios: &[Scenario],
    discovery: &DiscoveryConfig,
    writer: &ArtifactWriter,
    suite_name: &str,
) -> SuiteReport {
    let log = InteractionLogger::new(writer.interaction_log_path());
    let runner = ScenarioRunner::new(&log)
        .with_discovery(discovery.clone())
        .with_screenshot_dir(writer.screenshot_dir());

    let started = Instant::now();
    let results = scenarios
        .iter()
        .map(|scenario| runner.run(scenario, session))
        .collect();

    SuiteReport::from_results(suite_name, results).with_duration(started.elapsed().as_millis())
}

/// Run scenarios and return whether all passed.
pub fn cmd_run(
    session_config: &SessionConfig,
    scenario_path: &str,
    format: &str,
    output: Option<&str>,
    discovery: &DiscoveryConfig,
    writer: &ArtifactWriter,
) -> CmdResult<bool> {
    let format = ReportFormat::parse(format)
        .ok_or_else(|| format!("unknown report format '{}'", format))?;

    let scenarios: Vec<Scenario> = load_scenarios(Path::new(scenario_path))?
        .into_iter()
        .map(|(path, scenario)| {
            info!(path = %path.display(), name = %scenario.name, "loaded scenario");
            scenario
        })
        .collect();

    let suite_name = Path::new(scenario_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenarios")
        .to_string();

    let report = with_session(session_config, |session| {
        Ok::<_, Box<dyn Error>>(run_scenarios(session, &scenarios, discovery, writer, &suite_name))
    })?;
    let all_passed = report.all_passed();

    let rendered = render_suite(&report, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("Report written to {}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(all_passed)
}
