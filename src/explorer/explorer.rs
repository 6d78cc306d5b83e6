use tracing::{info, warn};

use crate::screen::screen_model::{ElementDescriptor, ElementKind, UNKNOWN_SCREEN};
use crate::screen::selector::{LocateOutcome, try_locate};
use crate::screen::snapshot::capture_screen;
use crate::session::driver::AutomationSession;
use crate::session::error::SessionError;
use crate::trace::logger::InteractionLogger;
use crate::trace::trace::{InteractionEvent, InteractionKind};

use super::exploration::{
    BackAnomaly, ClickEdge, ClickOutcome, ExplorationRun, ExplorerConfig, Termination,
};

/// Index of the start screen; exploration never goes deeper than one click.
const START_SCREEN: usize = 0;

// ============================================================================
// Shallow navigation exploration
// ============================================================================

/// Pick the start-screen elements worth clicking: clickable, with text or a
/// label, in discovery order, at most `max_clicks`.
pub fn select_click_targets(
    run: &ExplorationRun,
    max_clicks: usize,
) -> Vec<ElementDescriptor> {
    run.start_screen()
        .elements(ElementKind::Clickable)
        .iter()
        .filter(|d| d.has_human_label())
        .take(max_clicks)
        .cloned()
        .collect()
}

/// Depth-1 exploration from the screen currently loaded.
///
/// Captures the start screen, then for each selected element: re-locate,
/// click, wait, capture, navigate back, wait. A failure on one element is
/// recorded on its edge and the next element is tried. No cycle detection,
/// no revisits, no recursion.
///
/// Returns `Err` only when the start screen cannot be captured because the
/// session is gone. A session loss later stops the run, which is returned
/// as `Termination::Aborted` with everything captured so far.
pub fn explore(
    session: &mut dyn AutomationSession,
    config: &ExplorerConfig,
    log: &InteractionLogger,
) -> Result<ExplorationRun, SessionError> {
    let start = capture_screen(session, &config.discovery)?;
    log.log(
        InteractionEvent::now(InteractionKind::Capture)
            .on_screen(&start.screen_id)
            .with_detail(format!("{} elements", start.element_count())),
    );

    let mut run = ExplorationRun::new(start);
    let targets = select_click_targets(&run, config.max_clicks);
    info!(
        screen = %run.start_screen().screen_id,
        targets = targets.len(),
        "exploring start screen"
    );

    for descriptor in targets {
        match click_and_capture(session, config, log, &mut run, descriptor.clone()) {
            Ok(edge) => run.add_edge(edge),
            Err(SessionLoss { completed, error }) => {
                warn!(element = descriptor.display_name(), "session lost: {}", error);
                let edge = completed.unwrap_or_else(|| {
                    ClickEdge::failed(
                        START_SCREEN,
                        descriptor,
                        ClickOutcome::SessionLost {
                            error: error.to_string(),
                        },
                    )
                });
                run.add_edge(edge);
                run.termination = Termination::Aborted {
                    reason: error.to_string(),
                };
                break;
            }
        }
    }

    info!(
        screens = run.screen_count(),
        edges = run.click_edges.len(),
        failed = run.failed_edges().count(),
        "exploration finished"
    );
    Ok(run)
}

/// A fatal session error while processing one element.
///
/// `completed` holds the edge when the click had already reached a new
/// screen, which was added to the run before the session went away.
struct SessionLoss {
    completed: Option<ClickEdge>,
    error: SessionError,
}

impl From<SessionError> for SessionLoss {
    fn from(error: SessionError) -> Self {
        Self {
            completed: None,
            error,
        }
    }
}

/// Process one start-screen element. Only fatal session errors escape.
fn click_and_capture(
    session: &mut dyn AutomationSession,
    config: &ExplorerConfig,
    log: &InteractionLogger,
    run: &mut ExplorationRun,
    descriptor: ElementDescriptor,
) -> Result<ClickEdge, SessionLoss> {
    let origin_id = run.start_screen().screen_id.clone();
    let origin_fingerprint = run.start_screen().structure_fingerprint();
    let name = descriptor.display_name().to_string();

    let (element, selector) = match try_locate(session, &descriptor.selectors)? {
        LocateOutcome::Found { element, selector } => (element, selector),
        LocateOutcome::NotFound => {
            warn!(element = %name, "could not re-locate element");
            log.log(
                InteractionEvent::now(InteractionKind::Locate)
                    .on_screen(&origin_id)
                    .with_target(&name)
                    .failed("no selector matched"),
            );
            return Ok(ClickEdge::failed(START_SCREEN, descriptor, ClickOutcome::NotFound));
        }
    };

    match session.is_displayed(&element) {
        Ok(true) => {}
        Ok(false) => {
            return Ok(ClickEdge::failed(START_SCREEN, descriptor, ClickOutcome::NotVisible));
        }
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            warn!(element = %name, "visibility check failed: {}", e);
            return Ok(ClickEdge::failed(START_SCREEN, descriptor, ClickOutcome::NotVisible));
        }
    }

    if let Err(e) = session.click(&element) {
        if e.is_fatal() {
            return Err(e.into());
        }
        log.log(
            InteractionEvent::now(InteractionKind::Click)
                .on_screen(&origin_id)
                .with_target(&name)
                .with_selector(&selector)
                .failed(&e),
        );
        return Ok(ClickEdge::failed(
            START_SCREEN,
            descriptor,
            ClickOutcome::ClickFailed {
                error: e.to_string(),
            },
        ));
    }
    log.log(
        InteractionEvent::now(InteractionKind::Click)
            .on_screen(&origin_id)
            .with_target(&name)
            .with_selector(&selector),
    );
    session.wait(config.settle());

    let snapshot = capture_screen(session, &config.discovery)?;
    log.log(
        InteractionEvent::now(InteractionKind::Capture)
            .on_screen(&snapshot.screen_id)
            .with_detail(format!("{} elements", snapshot.element_count())),
    );

    let mut edge = ClickEdge {
        from_screen_index: START_SCREEN,
        descriptor,
        to_screen_index: None,
        outcome: ClickOutcome::Unchanged,
        selector_used: Some(selector),
        back_anomaly: None,
    };

    let unchanged = snapshot.screen_id == origin_id
        && snapshot.structure_fingerprint() == origin_fingerprint;
    if unchanged {
        info!(element = %name, "click left the screen unchanged");
        return Ok(edge);
    }

    edge.to_screen_index = Some(run.add_screen(snapshot));
    edge.outcome = ClickOutcome::Navigated;

    match navigate_back(session, config, log, &origin_id, &mut edge) {
        Ok(()) => Ok(edge),
        Err(error) => Err(SessionLoss {
            completed: Some(edge),
            error,
        }),
    }
}

/// Press back, settle, and check we are on the origin screen again.
fn navigate_back(
    session: &mut dyn AutomationSession,
    config: &ExplorerConfig,
    log: &InteractionLogger,
    origin_id: &str,
    edge: &mut ClickEdge,
) -> Result<(), SessionError> {
    match session.back() {
        Ok(()) => log.log(InteractionEvent::now(InteractionKind::Back)),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("back navigation failed: {}", e);
            log.log(InteractionEvent::now(InteractionKind::Back).failed(&e));
        }
    }
    session.wait(config.settle());

    if !config.verify_back {
        return Ok(());
    }

    let actual = match session.current_screen_id() {
        Ok(id) => id,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("could not verify back navigation: {}", e);
            UNKNOWN_SCREEN.to_string()
        }
    };

    if actual != origin_id {
        warn!(expected = %origin_id, actual = %actual, "back navigation landed elsewhere");
        edge.back_anomaly = Some(BackAnomaly {
            expected_screen_id: origin_id.to_string(),
            actual_screen_id: actual,
        });
    }
    Ok(())
}
