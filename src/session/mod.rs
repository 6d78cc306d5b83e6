pub mod appium;
pub mod capabilities;
pub mod driver;
pub mod error;
pub mod mock;

use tracing::warn;

use self::appium::AppiumSession;
use self::capabilities::SessionConfig;
use self::driver::AutomationSession;
use self::error::SessionError;

/// Run `f` against a freshly opened Appium session and always release it.
///
/// The session is deleted on every exit path, before `f`'s error (if any)
/// is returned. A release failure is logged and only reported when `f`
/// itself succeeded.
pub fn with_session<T, E, F>(config: &SessionConfig, f: F) -> Result<T, E>
where
    F: FnOnce(&mut dyn AutomationSession) -> Result<T, E>,
    E: From<SessionError>,
{
    let mut session = AppiumSession::connect(config)?;
    let outcome = f(&mut session);
    let released = session.quit();

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), released) => {
            if let Err(release_error) = released {
                warn!("session release failed after error: {}", release_error);
            }
            Err(e)
        }
    }
}
