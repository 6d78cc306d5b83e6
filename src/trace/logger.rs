use std::{fs::OpenOptions, io::Write, path::Path, sync::Mutex};

use tracing::warn;

use crate::trace::trace::InteractionEvent;

/// Append-only JSON Lines log of remote interactions.
///
/// Logging never fails the caller: problems are reported as warnings and
/// the event is dropped.
pub struct InteractionLogger {
    file: Option<Mutex<std::fs::File>>,
    events: Mutex<Vec<InteractionEvent>>,
}

impl InteractionLogger {
    /// Log to `path`, creating it if needed. Falls back to memory-only
    /// logging when the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
                events: Mutex::new(Vec::new()),
            },
            Err(e) => {
                warn!("could not open interaction log '{}': {}", path.display(), e);
                Self::in_memory()
            }
        }
    }

    /// Keep events in memory only.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self, event: InteractionEvent) {
        if let Some(file_mutex) = &self.file {
            match serde_json::to_string(&event) {
                Ok(json) => match file_mutex.lock() {
                    Ok(mut file) => {
                        if let Err(e) = writeln!(file, "{}", json) {
                            warn!("failed to write interaction event: {}", e);
                        }
                    }
                    Err(e) => warn!("interaction log lock poisoned: {}", e),
                },
                Err(e) => warn!("failed to serialize interaction event: {}", e),
            }
        }

        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(e) => warn!("interaction log lock poisoned: {}", e),
        }
    }

    /// Copy of every event logged so far.
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}
