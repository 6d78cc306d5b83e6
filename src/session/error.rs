use thiserror::Error;

/// W3C error codes that mean the remote session itself is gone.
const FATAL_PROTOCOL_ERRORS: &[&str] = &["invalid session id", "session not created"];

#[derive(Debug, Error)]
pub enum SessionError {
    /// HTTP request to the automation server could not be completed
    #[error("Transport error during {command}: {source}")]
    Transport {
        command: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a W3C error envelope
    #[error("{command} failed ({error}): {message}")]
    Protocol {
        command: String,
        error: String,
        message: String,
    },

    /// Server answered but the payload had an unexpected shape
    #[error("Malformed response to {command}: {detail}")]
    MalformedResponse { command: String, detail: String },

    /// JSON parsing failed
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Session was never established or has already been released
    #[error("No active session: {0}")]
    NoSession(String),

    /// Locator string is not in a recognised family
    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),

    /// Screenshot payload was not valid base64
    #[error("Screenshot decode failed: {0}")]
    ScreenshotDecode(#[from] base64::DecodeError),
}

impl SessionError {
    /// Build a protocol error from a W3C error code and message.
    pub fn protocol(command: &str, error: &str, message: impl Into<String>) -> Self {
        SessionError::Protocol {
            command: command.to_string(),
            error: error.to_string(),
            message: message.into(),
        }
    }

    /// Whether this failure means the session cannot be used any further.
    ///
    /// Fatal errors cross the exploration boundary; everything else is
    /// recovered where it happens.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Transport { .. } | SessionError::NoSession(_) => true,
            SessionError::Protocol { error, .. } => {
                FATAL_PROTOCOL_ERRORS.contains(&error.as_str())
            }
            _ => false,
        }
    }
}
