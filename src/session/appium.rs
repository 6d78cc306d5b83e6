use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::screen::screen_model::Bounds;
use crate::session::capabilities::SessionConfig;
use crate::session::driver::{AutomationSession, ElementRef, Locator};
use crate::session::error::SessionError;

/// W3C key under which element references are returned.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Pre-W3C key still emitted by some drivers.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Per-request HTTP timeout. Session creation installs the app and can be slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

// ============================================================================
// Wire commands
// ============================================================================

/// One W3C WebDriver / Appium endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub enum WireCommand {
    NewSession { body: Value },
    FindElements { using: &'static str, value: String },
    Attribute { element: String, name: String },
    Text { element: String },
    Displayed { element: String },
    Enabled { element: String },
    Rect { element: String },
    Click { element: String },
    Actions { body: Value },
    Back,
    Screenshot,
    Source,
    CurrentActivity,
    DeleteSession,
}

impl WireCommand {
    pub fn find_elements(locator: &Locator) -> Self {
        WireCommand::FindElements {
            using: locator.strategy.w3c_name(),
            value: locator.value.clone(),
        }
    }

    /// Touch pointer sequence for a single tap.
    pub fn tap(x: i64, y: i64) -> Self {
        WireCommand::Actions {
            body: json!({
                "actions": [{
                    "type": "pointer",
                    "id": "finger1",
                    "parameters": { "pointerType": "touch" },
                    "actions": [
                        { "type": "pointerMove", "duration": 0, "x": x, "y": y },
                        { "type": "pointerDown", "button": 0 },
                        { "type": "pause", "duration": 100 },
                        { "type": "pointerUp", "button": 0 }
                    ]
                }]
            }),
        }
    }

    /// Short name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            WireCommand::NewSession { .. } => "new_session",
            WireCommand::FindElements { .. } => "find_elements",
            WireCommand::Attribute { .. } => "get_attribute",
            WireCommand::Text { .. } => "get_text",
            WireCommand::Displayed { .. } => "is_displayed",
            WireCommand::Enabled { .. } => "is_enabled",
            WireCommand::Rect { .. } => "get_rect",
            WireCommand::Click { .. } => "click",
            WireCommand::Actions { .. } => "perform_actions",
            WireCommand::Back => "back",
            WireCommand::Screenshot => "screenshot",
            WireCommand::Source => "page_source",
            WireCommand::CurrentActivity => "current_activity",
            WireCommand::DeleteSession => "delete_session",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            WireCommand::NewSession { .. }
            | WireCommand::FindElements { .. }
            | WireCommand::Click { .. }
            | WireCommand::Actions { .. }
            | WireCommand::Back => Method::POST,
            WireCommand::DeleteSession => Method::DELETE,
            _ => Method::GET,
        }
    }

    /// Request path relative to the server root.
    pub fn path(&self, session_id: &str) -> String {
        let base = format!("/session/{}", session_id);
        match self {
            WireCommand::NewSession { .. } => "/session".to_string(),
            WireCommand::FindElements { .. } => format!("{}/elements", base),
            WireCommand::Attribute { element, name } => {
                format!("{}/element/{}/attribute/{}", base, element, name)
            }
            WireCommand::Text { element } => format!("{}/element/{}/text", base, element),
            WireCommand::Displayed { element } => {
                format!("{}/element/{}/displayed", base, element)
            }
            WireCommand::Enabled { element } => format!("{}/element/{}/enabled", base, element),
            WireCommand::Rect { element } => format!("{}/element/{}/rect", base, element),
            WireCommand::Click { element } => format!("{}/element/{}/click", base, element),
            WireCommand::Actions { .. } => format!("{}/actions", base),
            WireCommand::Back => format!("{}/back", base),
            WireCommand::Screenshot => format!("{}/screenshot", base),
            WireCommand::Source => format!("{}/source", base),
            WireCommand::CurrentActivity => format!("{}/appium/device/current_activity", base),
            WireCommand::DeleteSession => base,
        }
    }

    /// JSON body for POST commands.
    pub fn body(&self) -> Option<Value> {
        match self {
            WireCommand::NewSession { body } | WireCommand::Actions { body } => Some(body.clone()),
            WireCommand::FindElements { using, value } => {
                Some(json!({ "using": using, "value": value }))
            }
            WireCommand::Click { .. } | WireCommand::Back => Some(json!({})),
            _ => None,
        }
    }
}

// ============================================================================
// Response envelope handling
// ============================================================================

/// Unwrap a W3C response envelope into its `value`.
///
/// Error envelopes (`{"value": {"error": ..., "message": ...}}`) and
/// non-success statuses become `SessionError::Protocol`.
pub fn parse_response(command: &str, status: u16, body: &str) -> Result<Value, SessionError> {
    let parsed: Value = if body.trim().is_empty() {
        json!({ "value": null })
    } else {
        serde_json::from_str(body).map_err(|e| SessionError::JsonParse {
            context: format!("{} response", command),
            source: e,
        })?
    };

    let value = parsed.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        return Err(SessionError::protocol(command, error, message));
    }

    if !(200..300).contains(&status) {
        return Err(SessionError::protocol(
            command,
            "unknown error",
            format!("HTTP status {}", status),
        ));
    }

    Ok(value)
}

/// Extract element references from a `find elements` value.
pub fn parse_element_refs(command: &str, value: &Value) -> Result<Vec<ElementRef>, SessionError> {
    let items = value.as_array().ok_or_else(|| SessionError::MalformedResponse {
        command: command.to_string(),
        detail: "expected an array of element references".into(),
    })?;

    items
        .iter()
        .map(|item| {
            item.get(W3C_ELEMENT_KEY)
                .or_else(|| item.get(LEGACY_ELEMENT_KEY))
                .and_then(Value::as_str)
                .map(ElementRef::new)
                .ok_or_else(|| SessionError::MalformedResponse {
                    command: command.to_string(),
                    detail: format!("element reference without id: {}", item),
                })
        })
        .collect()
}

/// Extract a rectangle from a `get rect` value.
pub fn parse_rect(command: &str, value: &Value) -> Result<Bounds, SessionError> {
    let field = |name: &str| -> Result<i64, SessionError> {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v.round() as i64)
            .ok_or_else(|| SessionError::MalformedResponse {
                command: command.to_string(),
                detail: format!("rect without '{}'", name),
            })
    };

    Ok(Bounds {
        x: field("x")?,
        y: field("y")?,
        width: field("width")?,
        height: field("height")?,
    })
}

/// Extract the session id from a `new session` value.
pub fn parse_session_id(value: &Value) -> Result<String, SessionError> {
    value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SessionError::MalformedResponse {
            command: "new_session".into(),
            detail: "no sessionId in response".into(),
        })
}

fn expect_bool(command: &str, value: &Value) -> Result<bool, SessionError> {
    value.as_bool().ok_or_else(|| SessionError::MalformedResponse {
        command: command.to_string(),
        detail: format!("expected boolean, got {}", value),
    })
}

fn expect_string(command: &str, value: &Value) -> Result<String, SessionError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SessionError::MalformedResponse {
            command: command.to_string(),
            detail: format!("expected string, got {}", value),
        })
}

// ============================================================================
// AppiumSession
// ============================================================================

/// A live session on an Appium server, spoken to over HTTP.
///
/// Created with `connect()`, released with `quit()` or on drop.
pub struct AppiumSession {
    client: reqwest::blocking::Client,
    server_url: String,
    session_id: Option<String>,
}

impl AppiumSession {
    /// Open a new session with the configured capabilities.
    pub fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SessionError::Transport {
                command: "new_session".into(),
                source: e,
            })?;

        let mut session = AppiumSession {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
            session_id: None,
        };

        info!(server = %session.server_url, "creating automation session");
        let command = WireCommand::NewSession {
            body: config.capabilities.to_new_session_body(),
        };
        let value = session.execute(&command, "")?;
        let id = parse_session_id(&value)?;
        info!(session_id = %id, "session created");
        session.session_id = Some(id);

        Ok(session)
    }

    /// Id of the live session, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn send(&self, command: &WireCommand) -> Result<Value, SessionError> {
        let id = self
            .session_id
            .as_deref()
            .ok_or_else(|| SessionError::NoSession(command.name().to_string()))?;
        self.execute(command, id)
    }

    fn execute(&self, command: &WireCommand, session_id: &str) -> Result<Value, SessionError> {
        let url = format!("{}{}", self.server_url, command.path(session_id));
        debug!(command = command.name(), %url, "sending");

        let mut request = self.client.request(command.method(), &url);
        if let Some(body) = command.body() {
            request = request.json(&body);
        }

        let response = request.send().map_err(|e| SessionError::Transport {
            command: command.name().to_string(),
            source: e,
        })?;

        let status = response.status().as_u16();
        let text = response.text().map_err(|e| SessionError::Transport {
            command: command.name().to_string(),
            source: e,
        })?;

        parse_response(command.name(), status, &text)
    }
}

impl AutomationSession for AppiumSession {
    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        let command = WireCommand::find_elements(locator);
        let value = self.send(&command)?;
        parse_element_refs(command.name(), &value)
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let command = WireCommand::Attribute {
            element: element.id().to_string(),
            name: name.to_string(),
        };
        let value = self.send(&command)?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, SessionError> {
        let command = WireCommand::Text {
            element: element.id().to_string(),
        };
        let value = self.send(&command)?;
        expect_string(command.name(), &value)
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, SessionError> {
        let command = WireCommand::Displayed {
            element: element.id().to_string(),
        };
        let value = self.send(&command)?;
        expect_bool(command.name(), &value)
    }

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, SessionError> {
        let command = WireCommand::Enabled {
            element: element.id().to_string(),
        };
        let value = self.send(&command)?;
        expect_bool(command.name(), &value)
    }

    fn rect(&mut self, element: &ElementRef) -> Result<Bounds, SessionError> {
        let command = WireCommand::Rect {
            element: element.id().to_string(),
        };
        let value = self.send(&command)?;
        parse_rect(command.name(), &value)
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        self.send(&WireCommand::Click {
            element: element.id().to_string(),
        })?;
        Ok(())
    }

    fn tap(&mut self, x: i64, y: i64) -> Result<(), SessionError> {
        self.send(&WireCommand::tap(x, y))?;
        Ok(())
    }

    fn back(&mut self) -> Result<(), SessionError> {
        self.send(&WireCommand::Back)?;
        Ok(())
    }

    fn screenshot_png(&mut self) -> Result<Vec<u8>, SessionError> {
        let command = WireCommand::Screenshot;
        let value = self.send(&command)?;
        let encoded = expect_string(command.name(), &value)?;
        Ok(STANDARD.decode(encoded.trim())?)
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        let command = WireCommand::Source;
        let value = self.send(&command)?;
        expect_string(command.name(), &value)
    }

    fn current_screen_id(&mut self) -> Result<String, SessionError> {
        let command = WireCommand::CurrentActivity;
        let value = self.send(&command)?;
        expect_string(command.name(), &value)
    }

    fn quit(&mut self) -> Result<(), SessionError> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        info!(session_id = %id, "releasing session");
        self.execute(&WireCommand::DeleteSession, &id)?;
        Ok(())
    }
}

impl Drop for AppiumSession {
    fn drop(&mut self) {
        if self.session_id.is_some() {
            if let Err(e) = self.quit() {
                warn!("failed to release session on drop: {}", e);
            }
        }
    }
}
