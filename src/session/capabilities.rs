use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Default Appium server endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

// ============================================================================
// Session creation parameters
// ============================================================================

/// Desired capabilities for a new device-automation session.
///
/// Serialized with the `appium:` vendor prefix for everything except
/// `platformName`, as required by W3C-mode Appium servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Target platform (default "Android")
    #[serde(default = "default_platform")]
    pub platform_name: String,

    /// Device selector, e.g. "emulator-5554" or "Android Emulator"
    #[serde(default)]
    pub device_name: Option<String>,

    /// Exact device serial, when several devices are attached
    #[serde(default)]
    pub udid: Option<String>,

    /// Path to the application binary (.apk)
    #[serde(default)]
    pub app: Option<String>,

    /// Package of an already-installed application
    #[serde(default)]
    pub app_package: Option<String>,

    /// Launch activity of an already-installed application
    #[serde(default)]
    pub app_activity: Option<String>,

    /// Automation backend name (default "UiAutomator2")
    #[serde(default = "default_automation")]
    pub automation_name: String,

    /// Seconds of client inactivity before the server ends the session
    #[serde(default = "default_command_timeout")]
    pub new_command_timeout_secs: u64,

    /// Keep application data between sessions
    #[serde(default = "default_true")]
    pub no_reset: bool,

    /// Uninstall and reinstall the application around the session
    #[serde(default)]
    pub full_reset: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            platform_name: default_platform(),
            device_name: None,
            udid: None,
            app: None,
            app_package: None,
            app_activity: None,
            automation_name: default_automation(),
            new_command_timeout_secs: default_command_timeout(),
            no_reset: true,
            full_reset: false,
        }
    }
}

fn default_platform() -> String { "Android".to_string() }
fn default_automation() -> String { "UiAutomator2".to_string() }
fn default_command_timeout() -> u64 { 300 }
fn default_true() -> bool { true }

impl Capabilities {
    /// Build the body of a W3C `POST /session` request.
    pub fn to_new_session_body(&self) -> Value {
        let mut caps = Map::new();
        caps.insert("platformName".into(), json!(self.platform_name));
        caps.insert("appium:automationName".into(), json!(self.automation_name));
        caps.insert(
            "appium:newCommandTimeout".into(),
            json!(self.new_command_timeout_secs),
        );
        caps.insert("appium:noReset".into(), json!(self.no_reset));
        caps.insert("appium:fullReset".into(), json!(self.full_reset));

        let optional = [
            ("appium:deviceName", &self.device_name),
            ("appium:udid", &self.udid),
            ("appium:app", &self.app),
            ("appium:appPackage", &self.app_package),
            ("appium:appActivity", &self.app_activity),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                caps.insert(key.into(), json!(v));
            }
        }

        json!({
            "capabilities": {
                "alwaysMatch": Value::Object(caps),
                "firstMatch": [{}]
            }
        })
    }
}

/// Everything needed to open a session: where the server is and what to ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server_url: String,
    pub capabilities: Capabilities,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            capabilities: Capabilities::default(),
        }
    }
}
