use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::explorer::exploration::ExplorerConfig;
use crate::screen::snapshot::DiscoveryConfig;
use crate::session::capabilities::{Capabilities, DEFAULT_SERVER_URL, SessionConfig};

/// Config file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "screen-discovery.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "screen-discovery",
    version,
    about = "Discover, explore and replay Android app screens over Appium"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: screen-discovery.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Appium server URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Path to the application binary to install and launch
    #[arg(long, global = true)]
    pub app: Option<String>,

    /// Device name or serial
    #[arg(long, global = true)]
    pub device: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture the current screen once
    Inspect {
        /// Output directory (default: artifacts dir from config)
        #[arg(long)]
        out: Option<String>,
    },

    /// Click through the start screen one level deep
    Explore {
        /// Maximum start-screen elements to click
        #[arg(long)]
        max_clicks: Option<usize>,

        /// Maximum nodes processed per element kind
        #[arg(long)]
        max_per_kind: Option<usize>,

        /// Settle time after each click and back, in ms
        #[arg(long)]
        settle_ms: Option<u64>,

        /// Output directory (default: artifacts dir from config)
        #[arg(long)]
        out: Option<String>,
    },

    /// Explore, then write page objects and smoke scenarios
    Generate {
        /// Output directory for generated YAML
        #[arg(short, long, default_value = "scenarios/generated")]
        output_dir: String,

        /// Maximum start-screen elements to click
        #[arg(long)]
        max_clicks: Option<usize>,
    },

    /// Run scenarios from YAML files
    Run {
        /// Path to a scenario YAML file or a directory of them
        #[arg(long)]
        scenario: String,

        /// Output format: console, html, junit, json
        #[arg(long)]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `screen-discovery.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub explore: ExploreSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    #[serde(default = "default_max_per_kind")]
    pub max_per_kind: usize,

    /// Save a screenshot with every snapshot
    #[serde(default = "default_true")]
    pub screenshots: bool,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            max_per_kind: default_max_per_kind(),
            screenshots: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreSection {
    #[serde(default = "default_max_clicks")]
    pub max_clicks: usize,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_true")]
    pub verify_back: bool,
}

impl Default for ExploreSection {
    fn default() -> Self {
        Self {
            max_clicks: default_max_clicks(),
            settle_ms: default_settle_ms(),
            verify_back: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_console")]
    pub format: String,

    pub output: Option<String>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            format: default_console(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default = "default_artifacts_dir")]
    pub dir: String,
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

// Serde default helpers
fn default_server_url() -> String { DEFAULT_SERVER_URL.to_string() }
fn default_max_per_kind() -> usize { 20 }
fn default_max_clicks() -> usize { 5 }
fn default_settle_ms() -> u64 { 1500 }
fn default_true() -> bool { true }
fn default_console() -> String { "console".to_string() }
fn default_artifacts_dir() -> String { "artifacts".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring malformed config '{}': {}", config_path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Session parameters: CLI flags override the config file.
pub fn build_session_config(
    config: &AppConfig,
    server: Option<&str>,
    app: Option<&str>,
    device: Option<&str>,
) -> SessionConfig {
    let mut capabilities = config.capabilities.clone();
    if let Some(app) = app {
        capabilities.app = Some(app.to_string());
    }
    if let Some(device) = device {
        capabilities.device_name = Some(device.to_string());
    }

    SessionConfig {
        server_url: server.unwrap_or(&config.server.url).to_string(),
        capabilities,
    }
}

/// Discovery options; screenshots go to `screenshot_dir` when enabled.
pub fn build_discovery_config(
    config: &AppConfig,
    max_per_kind: Option<usize>,
    screenshot_dir: PathBuf,
) -> DiscoveryConfig {
    DiscoveryConfig {
        max_per_kind: max_per_kind.unwrap_or(config.discovery.max_per_kind),
        screenshot_dir: config.discovery.screenshots.then_some(screenshot_dir),
    }
}

pub fn build_explorer_config(
    config: &AppConfig,
    max_clicks: Option<usize>,
    settle_ms: Option<u64>,
    discovery: DiscoveryConfig,
) -> ExplorerConfig {
    ExplorerConfig {
        max_clicks: max_clicks.unwrap_or(config.explore.max_clicks),
        settle_ms: settle_ms.unwrap_or(config.explore.settle_ms),
        verify_back: config.explore.verify_back,
        discovery,
    }
}
