use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::explorer::exploration::ExplorationRun;
use crate::explorer::test_generator::GeneratedPlan;
use crate::report::console::format_console_report;
use crate::report::html::{generate_exploration_html, generate_html_report, generate_snapshot_html};
use crate::report::junit::generate_junit_xml;
use crate::report::report_model::{ReportFormat, SuiteReport};
use crate::scenario::scenario_model::Scenario;
use crate::screen::screen_model::ScreenSnapshot;
use crate::screen::snapshot::file_slug;

/// Screenshots live in this directory under the artifact root, so HTML
/// reports can reference them relatively.
pub const SCREENSHOT_SUBDIR: &str = "screenshots";

pub const INTERACTION_LOG: &str = "interactions.jsonl";
pub const PAGE_OBJECTS_FILE: &str = "page_objects.yaml";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode JSON for '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML error in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no scenario files found in '{}'", .0.display())]
    NoScenarios(PathBuf),
}

// ============================================================================
// Artifact writer
// ============================================================================

/// Writes every output of a command under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.root.join(SCREENSHOT_SUBDIR)
    }

    pub fn interaction_log_path(&self) -> PathBuf {
        self.root.join(INTERACTION_LOG)
    }

    pub fn write_text(&self, name: &str, content: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.root.join(name);
        write_file(&path, content.as_bytes())?;
        debug!(path = %path.display(), "artifact written");
        Ok(path)
    }

    pub fn write_json<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.root.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Json {
            path: path.clone(),
            source,
        })?;
        self.write_text(name, &json)
    }

    pub fn write_yaml<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.root.join(name);
        let yaml = serde_yaml::to_string(value).map_err(|source| ArtifactError::Yaml {
            path: path.clone(),
            source,
        })?;
        self.write_text(name, &yaml)
    }

    /// `snapshot.json` and `snapshot.html`.
    pub fn write_snapshot(&self, snapshot: &ScreenSnapshot) -> Result<Vec<PathBuf>, ArtifactError> {
        Ok(vec![
            self.write_json("snapshot.json", snapshot)?,
            self.write_text("snapshot.html", &generate_snapshot_html(snapshot))?,
        ])
    }

    /// `exploration.json` and `exploration.html`.
    pub fn write_exploration(&self, run: &ExplorationRun) -> Result<Vec<PathBuf>, ArtifactError> {
        Ok(vec![
            self.write_json("exploration.json", run)?,
            self.write_text("exploration.html", &generate_exploration_html(run))?,
        ])
    }

    /// Page objects into one file, then each scenario as `NNN_<slug>.yaml`.
    pub fn write_plan(&self, plan: &GeneratedPlan) -> Result<Vec<PathBuf>, ArtifactError> {
        let mut written = vec![self.write_yaml(PAGE_OBJECTS_FILE, &plan.page_objects)?];
        for (i, scenario) in plan.scenarios.iter().enumerate() {
            let name = scenario_file_name(i + 1, &scenario.name);
            written.push(self.write_yaml(&name, scenario)?);
        }
        info!(
            dir = %self.root.display(),
            page_objects = plan.page_objects.len(),
            scenarios = plan.scenarios.len(),
            "generated plan written"
        );
        Ok(written)
    }
}

/// `001_smoke_specimen.yaml`
pub fn scenario_file_name(index: usize, scenario_name: &str) -> String {
    format!("{:03}_{}.yaml", index, file_slug(scenario_name))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let io = |source: std::io::Error| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, bytes).map_err(io)
}

// ============================================================================
// Scenario loading and suite rendering
// ============================================================================

/// Load one scenario file, or every `.yaml`/`.yml` file in a directory in
/// file-name order.
pub fn load_scenarios(path: &Path) -> Result<Vec<(PathBuf, Scenario)>, ArtifactError> {
    let files = if path.is_dir() {
        let entries = std::fs::read_dir(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
                    && p.file_name().and_then(|n| n.to_str()) != Some(PAGE_OBJECTS_FILE)
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(ArtifactError::NoScenarios(path.to_path_buf()));
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    files
        .into_iter()
        .map(|file| {
            let content = std::fs::read_to_string(&file).map_err(|source| ArtifactError::Io {
                path: file.clone(),
                source,
            })?;
            let scenario: Scenario =
                serde_yaml::from_str(&content).map_err(|source| ArtifactError::Yaml {
                    path: file.clone(),
                    source,
                })?;
            Ok((file, scenario))
        })
        .collect()
}

/// Render a suite report in the requested format.
pub fn render_suite(report: &SuiteReport, format: ReportFormat) -> Result<String, ArtifactError> {
    Ok(match format {
        ReportFormat::Console => format_console_report(report),
        ReportFormat::Html => generate_html_report(report),
        ReportFormat::Junit => generate_junit_xml(report),
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).map_err(|source| ArtifactError::Json {
                path: PathBuf::from(&report.suite_name),
                source,
            })?
        }
    })
}
