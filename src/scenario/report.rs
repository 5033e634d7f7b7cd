//! Run reports
//!
//! Machine-readable results of a scenario run: one record per scenario plus
//! run-level counts, written as pretty JSON for CI pipelines to archive and
//! inspect.

use crate::recorder::ArtifactRecord;
use crate::scenario::model::ScenarioState;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Done,
    Failed,
}

/// Machine-readable result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Terminal outcome
    pub status: ScenarioStatus,
    /// The state the scenario had reached when it finished or failed
    pub final_state: ScenarioState,
    /// One-based index of the failing step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<usize>,
    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable failure kind label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Wall-clock duration of the scenario in milliseconds
    pub elapsed_ms: u64,
    /// Artifact capture attempts, in order
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
    /// Console messages accumulated over the whole scenario
    #[serde(default)]
    pub console: Vec<String>,
    /// Diagnostic screenshot taken after a failure, when one could be written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_screenshot: Option<PathBuf>,
}

impl ScenarioReport {
    /// Report for a scenario whose steps all succeeded
    pub fn passed(name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Done,
            final_state: ScenarioState::Done,
            failed_step: None,
            error: None,
            error_kind: None,
            elapsed_ms: elapsed.as_millis() as u64,
            artifacts: Vec::new(),
            console: Vec::new(),
            failure_screenshot: None,
        }
    }

    /// Report for a scenario that failed at `failed_step` while in
    /// `reached`, the last state before the failing step.
    pub fn failed(
        name: impl Into<String>,
        reached: ScenarioState,
        failed_step: Option<usize>,
        error: &Error,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Failed,
            final_state: reached,
            failed_step,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            elapsed_ms: elapsed.as_millis() as u64,
            artifacts: Vec::new(),
            console: Vec::new(),
            failure_screenshot: None,
        }
    }

    /// Attach artifact records
    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactRecord>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Attach the console record
    pub fn with_console(mut self, console: Vec<String>) -> Self {
        self.console = console;
        self
    }

    /// Attach the failure screenshot path, if one was written
    pub fn with_failure_screenshot(mut self, path: Option<PathBuf>) -> Self {
        self.failure_screenshot = path;
        self
    }

    /// Whether the scenario finished without a failure
    pub fn is_passed(&self) -> bool {
        self.status == ScenarioStatus::Done
    }
}

/// Aggregated result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run start, RFC 3339
    pub started_at: String,
    /// Run end, RFC 3339
    pub finished_at: String,
    /// Number of scenarios run
    pub total: usize,
    /// Number of scenarios that finished in `done`
    pub passed: usize,
    /// Number of scenarios that finished in `failed`
    pub failed: usize,
    /// Per-scenario reports, in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// Aggregate per-scenario reports into a run report
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        scenarios: Vec<ScenarioReport>,
    ) -> Self {
        let passed = scenarios.iter().filter(|report| report.is_passed()).count();
        Self {
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            total: scenarios.len(),
            passed,
            failed: scenarios.len() - passed,
            scenarios,
        }
    }

    /// Whether every scenario passed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as pretty JSON, creating parent directories
    pub async fn write_to_path(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::configuration(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }
        tokio::fs::write(path, payload)
            .await
            .map_err(|e| Error::configuration(format!("write {}: {}", path.display(), e)))?;
        info!("Run report written to {}", path.display());
        Ok(())
    }
}
