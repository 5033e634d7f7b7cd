//! Diagnostic recorder
//!
//! Persists the artifacts a scenario asks for: screenshots (full-page or
//! element-scoped) written as PNG files, and the console record the session's
//! pump has been accumulating since open. Every attempt, successful or not,
//! leaves an [`ArtifactRecord`] for the run report. On scenario failure the
//! recorder's last act is one best-effort full-page screenshot to a known
//! per-scenario path; errors from that attempt never replace the scenario's
//! own error.

use crate::session::Session;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// What a capture step persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// PNG image of the page or an element
    Screenshot,
    /// The console record accumulated so far
    ConsoleLog,
}

impl ArtifactKind {
    /// Stable label for records and logs
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Screenshot => "screenshot",
            ArtifactKind::ConsoleLog => "console_log",
        }
    }
}

/// What a screenshot covers
///
/// In scenario files: `target = "full_page"` (the default) or
/// `target = { element = ".card.shadow-sm" }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureTarget {
    /// The full scrollable page
    #[default]
    FullPage,
    /// The bounding box of the first match of a selector
    Element(String),
}

impl CaptureTarget {
    /// Stable label for records and logs
    pub fn label(&self) -> String {
        match self {
            CaptureTarget::FullPage => "full_page".to_string(),
            CaptureTarget::Element(selector) => selector.clone(),
        }
    }
}

/// One artifact requested by a scenario capture step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureArtifact {
    /// Artifact kind
    #[serde(rename = "artifact")]
    pub kind: ArtifactKind,
    /// Screenshot coverage; ignored for console logs
    #[serde(default)]
    pub target: CaptureTarget,
    /// Output path, resolved against the artifact directory when relative.
    /// Required for screenshots; optional for console logs (without one the
    /// record is only emitted into the run report).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CaptureArtifact {
    /// Full-page screenshot to `path`
    pub fn screenshot(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ArtifactKind::Screenshot,
            target: CaptureTarget::FullPage,
            path: Some(path.into()),
        }
    }

    /// Element-scoped screenshot to `path`
    pub fn element_screenshot(selector: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ArtifactKind::Screenshot,
            target: CaptureTarget::Element(selector.into()),
            path: Some(path.into()),
        }
    }

    /// Console record, report-only
    pub fn console_log() -> Self {
        Self {
            kind: ArtifactKind::ConsoleLog,
            target: CaptureTarget::FullPage,
            path: None,
        }
    }

    /// Console record, additionally written to `path` (one line per message)
    pub fn console_log_to(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ArtifactKind::ConsoleLog,
            target: CaptureTarget::FullPage,
            path: Some(path.into()),
        }
    }

    /// Check field consistency without performing the capture
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            ArtifactKind::Screenshot => {
                if self.path.is_none() {
                    return Err(Error::scenario("screenshot capture requires a path"));
                }
            }
            ArtifactKind::ConsoleLog => {
                if self.target != CaptureTarget::FullPage {
                    return Err(Error::scenario(
                        "console_log captures the whole record and takes no element target",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Outcome of one capture attempt, kept for the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Artifact kind label
    pub kind: String,
    /// Coverage label ("full_page" or the element selector)
    pub target: String,
    /// Resolved output path, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Whether the capture succeeded
    pub ok: bool,
    /// Size/line-count on success, failure text otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Diagnostic recorder for one scenario run
#[derive(Debug)]
pub struct DiagnosticRecorder {
    scenario: String,
    artifact_dir: PathBuf,
    records: Mutex<Vec<ArtifactRecord>>,
}

impl DiagnosticRecorder {
    /// Recorder writing under `artifact_dir` for the named scenario
    pub fn new(scenario: impl Into<String>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            scenario: scenario.into(),
            artifact_dir: artifact_dir.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Capture attempts so far, in order
    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Perform one capture.
    ///
    /// Screenshot failures are errors (the scenario asked for an image it did
    /// not get). Console-log captures never raise: the record is in-memory
    /// accumulation, and a failed file write is logged and recorded instead.
    pub async fn capture(&self, session: &Session, artifact: &CaptureArtifact) -> Result<()> {
        match artifact.kind {
            ArtifactKind::Screenshot => self.capture_screenshot(session, artifact).await,
            ArtifactKind::ConsoleLog => {
                self.capture_console_log(session, artifact.path.as_deref()).await;
                Ok(())
            }
        }
    }

    /// Best-effort full-page screenshot on scenario failure.
    ///
    /// Writes to `<artifact_dir>/<scenario>-failure.png` and swallows every
    /// secondary error, so the scenario's own error is always the one
    /// reported.
    pub async fn capture_failure_screenshot(&self, session: &Session) -> Option<PathBuf> {
        let path = self.artifact_dir.join(self.failure_name());
        info!("Capturing failure screenshot to {}", path.display());

        let bytes = match session.page().screenshot_full_page().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failure screenshot not captured: {}", e);
                self.record(ArtifactRecord {
                    kind: ArtifactKind::Screenshot.label().to_string(),
                    target: "full_page".to_string(),
                    path: Some(path),
                    ok: false,
                    detail: Some(e.to_string()),
                });
                return None;
            }
        };

        if let Err(e) = write_file(&path, &bytes).await {
            warn!("Failure screenshot not written: {}", e);
            self.record(ArtifactRecord {
                kind: ArtifactKind::Screenshot.label().to_string(),
                target: "full_page".to_string(),
                path: Some(path),
                ok: false,
                detail: Some(e.to_string()),
            });
            return None;
        }

        self.record(ArtifactRecord {
            kind: ArtifactKind::Screenshot.label().to_string(),
            target: "full_page".to_string(),
            path: Some(path.clone()),
            ok: true,
            detail: Some(format!("{} bytes", bytes.len())),
        });
        Some(path)
    }

    async fn capture_screenshot(
        &self,
        session: &Session,
        artifact: &CaptureArtifact,
    ) -> Result<()> {
        let path = artifact
            .path
            .as_deref()
            .ok_or_else(|| Error::capture("screenshot capture requires a path"))?;
        let path = self.resolve(path);

        let result = match &artifact.target {
            CaptureTarget::FullPage => session.page().screenshot_full_page().await,
            CaptureTarget::Element(selector) => session.page().screenshot_element(selector).await,
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record(ArtifactRecord {
                    kind: artifact.kind.label().to_string(),
                    target: artifact.target.label(),
                    path: Some(path),
                    ok: false,
                    detail: Some(e.to_string()),
                });
                return Err(e);
            }
        };

        if let Err(e) = write_file(&path, &bytes).await {
            self.record(ArtifactRecord {
                kind: artifact.kind.label().to_string(),
                target: artifact.target.label(),
                path: Some(path),
                ok: false,
                detail: Some(e.to_string()),
            });
            return Err(e);
        }

        info!(
            "Captured {} screenshot to {} ({} bytes)",
            artifact.target.label(),
            path.display(),
            bytes.len()
        );
        self.record(ArtifactRecord {
            kind: artifact.kind.label().to_string(),
            target: artifact.target.label(),
            path: Some(path),
            ok: true,
            detail: Some(format!("{} bytes", bytes.len())),
        });
        Ok(())
    }

    async fn capture_console_log(&self, session: &Session, path: Option<&Path>) {
        let lines = session.console().snapshot();

        let (resolved, ok, detail) = match path {
            None => (None, true, format!("{} lines", lines.len())),
            Some(path) => {
                let resolved = self.resolve(path);
                let mut content = lines.join("\n");
                if !content.is_empty() {
                    content.push('\n');
                }
                match write_file(&resolved, content.as_bytes()).await {
                    Ok(()) => {
                        info!(
                            "Captured console log to {} ({} lines)",
                            resolved.display(),
                            lines.len()
                        );
                        (Some(resolved), true, format!("{} lines", lines.len()))
                    }
                    Err(e) => {
                        warn!("Console log not written: {}", e);
                        (Some(resolved), false, e.to_string())
                    }
                }
            }
        };

        self.record(ArtifactRecord {
            kind: ArtifactKind::ConsoleLog.label().to_string(),
            target: "full_page".to_string(),
            path: resolved,
            ok,
            detail: Some(detail),
        });
    }

    /// Relative paths land under the artifact directory
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.artifact_dir.join(path)
        }
    }

    fn failure_name(&self) -> String {
        let slug: String = self
            .scenario
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}-failure.png", slug.trim_matches('-'))
    }

    fn record(&self, record: ArtifactRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Write `bytes` to `path`, creating parent directories as needed
async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::capture(format!("create {}: {}", parent.display(), e))
            })?;
        }
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| Error::capture(format!("write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::{MockCdpClient, MockElement};
    use std::sync::Arc;
    use std::time::Duration;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("dashprobe-test-{}", uuid::Uuid::new_v4()))
    }

    fn mock_session(client: &Arc<MockCdpClient>) -> Session {
        Session::with_client(client.clone()).expect("Failed to build session")
    }

    #[tokio::test]
    async fn test_screenshot_capture_writes_file() {
        let dir = temp_dir();
        let client = Arc::new(MockCdpClient::new());
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("dashboard", &dir);

        recorder
            .capture(&session, &CaptureArtifact::screenshot("shot.png"))
            .await
            .expect("Failed to capture");

        let written = tokio::fs::metadata(dir.join("shot.png"))
            .await
            .expect("Screenshot file missing");
        assert!(written.len() > 0);

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].ok);
        assert_eq!(records[0].kind, "screenshot");

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_element_capture_fails_when_target_missing() {
        let dir = temp_dir();
        let client = Arc::new(MockCdpClient::new());
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("dashboard", &dir);

        let err = recorder
            .capture(
                &session,
                &CaptureArtifact::element_screenshot("#gone", "gone.png"),
            )
            .await
            .expect_err("Capture of a missing element should fail");

        assert!(matches!(err, Error::Capture(_)));
        assert!(tokio::fs::metadata(dir.join("gone.png")).await.is_err());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].ok);
        assert_eq!(records[0].target, "#gone");

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_element_capture_writes_clipped_image() {
        let dir = temp_dir();
        let client = Arc::new(
            MockCdpClient::new()
                .element(".card.shadow-sm", MockElement::visible_now().with_rect(0.0, 50.0, 400.0, 300.0)),
        );
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("dashboard", &dir);

        recorder
            .capture(
                &session,
                &CaptureArtifact::element_screenshot(".card.shadow-sm", "cards.png"),
            )
            .await
            .expect("Failed to capture element");

        assert!(tokio::fs::metadata(dir.join("cards.png")).await.is_ok());
        assert!(client.command_log().iter().any(|c| c.name == "screenshot:clip"));

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_console_log_capture_never_raises() {
        let dir = temp_dir();
        let client = Arc::new(MockCdpClient::new());
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("tools", &dir);

        client.push_console_log("first line");
        client.push_console_log("second line");
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Report-only capture
        recorder
            .capture(&session, &CaptureArtifact::console_log())
            .await
            .expect("Report-only console capture cannot fail");

        // File capture
        recorder
            .capture(&session, &CaptureArtifact::console_log_to("console.log"))
            .await
            .expect("Console file capture should succeed");
        let content = tokio::fs::read_to_string(dir.join("console.log"))
            .await
            .expect("Console log file missing");
        assert_eq!(content, "first line\nsecond line\n");

        // A write failure is recorded, not raised: the target's parent is a file
        tokio::fs::write(dir.join("blocker"), b"x").await.unwrap();
        recorder
            .capture(
                &session,
                &CaptureArtifact::console_log_to("blocker/console.log"),
            )
            .await
            .expect("Console capture must not raise on write failure");

        let records = recorder.records();
        assert_eq!(records.len(), 3);
        assert!(records[0].ok);
        assert!(records[1].ok);
        assert!(!records[2].ok);

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failure_screenshot_goes_to_known_path() {
        let dir = temp_dir();
        let client = Arc::new(MockCdpClient::new());
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("Dashboard Check", &dir);

        let path = recorder
            .capture_failure_screenshot(&session)
            .await
            .expect("Failure screenshot should be captured");

        assert_eq!(path, dir.join("dashboard-check-failure.png"));
        assert!(tokio::fs::metadata(&path).await.is_ok());

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failure_screenshot_swallows_secondary_errors() {
        let dir = temp_dir();
        let client = Arc::new(MockCdpClient::new().failing_screenshots());
        let session = mock_session(&client);
        let recorder = DiagnosticRecorder::new("dashboard", &dir);

        let path = recorder.capture_failure_screenshot(&session).await;
        assert!(path.is_none());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].ok);

        session.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_artifact_validation() {
        let mut screenshot = CaptureArtifact::screenshot("a.png");
        assert!(screenshot.validate().is_ok());
        screenshot.path = None;
        assert!(screenshot.validate().is_err());

        assert!(CaptureArtifact::console_log().validate().is_ok());
        let mut console = CaptureArtifact::console_log_to("c.log");
        assert!(console.validate().is_ok());
        console.target = CaptureTarget::Element("#x".to_string());
        assert!(console.validate().is_err());
    }
}
