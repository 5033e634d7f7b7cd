//! Shared helpers for the integration tests

use async_trait::async_trait;
use dashprobe::cdp::{CdpClient, CdpClientImpl, CdpWebSocketConnection};
use dashprobe::config::Config;
use dashprobe::readiness::ReadinessCondition;
use dashprobe::recorder::CaptureArtifact;
use dashprobe::scenario::{Interaction, Scenario, SessionFactory, Step};
use dashprobe::session::Session;
use dashprobe::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fresh artifact directory under the system temp dir
pub fn temp_artifact_dir() -> PathBuf {
    std::env::temp_dir().join(format!("dashprobe-it-{}", uuid::Uuid::new_v4()))
}

/// Configuration tuned for fast test runs: tight polling, no settle-delay,
/// short timeouts. Tests that exercise settle or timeout behavior override
/// the fields they care about.
pub fn test_config(artifact_dir: &Path) -> Config {
    let mut config = Config::default();
    config.artifact_dir = artifact_dir.to_path_buf();
    config.poll_interval_ms = 50;
    config.settle_delay_ms = 0;
    config.condition_timeout_ms = 5000;
    config.navigation_timeout_ms = 5000;
    config
}

pub fn navigate_step(url: &str) -> Step {
    Step::Navigate {
        url: url.to_string(),
        timeout_ms: None,
        wait_until: None,
    }
}

pub fn gate_step(conditions: Vec<ReadinessCondition>) -> Step {
    Step::AwaitReadiness { conditions }
}

pub fn screenshot_step(path: &str) -> Step {
    Step::Capture {
        artifact: CaptureArtifact::screenshot(path),
    }
}

pub fn element_screenshot_step(selector: &str, path: &str) -> Step {
    Step::Capture {
        artifact: CaptureArtifact::element_screenshot(selector, path),
    }
}

pub fn console_log_step() -> Step {
    Step::Capture {
        artifact: CaptureArtifact::console_log(),
    }
}

pub fn select_option_step(selector: &str, index: usize) -> Step {
    Step::Interact {
        action: Interaction::SelectOption {
            selector: selector.to_string(),
            index,
        },
    }
}

pub fn click_step(selector: &str) -> Step {
    Step::Interact {
        action: Interaction::Click {
            selector: selector.to_string(),
        },
    }
}

pub fn scenario_named(name: &str, steps: Vec<Step>) -> Scenario {
    Scenario {
        name: name.to_string(),
        launch: Default::default(),
        steps,
    }
}

/// Session factory that attaches every scenario to one DevTools endpoint
/// instead of launching a browser
#[derive(Debug)]
pub struct WsSessionFactory {
    ws_url: String,
}

impl WsSessionFactory {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

#[async_trait]
impl SessionFactory for WsSessionFactory {
    async fn create(&self, _scenario: &Scenario) -> Result<Session> {
        let transport = CdpWebSocketConnection::connect(&self.ws_url).await?;
        let client: Arc<dyn CdpClient> = Arc::new(CdpClientImpl::new(transport));
        let session = Session::with_client(client)?;
        session.enable_domains().await?;
        Ok(session)
    }
}
