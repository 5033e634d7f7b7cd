//! CDP (Chrome DevTools Protocol) layer traits
//!
//! Abstract interfaces for the transport (one WebSocket to one page target)
//! and the typed client on top of it. Mock implementations live in
//! [`crate::cdp::mock`].

use crate::cdp::types::{Clip, NavigateResult, ScreenshotParams};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

/// CDP event representation
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    pub params: Value,
}

/// CDP transport trait
///
/// One WebSocket connection to one DevTools target: correlated
/// command/response exchange plus event fan-out.
#[async_trait]
pub trait CdpTransport: Send + Sync + std::fmt::Debug {
    /// Send a CDP command and wait for its result payload
    async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value>;

    /// Subscribe to all events arriving on this connection
    fn subscribe_events(&self) -> Result<UnboundedReceiver<CdpEvent>>;

    /// Close the connection; pending commands fail with a closed error
    async fn close(&self) -> Result<()>;

    /// Check if the connection is open
    fn is_open(&self) -> bool;
}

/// CDP client trait
///
/// Typed commands for the operations the harness performs against a page
/// target. All probe scripts return JSON-encoded strings, so string-typed
/// evaluation is the primitive and [`CdpClient::evaluate_json`] parses on top
/// of it.
#[async_trait]
pub trait CdpClient: Send + Sync + std::fmt::Debug {
    /// Navigate to a URL; resolves at navigation commit, not load completion
    async fn navigate(&self, url: &str) -> Result<NavigateResult>;

    /// Evaluate JavaScript that produces a string
    async fn evaluate_string(&self, script: &str) -> Result<String>;

    /// Evaluate JavaScript that produces a JSON-encoded string, parsed here
    async fn evaluate_json(&self, script: &str) -> Result<Value> {
        let raw = self.evaluate_string(script).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Current `document.readyState`
    async fn ready_state(&self) -> Result<String> {
        self.evaluate_string("document.readyState").await
    }

    /// Capture a screenshot, returning decoded image bytes
    async fn capture_screenshot(&self, params: ScreenshotParams) -> Result<Vec<u8>>;

    /// Enable a CDP domain (e.g. "Page", "Runtime")
    async fn enable_domain(&self, domain: &str) -> Result<()>;

    /// Call a raw CDP method
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value>;

    /// Subscribe to events arriving from this target
    fn subscribe_events(&self) -> Result<UnboundedReceiver<CdpEvent>>;

    /// Close the page target and the underlying connection
    async fn close(&self) -> Result<()>;

    /// Check if the client can still issue commands
    fn is_open(&self) -> bool;
}

/// PNG screenshot of the full scrollable page
pub fn full_page_screenshot_params() -> ScreenshotParams {
    ScreenshotParams {
        format: Some("png".to_string()),
        quality: None,
        clip: None,
        capture_beyond_viewport: Some(true),
    }
}

/// PNG screenshot clipped to a page-coordinate region
pub fn clipped_screenshot_params(clip: Clip) -> ScreenshotParams {
    ScreenshotParams {
        format: Some("png".to_string()),
        quality: None,
        clip: Some(clip),
        capture_beyond_viewport: Some(true),
    }
}
