//! CDP client implementation
//!
//! Typed commands over a [`CdpTransport`]. The client stays at protocol
//! level: navigation resolves at commit (load completion is the page layer's
//! business), evaluation unwraps remote objects and surfaces thrown
//! exceptions, screenshots come back as decoded bytes.

use super::traits::{CdpClient, CdpEvent, CdpTransport};
use super::types::{EvaluateParams, EvaluateResponse, NavigateParams, NavigateResult, ScreenshotParams};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP transport
    transport: Arc<dyn CdpTransport>,
}

impl CdpClientImpl {
    /// Create a new CDP client over an established transport
    pub fn new(transport: Arc<dyn CdpTransport>) -> Self {
        Self { transport }
    }

    /// The underlying transport
    pub fn transport(&self) -> Arc<dyn CdpTransport> {
        Arc::clone(&self.transport)
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    async fn navigate(&self, url: &str) -> Result<NavigateResult> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
        };
        let result = self
            .transport
            .send_command("Page.navigate", Some(serde_json::to_value(params)?))
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    async fn evaluate_string(&self, script: &str) -> Result<String> {
        debug!("Evaluating script ({} bytes)", script.len());

        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(true),
            return_by_value: Some(true),
        };
        let result = self
            .transport
            .send_command("Runtime.evaluate", Some(serde_json::to_value(params)?))
            .await?;
        let response: EvaluateResponse = serde_json::from_value(result)?;

        if let Some(details) = response.exception_details {
            return Err(Error::cdp(format!(
                "Script threw: {} (line {})",
                details.describe(),
                details.line_number
            )));
        }

        match response.result.r#type.as_str() {
            "string" => Ok(response
                .result
                .value
                .as_ref()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()),
            other => Err(Error::cdp(format!(
                "Expected string evaluation result, got {} ({})",
                other,
                response.result.display_text()
            ))),
        }
    }

    async fn capture_screenshot(&self, params: ScreenshotParams) -> Result<Vec<u8>> {
        debug!("Capturing screenshot");

        let result = self
            .transport
            .send_command("Page.captureScreenshot", Some(serde_json::to_value(params)?))
            .await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("Screenshot response missing data field"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot payload: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<()> {
        debug!("Enabling {} domain", domain);
        self.transport
            .send_command(&format!("{}.enable", domain), None)
            .await?;
        Ok(())
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.transport.send_command(method, params).await
    }

    fn subscribe_events(&self) -> Result<UnboundedReceiver<CdpEvent>> {
        self.transport.subscribe_events()
    }

    async fn close(&self) -> Result<()> {
        if self.transport.is_open() {
            // Best effort; the browser may already be tearing the target down
            if let Err(e) = self.transport.send_command("Page.close", None).await {
                warn!("Page.close failed: {}", e);
            }
        }
        self.transport.close().await
    }

    fn is_open(&self) -> bool {
        self.transport.is_open()
    }
}
