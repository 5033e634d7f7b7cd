//! CDP (Chrome DevTools Protocol) type definitions
//!
//! Wire structures for the JSON-RPC traffic the harness exchanges with the
//! browser, plus typed parameter/result payloads for the commands and events
//! it uses.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Session ID for multi-session targets
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Session ID for multi-session targets
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// Result of `Page.navigate`: the navigation has been committed (or refused),
/// not yet loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct NavigateResult {
    /// Frame the navigation happened in
    #[serde(rename = "frameId")]
    pub frame_id: String,
    /// Loader identity, absent for same-document navigations
    #[serde(default, rename = "loaderId")]
    pub loader_id: Option<String>,
    /// Set when the navigation was refused (e.g. net::ERR_CONNECTION_REFUSED)
    #[serde(default, rename = "errorText")]
    pub error_text: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await a returned promise
    #[serde(skip_serializing_if = "Option::is_none", rename = "awaitPromise")]
    pub await_promise: Option<bool>,
    /// Whether to return the result by value
    #[serde(skip_serializing_if = "Option::is_none", rename = "returnByValue")]
    pub return_by_value: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteObject {
    /// Human-readable rendering, used for console lines and diagnostics
    pub fn display_text(&self) -> String {
        if let Some(value) = &self.value {
            match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        } else if let Some(description) = &self.description {
            description.clone()
        } else {
            format!("<{}>", self.r#type)
        }
    }
}

/// Exception details attached to a failed evaluation or a thrown page error
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    /// Exception text
    #[serde(default)]
    pub text: Option<String>,
    /// Line number
    #[serde(default, rename = "lineNumber")]
    pub line_number: i32,
    /// Column number
    #[serde(default, rename = "columnNumber")]
    pub column_number: i32,
    /// Exception object
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best available description of the thrown value
    pub fn describe(&self) -> String {
        if let Some(exception) = &self.exception {
            exception.display_text()
        } else if let Some(text) = &self.text {
            text.clone()
        } else {
            "Uncaught exception".to_string()
        }
    }
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation threw
    #[serde(default, rename = "exceptionDetails")]
    pub exception_details: Option<ExceptionDetails>,
}

/// Screenshot parameters for `Page.captureScreenshot`
#[derive(Debug, Clone, Serialize)]
pub struct ScreenshotParams {
    /// Image format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// JPEG quality (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    /// Region to capture, in page coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
    /// Capture the full scrollable page rather than the viewport
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "captureBeyondViewport"
    )]
    pub capture_beyond_viewport: Option<bool>,
}

/// Clip region for screenshot
#[derive(Debug, Clone, Serialize)]
pub struct Clip {
    /// X offset
    pub x: f64,
    /// Y offset
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Page scale factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// Parameters of a `Runtime.consoleAPICalled` event
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleApiCalledParams {
    /// Call type ("log", "warning", "error", ...)
    pub r#type: String,
    /// Call arguments
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

impl ConsoleApiCalledParams {
    /// The message text: stringified arguments joined with spaces
    pub fn message_text(&self) -> String {
        self.args
            .iter()
            .map(RemoteObject::display_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parameters of a `Runtime.exceptionThrown` event
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionThrownParams {
    /// Details of the uncaught exception
    #[serde(rename = "exceptionDetails")]
    pub exception_details: ExceptionDetails,
}

/// Parameters of a `Page.lifecycleEvent` notification
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleEventParams {
    /// Frame the event belongs to
    #[serde(rename = "frameId")]
    pub frame_id: String,
    /// Lifecycle phase name ("DOMContentLoaded", "load", "networkIdle", ...)
    pub name: String,
}
