//! Unified error types for dashprobe

use std::time::Duration;
use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for dashprobe
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Browser could not be started or attached to
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Page load failed or exceeded its timeout
    #[error("Navigation to {url} failed after {elapsed_ms}ms: {reason}")]
    Navigation {
        url: String,
        elapsed_ms: u64,
        reason: String,
    },

    /// A readiness condition never held within its timeout
    #[error(
        "Readiness timeout: {predicate} on {selector} not satisfied after \
         {elapsed_ms}ms (budget {timeout_ms}ms, last state: {last_state})"
    )]
    ReadinessTimeout {
        selector: String,
        predicate: String,
        elapsed_ms: u64,
        timeout_ms: u64,
        last_state: String,
    },

    /// A diagnostic artifact could not be produced
    #[error("Capture failed: {0}")]
    Capture(String),

    /// A requested UI action could not be performed
    #[error("Interaction with {selector} failed: {reason}")]
    Interaction { selector: String, reason: String },

    /// Operation attempted on a closed session or connection
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Command timeout at the transport level
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Scenario definition is malformed or violates step ordering
    #[error("Invalid scenario: {0}")]
    Scenario(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new launch error
    pub fn launch<S: Into<String>>(msg: S) -> Self {
        Error::Launch(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation(
        url: impl Into<String>,
        elapsed: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Error::Navigation {
            url: url.into(),
            elapsed_ms: elapsed.as_millis() as u64,
            reason: reason.into(),
        }
    }

    /// Create a new readiness timeout error
    pub fn readiness_timeout(
        selector: impl Into<String>,
        predicate: impl Into<String>,
        elapsed: Duration,
        timeout: Duration,
        last_state: impl Into<String>,
    ) -> Self {
        Error::ReadinessTimeout {
            selector: selector.into(),
            predicate: predicate.into(),
            elapsed_ms: elapsed.as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
            last_state: last_state.into(),
        }
    }

    /// Create a new capture error
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a new interaction error
    pub fn interaction(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Interaction {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Create a new session closed error
    pub fn session_closed<S: Into<String>>(msg: S) -> Self {
        Error::SessionClosed(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new scenario error
    pub fn scenario<S: Into<String>>(msg: S) -> Self {
        Error::Scenario(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Stable label for reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::WebSocket(_) => "websocket",
            Error::Cdp(_) => "cdp",
            Error::Serialization(_) => "serialization",
            Error::Launch(_) => "launch",
            Error::Navigation { .. } => "navigation",
            Error::ReadinessTimeout { .. } => "readiness_timeout",
            Error::Capture(_) => "capture",
            Error::Interaction { .. } => "interaction",
            Error::SessionClosed(_) => "session_closed",
            Error::Timeout(_) => "timeout",
            Error::Scenario(_) => "scenario",
            Error::Configuration(_) => "configuration",
            Error::Internal(_) => "internal",
        }
    }
}
