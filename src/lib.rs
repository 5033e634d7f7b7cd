//! Dashprobe: headless-browser verification harness
//!
//! Drives a Chrome/Chromium instance over the DevTools protocol to verify
//! that dynamically rendered pages actually reached a usable state: it polls
//! deterministic readiness conditions, optionally drives form controls, and
//! captures screenshots, console output, and a machine-readable run report
//! for TOML-defined scenarios.

pub mod error;
pub mod config;

pub mod cdp;
pub mod readiness;
pub mod recorder;
pub mod scenario;
pub mod session;

// Re-exports
pub use error::{Error, Result};

/// Dashprobe library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
