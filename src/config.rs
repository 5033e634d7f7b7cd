//! Configuration management for dashprobe

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Harness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chrome/Chromium executable path; auto-detected when unset
    pub chrome_path: Option<String>,

    /// Attach to an already-running browser at this CDP endpoint
    /// instead of launching one
    pub cdp_endpoint: Option<String>,

    /// Run the browser headless
    pub headless: bool,

    /// Browser window width in pixels
    pub window_width: u32,

    /// Browser window height in pixels
    pub window_height: u32,

    /// Directory that relative artifact paths resolve against
    pub artifact_dir: PathBuf,

    /// Where the run report is written; defaults to
    /// `<artifact_dir>/report.json`
    pub report_path: Option<PathBuf>,

    /// Readiness poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Fixed settle delay after each readiness gate, in milliseconds
    pub settle_delay_ms: u64,

    /// Default navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,

    /// Default per-condition readiness timeout in milliseconds
    pub condition_timeout_ms: u64,

    /// Browser launch timeout in milliseconds
    pub launch_timeout_ms: u64,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome_path: None,
            cdp_endpoint: None,
            headless: true,
            window_width: 1920,
            window_height: 1080,
            artifact_dir: PathBuf::from("artifacts"),
            report_path: None,
            poll_interval_ms: 100,
            settle_delay_ms: 2000,
            navigation_timeout_ms: 60000,
            condition_timeout_ms: 15000,
            launch_timeout_ms: 30000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(chrome_path) = env::var("DASHPROBE_CHROME_PATH") {
            config.chrome_path = Some(chrome_path);
        }

        if let Ok(endpoint) = env::var("DASHPROBE_CDP_ENDPOINT") {
            config.cdp_endpoint = Some(endpoint);
        }

        if let Ok(headless) = env::var("DASHPROBE_HEADLESS") {
            config.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_HEADLESS"))?;
        }

        if let Ok(width) = env::var("DASHPROBE_WINDOW_WIDTH") {
            config.window_width = width
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_WINDOW_WIDTH"))?;
        }

        if let Ok(height) = env::var("DASHPROBE_WINDOW_HEIGHT") {
            config.window_height = height
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_WINDOW_HEIGHT"))?;
        }

        if let Ok(dir) = env::var("DASHPROBE_ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(dir);
        }

        if let Ok(path) = env::var("DASHPROBE_REPORT_PATH") {
            config.report_path = Some(PathBuf::from(path));
        }

        if let Ok(interval) = env::var("DASHPROBE_POLL_INTERVAL_MS") {
            config.poll_interval_ms = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_POLL_INTERVAL_MS"))?;
        }

        if let Ok(settle) = env::var("DASHPROBE_SETTLE_DELAY_MS") {
            config.settle_delay_ms = settle
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_SETTLE_DELAY_MS"))?;
        }

        if let Ok(timeout) = env::var("DASHPROBE_NAVIGATION_TIMEOUT_MS") {
            config.navigation_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_NAVIGATION_TIMEOUT_MS"))?;
        }

        if let Ok(timeout) = env::var("DASHPROBE_CONDITION_TIMEOUT_MS") {
            config.condition_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_CONDITION_TIMEOUT_MS"))?;
        }

        if let Ok(timeout) = env::var("DASHPROBE_LAUNCH_TIMEOUT_MS") {
            config.launch_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid DASHPROBE_LAUNCH_TIMEOUT_MS"))?;
        }

        if let Ok(log_level) = env::var("DASHPROBE_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Resolved report path
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.artifact_dir.join("report.json"))
    }
}
