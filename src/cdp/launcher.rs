//! Browser acquisition
//!
//! Either spawns a local headless Chrome/Chromium with a throwaway profile
//! and discovers its DevTools endpoint from the stderr banner, or attaches
//! to an already-running browser via a configured CDP endpoint. Page targets
//! are opened through the browser's HTTP interface (`/json/new`).

use crate::config::Config;
use crate::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Browser-level launch options
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run the browser headless
    pub headless: bool,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Explicit browser executable; auto-detected when unset
    pub executable_path: Option<String>,
    /// Attach to this CDP endpoint instead of launching
    pub cdp_endpoint: Option<String>,
    /// Additional command-line arguments for a launched browser
    pub extra_args: Vec<String>,
    /// How long to wait for a launched browser to announce its endpoint
    pub launch_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            executable_path: None,
            cdp_endpoint: None,
            extra_args: Vec::new(),
            launch_timeout: Duration::from_secs(30),
        }
    }
}

impl LaunchOptions {
    /// Derive launch options from the harness configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            window_width: config.window_width,
            window_height: config.window_height,
            executable_path: config.chrome_path.clone(),
            cdp_endpoint: config.cdp_endpoint.clone(),
            extra_args: Vec::new(),
            launch_timeout: Duration::from_millis(config.launch_timeout_ms),
        }
    }
}

/// A page target opened in the browser
#[derive(Debug, Clone)]
pub struct PageTarget {
    /// Target identifier
    pub target_id: String,
    /// DevTools WebSocket URL of the page
    pub ws_url: String,
}

/// Handle to a running browser: either a child process we own or an
/// endpoint we attached to.
#[derive(Debug)]
pub struct BrowserHandle {
    /// Browser-level DevTools WebSocket endpoint
    pub ws_endpoint: String,
    /// HTTP endpoint serving `/json/*`
    pub http_endpoint: String,
    /// Child process, present only when we launched the browser
    child: Option<Child>,
    /// Throwaway profile directory, removed at shutdown
    profile_dir: Option<PathBuf>,
}

impl BrowserHandle {
    /// Handle for a browser we attached to (left running at shutdown)
    pub fn attached(ws_endpoint: String, http_endpoint: String) -> Self {
        Self {
            ws_endpoint,
            http_endpoint,
            child: None,
            profile_dir: None,
        }
    }

    /// Whether this handle owns the browser process
    pub fn is_owned(&self) -> bool {
        self.child.is_some()
    }

    /// Open a new page target via the browser's HTTP interface
    pub async fn create_page(&self, url: &str) -> Result<PageTarget> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint, url);
        debug!("Creating page target via {}", new_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::launch(format!("Failed to create HTTP client: {}", e)))?;

        // Chrome M111+ requires PUT on /json/new
        let response = http_client.put(&new_url).send().await.map_err(|e| {
            Error::launch(format!(
                "Browser HTTP endpoint {} unreachable: {}",
                self.http_endpoint, e
            ))
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::launch(format!("Failed to read /json/new response: {}", e)))?;
        let target: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            Error::launch(format!(
                "Failed to parse /json/new response: {} (body: {})",
                e, body
            ))
        })?;

        let ws_url = target
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::launch("No webSocketDebuggerUrl in /json/new response"))?;
        let target_id = target
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        info!("Opened page target {}", target_id);
        Ok(PageTarget {
            target_id: target_id.to_string(),
            ws_url: ws_url.to_string(),
        })
    }

    /// Release the browser: kill an owned child process (attached browsers
    /// are left running) and remove the throwaway profile.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            info!("Terminating browser process");
            if let Err(e) = child.start_kill() {
                warn!("Failed to signal browser process: {}", e);
            }
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(Ok(status)) => debug!("Browser exited with {}", status),
                Ok(Err(e)) => warn!("Failed to reap browser process: {}", e),
                Err(_) => warn!("Browser did not exit within 5s of kill"),
            }
        }

        if let Some(dir) = self.profile_dir.take() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                debug!("Leaving profile dir {}: {}", dir.display(), e);
            }
        }

        Ok(())
    }
}

/// Launches or attaches to a browser per [`LaunchOptions`]
#[derive(Debug, Clone, Default)]
pub struct BrowserLauncher {
    options: LaunchOptions,
}

impl BrowserLauncher {
    /// Create a launcher with the given options
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    /// Acquire a browser: attach if an endpoint is configured, launch
    /// otherwise.
    pub async fn launch(&self) -> Result<BrowserHandle> {
        match &self.options.cdp_endpoint {
            Some(endpoint) => self.attach(endpoint).await,
            None => self.spawn().await,
        }
    }

    /// Attach to an already-running browser and verify it answers
    async fn attach(&self, endpoint: &str) -> Result<BrowserHandle> {
        let http_endpoint = normalize_http_endpoint(endpoint);
        info!("Attaching to browser at {}", http_endpoint);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::launch(format!("Failed to create HTTP client: {}", e)))?;

        let version: serde_json::Value = http_client
            .get(format!("{}/json/version", http_endpoint))
            .send()
            .await
            .map_err(|e| {
                Error::launch(format!(
                    "No browser answering at {}: {}. Start one with: \
                     google-chrome --remote-debugging-port=9222 --user-data-dir=/tmp/chrome-debug",
                    http_endpoint, e
                ))
            })?
            .json()
            .await
            .map_err(|e| Error::launch(format!("Failed to parse /json/version: {}", e)))?;

        let ws_endpoint = version
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::launch("No webSocketDebuggerUrl in /json/version"))?
            .to_string();
        if let Some(product) = version.get("Browser").and_then(|v| v.as_str()) {
            info!("Attached to {}", product);
        }

        Ok(BrowserHandle::attached(ws_endpoint, http_endpoint))
    }

    /// Spawn a browser process and wait for its DevTools banner
    async fn spawn(&self) -> Result<BrowserHandle> {
        let profile_dir =
            std::env::temp_dir().join(format!("dashprobe-profile-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&profile_dir).await?;

        let candidates = match &self.options.executable_path {
            Some(path) => vec![path.clone()],
            None => default_executables(),
        };

        let mut spawn_errors = Vec::new();
        for executable in &candidates {
            match self.spawn_executable(executable, &profile_dir) {
                Ok(child) => {
                    info!("Launched {} (profile {})", executable, profile_dir.display());
                    return self.await_devtools_banner(child, profile_dir).await;
                }
                Err(e) => {
                    debug!("Cannot launch {}: {}", executable, e);
                    spawn_errors.push(format!("{}: {}", executable, e));
                }
            }
        }

        let _ = tokio::fs::remove_dir_all(&profile_dir).await;
        Err(Error::launch(format!(
            "No usable browser executable found (tried: {})",
            spawn_errors.join("; ")
        )))
    }

    fn spawn_executable(&self, executable: &str, profile_dir: &PathBuf) -> std::io::Result<Child> {
        let mut command = Command::new(executable);
        command
            .arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!(
                "--window-size={},{}",
                self.options.window_width, self.options.window_height
            ));

        if self.options.headless {
            command
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--hide-scrollbars");
        }

        for arg in &self.options.extra_args {
            command.arg(arg);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Last-resort cleanup if shutdown is never reached
            .kill_on_drop(true);

        command.spawn()
    }

    /// Read the child's stderr until the "DevTools listening on ws://..."
    /// banner appears or the launch timeout expires.
    async fn await_devtools_banner(
        &self,
        mut child: Child,
        profile_dir: PathBuf,
    ) -> Result<BrowserHandle> {
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::launch("Browser stderr not captured"))?;
        let mut lines = BufReader::new(stderr).lines();
        let started = Instant::now();
        let mut early_output = Vec::new();

        loop {
            let remaining = self
                .options
                .launch_timeout
                .checked_sub(started.elapsed())
                .unwrap_or(Duration::ZERO);
            if remaining.is_zero() {
                let _ = child.start_kill();
                return Err(Error::launch(format!(
                    "Browser did not announce DevTools endpoint within {:?}",
                    self.options.launch_timeout
                )));
            }

            let line = match tokio::time::timeout(remaining, lines.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    return Err(Error::launch(format!(
                        "Browser exited before announcing DevTools endpoint: {}",
                        early_output.join(" | ")
                    )));
                }
                Ok(Err(e)) => {
                    return Err(Error::launch(format!("Failed to read browser stderr: {}", e)));
                }
                Err(_) => {
                    let _ = child.start_kill();
                    return Err(Error::launch(format!(
                        "Browser did not announce DevTools endpoint within {:?}",
                        self.options.launch_timeout
                    )));
                }
            };

            if let Some(ws_endpoint) = parse_devtools_banner(&line) {
                let http_endpoint = http_endpoint_from_ws(&ws_endpoint)?;
                debug!("DevTools endpoint: {}", ws_endpoint);

                // Keep draining stderr so the pipe never fills up and blocks
                // the browser
                tokio::spawn(async move {
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!("browser: {}", line);
                    }
                });

                return Ok(BrowserHandle {
                    ws_endpoint,
                    http_endpoint,
                    child: Some(child),
                    profile_dir: Some(profile_dir),
                });
            }

            debug!("browser: {}", line);
            if early_output.len() < 20 {
                early_output.push(line);
            }
        }
    }
}

/// Extract the WebSocket URL from Chrome's startup banner
fn parse_devtools_banner(line: &str) -> Option<String> {
    line.split("DevTools listening on ")
        .nth(1)
        .map(str::trim)
        .filter(|url| url.starts_with("ws://") || url.starts_with("wss://"))
        .map(str::to_string)
}

/// Derive the HTTP endpoint from a browser-level WebSocket endpoint
fn http_endpoint_from_ws(ws_endpoint: &str) -> Result<String> {
    let (scheme, rest) = if let Some(rest) = ws_endpoint.strip_prefix("ws://") {
        ("http", rest)
    } else if let Some(rest) = ws_endpoint.strip_prefix("wss://") {
        ("https", rest)
    } else {
        return Err(Error::launch(format!(
            "Unexpected DevTools endpoint: {}",
            ws_endpoint
        )));
    };

    let authority = rest.split('/').next().unwrap_or(rest);
    Ok(format!("{}://{}", scheme, authority))
}

/// Accept ws://, http://, or bare host:port endpoint notations
fn normalize_http_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.trim_end_matches('/').to_string()
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        format!("http://{}", rest.split('/').next().unwrap_or(rest))
    } else if let Some(rest) = endpoint.strip_prefix("wss://") {
        format!("https://{}", rest.split('/').next().unwrap_or(rest))
    } else {
        format!("http://{}", endpoint.trim_end_matches('/'))
    }
}

/// Well-known browser locations, tried in order
fn default_executables() -> Vec<String> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ]
    };
    candidates.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devtools_banner() {
        let line = "DevTools listening on ws://127.0.0.1:33291/devtools/browser/7abc-def";
        assert_eq!(
            parse_devtools_banner(line).as_deref(),
            Some("ws://127.0.0.1:33291/devtools/browser/7abc-def")
        );

        assert_eq!(parse_devtools_banner("[WARNING] gpu init failed"), None);
        assert_eq!(parse_devtools_banner("DevTools listening on garbage"), None);
    }

    #[test]
    fn test_http_endpoint_from_ws() {
        assert_eq!(
            http_endpoint_from_ws("ws://127.0.0.1:9222/devtools/browser/abc").unwrap(),
            "http://127.0.0.1:9222"
        );
        assert_eq!(
            http_endpoint_from_ws("wss://remote:443/devtools/browser/abc").unwrap(),
            "https://remote:443"
        );
        assert!(http_endpoint_from_ws("tcp://nope").is_err());
    }

    #[test]
    fn test_normalize_http_endpoint() {
        assert_eq!(
            normalize_http_endpoint("http://127.0.0.1:9222/"),
            "http://127.0.0.1:9222"
        );
        assert_eq!(
            normalize_http_endpoint("ws://127.0.0.1:9222/devtools/browser/x"),
            "http://127.0.0.1:9222"
        );
        assert_eq!(
            normalize_http_endpoint("127.0.0.1:9222"),
            "http://127.0.0.1:9222"
        );
    }

    #[test]
    fn test_launch_options_from_config() {
        let mut config = Config::default();
        config.window_width = 1280;
        config.cdp_endpoint = Some("127.0.0.1:9222".to_string());
        config.launch_timeout_ms = 5000;

        let options = LaunchOptions::from_config(&config);
        assert_eq!(options.window_width, 1280);
        assert_eq!(options.cdp_endpoint.as_deref(), Some("127.0.0.1:9222"));
        assert_eq!(options.launch_timeout, Duration::from_millis(5000));
    }
}
