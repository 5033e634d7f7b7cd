//! Page driver
//!
//! One navigable page over a CDP client. Navigation resolves when the
//! caller's completion condition is met, not at commit: the page subscribes
//! to load/lifecycle events before issuing the command and falls back to a
//! periodic `document.readyState` probe for loads that finish before the
//! event round-trips (`readyState` alone can race the previous document,
//! which is why events are the primary signal).

use crate::cdp::{clipped_screenshot_params, full_page_screenshot_params, CdpClient};
use crate::session::locator::Locator;
use crate::session::options::{NavigationOptions, WaitUntil};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Interval of the `document.readyState` fallback probe during navigation
const READY_STATE_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// One navigable page of a session
#[derive(Debug, Clone)]
pub struct Page {
    client: Arc<dyn CdpClient>,
}

impl Page {
    /// Create a page over an established CDP client
    pub fn new(client: Arc<dyn CdpClient>) -> Self {
        Self { client }
    }

    /// The underlying CDP client
    pub fn client(&self) -> Arc<dyn CdpClient> {
        Arc::clone(&self.client)
    }

    /// Lazy locator for a selector; checks nothing until probed
    pub fn locate(&self, selector: &str) -> Locator {
        Locator::new(Arc::clone(&self.client), selector)
    }

    /// Navigate to `url` and wait until the requested completion condition
    /// holds or the timeout elapses.
    ///
    /// A refused navigation (the commit's `errorText`, e.g.
    /// `net::ERR_CONNECTION_REFUSED`) and a timed-out load both surface as
    /// [`Error::Navigation`] carrying the URL and elapsed time.
    pub async fn navigate(&self, url: &str, options: &NavigationOptions) -> Result<()> {
        let started = Instant::now();
        info!("Navigating to {} (until {})", url, options.wait_until.label());

        // Subscribe before the command so completion events cannot slip past
        let events = self.client.subscribe_events()?;

        let commit = match self.client.navigate(url).await {
            Ok(commit) => commit,
            Err(e) => {
                return Err(Error::navigation(url, started.elapsed(), e.to_string()));
            }
        };
        if let Some(error_text) = commit.error_text {
            return Err(Error::navigation(url, started.elapsed(), error_text));
        }

        let remaining = options
            .timeout
            .checked_sub(started.elapsed())
            .unwrap_or(Duration::ZERO);
        let wait = self.await_load(events, options.wait_until);
        match tokio::time::timeout(remaining, wait).await {
            Ok(()) => {
                debug!(
                    "Navigation to {} complete after {}ms",
                    url,
                    started.elapsed().as_millis()
                );
                Ok(())
            }
            Err(_) => Err(Error::navigation(
                url,
                started.elapsed(),
                format!("{} not reached within timeout", options.wait_until.label()),
            )),
        }
    }

    /// Wait until an event or the readyState fallback confirms `wait_until`
    async fn await_load(
        &self,
        mut events: tokio::sync::mpsc::UnboundedReceiver<crate::cdp::CdpEvent>,
        wait_until: WaitUntil,
    ) {
        let mut events_open = true;
        let mut probe = tokio::time::interval(READY_STATE_PROBE_INTERVAL);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_event = events.recv(), if events_open => {
                    match maybe_event {
                        Some(event) => {
                            if wait_until.satisfied_by(&event) {
                                debug!("Load condition met by {}", event.method);
                                return;
                            }
                        }
                        None => events_open = false,
                    }
                }
                _ = probe.tick() => {
                    if let Ok(state) = self.client.ready_state().await {
                        if wait_until.reached_ready_state(&state) {
                            debug!("Load condition met by readyState {}", state);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// PNG of the full scrollable page
    pub async fn screenshot_full_page(&self) -> Result<Vec<u8>> {
        self.client
            .capture_screenshot(full_page_screenshot_params())
            .await
            .map_err(|e| Error::capture(format!("full-page screenshot failed: {}", e)))
    }

    /// PNG clipped to the first match of `selector`
    ///
    /// Fails with a capture error when no match with a non-zero box exists at
    /// capture time.
    pub async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        let rect = self.locate(selector).rect().await?;
        let clip = rect.clip().ok_or_else(|| {
            Error::capture(format!(
                "cannot capture {}: {}",
                selector,
                rect.reason.unwrap_or_else(|| "not found".to_string())
            ))
        })?;

        self.client
            .capture_screenshot(clipped_screenshot_params(clip))
            .await
            .map_err(|e| Error::capture(format!("screenshot of {} failed: {}", selector, e)))
    }
}
