//! Navigation and capture option types
//!
//! Option structs consumed by [`crate::session::Page`]. Launch-level options
//! live with the launcher in [`crate::cdp::launcher`].

use crate::cdp::CdpEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Navigation completion condition
///
/// Different scenarios have different minimum-readiness needs: some only need
/// the DOM parsed, others need network quiescence before their conditions are
/// worth polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// DOM parsed (`DOMContentLoaded`)
    DomContentLoaded,
    /// Document and subresources loaded (`load`)
    #[default]
    Load,
    /// Network has been quiet after load (`networkIdle` lifecycle event)
    NetworkIdle,
}

impl WaitUntil {
    /// Stable label for logs and errors
    pub fn label(&self) -> &'static str {
        match self {
            WaitUntil::DomContentLoaded => "dom_content_loaded",
            WaitUntil::Load => "load",
            WaitUntil::NetworkIdle => "network_idle",
        }
    }

    /// Does this CDP event signal that the condition has been reached?
    pub fn satisfied_by(&self, event: &CdpEvent) -> bool {
        match self {
            WaitUntil::DomContentLoaded => {
                event.method == "Page.domContentEventFired"
                    || is_lifecycle(event, "DOMContentLoaded")
            }
            // DOMContentLoaded precedes load, so load-class events satisfy
            // the weaker condition too
            WaitUntil::Load => {
                event.method == "Page.loadEventFired" || is_lifecycle(event, "load")
            }
            WaitUntil::NetworkIdle => is_lifecycle(event, "networkIdle"),
        }
    }

    /// Does this `document.readyState` value confirm the condition?
    ///
    /// Fallback for loads that finish before the event round-trips; network
    /// idleness has no readyState equivalent and can only be confirmed by its
    /// lifecycle event.
    pub fn reached_ready_state(&self, state: &str) -> bool {
        match self {
            WaitUntil::DomContentLoaded => state == "interactive" || state == "complete",
            WaitUntil::Load => state == "complete",
            WaitUntil::NetworkIdle => false,
        }
    }
}

fn is_lifecycle(event: &CdpEvent, name: &str) -> bool {
    event.method == "Page.lifecycleEvent"
        && event.params.get("name").and_then(|v| v.as_str()) == Some(name)
}

/// Navigation options
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Maximum wait for the page load, commit included
    pub timeout: Duration,
    /// Completion condition to wait for after the commit
    pub wait_until: WaitUntil,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            wait_until: WaitUntil::Load,
        }
    }
}

impl NavigationOptions {
    /// Options with an explicit timeout in milliseconds
    pub fn new(timeout_ms: u64, wait_until: WaitUntil) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            wait_until,
        }
    }
}
