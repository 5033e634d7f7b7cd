//! Lazy element locator
//!
//! A [`Locator`] is a reference to whatever currently matches a selector.
//! Constructing one asserts nothing: the element does not have to exist, and
//! existence/visibility is only checked when a probe or action runs. This is
//! what lets readiness polling compose locate + assert without a separate
//! existence check.

use crate::cdp::types::Clip;
use crate::cdp::CdpClient;
use crate::session::js;
use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;

/// Outcome of a visibility probe
#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityState {
    /// Some match is in the DOM, has a non-zero box, and is not hidden by
    /// styling
    pub visible: bool,
    /// Why the probe failed (`not_found`, `display_none`, `zero_size`, ...)
    #[serde(default)]
    pub reason: Option<String>,
}

impl VisibilityState {
    /// Short diagnosis for logs and timeout errors
    pub fn describe(&self) -> String {
        if self.visible {
            "visible".to_string()
        } else {
            self.reason.clone().unwrap_or_else(|| "hidden".to_string())
        }
    }
}

/// Outcome of a texts probe
#[derive(Debug, Clone, Deserialize)]
pub struct VisibleTexts {
    /// Matches in the DOM, visible or not
    pub total: usize,
    /// Trimmed text content of the visible matches, in document order
    pub texts: Vec<String>,
}

/// Outcome of an nth-match visibility probe
#[derive(Debug, Clone, Deserialize)]
pub struct NthVisibility {
    /// Matches currently in the DOM
    pub count: usize,
    /// The index-th match exists and is visible
    pub visible: bool,
    /// Why not (`too_few_matches`, a hidden-state reason, ...)
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of a bounding-rect probe, in page-absolute coordinates
#[derive(Debug, Clone, Deserialize)]
pub struct RectState {
    /// A match with a non-zero box exists
    pub found: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl RectState {
    /// Screenshot clip for this rect, if the element was found
    pub fn clip(&self) -> Option<Clip> {
        self.found.then(|| Clip {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            scale: None,
        })
    }
}

/// Outcome of an action script (select, click)
#[derive(Debug, Clone, Deserialize)]
struct ActionState {
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Lazy reference to the elements matching a selector
#[derive(Debug, Clone)]
pub struct Locator {
    client: Arc<dyn CdpClient>,
    selector: String,
}

impl Locator {
    pub(crate) fn new(client: Arc<dyn CdpClient>, selector: impl Into<String>) -> Self {
        Self {
            client,
            selector: selector.into(),
        }
    }

    /// Selector this locator resolves
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Is some match currently visible?
    pub async fn visibility(&self) -> Result<VisibilityState> {
        let payload = self
            .client
            .evaluate_json(&js::visibility_probe(&self.selector))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Trimmed texts of the currently visible matches
    pub async fn visible_texts(&self) -> Result<VisibleTexts> {
        let payload = self
            .client
            .evaluate_json(&js::texts_probe(&self.selector))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Is the index-th match currently visible?
    pub async fn nth_visibility(&self, index: usize) -> Result<NthVisibility> {
        let payload = self
            .client
            .evaluate_json(&js::nth_visibility_probe(&self.selector, index))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Page-absolute bounding rect of the first match
    pub async fn rect(&self) -> Result<RectState> {
        let payload = self
            .client
            .evaluate_json(&js::rect_probe(&self.selector))
            .await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Set the matched `<select>`'s selected index and dispatch input/change
    /// events
    pub async fn select_option(&self, index: usize) -> Result<()> {
        let payload = self
            .client
            .evaluate_json(&js::select_option_script(&self.selector, index))
            .await?;
        self.check_action(payload, &format!("select option {}", index))
    }

    /// Scroll the first match into view and click it
    pub async fn click(&self) -> Result<()> {
        let payload = self
            .client
            .evaluate_json(&js::click_script(&self.selector))
            .await?;
        self.check_action(payload, "click")
    }

    fn check_action(&self, payload: serde_json::Value, what: &str) -> Result<()> {
        let state: ActionState = serde_json::from_value(payload)?;
        if state.ok {
            return Ok(());
        }
        Err(Error::interaction(
            &self.selector,
            format!(
                "{} failed: {}",
                what,
                state.reason.unwrap_or_else(|| "not interactable".to_string())
            ),
        ))
    }
}
