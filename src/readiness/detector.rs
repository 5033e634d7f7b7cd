//! Readiness detector
//!
//! Polls readiness conditions against a page until they hold or their
//! timeout elapses. Polling-with-timeout is the primary gate; the one fixed
//! settle-delay runs only after every condition of a gate has passed, as a
//! margin for rendering work no DOM query can observe.

use crate::config::Config;
use crate::readiness::condition::{CompiledCheck, CompiledCondition, ReadinessCondition};
use crate::session::Page;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Readiness detector over one page
#[derive(Debug, Clone)]
pub struct ReadinessDetector {
    page: Page,
    poll_interval: Duration,
    settle_delay: Duration,
    default_timeout: Duration,
}

impl ReadinessDetector {
    /// Detector with timing taken from the configuration
    pub fn new(page: Page, config: &Config) -> Self {
        Self {
            page,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            default_timeout: Duration::from_millis(config.condition_timeout_ms),
        }
    }

    /// Detector with explicit timing
    pub fn with_timing(
        page: Page,
        poll_interval: Duration,
        settle_delay: Duration,
        default_timeout: Duration,
    ) -> Self {
        Self {
            page,
            poll_interval,
            settle_delay,
            default_timeout,
        }
    }

    /// Block until every condition of the gate holds, in declared order,
    /// then apply the settle-delay.
    ///
    /// Later conditions are not polled until earlier ones have passed. All
    /// conditions are validated and their patterns compiled up front, so a
    /// malformed condition fails the gate before any polling starts.
    #[instrument(skip(self, conditions))]
    pub async fn await_gate(&self, conditions: &[ReadinessCondition]) -> Result<()> {
        let compiled: Vec<CompiledCondition> = conditions
            .iter()
            .map(|c| c.compile(self.default_timeout))
            .collect::<Result<_>>()?;

        info!("Awaiting readiness gate ({} conditions)", compiled.len());
        for condition in &compiled {
            self.await_condition(condition).await?;
        }

        if !self.settle_delay.is_zero() {
            debug!("Settling for {}ms", self.settle_delay.as_millis());
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(())
    }

    /// Poll one condition until it holds or its timeout elapses
    async fn await_condition(&self, condition: &CompiledCondition) -> Result<()> {
        let started = Instant::now();
        info!(
            "Awaiting {} on {} (timeout {}ms)",
            condition.describe(),
            condition.selector,
            condition.timeout.as_millis()
        );

        loop {
            let (satisfied, state) = self.probe(condition).await?;
            if satisfied {
                debug!(
                    "{} on {} satisfied after {}ms",
                    condition.describe(),
                    condition.selector,
                    started.elapsed().as_millis()
                );
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= condition.timeout {
                warn!(
                    "{} on {} still {} after {}ms",
                    condition.describe(),
                    condition.selector,
                    state,
                    elapsed.as_millis()
                );
                return Err(Error::readiness_timeout(
                    &condition.selector,
                    condition.describe(),
                    elapsed,
                    condition.timeout,
                    state,
                ));
            }

            // Clamp the final sleep to the remaining budget so the timeout
            // is honored tightly
            let nap = self.poll_interval.min(condition.timeout - elapsed);
            tokio::time::sleep(nap).await;
        }
    }

    /// One probe of the condition: (satisfied, last-known-state diagnosis)
    async fn probe(&self, condition: &CompiledCondition) -> Result<(bool, String)> {
        let locator = self.page.locate(&condition.selector);
        match &condition.check {
            CompiledCheck::Visible => {
                let state = locator.visibility().await?;
                Ok((state.visible, state.describe()))
            }
            CompiledCheck::VisibleWithText(pattern) => {
                let texts = locator.visible_texts().await?;
                let matched = texts.texts.iter().any(|text| pattern.matches(text));
                let state = if matched {
                    "matched".to_string()
                } else if texts.texts.is_empty() {
                    format!("no visible match ({} in DOM)", texts.total)
                } else {
                    format!("texts seen: {}", summarize(&texts.texts))
                };
                Ok((matched, state))
            }
            CompiledCheck::NthChildVisible(index) => {
                let state = locator.nth_visibility(*index).await?;
                let diagnosis = if state.visible {
                    "visible".to_string()
                } else {
                    format!(
                        "{} ({} matches)",
                        state.reason.clone().unwrap_or_else(|| "hidden".to_string()),
                        state.count
                    )
                };
                Ok((state.visible, diagnosis))
            }
        }
    }
}

/// Clip a text list for a one-line diagnosis
fn summarize(texts: &[String]) -> String {
    let joined = texts.join(" | ");
    if joined.chars().count() <= 120 {
        return joined;
    }
    let clipped: String = joined.chars().take(120).collect();
    format!("{}...", clipped)
}
