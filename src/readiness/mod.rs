//! # Readiness detection
//!
//! The harness's central discipline: readiness is established by polling
//! conditions with bounded timeouts, not by fixed delays. A scenario's gate
//! is the ordered AND of its conditions; each condition gets its own timeout
//! budget, and one small settle-delay runs after the whole gate passes.
//!
//! ## Module structure
//! - `condition`: condition/pattern model and validation
//! - `detector`: the polling loop
//!
//! ## Usage
//! ```rust,no_run
//! use dashprobe::config::Config;
//! use dashprobe::readiness::{ReadinessCondition, ReadinessDetector, TextPattern};
//! use dashprobe::session::Page;
//!
//! # async fn example(page: Page) -> dashprobe::Result<()> {
//! let detector = ReadinessDetector::new(page, &Config::default());
//! detector
//!     .await_gate(&[
//!         ReadinessCondition::visible("#worldMap"),
//!         ReadinessCondition::visible_with_text(
//!             "#worldMapLegend li",
//!             TextPattern::Contains("No Data".to_string()),
//!         ),
//!     ])
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod detector;


pub use condition::{PredicateKind, ReadinessCondition, TextPattern};
pub use detector::ReadinessDetector;
