//! # Session layer
//!
//! One scenario run owns one [`Session`]: a launched (or attached) browser,
//! a single page, and the console record accumulated for the run's report.
//! The layer turns raw CDP commands into page-level operations: navigation
//! that resolves at a load milestone, lazy element locators backed by
//! injected probes, and screenshot capture.
//!
//! ## Module structure
//! - `session`: session lifecycle (launch, domain setup, idempotent close)
//! - `page`: navigation and screenshot capture on the session's page
//! - `locator`: selector-addressed element probes and interactions
//! - `console`: console event pump feeding an append-only record
//! - `options`: navigation options and load milestones
//! - `js`: probe and action script builders
//!
//! ## Usage
//! ```rust,no_run
//! use dashprobe::cdp::LaunchOptions;
//! use dashprobe::session::{NavigationOptions, Session};
//!
//! # async fn example() -> dashprobe::Result<()> {
//! let session = Session::launch(LaunchOptions::default()).await?;
//! session
//!     .page()
//!     .navigate("https://example.com", &NavigationOptions::default())
//!     .await?;
//! let state = session.page().locate("#app").visibility().await?;
//! println!("visible: {}", state.visible);
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod console;
pub mod js;
pub mod locator;
pub mod options;
pub mod page;
pub mod session;

#[cfg(test)]
mod tests;

pub use console::ConsoleRecord;
pub use locator::{Locator, NthVisibility, RectState, VisibilityState, VisibleTexts};
pub use options::{NavigationOptions, WaitUntil};
pub use page::Page;
pub use session::Session;
