//! # Scenario layer
//!
//! TOML-defined verification flows and the machinery that runs them. A
//! scenario is an ordered list of steps (navigate, await readiness,
//! interact, capture) driven through a state machine over one exclusively
//! owned browser session, producing a machine-readable report.
//!
//! ## Module structure
//! - `model`: scenario, step, and state-machine types with pre-run validation
//! - `report`: per-scenario and run-level result records
//! - `runner`: serial execution, one fresh session per scenario
//!
//! ## Usage
//! ```rust,no_run
//! use dashprobe::config::Config;
//! use dashprobe::scenario::{Scenario, ScenarioRunner};
//!
//! # async fn example() -> dashprobe::Result<()> {
//! let scenario = Scenario::from_path("scenarios/dashboard.toml")?;
//! let runner = ScenarioRunner::new(Config::default());
//! let report = runner.run(&[scenario]).await;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod report;
pub mod runner;


pub use model::{Interaction, LaunchOverrides, Scenario, ScenarioState, Step};
pub use report::{RunReport, ScenarioReport, ScenarioStatus};
pub use runner::{LaunchingSessionFactory, ScenarioRunner, SessionFactory};
