//! Scenario runner
//!
//! Executes scenarios serially, one fresh session per scenario. A failing
//! step moves the scenario to its failed terminal state: the runner grabs a
//! diagnostic screenshot, closes the session, and reports how far the
//! scenario got. Later scenarios still run.

use crate::cdp::LaunchOptions;
use crate::config::Config;
use crate::readiness::ReadinessDetector;
use crate::recorder::DiagnosticRecorder;
use crate::scenario::model::{Interaction, Scenario, ScenarioState, Step};
use crate::scenario::report::{RunReport, ScenarioReport};
use crate::session::{NavigationOptions, Session};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Provides one session per scenario run
#[async_trait]
pub trait SessionFactory: Send + Sync + std::fmt::Debug {
    /// Create a fresh session for `scenario`
    async fn create(&self, scenario: &Scenario) -> Result<Session>;
}

/// Factory that launches (or attaches to) a browser per scenario, honoring
/// the scenario's launch overrides
#[derive(Debug, Clone)]
pub struct LaunchingSessionFactory {
    config: Config,
}

impl LaunchingSessionFactory {
    /// Factory over the harness configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for LaunchingSessionFactory {
    async fn create(&self, scenario: &Scenario) -> Result<Session> {
        let options = scenario
            .launch
            .apply(LaunchOptions::from_config(&self.config));
        Session::launch(options).await
    }
}

/// How far a failing scenario got
#[derive(Debug)]
struct StepFailure {
    /// State before the failing step
    reached: ScenarioState,
    /// One-based index of the failing step
    step: usize,
    /// Step label for logs
    label: &'static str,
    error: Error,
}

impl StepFailure {
    fn new(reached: ScenarioState, step_number: usize, step: &Step, error: Error) -> Self {
        Self {
            reached,
            step: step_number,
            label: step.label(),
            error,
        }
    }
}

/// Runs scenarios serially, each over a session of its own
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: Config,
    factory: Arc<dyn SessionFactory>,
}

impl ScenarioRunner {
    /// Runner that launches a browser per scenario
    pub fn new(config: Config) -> Self {
        let factory = Arc::new(LaunchingSessionFactory::new(config.clone()));
        Self { config, factory }
    }

    /// Runner over a custom session factory
    pub fn with_factory(config: Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self { config, factory }
    }

    /// Run every scenario in order and aggregate the results
    #[instrument(skip(self, scenarios))]
    pub async fn run(&self, scenarios: &[Scenario]) -> RunReport {
        let started_at = Utc::now();
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run_scenario(scenario).await);
        }

        let run = RunReport::new(started_at, Utc::now(), reports);
        info!(
            "Run finished: {} passed, {} failed of {}",
            run.passed, run.failed, run.total
        );
        run
    }

    /// Run one scenario over a fresh session
    #[instrument(skip(self, scenario))]
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        info!("Running scenario {}", scenario.name);

        // A malformed scenario fails before any browser is spent on it
        if let Err(e) = scenario.validate() {
            error!("Scenario {} rejected: {}", scenario.name, e);
            return ScenarioReport::failed(
                &scenario.name,
                ScenarioState::Init,
                None,
                &e,
                started.elapsed(),
            );
        }

        let session = match self.factory.create(scenario).await {
            Ok(session) => session,
            Err(e) => {
                error!("Scenario {} could not get a session: {}", scenario.name, e);
                return ScenarioReport::failed(
                    &scenario.name,
                    ScenarioState::Init,
                    None,
                    &e,
                    started.elapsed(),
                );
            }
        };

        let recorder = DiagnosticRecorder::new(&scenario.name, &self.config.artifact_dir);
        let report = match self.execute_steps(scenario, &session, &recorder).await {
            Ok(()) => {
                info!(
                    "Scenario {} done in {}ms",
                    scenario.name,
                    started.elapsed().as_millis()
                );
                ScenarioReport::passed(&scenario.name, started.elapsed())
            }
            Err(failure) => {
                error!(
                    "Scenario {} failed at step {} ({}): {}",
                    scenario.name, failure.step, failure.label, failure.error
                );
                let failure_screenshot = recorder.capture_failure_screenshot(&session).await;
                ScenarioReport::failed(
                    &scenario.name,
                    failure.reached,
                    Some(failure.step),
                    &failure.error,
                    started.elapsed(),
                )
                .with_failure_screenshot(failure_screenshot)
            }
        };

        session.close().await;
        report
            .with_console(session.console().snapshot())
            .with_artifacts(recorder.records())
    }

    /// Drive the steps through the state machine until done or failed
    async fn execute_steps(
        &self,
        scenario: &Scenario,
        session: &Session,
        recorder: &DiagnosticRecorder,
    ) -> std::result::Result<(), StepFailure> {
        let mut state = ScenarioState::Init;
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_number = index + 1;
            debug!(
                "Scenario {} step {}/{}: {}",
                scenario.name,
                step_number,
                scenario.steps.len(),
                step.label()
            );

            let next = match state.apply(step) {
                Ok(next) => next,
                Err(reason) => {
                    return Err(StepFailure::new(
                        state,
                        step_number,
                        step,
                        Error::scenario(reason),
                    ))
                }
            };
            if let Err(error) = self.execute_step(step, session, recorder).await {
                return Err(StepFailure::new(state, step_number, step, error));
            }
            state = next;
        }
        Ok(())
    }

    /// Execute a single step against the session
    async fn execute_step(
        &self,
        step: &Step,
        session: &Session,
        recorder: &DiagnosticRecorder,
    ) -> Result<()> {
        session.ensure_open()?;
        match step {
            Step::Navigate {
                url,
                timeout_ms,
                wait_until,
            } => {
                let options = NavigationOptions::new(
                    timeout_ms.unwrap_or(self.config.navigation_timeout_ms),
                    wait_until.unwrap_or_default(),
                );
                session.page().navigate(url, &options).await
            }
            Step::AwaitReadiness { conditions } => {
                ReadinessDetector::new(session.page().clone(), &self.config)
                    .await_gate(conditions)
                    .await
            }
            Step::Interact { action } => {
                info!("Interacting: {} on {}", action.label(), action.selector());
                match action {
                    Interaction::SelectOption { selector, index } => {
                        session.page().locate(selector).select_option(*index).await
                    }
                    Interaction::Click { selector } => {
                        session.page().locate(selector).click().await
                    }
                }
            }
            Step::Capture { artifact } => recorder.capture(session, artifact).await,
        }
    }
}
