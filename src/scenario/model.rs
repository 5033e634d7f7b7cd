//! Scenario model
//!
//! TOML-defined verification flows: a named sequence of steps driven over
//! one browser session. Step ordering is checked against the scenario state
//! machine before any browser is launched, so a malformed flow never costs
//! a session.

use crate::cdp::LaunchOptions;
use crate::readiness::ReadinessCondition;
use crate::recorder::CaptureArtifact;
use crate::session::WaitUntil;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named verification flow over one browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, used in reports and artifact file names
    pub name: String,
    /// Browser overrides for this scenario
    #[serde(default)]
    pub launch: LaunchOverrides,
    /// Steps executed in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::scenario(format!("invalid scenario TOML: {}", e)))
    }

    /// Load a scenario from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::scenario(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Check the scenario against the step-order rules without running it:
    /// navigation only as the first step, a readiness gate before any
    /// interaction or capture, and well-formed conditions and artifacts.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::scenario("scenario name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(Error::scenario(format!(
                "scenario {:?} has no steps",
                self.name
            )));
        }

        let mut state = ScenarioState::Init;
        for (index, step) in self.steps.iter().enumerate() {
            step.validate()?;
            state = state.apply(step).map_err(|reason| {
                Error::scenario(format!("step {} ({}): {}", index + 1, step.label(), reason))
            })?;
        }
        Ok(())
    }
}

/// Per-scenario browser overrides, applied over the harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchOverrides {
    /// Override headless mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Override window width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,
    /// Override window height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_height: Option<u32>,
    /// Override the browser executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,
    /// Attach to this CDP endpoint instead of launching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdp_endpoint: Option<String>,
}

impl LaunchOverrides {
    /// Apply the overrides on top of base launch options
    pub fn apply(&self, mut options: LaunchOptions) -> LaunchOptions {
        if let Some(headless) = self.headless {
            options.headless = headless;
        }
        if let Some(width) = self.window_width {
            options.window_width = width;
        }
        if let Some(height) = self.window_height {
            options.window_height = height;
        }
        if let Some(path) = &self.chrome_path {
            options.executable_path = Some(path.clone());
        }
        if let Some(endpoint) = &self.cdp_endpoint {
            options.cdp_endpoint = Some(endpoint.clone());
        }
        options
    }
}

/// One scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL; legal only as the first step
    Navigate {
        url: String,
        /// Navigation timeout override in milliseconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        /// Load milestone to wait for before the step completes
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wait_until: Option<WaitUntil>,
    },
    /// Poll readiness conditions in declared order until all hold
    AwaitReadiness { conditions: Vec<ReadinessCondition> },
    /// Drive one element on the page
    Interact {
        #[serde(flatten)]
        action: Interaction,
    },
    /// Persist an artifact
    Capture {
        #[serde(flatten)]
        artifact: CaptureArtifact,
    },
}

impl Step {
    /// Stable step label for logs and error context
    pub fn label(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::AwaitReadiness { .. } => "await_readiness",
            Step::Interact { .. } => "interact",
            Step::Capture { .. } => "capture",
        }
    }

    /// Check the step's own fields, independent of ordering
    pub fn validate(&self) -> Result<()> {
        match self {
            Step::Navigate { url, .. } => {
                if url.trim().is_empty() {
                    return Err(Error::scenario("navigate requires a url"));
                }
                Ok(())
            }
            Step::AwaitReadiness { conditions } => {
                if conditions.is_empty() {
                    return Err(Error::scenario(
                        "await_readiness requires at least one condition",
                    ));
                }
                for condition in conditions {
                    condition.validate()?;
                }
                Ok(())
            }
            Step::Interact { action } => {
                if action.selector().trim().is_empty() {
                    return Err(Error::scenario(format!(
                        "{} requires a selector",
                        action.label()
                    )));
                }
                Ok(())
            }
            Step::Capture { artifact } => artifact.validate(),
        }
    }
}

/// An element interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Interaction {
    /// Choose an option of a `<select>` by zero-based index
    SelectOption { selector: String, index: usize },
    /// Click the first match of a selector
    Click { selector: String },
}

impl Interaction {
    /// The selector the interaction drives
    pub fn selector(&self) -> &str {
        match self {
            Interaction::SelectOption { selector, .. } => selector,
            Interaction::Click { selector } => selector,
        }
    }

    /// Stable action label
    pub fn label(&self) -> &'static str {
        match self {
            Interaction::SelectOption { .. } => "select_option",
            Interaction::Click { .. } => "click",
        }
    }
}

/// Progress of a scenario through its steps
///
/// `apply` yields only non-terminal states; the runner moves a scenario to
/// `Done` after its last step and to `Failed` on any step error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Init,
    Navigated,
    Ready,
    Interacted,
    Captured,
    Done,
    Failed,
}

impl ScenarioState {
    /// Stable label for reports and logs
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioState::Init => "init",
            ScenarioState::Navigated => "navigated",
            ScenarioState::Ready => "ready",
            ScenarioState::Interacted => "interacted",
            ScenarioState::Captured => "captured",
            ScenarioState::Done => "done",
            ScenarioState::Failed => "failed",
        }
    }

    /// Whether the scenario has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Done | ScenarioState::Failed)
    }

    /// The state after `step`, or the reason the step is not legal here.
    ///
    /// Interactions and captures require a passed readiness gate, and an
    /// interaction invalidates that gate: the page may be reloading or
    /// re-rendering, so the scenario must re-await readiness before the
    /// next interaction or capture.
    pub fn apply(self, step: &Step) -> std::result::Result<ScenarioState, String> {
        match (self, step) {
            (ScenarioState::Init, Step::Navigate { .. }) => Ok(ScenarioState::Navigated),
            (_, Step::Navigate { .. }) => {
                Err("navigate is only legal as the first step".to_string())
            }
            (
                ScenarioState::Navigated
                | ScenarioState::Ready
                | ScenarioState::Interacted
                | ScenarioState::Captured,
                Step::AwaitReadiness { .. },
            ) => Ok(ScenarioState::Ready),
            (ScenarioState::Ready | ScenarioState::Captured, Step::Interact { .. }) => {
                Ok(ScenarioState::Interacted)
            }
            (ScenarioState::Ready | ScenarioState::Captured, Step::Capture { .. }) => {
                Ok(ScenarioState::Captured)
            }
            (ScenarioState::Interacted, Step::Interact { .. } | Step::Capture { .. }) => {
                Err(format!(
                    "{} after an interaction requires a readiness gate in between",
                    step.label()
                ))
            }
            (ScenarioState::Init, _) => Err(format!("{} requires a navigation first", step.label())),
            (ScenarioState::Navigated, Step::Interact { .. } | Step::Capture { .. }) => Err(
                format!("{} requires a readiness gate after navigation", step.label()),
            ),
            (ScenarioState::Done | ScenarioState::Failed, _) => Err(format!(
                "scenario already finished in state {}",
                self.label()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::PredicateKind;
    use crate::recorder::{ArtifactKind, CaptureTarget};

    #[test]
    fn test_scenario_parses_all_step_kinds() {
        let scenario = Scenario::from_toml_str(
            r##"
            name = "kitchen sink"

            [launch]
            headless = false
            window_width = 1280

            [[steps]]
            kind = "navigate"
            url = "http://127.0.0.1:8080/"
            timeout_ms = 10000
            wait_until = "dom_content_loaded"

            [[steps]]
            kind = "await_readiness"

            [[steps.conditions]]
            selector = "#worldMap"
            predicate = "visible"

            [[steps.conditions]]
            selector = "#worldMapLegend li"
            predicate = "visible_with_text"
            pattern = { contains = "No Data" }

            [[steps]]
            kind = "interact"
            action = "select_option"
            selector = "#user_select"
            index = 1

            [[steps]]
            kind = "await_readiness"

            [[steps.conditions]]
            selector = "#userForm #email"
            predicate = "visible_with_text"
            pattern = "non_empty"

            [[steps]]
            kind = "capture"
            artifact = "screenshot"
            path = "page.png"

            [[steps]]
            kind = "capture"
            artifact = "screenshot"
            target = { element = ".card.shadow-sm" }
            path = "cards.png"

            [[steps]]
            kind = "capture"
            artifact = "console_log"
            "##,
        )
        .expect("Failed to parse scenario");

        assert_eq!(scenario.name, "kitchen sink");
        assert_eq!(scenario.launch.headless, Some(false));
        assert_eq!(scenario.launch.window_width, Some(1280));
        assert_eq!(scenario.launch.cdp_endpoint, None);
        assert_eq!(scenario.steps.len(), 7);

        match &scenario.steps[0] {
            Step::Navigate {
                url,
                timeout_ms,
                wait_until,
            } => {
                assert_eq!(url, "http://127.0.0.1:8080/");
                assert_eq!(*timeout_ms, Some(10000));
                assert_eq!(*wait_until, Some(WaitUntil::DomContentLoaded));
            }
            other => panic!("expected navigate, got {}", other.label()),
        }
        match &scenario.steps[1] {
            Step::AwaitReadiness { conditions } => {
                assert_eq!(conditions.len(), 2);
                assert_eq!(conditions[0].selector, "#worldMap");
                assert_eq!(conditions[0].predicate, PredicateKind::Visible);
                assert_eq!(conditions[1].predicate, PredicateKind::VisibleWithText);
            }
            other => panic!("expected await_readiness, got {}", other.label()),
        }
        match &scenario.steps[2] {
            Step::Interact {
                action: Interaction::SelectOption { selector, index },
            } => {
                assert_eq!(selector, "#user_select");
                assert_eq!(*index, 1);
            }
            other => panic!("expected select_option, got {}", other.label()),
        }
        match &scenario.steps[5] {
            Step::Capture { artifact } => {
                assert_eq!(artifact.kind, ArtifactKind::Screenshot);
                assert_eq!(
                    artifact.target,
                    CaptureTarget::Element(".card.shadow-sm".to_string())
                );
            }
            other => panic!("expected capture, got {}", other.label()),
        }
        match &scenario.steps[6] {
            Step::Capture { artifact } => {
                assert_eq!(artifact.kind, ArtifactKind::ConsoleLog);
                assert_eq!(artifact.path, None);
            }
            other => panic!("expected capture, got {}", other.label()),
        }

        scenario.validate().expect("Failed to validate scenario");
    }

    #[test]
    fn test_scenario_rejects_unknown_step_kind() {
        let result = Scenario::from_toml_str(
            r#"
            name = "bad"

            [[steps]]
            kind = "teleport"
            url = "http://example.com"
            "#,
        );
        assert!(result.is_err());
    }

    /// Test helper: a minimal valid gate step
    fn gate() -> Step {
        Step::AwaitReadiness {
            conditions: vec![ReadinessCondition::visible("#app")],
        }
    }

    /// Test helper: a minimal valid navigate step
    fn navigate() -> Step {
        Step::Navigate {
            url: "http://127.0.0.1:8080/".to_string(),
            timeout_ms: None,
            wait_until: None,
        }
    }

    /// Test helper: a full-page capture step
    fn capture() -> Step {
        Step::Capture {
            artifact: CaptureArtifact::screenshot("shot.png"),
        }
    }

    /// Test helper: a click step
    fn click() -> Step {
        Step::Interact {
            action: Interaction::Click {
                selector: "button".to_string(),
            },
        }
    }

    /// Test helper: a scenario named "t" over the given steps
    fn scenario_with(steps: Vec<Step>) -> Scenario {
        Scenario {
            name: "t".to_string(),
            launch: LaunchOverrides::default(),
            steps,
        }
    }

    #[test]
    fn test_validation_requires_leading_navigation() {
        let err = scenario_with(vec![gate()])
            .validate()
            .expect_err("gate without navigation must not validate");
        assert!(err.to_string().contains("requires a navigation first"));

        let err = scenario_with(vec![navigate(), gate(), navigate()])
            .validate()
            .expect_err("second navigation must not validate");
        assert!(err.to_string().contains("only legal as the first step"));
        assert!(err.to_string().contains("step 3"));
    }

    #[test]
    fn test_validation_requires_gate_before_capture_and_interact() {
        let err = scenario_with(vec![navigate(), capture()])
            .validate()
            .expect_err("capture without gate must not validate");
        assert!(err
            .to_string()
            .contains("requires a readiness gate after navigation"));

        let err = scenario_with(vec![navigate(), click()])
            .validate()
            .expect_err("interact without gate must not validate");
        assert!(err
            .to_string()
            .contains("requires a readiness gate after navigation"));

        scenario_with(vec![navigate(), gate(), click(), gate(), capture()])
            .validate()
            .expect("Failed to validate gated flow");
    }

    #[test]
    fn test_validation_requires_regate_after_interaction() {
        let err = scenario_with(vec![navigate(), gate(), click(), capture()])
            .validate()
            .expect_err("capture directly after interact must not validate");
        assert!(err.to_string().contains("readiness gate in between"));

        let err = scenario_with(vec![navigate(), gate(), click(), click()])
            .validate()
            .expect_err("consecutive interactions must not validate");
        assert!(err.to_string().contains("readiness gate in between"));
    }

    #[test]
    fn test_validation_checks_step_fields() {
        let err = scenario_with(vec![navigate(), Step::AwaitReadiness { conditions: vec![] }])
            .validate()
            .expect_err("empty gate must not validate");
        assert!(err.to_string().contains("at least one condition"));

        let bad_condition = ReadinessCondition {
            selector: "#x".to_string(),
            predicate: PredicateKind::VisibleWithText,
            pattern: None,
            index: None,
            timeout_ms: None,
        };
        let err = scenario_with(vec![
            navigate(),
            Step::AwaitReadiness {
                conditions: vec![bad_condition],
            },
        ])
        .validate()
        .expect_err("condition without pattern must not validate");
        assert!(err.to_string().contains("pattern"));

        let mut artifact = CaptureArtifact::screenshot("x.png");
        artifact.path = None;
        let err = scenario_with(vec![navigate(), gate(), Step::Capture { artifact }])
            .validate()
            .expect_err("screenshot without path must not validate");
        assert!(err.to_string().contains("path"));

        let err = scenario_with(vec![])
            .validate()
            .expect_err("empty scenario must not validate");
        assert!(err.to_string().contains("no steps"));

        let mut unnamed = scenario_with(vec![navigate()]);
        unnamed.name = "  ".to_string();
        let err = unnamed
            .validate()
            .expect_err("blank name must not validate");
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_state_machine_transitions() {
        use ScenarioState::*;

        assert_eq!(Init.apply(&navigate()), Ok(Navigated));
        assert_eq!(Navigated.apply(&gate()), Ok(Ready));
        assert_eq!(Ready.apply(&gate()), Ok(Ready));
        assert_eq!(Ready.apply(&click()), Ok(Interacted));
        assert_eq!(Interacted.apply(&gate()), Ok(Ready));
        assert_eq!(Ready.apply(&capture()), Ok(Captured));
        assert_eq!(Captured.apply(&capture()), Ok(Captured));
        assert_eq!(Captured.apply(&click()), Ok(Interacted));
        assert_eq!(Captured.apply(&gate()), Ok(Ready));

        assert!(Interacted.apply(&capture()).is_err());
        assert!(Interacted.apply(&click()).is_err());
        assert!(Navigated.apply(&capture()).is_err());
        assert!(Init.apply(&gate()).is_err());
        assert!(Ready.apply(&navigate()).is_err());
        assert!(Done.apply(&gate()).is_err());
        assert!(Failed.apply(&capture()).is_err());

        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Ready.is_terminal());
    }

    #[test]
    fn test_launch_overrides_apply() {
        let overrides = LaunchOverrides {
            headless: Some(false),
            window_width: Some(800),
            window_height: None,
            chrome_path: Some("/opt/chrome".to_string()),
            cdp_endpoint: None,
        };

        let options = overrides.apply(LaunchOptions::default());
        assert!(!options.headless);
        assert_eq!(options.window_width, 800);
        assert_eq!(options.window_height, 1080);
        assert_eq!(options.executable_path.as_deref(), Some("/opt/chrome"));
        assert_eq!(options.cdp_endpoint, None);

        let untouched = LaunchOverrides::default().apply(LaunchOptions::default());
        assert!(untouched.headless);
        assert_eq!(untouched.window_width, 1920);
    }

    #[test]
    fn test_shipped_scenarios_are_valid() {
        let dashboard = Scenario::from_toml_str(include_str!("../../scenarios/dashboard.toml"))
            .expect("Failed to parse dashboard scenario");
        dashboard
            .validate()
            .expect("Failed to validate dashboard scenario");
        assert!(dashboard
            .steps
            .iter()
            .any(|step| matches!(step, Step::Capture { .. })));

        let tools = Scenario::from_toml_str(include_str!("../../scenarios/tools.toml"))
            .expect("Failed to parse tools scenario");
        tools.validate().expect("Failed to validate tools scenario");
        assert!(tools
            .steps
            .iter()
            .any(|step| matches!(step, Step::Interact { .. })));
    }
}
