//! Harness integration tests
//!
//! Full-stack scenario runs over a real WebSocket: runner, session,
//! readiness detector, and recorder driving the mock DevTools endpoint with
//! production-like timings. Pages here render late, refuse navigations, or
//! never produce the awaited element, the way dashboards under test do.

mod common;

use common::{
    click_step, console_log_step, element_screenshot_step, gate_step, navigate_step,
    scenario_named, screenshot_step, select_option_step, temp_artifact_dir, test_config,
    WsSessionFactory,
};
use dashprobe::readiness::{ReadinessCondition, TextPattern};
use dashprobe::scenario::{ScenarioRunner, ScenarioState, ScenarioStatus};
use mock_chrome::{MockChrome, PageScript, ScriptedElement};
use std::sync::Arc;

async fn start_server(script: PageScript) -> MockChrome {
    MockChrome::start(script)
        .await
        .expect("Failed to start mock Chrome")
}

/// A dashboard whose map renders at 1.2s and whose legend fills at 1.8s
/// passes its gate, settles, and leaves all three artifacts.
#[tokio::test]
async fn test_dashboard_scenario_waits_out_late_render() {
    let script = PageScript::new()
        .with_element(
            "#worldMap",
            ScriptedElement::appearing_after_ms(1200).with_rect(0.0, 0.0, 960.0, 540.0),
        )
        .with_element(
            "#worldMapLegend li",
            ScriptedElement::appearing_after_ms(1800)
                .with_texts(&["No Data", "1-9", "10-99"])
                .with_count(3),
        )
        .with_element(
            ".card.shadow-sm",
            ScriptedElement::visible().with_rect(0.0, 560.0, 720.0, 480.0),
        )
        .with_console_line("userlist loaded");
    let server = start_server(script).await;

    let dir = temp_artifact_dir();
    let mut config = test_config(&dir);
    config.poll_interval_ms = 100;
    config.settle_delay_ms = 250;

    let scenario = scenario_named(
        "dashboard",
        vec![
            navigate_step("http://127.0.0.1:8080/"),
            gate_step(vec![
                ReadinessCondition::visible("#worldMap"),
                ReadinessCondition::visible_with_text(
                    "#worldMapLegend li",
                    TextPattern::Contains("No Data".to_string()),
                ),
            ]),
            screenshot_step("dashboard.png"),
            element_screenshot_step(".card.shadow-sm", "dashboard-cards.png"),
            console_log_step(),
        ],
    );

    let runner = ScenarioRunner::with_factory(
        config,
        Arc::new(WsSessionFactory::new(server.ws_endpoint())),
    );
    let report = runner.run_scenario(&scenario).await;

    assert!(report.is_passed(), "scenario failed: {:?}", report.error);
    assert_eq!(report.status, ScenarioStatus::Done);
    assert_eq!(report.final_state, ScenarioState::Done);
    // Legend text is not up before 1.8s, and the settle-delay runs after it
    assert!(
        report.elapsed_ms >= 2050,
        "finished too early: {}ms",
        report.elapsed_ms
    );

    let full = std::fs::metadata(dir.join("dashboard.png")).expect("Full-page shot missing");
    assert!(full.len() > 0);
    let cards = std::fs::metadata(dir.join("dashboard-cards.png")).expect("Card shot missing");
    assert!(cards.len() > 0);

    assert_eq!(report.artifacts.len(), 3);
    assert!(report.artifacts.iter().all(|record| record.ok));
    assert!(report
        .console
        .iter()
        .any(|line| line == "userlist loaded"));

    std::fs::remove_dir_all(&dir).ok();
}

/// A legend that never renders turns into a readiness timeout naming the
/// selector, a failure screenshot, and no further steps executed.
#[tokio::test]
async fn test_missing_legend_times_out_with_diagnostics() {
    let script = PageScript::new().with_element("#worldMap", ScriptedElement::visible());
    let server = start_server(script).await;

    let dir = temp_artifact_dir();
    let config = test_config(&dir);

    let scenario = scenario_named(
        "dashboard",
        vec![
            navigate_step("http://127.0.0.1:8080/"),
            gate_step(vec![
                ReadinessCondition::visible("#worldMap"),
                ReadinessCondition::visible_with_text(
                    "#worldMapLegend li",
                    TextPattern::NonEmpty,
                )
                .with_timeout_ms(500),
            ]),
            screenshot_step("dashboard.png"),
        ],
    );

    let runner = ScenarioRunner::with_factory(
        config,
        Arc::new(WsSessionFactory::new(server.ws_endpoint())),
    );
    let report = runner.run_scenario(&scenario).await;

    assert!(!report.is_passed());
    assert_eq!(report.failed_step, Some(2));
    assert_eq!(report.final_state, ScenarioState::Navigated);
    assert_eq!(report.error_kind.as_deref(), Some("readiness_timeout"));
    let message = report.error.as_deref().expect("Failed report needs an error");
    assert!(message.contains("#worldMapLegend li"), "got: {}", message);
    assert!(report.elapsed_ms >= 500);

    // Diagnostic screenshot at the scenario's known failure path
    let failure = report
        .failure_screenshot
        .as_deref()
        .expect("No failure screenshot recorded");
    assert_eq!(failure, dir.join("dashboard-failure.png"));
    assert!(std::fs::metadata(failure).expect("Failure shot missing").len() > 0);

    // The capture step after the failed gate never ran
    assert!(std::fs::metadata(dir.join("dashboard.png")).is_err());
    assert_eq!(report.artifacts.len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

/// A refused navigation fails the scenario at step one with the browser's
/// network error text in the message.
#[tokio::test]
async fn test_refused_navigation_fails_the_first_step() {
    let script = PageScript::new().with_navigate_error("net::ERR_CONNECTION_REFUSED");
    let server = start_server(script).await;

    let dir = temp_artifact_dir();
    let config = test_config(&dir);

    let scenario = scenario_named(
        "dashboard",
        vec![
            navigate_step("http://198.51.100.7:8080/"),
            gate_step(vec![ReadinessCondition::visible("#worldMap")]),
        ],
    );

    let runner = ScenarioRunner::with_factory(
        config,
        Arc::new(WsSessionFactory::new(server.ws_endpoint())),
    );
    let report = runner.run_scenario(&scenario).await;

    assert!(!report.is_passed());
    assert_eq!(report.failed_step, Some(1));
    assert_eq!(report.final_state, ScenarioState::Init);
    assert_eq!(report.error_kind.as_deref(), Some("navigation"));
    let message = report.error.as_deref().expect("Failed report needs an error");
    assert!(message.contains("net::ERR_CONNECTION_REFUSED"), "got: {}", message);
    assert!(message.contains("198.51.100.7"), "got: {}", message);

    std::fs::remove_dir_all(&dir).ok();
}

/// Select, click, and re-gate against a form whose options and output fill
/// in shortly after load.
#[tokio::test]
async fn test_user_form_flow_drives_interactions() {
    let script = PageScript::new()
        .with_element("#user_select", ScriptedElement::visible())
        .with_element(
            "#user_select option",
            ScriptedElement::visible().with_count_after_ms(80, 1, 3),
        )
        .with_element(
            "#userForm",
            ScriptedElement::visible().with_rect(40.0, 200.0, 600.0, 320.0),
        )
        .with_element("#userForm button[type=submit]", ScriptedElement::visible())
        .with_element(
            "#userForm #email",
            ScriptedElement::visible().with_texts_after_ms(120, &["alice@example.com"]),
        );
    let server = start_server(script).await;

    let dir = temp_artifact_dir();
    let mut config = test_config(&dir);
    config.poll_interval_ms = 25;

    let scenario = scenario_named(
        "tools",
        vec![
            navigate_step("http://127.0.0.1:8080/tools"),
            gate_step(vec![ReadinessCondition::nth_child_visible(
                "#user_select option",
                1,
            )]),
            select_option_step("#user_select", 1),
            gate_step(vec![ReadinessCondition::visible("#userForm")]),
            click_step("#userForm button[type=submit]"),
            gate_step(vec![ReadinessCondition::visible_with_text(
                "#userForm #email",
                TextPattern::Regex(r".+@.+\..+".to_string()),
            )]),
            element_screenshot_step("#userForm", "tools-user-form.png"),
        ],
    );

    let runner = ScenarioRunner::with_factory(
        config,
        Arc::new(WsSessionFactory::new(server.ws_endpoint())),
    );
    let report = runner.run_scenario(&scenario).await;

    assert!(report.is_passed(), "scenario failed: {:?}", report.error);
    // The second option only exists from 80ms, the email text from 120ms
    assert!(report.elapsed_ms >= 120);
    let form = std::fs::metadata(dir.join("tools-user-form.png")).expect("Form shot missing");
    assert!(form.len() > 0);

    std::fs::remove_dir_all(&dir).ok();
}

/// A run over a passing and a failing scenario counts both, keeps running
/// after the failure, and persists a report CI can parse.
#[tokio::test]
async fn test_mixed_run_aggregates_and_persists_report() {
    let script = PageScript::new().with_element("#app", ScriptedElement::visible());
    let server = start_server(script).await;

    let dir = temp_artifact_dir();
    let config = test_config(&dir);

    let scenarios = vec![
        scenario_named(
            "healthy",
            vec![
                navigate_step("http://127.0.0.1:8080/"),
                gate_step(vec![ReadinessCondition::visible("#app")]),
                screenshot_step("healthy.png"),
            ],
        ),
        scenario_named(
            "broken",
            vec![
                navigate_step("http://127.0.0.1:8080/"),
                gate_step(vec![
                    ReadinessCondition::visible("#ghost").with_timeout_ms(300)
                ]),
                screenshot_step("broken.png"),
            ],
        ),
    ];

    let runner = ScenarioRunner::with_factory(
        config.clone(),
        Arc::new(WsSessionFactory::new(server.ws_endpoint())),
    );
    let run = runner.run(&scenarios).await;

    assert_eq!(run.total, 2);
    assert_eq!(run.passed, 1);
    assert_eq!(run.failed, 1);
    assert!(!run.all_passed());
    assert!(run.scenarios[0].is_passed());
    assert_eq!(
        run.scenarios[1].error_kind.as_deref(),
        Some("readiness_timeout")
    );
    assert!(std::fs::metadata(dir.join("healthy.png")).is_ok());
    assert!(std::fs::metadata(dir.join("broken-failure.png")).is_ok());

    let report_path = config.report_path();
    run.write_to_path(&report_path)
        .await
        .expect("Failed to write run report");
    let raw = std::fs::read_to_string(&report_path).expect("Run report missing");
    let parsed: serde_json::Value =
        serde_json::from_str(&raw).expect("Run report is not valid JSON");
    assert_eq!(parsed["total"], 2);
    assert_eq!(parsed["failed"], 1);
    assert_eq!(parsed["scenarios"][0]["status"], "done");
    assert_eq!(parsed["scenarios"][1]["status"], "failed");
    assert_eq!(parsed["scenarios"][1]["failed_step"], 2);

    std::fs::remove_dir_all(&dir).ok();
}
