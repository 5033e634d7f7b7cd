//! Integration tests for the session layer
//!
//! Navigation, locator probes, screenshots, console recording, and session
//! lifecycle, all driven through the scripted mock client so no browser is
//! needed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::cdp::mock::{mock_png_bytes, MockCdpClient, MockElement};
use crate::session::options::{NavigationOptions, WaitUntil};
use crate::session::page::Page;
use crate::session::session::Session;
use crate::Error;

/// Test helper: page over a shared mock client
fn page_over(client: &Arc<MockCdpClient>) -> Page {
    Page::new(client.clone())
}

/// Test helper: session over a shared mock client
fn session_over(client: &Arc<MockCdpClient>) -> Session {
    Session::with_client(client.clone()).expect("Failed to build session")
}

#[tokio::test]
async fn test_navigation_completes_via_ready_state_fallback() {
    // No load events arrive; the readyState probe alone must finish the wait
    let client = Arc::new(MockCdpClient::new());
    let page = page_over(&client);

    page.navigate("https://example.com", &NavigationOptions::default())
        .await
        .expect("Failed to navigate");

    let commands = client.command_log();
    assert!(commands
        .iter()
        .any(|c| c.name == "navigate:https://example.com"));
}

#[tokio::test]
async fn test_navigation_completes_on_load_event() {
    let client = Arc::new(MockCdpClient::new());
    client.set_ready_state("loading");

    let pusher = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pusher.push_event("Page.loadEventFired", json!({ "timestamp": 1.0 }));
    });

    let page = page_over(&client);
    let started = Instant::now();
    page.navigate(
        "https://example.com",
        &NavigationOptions::new(2000, WaitUntil::Load),
    )
    .await
    .expect("Failed to navigate");

    assert!(started.elapsed() < Duration::from_millis(2000));
}

#[tokio::test]
async fn test_navigation_waits_for_network_idle_lifecycle() {
    // readyState can never confirm networkIdle; only the lifecycle event can
    let client = Arc::new(MockCdpClient::new());

    let pusher = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pusher.push_event(
            "Page.lifecycleEvent",
            json!({ "frameId": "f", "name": "networkIdle" }),
        );
    });

    let page = page_over(&client);
    page.navigate(
        "https://example.com",
        &NavigationOptions::new(2000, WaitUntil::NetworkIdle),
    )
    .await
    .expect("Failed to navigate");
}

#[tokio::test]
async fn test_navigation_surfaces_refused_commit() {
    let client =
        Arc::new(MockCdpClient::new().navigate_error("net::ERR_CONNECTION_REFUSED"));
    let page = page_over(&client);

    let err = page
        .navigate("http://localhost:9", &NavigationOptions::default())
        .await
        .expect_err("Refused navigation should fail");

    assert!(matches!(err, Error::Navigation { .. }));
    assert!(err.to_string().contains("ERR_CONNECTION_REFUSED"));
    assert!(err.to_string().contains("http://localhost:9"));
}

#[tokio::test]
async fn test_navigation_times_out_when_load_never_finishes() {
    let client = Arc::new(MockCdpClient::new());
    client.set_ready_state("loading");

    let page = page_over(&client);
    let started = Instant::now();
    let err = page
        .navigate(
            "https://example.com",
            &NavigationOptions::new(200, WaitUntil::Load),
        )
        .await
        .expect_err("Navigation should time out");

    assert!(matches!(err, Error::Navigation { .. }));
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn test_locator_checks_nothing_until_probed() {
    let client = Arc::new(MockCdpClient::new());
    let page = page_over(&client);

    // Locating a selector with no match is not an error
    let locator = page.locate("#missing");
    assert!(client.probe_log().is_empty());

    let state = locator.visibility().await.expect("Failed to probe");
    assert!(!state.visible);
    assert_eq!(state.reason.as_deref(), Some("not_found"));
    assert_eq!(client.probe_log().len(), 1);
}

#[tokio::test]
async fn test_visibility_probe_sees_scripted_element() {
    let client = Arc::new(
        MockCdpClient::new()
            .element("#app", MockElement::visible_now())
            .element("#ghost", MockElement::never()),
    );
    let page = page_over(&client);

    let app = page.locate("#app").visibility().await.expect("probe");
    assert!(app.visible);
    assert_eq!(app.describe(), "visible");

    let ghost = page.locate("#ghost").visibility().await.expect("probe");
    assert!(!ghost.visible);
    assert_eq!(ghost.describe(), "not_found");
}

#[tokio::test]
async fn test_texts_probe_returns_visible_texts_in_order() {
    let client = Arc::new(
        MockCdpClient::new().element(
            "#legend li",
            MockElement::visible_now()
                .with_texts(["Alpha", "Beta"])
                .with_count_step(Duration::ZERO, 2),
        ),
    );
    let page = page_over(&client);

    let texts = page
        .locate("#legend li")
        .visible_texts()
        .await
        .expect("Failed to probe texts");
    assert_eq!(texts.total, 2);
    assert_eq!(texts.texts, vec!["Alpha", "Beta"]);
}

#[tokio::test]
async fn test_nth_visibility_counts_matches() {
    let client = Arc::new(
        MockCdpClient::new().element(
            "#user_select option",
            MockElement::visible_now().with_count_step(Duration::ZERO, 3),
        ),
    );
    let page = page_over(&client);
    let locator = page.locate("#user_select option");

    let second = locator.nth_visibility(1).await.expect("probe");
    assert!(second.visible);
    assert_eq!(second.count, 3);

    let sixth = locator.nth_visibility(5).await.expect("probe");
    assert!(!sixth.visible);
    assert_eq!(sixth.reason.as_deref(), Some("too_few_matches"));
}

#[tokio::test]
async fn test_select_option_fails_on_missing_element() {
    let client = Arc::new(MockCdpClient::new());
    let page = page_over(&client);

    let err = page
        .locate("#user_select")
        .select_option(1)
        .await
        .expect_err("Select on a missing element should fail");

    assert!(matches!(err, Error::Interaction { .. }));
    assert_eq!(err.kind(), "interaction");
    assert!(err.to_string().contains("#user_select"));
}

#[tokio::test]
async fn test_click_succeeds_on_visible_element() {
    let client = Arc::new(
        MockCdpClient::new().element("button[type=submit]", MockElement::visible_now()),
    );
    let page = page_over(&client);

    page.locate("button[type=submit]")
        .click()
        .await
        .expect("Failed to click");

    assert!(client
        .probe_log()
        .iter()
        .any(|p| p.probe == "click" && p.satisfied));
}

#[tokio::test]
async fn test_full_page_screenshot_returns_png_bytes() {
    let client = Arc::new(MockCdpClient::new());
    let page = page_over(&client);

    let bytes = page
        .screenshot_full_page()
        .await
        .expect("Failed to capture");
    assert_eq!(bytes, mock_png_bytes());
    assert!(client
        .command_log()
        .iter()
        .any(|c| c.name == "screenshot:full"));
}

#[tokio::test]
async fn test_element_screenshot_clips_to_element_rect() {
    let client = Arc::new(
        MockCdpClient::new()
            .element("#panel", MockElement::visible_now().with_rect(5.0, 6.0, 100.0, 50.0)),
    );
    let page = page_over(&client);

    let bytes = page
        .screenshot_element("#panel")
        .await
        .expect("Failed to capture element");
    assert_eq!(bytes, mock_png_bytes());

    // The rect probe runs first, then the clipped capture
    assert!(client
        .probe_log()
        .iter()
        .any(|p| p.probe == "rect" && p.selector == "#panel"));
    assert!(client
        .command_log()
        .iter()
        .any(|c| c.name == "screenshot:clip"));
}

#[tokio::test]
async fn test_element_screenshot_fails_when_element_absent() {
    let client = Arc::new(MockCdpClient::new());
    let page = page_over(&client);

    let err = page
        .screenshot_element("#gone")
        .await
        .expect_err("Capture of a missing element should fail");

    assert!(matches!(err, Error::Capture(_)));
    assert!(err.to_string().contains("#gone"));
    // No capture command was issued for the failed clip
    assert!(!client
        .command_log()
        .iter()
        .any(|c| c.name.starts_with("screenshot")));
}

#[tokio::test]
async fn test_console_pump_records_output_in_order() {
    let client = Arc::new(MockCdpClient::new());
    let session = session_over(&client);

    client.push_console_log("Loading dashboard data...");
    client.push_console_log("Data loaded");
    client.push_exception("TypeError: map is undefined");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        session.console().snapshot(),
        vec![
            "Loading dashboard data...",
            "Data loaded",
            "TypeError: map is undefined"
        ]
    );
    session.close().await;
}

#[tokio::test]
async fn test_console_record_survives_close() {
    let client = Arc::new(MockCdpClient::new());
    let session = session_over(&client);

    client.push_console_log("before close");
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.close().await;

    // The record is still readable, and the stopped pump appends nothing new
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.push_console_log("after close");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.console().snapshot(), vec!["before close"]);
}

#[tokio::test]
async fn test_enable_domains_issues_setup_commands() {
    let client = Arc::new(MockCdpClient::new());
    let session = session_over(&client);

    session.enable_domains().await.expect("Failed to enable");

    let names: Vec<String> = client.command_log().iter().map(|c| c.name.clone()).collect();
    assert!(names.contains(&"Page.enable".to_string()));
    assert!(names.contains(&"Runtime.enable".to_string()));
    assert!(names.contains(&"Page.setLifecycleEventsEnabled".to_string()));
    session.close().await;
}

#[tokio::test]
async fn test_session_close_is_idempotent() {
    let client = Arc::new(MockCdpClient::new());
    let session = session_over(&client);
    assert!(session.is_open());

    session.close().await;
    session.close().await;
    session.close().await;

    assert!(!session.is_open());
    assert_eq!(client.close_calls(), 1);
}

#[tokio::test]
async fn test_closed_session_rejects_operations() {
    let client = Arc::new(MockCdpClient::new());
    let session = session_over(&client);
    session.close().await;

    let err = session.ensure_open().expect_err("Closed session should refuse");
    assert!(matches!(err, Error::SessionClosed(_)));

    let nav_err = session
        .page()
        .navigate("https://example.com", &NavigationOptions::default())
        .await
        .expect_err("Navigation on a closed session should fail");
    assert!(matches!(nav_err, Error::Navigation { .. }));
}
