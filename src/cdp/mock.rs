//! Mock CDP implementations for testing
//!
//! `MockCdpTransport` serves canned per-method responses for client-level
//! tests. `MockCdpClient` simulates a page whose elements appear, gain text,
//! and grow over time: probe scripts are recognized by their `const sel` /
//! `const probe` headers and answered from per-selector timelines, so
//! readiness and runner behavior can be tested without a browser.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::cdp::traits::{CdpClient, CdpEvent, CdpTransport};
use crate::cdp::types::{NavigateResult, ScreenshotParams};
use crate::{Error, Result};

// 1x1 transparent PNG, the smallest payload that is still a valid image.
const MOCK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Decoded mock screenshot bytes
pub fn mock_png_bytes() -> Vec<u8> {
    BASE64.decode(MOCK_PNG_BASE64).unwrap_or_default()
}

/// Mock CDP transport with canned per-method responses
#[derive(Debug, Default)]
pub struct MockCdpTransport {
    responses: Mutex<HashMap<String, Value>>,
    sent: Mutex<Vec<(String, Option<Value>)>>,
    subscribers: Mutex<Vec<UnboundedSender<CdpEvent>>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MockCdpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the result payload returned for a method
    pub fn with_response(self, method: &str, result: Value) -> Self {
        if let Ok(mut map) = self.responses.lock() {
            map.insert(method.to_string(), result);
        }
        self
    }

    /// Methods sent so far, in order
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|log| log.iter().map(|(m, _)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// Parameters of the most recent call to a method
    pub fn last_params(&self, method: &str) -> Option<Value> {
        self.sent.lock().ok().and_then(|log| {
            log.iter()
                .rev()
                .find(|(m, _)| m == method)
                .and_then(|(_, p)| p.clone())
        })
    }

    /// Deliver an event to every subscriber
    pub fn push_event(&self, method: &str, params: Value) {
        let event = CdpEvent {
            method: method.to_string(),
            params,
        };
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CdpTransport for MockCdpTransport {
    async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::session_closed(format!(
                "cannot send {} on closed connection",
                method
            )));
        }
        if let Ok(mut log) = self.sent.lock() {
            log.push((method.to_string(), params));
        }
        let canned = self
            .responses
            .lock()
            .ok()
            .and_then(|map| map.get(method).cloned());
        Ok(canned.unwrap_or_else(|| json!({})))
    }

    fn subscribe_events(&self) -> Result<UnboundedReceiver<CdpEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|_| Error::internal("subscriber list poisoned"))?
            .push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// Timeline of one simulated element (or element list)
#[derive(Debug, Clone)]
pub struct MockElement {
    /// When the element enters the DOM visibly; `None` means never
    visible_after: Option<Duration>,
    /// Visible matches' texts once populated
    texts: Vec<String>,
    /// Texts stay blank until this offset (element visible but unpopulated)
    texts_after: Option<Duration>,
    /// Match-count growth steps as (offset, count) pairs
    count_steps: Vec<(Duration, usize)>,
    /// Bounding rect reported once visible
    rect: (f64, f64, f64, f64),
}

impl MockElement {
    /// Element that becomes visible after a delay
    pub fn appears_after(delay: Duration) -> Self {
        Self {
            visible_after: Some(delay),
            texts: Vec::new(),
            texts_after: None,
            count_steps: Vec::new(),
            rect: (10.0, 20.0, 200.0, 100.0),
        }
    }

    /// Element visible from the start
    pub fn visible_now() -> Self {
        Self::appears_after(Duration::ZERO)
    }

    /// Element that never appears
    pub fn never() -> Self {
        Self {
            visible_after: None,
            texts: Vec::new(),
            texts_after: None,
            count_steps: Vec::new(),
            rect: (0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Texts present from the moment the element is visible
    pub fn with_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts = texts.into_iter().map(Into::into).collect();
        self
    }

    /// Element is visible but blank until `delay`, then carries `texts`
    pub fn with_texts_after<I, S>(mut self, delay: Duration, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts = texts.into_iter().map(Into::into).collect();
        self.texts_after = Some(delay);
        self
    }

    /// Match count reaches `count` once `delay` has elapsed
    pub fn with_count_step(mut self, delay: Duration, count: usize) -> Self {
        self.count_steps.push((delay, count));
        self.count_steps.sort_by_key(|(d, _)| *d);
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = (x, y, width, height);
        self
    }

    fn visible_at(&self, elapsed: Duration) -> (bool, Option<&'static str>) {
        match self.visible_after {
            Some(delay) if elapsed >= delay => (true, None),
            _ => (false, Some("not_found")),
        }
    }

    fn texts_at(&self, elapsed: Duration) -> Vec<String> {
        let (visible, _) = self.visible_at(elapsed);
        if !visible {
            return Vec::new();
        }
        match self.texts_after {
            Some(delay) if elapsed < delay => vec![String::new()],
            _ => self.texts.clone(),
        }
    }

    fn count_at(&self, elapsed: Duration) -> usize {
        let stepped = self
            .count_steps
            .iter()
            .rev()
            .find(|(delay, _)| elapsed >= *delay)
            .map(|(_, count)| *count);
        match stepped {
            Some(count) => count,
            None => {
                let (visible, _) = self.visible_at(elapsed);
                usize::from(visible)
            }
        }
    }
}

/// One answered probe, for ordering and timing assertions
#[derive(Debug, Clone)]
pub struct ProbeRecord {
    pub selector: String,
    pub probe: String,
    pub at: Duration,
    pub satisfied: bool,
}

/// One non-probe command (navigate, screenshot, domain enable)
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub name: String,
    pub at: Duration,
}

/// Mock CDP client simulating a page with scripted element timelines
#[derive(Debug)]
pub struct MockCdpClient {
    started: Instant,
    elements: Mutex<HashMap<String, MockElement>>,
    probe_log: Mutex<Vec<ProbeRecord>>,
    command_log: Mutex<Vec<CommandRecord>>,
    navigate_error_text: Mutex<Option<String>>,
    console_on_navigate: Mutex<Vec<String>>,
    ready_state_value: Mutex<String>,
    screenshot_fails: AtomicBool,
    subscribers: Mutex<Vec<UnboundedSender<CdpEvent>>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCdpClient {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            elements: Mutex::new(HashMap::new()),
            probe_log: Mutex::new(Vec::new()),
            command_log: Mutex::new(Vec::new()),
            navigate_error_text: Mutex::new(None),
            console_on_navigate: Mutex::new(Vec::new()),
            ready_state_value: Mutex::new("complete".to_string()),
            screenshot_fails: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        }
    }

    /// Register an element timeline for a selector
    pub fn element(self, selector: &str, element: MockElement) -> Self {
        if let Ok(mut map) = self.elements.lock() {
            map.insert(selector.to_string(), element);
        }
        self
    }

    /// Make `Page.navigate` report a refused navigation
    pub fn navigate_error(self, error_text: &str) -> Self {
        if let Ok(mut slot) = self.navigate_error_text.lock() {
            *slot = Some(error_text.to_string());
        }
        self
    }

    /// Make every screenshot attempt fail
    pub fn failing_screenshots(self) -> Self {
        self.screenshot_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Emit these console messages when the page is navigated to
    pub fn console_on_navigate(self, lines: &[&str]) -> Self {
        if let Ok(mut slot) = self.console_on_navigate.lock() {
            slot.extend(lines.iter().map(|s| s.to_string()));
        }
        self
    }

    /// Override the reported `document.readyState`
    pub fn set_ready_state(&self, state: &str) {
        if let Ok(mut slot) = self.ready_state_value.lock() {
            *slot = state.to_string();
        }
    }

    /// Time since the mock page started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Probes answered so far
    pub fn probe_log(&self) -> Vec<ProbeRecord> {
        self.probe_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Non-probe commands issued so far
    pub fn command_log(&self) -> Vec<CommandRecord> {
        self.command_log
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Deliver an event to every subscriber
    pub fn push_event(&self, method: &str, params: Value) {
        let event = CdpEvent {
            method: method.to_string(),
            params,
        };
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Deliver a console message the way Chrome would
    pub fn push_console_log(&self, text: &str) {
        self.push_event(
            "Runtime.consoleAPICalled",
            json!({
                "type": "log",
                "args": [{ "type": "string", "value": text }]
            }),
        );
    }

    /// Deliver an uncaught page exception
    pub fn push_exception(&self, description: &str) {
        self.push_event(
            "Runtime.exceptionThrown",
            json!({
                "exceptionDetails": {
                    "text": "Uncaught",
                    "exception": { "type": "object", "description": description }
                }
            }),
        );
    }

    fn record_command(&self, name: impl Into<String>) {
        if let Ok(mut log) = self.command_log.lock() {
            log.push(CommandRecord {
                name: name.into(),
                at: self.started.elapsed(),
            });
        }
    }

    fn record_probe(&self, selector: &str, probe: &str, satisfied: bool) {
        if let Ok(mut log) = self.probe_log.lock() {
            log.push(ProbeRecord {
                selector: selector.to_string(),
                probe: probe.to_string(),
                at: self.started.elapsed(),
                satisfied,
            });
        }
    }

    fn ensure_open(&self, what: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::session_closed(format!("{} after close", what)));
        }
        Ok(())
    }

    fn answer_probe(&self, script: &str) -> Result<String> {
        let probe = extract_str_const(script, "probe").ok_or_else(|| {
            Error::internal(format!("mock: script without probe header: {}", head(script)))
        })?;
        let selector = extract_str_const(script, "sel")
            .ok_or_else(|| Error::internal("mock: script without sel header"))?;
        let elapsed = self.started.elapsed();
        let element = self
            .elements
            .lock()
            .ok()
            .and_then(|map| map.get(&selector).cloned());

        let payload = match probe.as_str() {
            "visible" => {
                let (visible, reason) = element
                    .map(|el| el.visible_at(elapsed))
                    .unwrap_or((false, Some("not_found")));
                self.record_probe(&selector, "visible", visible);
                json!({ "probe": "visible", "selector": selector, "visible": visible, "reason": reason })
            }
            "texts" => {
                let texts = element
                    .as_ref()
                    .map(|el| el.texts_at(elapsed))
                    .unwrap_or_default();
                let total = element.map(|el| el.count_at(elapsed)).unwrap_or(0);
                self.record_probe(&selector, "texts", !texts.is_empty());
                json!({ "probe": "texts", "selector": selector, "total": total, "texts": texts })
            }
            "nth_visible" => {
                let index = extract_num_const(script, "idx")
                    .ok_or_else(|| Error::internal("mock: nth probe without idx header"))?;
                let count = element.as_ref().map(|el| el.count_at(elapsed)).unwrap_or(0);
                let (visible, reason) = if count <= index {
                    (false, Some("too_few_matches"))
                } else {
                    element
                        .map(|el| el.visible_at(elapsed))
                        .unwrap_or((false, Some("not_found")))
                };
                self.record_probe(&selector, "nth_visible", visible);
                json!({
                    "probe": "nth_visible", "selector": selector, "index": index,
                    "count": count, "visible": visible, "reason": reason
                })
            }
            "rect" => {
                let rect = element.and_then(|el| {
                    let (visible, _) = el.visible_at(elapsed);
                    visible.then_some(el.rect)
                });
                self.record_probe(&selector, "rect", rect.is_some());
                match rect {
                    Some((x, y, width, height)) => json!({
                        "probe": "rect", "selector": selector, "found": true,
                        "x": x, "y": y, "width": width, "height": height
                    }),
                    None => {
                        json!({ "probe": "rect", "selector": selector, "found": false, "reason": "not_found" })
                    }
                }
            }
            "select_option" | "click" => {
                let (visible, reason) = element
                    .map(|el| el.visible_at(elapsed))
                    .unwrap_or((false, Some("not_found")));
                self.record_probe(&selector, &probe, visible);
                json!({ "probe": probe, "selector": selector, "ok": visible, "reason": reason })
            }
            other => {
                return Err(Error::internal(format!("mock: unknown probe kind {}", other)));
            }
        };

        Ok(payload.to_string())
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    async fn navigate(&self, url: &str) -> Result<NavigateResult> {
        self.ensure_open("navigate")?;
        self.record_command(format!("navigate:{}", url));
        let console_lines = self
            .console_on_navigate
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default();
        for line in console_lines {
            self.push_console_log(&line);
        }
        let error_text = self
            .navigate_error_text
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        Ok(NavigateResult {
            frame_id: "mock-frame".to_string(),
            loader_id: Some("mock-loader".to_string()),
            error_text,
        })
    }

    async fn evaluate_string(&self, script: &str) -> Result<String> {
        self.ensure_open("evaluate")?;
        if script == "document.readyState" {
            return Ok(self
                .ready_state_value
                .lock()
                .map(|s| s.clone())
                .unwrap_or_else(|_| "complete".to_string()));
        }
        self.answer_probe(script)
    }

    async fn capture_screenshot(&self, params: ScreenshotParams) -> Result<Vec<u8>> {
        self.ensure_open("screenshot")?;
        let kind = if params.clip.is_some() {
            "screenshot:clip"
        } else {
            "screenshot:full"
        };
        self.record_command(kind);
        if self.screenshot_fails.load(Ordering::SeqCst) {
            return Err(Error::cdp("mock screenshot failure"));
        }
        Ok(mock_png_bytes())
    }

    async fn enable_domain(&self, domain: &str) -> Result<()> {
        self.ensure_open("enable_domain")?;
        self.record_command(format!("{}.enable", domain));
        Ok(())
    }

    async fn call(&self, method: &str, _params: Option<Value>) -> Result<Value> {
        self.ensure_open("call")?;
        self.record_command(method.to_string());
        Ok(json!({}))
    }

    fn subscribe_events(&self) -> Result<UnboundedReceiver<CdpEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|_| Error::internal("subscriber list poisoned"))?
            .push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// First non-blank line of a script, for error messages
fn head(script: &str) -> &str {
    script.lines().find(|l| !l.trim().is_empty()).unwrap_or("")
}

/// Extract `const <name> = '<value>';` from a generated script
fn extract_str_const(script: &str, name: &str) -> Option<String> {
    let needle = format!("const {} = '", name);
    let start = script.find(&needle)? + needle.len();
    let rest = &script[start..];
    let end = rest.find("';")?;
    Some(rest[..end].replace("\\'", "'").replace("\\\\", "\\"))
}

/// Extract `const <name> = <number>;` from a generated script
fn extract_num_const(script: &str, name: &str) -> Option<usize> {
    let needle = format!("const {} = ", name);
    let start = script.find(&needle)? + needle.len();
    script[start..].split(';').next()?.trim().parse().ok()
}
