//! Console record and pump
//!
//! Every session owns one [`ConsoleRecord`]: an append-only log of the page's
//! console output, filled by a background pump task subscribed to the
//! session's CDP event stream. The record is created at session open, read at
//! report time, and discarded with the session.

use crate::cdp::types::{ConsoleApiCalledParams, ExceptionThrownParams};
use crate::cdp::CdpClient;
use crate::Result;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Append-only log of console message texts, in emission order
///
/// Cloning shares the underlying log; [`ConsoleRecord::snapshot`] returns an
/// owned copy of the lines accumulated so far. Lines are never mutated or
/// removed after append, so any snapshot is a prefix of every later one.
#[derive(Debug, Clone, Default)]
pub struct ConsoleRecord {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ConsoleRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message text
    pub fn append(&self, line: impl Into<String>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.into());
        }
    }

    /// Owned copy of the lines accumulated so far
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Number of lines accumulated so far
    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the console pump: a task that drains the client's event stream and
/// appends every console message and uncaught exception to `record`.
///
/// The pump runs until the event channel closes or the task is aborted at
/// session close. Message levels are not recorded; errors and warnings are
/// surfaced into the harness log instead.
pub fn spawn_console_pump(
    client: &Arc<dyn CdpClient>,
    record: ConsoleRecord,
) -> Result<JoinHandle<()>> {
    let mut events = client.subscribe_events()?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.method.as_str() {
                "Runtime.consoleAPICalled" => {
                    match serde_json::from_value::<ConsoleApiCalledParams>(event.params) {
                        Ok(params) => {
                            let text = params.message_text();
                            match params.r#type.as_str() {
                                "error" => warn!("page console error: {}", text),
                                "warning" => warn!("page console warning: {}", text),
                                _ => debug!("page console: {}", text),
                            }
                            record.append(text);
                        }
                        Err(e) => debug!("Unparseable console event: {}", e),
                    }
                }
                "Runtime.exceptionThrown" => {
                    match serde_json::from_value::<ExceptionThrownParams>(event.params) {
                        Ok(params) => {
                            let text = params.exception_details.describe();
                            warn!("page exception: {}", text);
                            record.append(text);
                        }
                        Err(e) => debug!("Unparseable exception event: {}", e),
                    }
                }
                _ => {}
            }
        }
        debug!("Console pump finished: event stream closed");
    }))
}
