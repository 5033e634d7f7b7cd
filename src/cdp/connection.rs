//! CDP WebSocket connection implementation
//!
//! One WebSocket to one DevTools page target. Commands are correlated to
//! responses through an id counter and a pending-command map; a background
//! reader task owns the receive half of the socket, completes pending
//! commands, and fans events out to subscribers.

use super::traits::{CdpEvent, CdpTransport};
use super::types::{CdpErrorDetail, CdpNotification, CdpRequest, CdpRpcResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// CDP timeout configuration
#[derive(Debug, Clone)]
pub struct CdpTimeoutConfig {
    /// Default timeout for most commands (seconds)
    default_timeout_secs: u64,
    /// Timeout for screenshot commands (seconds)
    screenshot_timeout_secs: u64,
    /// Timeout for JavaScript evaluation (seconds)
    execution_timeout_secs: u64,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            screenshot_timeout_secs: 60,
            execution_timeout_secs: 30,
        }
    }
}

impl CdpTimeoutConfig {
    /// Timeout budget for a specific command method
    fn timeout_for(&self, method: &str) -> tokio::time::Duration {
        // Screenshots of large pages can take a while to encode
        if method.starts_with("Page.captureScreenshot") {
            return tokio::time::Duration::from_secs(self.screenshot_timeout_secs);
        }

        if method.starts_with("Runtime.evaluate") {
            return tokio::time::Duration::from_secs(self.execution_timeout_secs);
        }

        tokio::time::Duration::from_secs(self.default_timeout_secs)
    }
}

/// A command waiting for its response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpRpcResponse>,
    /// Command method (for logging)
    method: String,
}

// Held only for map insert/remove and subscriber push, never across an await.
type PendingMap = Arc<StdMutex<HashMap<u64, PendingCommand>>>;
type SubscriberList = Arc<StdMutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>;

/// CDP WebSocket connection implementation
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Send half of the socket; held across the send await
    sink: Mutex<SplitSink<WsStream, Message>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending: PendingMap,
    /// Event subscribers
    subscribers: SubscriberList,
    /// Whether the connection accepts new commands
    open: Arc<AtomicBool>,
    /// Background reader task
    reader: StdMutex<Option<JoinHandle<()>>>,
    /// Per-command timeout configuration
    timeouts: CdpTimeoutConfig,
}

impl CdpWebSocketConnection {
    /// Connect to a DevTools WebSocket URL
    /// (e.g. "ws://127.0.0.1:9222/devtools/page/ABC123")
    pub async fn connect<S: Into<String>>(url: S) -> Result<Arc<Self>> {
        let url = url.into();
        info!("Connecting to CDP target at {}", url);

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;
        let (sink, stream) = ws_stream.split();

        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let subscribers: SubscriberList = Arc::new(StdMutex::new(Vec::new()));
        let open = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(Self::read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&subscribers),
            Arc::clone(&open),
        ));

        Ok(Arc::new(Self {
            url,
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(1),
            pending,
            subscribers,
            open,
            reader: StdMutex::new(Some(reader)),
            timeouts: CdpTimeoutConfig::default(),
        }))
    }

    /// Receive loop: routes responses to pending commands and events to
    /// subscribers until the socket closes.
    async fn read_loop(
        mut stream: SplitStream<WsStream>,
        pending: PendingMap,
        subscribers: SubscriberList,
        open: Arc<AtomicBool>,
    ) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    Self::route_message(&text, &pending, &subscribers);
                }
                Ok(Message::Close(_)) => {
                    debug!("CDP target closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("CDP read error: {}", e);
                    break;
                }
            }
        }

        open.store(false, Ordering::SeqCst);
        Self::drain_pending(&pending);
    }

    /// Dispatch one incoming frame. Responses carry an `id`; everything else
    /// with a `method` is an event notification.
    fn route_message(text: &str, pending: &PendingMap, subscribers: &SubscriberList) {
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let waiter = pending.lock().ok().and_then(|mut map| map.remove(&response.id));
            match waiter {
                Some(command) => {
                    debug!("Response for {} (id {})", command.method, response.id);
                    // Receiver may have timed out and gone away
                    let _ = command.sender.send(response);
                }
                None => {
                    debug!("Dropping response for unknown command id {}", response.id);
                }
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            let event = CdpEvent {
                method: notification.method,
                params: notification.params,
            };
            if let Ok(mut subs) = subscribers.lock() {
                subs.retain(|tx| tx.send(event.clone()).is_ok());
            }
            return;
        }

        debug!("Unparseable CDP frame: {}", text);
    }

    /// Fail every in-flight command once the socket is gone.
    fn drain_pending(pending: &PendingMap) {
        let Ok(mut map) = pending.lock() else {
            return;
        };
        for (id, command) in map.drain() {
            debug!(
                "Failing pending {} (id {}): connection lost",
                command.method, id
            );
            let _ = command.sender.send(CdpRpcResponse {
                id,
                result: Value::Null,
                error: Some(CdpErrorDetail {
                    code: -1,
                    message: "connection closed".to_string(),
                    data: None,
                }),
            });
        }
    }

    /// WebSocket URL this connection was opened against
    pub fn url(&self) -> &str {
        &self.url
    }

    fn remove_pending(&self, id: u64) {
        if let Ok(mut map) = self.pending.lock() {
            map.remove(&id);
        }
    }
}

#[async_trait]
impl CdpTransport for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if !self.is_open() {
            return Err(Error::session_closed(format!(
                "cannot send {} on closed connection",
                method
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: None,
        };
        let payload = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        if let Ok(mut map) = self.pending.lock() {
            map.insert(
                id,
                PendingCommand {
                    sender: tx,
                    method: method.to_string(),
                },
            );
        }

        debug!("Sending {} (id {})", method, id);
        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Text(payload)).await {
                self.remove_pending(id);
                return Err(Error::websocket(format!("Failed to send {}: {}", method, e)));
            }
        }

        let budget = self.timeouts.timeout_for(method);
        let response = match tokio::time::timeout(budget, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(Error::websocket(format!(
                    "Response channel for {} dropped",
                    method
                )));
            }
            Err(_) => {
                self.remove_pending(id);
                return Err(Error::timeout(format!(
                    "{} did not respond within {:?}",
                    method, budget
                )));
            }
        };

        if let Some(error) = response.error {
            if error.message == "connection closed" {
                return Err(Error::session_closed(format!("{} aborted", method)));
            }
            return Err(Error::cdp(format!(
                "{} failed: {} (code {})",
                method, error.message, error.code
            )));
        }

        Ok(response.result)
    }

    fn subscribe_events(&self) -> Result<mpsc::UnboundedReceiver<CdpEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .map_err(|_| Error::internal("event subscriber list poisoned"))?
            .push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("Closing CDP connection to {}", self.url);
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Close frame not delivered: {}", e);
            }
        }

        // The reader finishes on its own once the close frame round-trips;
        // abort covers a peer that never answers.
        let reader = self.reader.lock().ok().and_then(|mut slot| slot.take());
        if let Some(reader) = reader {
            reader.abort();
        }

        Self::drain_pending(&self.pending);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
