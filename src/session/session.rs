//! Session lifecycle
//!
//! One [`Session`] is one browser + one page + one console record, owned
//! exclusively by one scenario run. Close is idempotent and releases
//! everything on every exit path: the console pump, the page target, the
//! WebSocket, and (for launched browsers) the child process.

use crate::cdp::{
    BrowserHandle, BrowserLauncher, CdpClient, CdpClientImpl, CdpWebSocketConnection,
    LaunchOptions,
};
use crate::session::console::{spawn_console_pump, ConsoleRecord};
use crate::session::page::Page;
use crate::{Error, Result};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One browser session: browser handle, page, and console record
#[derive(Debug)]
pub struct Session {
    id: String,
    client: Arc<dyn CdpClient>,
    page: Page,
    console: ConsoleRecord,
    pump: Mutex<Option<JoinHandle<()>>>,
    handle: Mutex<Option<BrowserHandle>>,
    closed: AtomicBool,
}

impl Session {
    /// Launch (or attach to) a browser and open one page, per `options`.
    ///
    /// Fails with a launch error when no browser can be acquired; on any
    /// later setup failure the acquired browser is released before the error
    /// is returned.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let handle = BrowserLauncher::new(options).launch().await?;

        let client = match Self::open_page(&handle).await {
            Ok(client) => client,
            Err(e) => {
                if let Err(shutdown_err) = handle.shutdown().await {
                    warn!("Browser shutdown after failed setup: {}", shutdown_err);
                }
                return Err(e);
            }
        };

        let session = Self::start(client, Some(handle))?;
        if let Err(e) = session.enable_domains().await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Build a session over an already-established CDP client
    ///
    /// Used by tests and by callers that manage the browser themselves; close
    /// releases the client but no browser process.
    pub fn with_client(client: Arc<dyn CdpClient>) -> Result<Self> {
        Self::start(client, None)
    }

    async fn open_page(handle: &BrowserHandle) -> Result<Arc<dyn CdpClient>> {
        let target = handle.create_page("about:blank").await?;
        let transport = CdpWebSocketConnection::connect(&target.ws_url).await?;
        Ok(Arc::new(CdpClientImpl::new(transport)))
    }

    fn start(client: Arc<dyn CdpClient>, handle: Option<BrowserHandle>) -> Result<Self> {
        let console = ConsoleRecord::new();
        // Subscribe before any navigation so no console output is missed
        let pump = spawn_console_pump(&client, console.clone())?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            page: Page::new(Arc::clone(&client)),
            client,
            console,
            pump: Mutex::new(Some(pump)),
            handle: Mutex::new(handle),
            closed: AtomicBool::new(false),
        })
    }

    /// Enable the CDP domains and lifecycle events the harness relies on
    pub async fn enable_domains(&self) -> Result<()> {
        self.client.enable_domain("Page").await?;
        self.client.enable_domain("Runtime").await?;
        // networkIdle is only reported through lifecycle events
        self.client
            .call("Page.setLifecycleEventsEnabled", Some(json!({ "enabled": true })))
            .await?;
        Ok(())
    }

    /// Session identity, for logs
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's page
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The session's console record
    pub fn console(&self) -> &ConsoleRecord {
        &self.console
    }

    /// Whether the session can still issue commands
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.client.is_open()
    }

    /// Guard for operations that require a live session
    pub fn ensure_open(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::session_closed(format!("session {}", self.id)));
        }
        Ok(())
    }

    /// Close the session: stop the console pump, close the page target and
    /// connection, release the browser.
    ///
    /// Idempotent; only the first call does work. Secondary teardown errors
    /// are logged, never returned.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Session {} already closed", self.id);
            return;
        }
        info!("Closing session {}", self.id);

        // Give the pump a chance to drain buffered console events
        tokio::task::yield_now().await;
        let pump = self.pump.lock().ok().and_then(|mut slot| slot.take());
        if let Some(pump) = pump {
            pump.abort();
        }

        if let Err(e) = self.client.close().await {
            warn!("Page close failed: {}", e);
        }

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.shutdown().await {
                warn!("Browser shutdown failed: {}", e);
            }
        }
    }
}
