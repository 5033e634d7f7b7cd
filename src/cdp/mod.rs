//! # Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket plumbing for talking to a Chrome/Chromium instance over CDP.
//!
//! ## Module structure
//! - `traits`: transport and client trait seams
//! - `types`: serde types for the protocol subset we use
//! - `connection`: WebSocket transport with command/response correlation
//! - `client`: command wrappers (navigate, evaluate, screenshot)
//! - `launcher`: browser process launch and endpoint discovery
//! - `mock`: scripted in-process implementations for tests
//!
//! ## Usage
//! ```rust,no_run
//! use dashprobe::cdp::{BrowserLauncher, CdpClient, CdpClientImpl, CdpWebSocketConnection, LaunchOptions};
//!
//! # async fn example() -> dashprobe::Result<()> {
//! let browser = BrowserLauncher::new(LaunchOptions::default()).launch().await?;
//! let page = browser.create_page("about:blank").await?;
//! let transport = CdpWebSocketConnection::connect(&page.ws_url).await?;
//! let client = CdpClientImpl::new(transport);
//! client.navigate("https://example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod launcher;
pub mod mock;
pub mod traits;
pub mod types;


pub use traits::{
    clipped_screenshot_params, full_page_screenshot_params, CdpClient, CdpEvent, CdpTransport,
};
pub use types::{
    Clip, ConsoleApiCalledParams, ExceptionThrownParams, LifecycleEventParams, NavigateResult,
    ScreenshotParams,
};

pub use client::CdpClientImpl;
pub use connection::{CdpTimeoutConfig, CdpWebSocketConnection};
pub use launcher::{BrowserHandle, BrowserLauncher, LaunchOptions, PageTarget};

pub use mock::{MockCdpClient, MockCdpTransport, MockElement};
