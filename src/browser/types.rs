use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intent::BrowserKind;

/// Viewport size of a browsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Error types for browser operations
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The engine could not be started
    #[error("failed to launch {engine}: {message}")]
    Launch { engine: BrowserKind, message: String },

    /// A page or context operation was rejected by the engine
    #[error("{operation} failed: {message}")]
    Operation { operation: String, message: String },

    /// The bridge process sent something we could not understand
    #[error("bridge protocol error: {0}")]
    Protocol(String),

    /// The bridge process went away
    #[error("browser connection closed")]
    Closed,

    /// I/O error talking to the bridge process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        BrowserError::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Starts isolated browser instances
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a fresh browser of the given engine
    async fn launch(&self, engine: BrowserKind, headless: bool) -> BrowserResult<Box<dyn Browser>>;

    /// Identifier of the backend (e.g. "playwright", "mock")
    fn backend_name(&self) -> &str;
}

/// A running browser instance owned by one test
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_context(
        &self,
        viewport: Viewport,
        user_agent: &str,
    ) -> BrowserResult<Box<dyn BrowserContext>>;

    async fn close(&self) -> BrowserResult<()>;
}

/// An isolated browsing context (cookies, storage, viewport)
#[async_trait]
pub trait BrowserContext: Send + Sync {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;

    async fn close(&self) -> BrowserResult<()>;
}

/// A single page driven by the action executor
#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url` and wait until the network is idle
    async fn goto(&self, url: &str, timeout_ms: u64) -> BrowserResult<()>;

    async fn click(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()>;

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()>;

    /// PNG-encoded capture of the page
    async fn screenshot(&self, full_page: bool) -> BrowserResult<Vec<u8>>;

    async fn title(&self) -> BrowserResult<String>;

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()>;

    async fn wait_for_timeout(&self, ms: u64) -> BrowserResult<()>;
}
