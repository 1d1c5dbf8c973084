//! Browser automation engines behind one object-safe interface.
//!
//! - [`PlaywrightBridge`] drives real Chromium/Firefox/WebKit via node
//! - [`MockBrowser`] is an in-memory engine for tests and dry runs
//! - [`BrowserSession`] owns one browser/context/page for a test's lifetime

pub mod bridge;
pub mod framebuffer;
pub mod mock;
pub mod session;
pub mod types;

pub use bridge::PlaywrightBridge;
pub use framebuffer::Framebuffer;
pub use mock::{MockBrowser, MockSite};
pub use session::{BrowserSession, DEFAULT_USER_AGENT};
pub use types::{
    Browser, BrowserContext, BrowserError, BrowserLauncher, BrowserResult, Page, Viewport,
};
