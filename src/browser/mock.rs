//! Deterministic in-memory browser backend.
//!
//! `MockBrowser` stands in for a real engine in tests and in `--backend mock`
//! runs. Pages "contain" a configured set of selectors; clicks, fills and
//! waits succeed only for those. Screenshots are real PNGs rendered with the
//! [`Framebuffer`] showing the current URL and title. Every call is recorded
//! in a shared journal so callers can assert on ordering and teardown.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::framebuffer::Framebuffer;
use super::types::{
    Browser, BrowserContext, BrowserError, BrowserLauncher, BrowserResult, Page, Viewport,
};
use crate::intent::BrowserKind;

const BACKGROUND: [u8; 3] = [245, 245, 245];
const HEADER: [u8; 3] = [36, 114, 200];
const TEXT: [u8; 3] = [20, 20, 20];
const WHITE: [u8; 3] = [255, 255, 255];

/// What the simulated site looks like
#[derive(Debug, Clone)]
pub struct MockSite {
    pub title: String,
    pub selectors: HashSet<String>,
    pub unreachable: HashSet<String>,
    pub launch_error: Option<String>,
    pub fail_screenshots: bool,
}

impl Default for MockSite {
    fn default() -> Self {
        Self {
            title: "Example Domain".to_string(),
            selectors: [
                "button",
                "button[type=\"submit\"]",
                "input[type=\"text\"]",
                "input[type=\"email\"]",
                "input[type=\"password\"]",
                ".success",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            unreachable: HashSet::new(),
            launch_error: None,
            fail_screenshots: false,
        }
    }
}

impl MockSite {
    /// A site with no interactive elements
    pub fn empty() -> Self {
        Self {
            selectors: HashSet::new(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.insert(selector.into());
        self
    }

    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    pub fn launch_error(mut self, message: impl Into<String>) -> Self {
        self.launch_error = Some(message.into());
        self
    }

    pub fn fail_screenshots(mut self, fail: bool) -> Self {
        self.fail_screenshots = fail;
        self
    }
}

/// Shared record of every call made against mock browsers
#[derive(Debug, Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
    open_browsers: AtomicUsize,
}

impl Journal {
    fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }
}

/// Launcher for in-memory browsers
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    site: Arc<MockSite>,
    journal: Arc<Journal>,
}

impl MockBrowser {
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            journal: Arc::default(),
        }
    }

    /// Snapshot of the call journal
    pub fn journal(&self) -> Vec<String> {
        self.journal.entries.lock().clone()
    }

    /// Browsers launched and not yet closed
    pub fn open_browsers(&self) -> usize {
        self.journal.open_browsers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowser {
    async fn launch(&self, engine: BrowserKind, headless: bool) -> BrowserResult<Box<dyn Browser>> {
        self.journal
            .record(format!("launch {} headless={}", engine, headless));
        if let Some(message) = &self.site.launch_error {
            return Err(BrowserError::Launch {
                engine,
                message: message.clone(),
            });
        }
        self.journal.open_browsers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockInstance {
            site: Arc::clone(&self.site),
            journal: Arc::clone(&self.journal),
            closed: Mutex::new(false),
        }))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct MockInstance {
    site: Arc<MockSite>,
    journal: Arc<Journal>,
    closed: Mutex<bool>,
}

#[async_trait]
impl Browser for MockInstance {
    async fn new_context(
        &self,
        viewport: Viewport,
        user_agent: &str,
    ) -> BrowserResult<Box<dyn BrowserContext>> {
        self.journal.record(format!(
            "new_context {}x{} ua={}",
            viewport.width,
            viewport.height,
            !user_agent.is_empty()
        ));
        Ok(Box::new(MockContext {
            site: Arc::clone(&self.site),
            journal: Arc::clone(&self.journal),
            viewport,
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut closed = self.closed.lock();
        if !*closed {
            *closed = true;
            self.journal.open_browsers.fetch_sub(1, Ordering::SeqCst);
            self.journal.record("close browser");
        }
        Ok(())
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        if !*self.closed.get_mut() {
            self.journal.open_browsers.fetch_sub(1, Ordering::SeqCst);
            self.journal.record("browser killed on drop");
        }
    }
}

struct MockContext {
    site: Arc<MockSite>,
    journal: Arc<Journal>,
    viewport: Viewport,
}

#[async_trait]
impl BrowserContext for MockContext {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        self.journal.record("new_page");
        Ok(Box::new(MockPage {
            site: Arc::clone(&self.site),
            journal: Arc::clone(&self.journal),
            viewport: self.viewport,
            url: Mutex::new("about:blank".to_string()),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        self.journal.record("close context");
        Ok(())
    }
}

struct MockPage {
    site: Arc<MockSite>,
    journal: Arc<Journal>,
    viewport: Viewport,
    url: Mutex<String>,
}

impl MockPage {
    fn require(&self, operation: &str, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        if self.site.selectors.contains(selector) {
            Ok(())
        } else {
            Err(BrowserError::operation(
                operation,
                format!("timeout {}ms exceeded waiting for {}", timeout_ms, selector),
            ))
        }
    }

    fn render(&self) -> BrowserResult<Vec<u8>> {
        let Viewport { width, height } = self.viewport;
        let mut fb = Framebuffer::with_color(width, height, BACKGROUND);
        fb.draw_rect(0, 0, width, 32, HEADER);
        fb.draw_text(12, 12, &self.url.lock(), WHITE, HEADER);
        fb.draw_text(12, 56, &self.site.title, TEXT, BACKGROUND);
        fb.to_png()
    }
}

#[async_trait]
impl Page for MockPage {
    async fn goto(&self, url: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.journal.record(format!("goto {} networkidle", url));
        if self.site.unreachable.contains(url) {
            return Err(BrowserError::operation(
                "goto",
                format!("net::ERR_NAME_NOT_RESOLVED at {} ({}ms)", url, timeout_ms),
            ));
        }
        *self.url.lock() = url.to_string();
        Ok(())
    }

    async fn click(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.journal.record(format!("click {}", selector));
        self.require("click", selector, timeout_ms)
    }

    async fn fill(&self, selector: &str, text: &str) -> BrowserResult<()> {
        self.journal.record(format!("fill {} {}", selector, text));
        self.require("fill", selector, 0)
    }

    async fn screenshot(&self, full_page: bool) -> BrowserResult<Vec<u8>> {
        self.journal.record(format!("screenshot full_page={}", full_page));
        if self.site.fail_screenshots {
            return Err(BrowserError::operation("screenshot", "target page crashed"));
        }
        self.render()
    }

    async fn title(&self) -> BrowserResult<String> {
        self.journal.record("title");
        Ok(self.site.title.clone())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> BrowserResult<()> {
        self.journal.record(format!("wait_for_selector {}", selector));
        self.require("wait_for_selector", selector, timeout_ms)
    }

    async fn wait_for_timeout(&self, ms: u64) -> BrowserResult<()> {
        // Settle delays are recorded, not slept; the mock page never changes on its own.
        self.journal.record(format!("wait {}", ms));
        Ok(())
    }
}
