//! Scoped ownership of one browser, one context and one page.
//!
//! A [`BrowserSession`] is acquired at the start of a UI test and released
//! on every exit path. `release` is async and closes the context before the
//! browser; dropping an unreleased session is logged, and backends are
//! expected to tear their engine down on drop (the Playwright bridge kills
//! its node process).

use tracing::{debug, warn};

use super::types::{Browser, BrowserContext, BrowserLauncher, BrowserResult, Page, Viewport};
use crate::intent::TestOptions;

/// User agent presented by every test context
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Browser, context and page owned by a single test
pub struct BrowserSession {
    // Field order matters for drop: page, then context, then browser.
    page: Box<dyn Page>,
    context: Box<dyn BrowserContext>,
    browser: Box<dyn Browser>,
    released: bool,
}

impl BrowserSession {
    /// Launch a browser and open one context and one page in it.
    ///
    /// If a later stage fails, the stages already acquired are closed before
    /// the error is returned.
    pub async fn open(launcher: &dyn BrowserLauncher, options: &TestOptions) -> BrowserResult<Self> {
        let browser = launcher.launch(options.browser, options.headless).await?;
        debug!(engine = %options.browser, headless = options.headless, "browser launched");

        let context = match browser
            .new_context(Viewport::default(), DEFAULT_USER_AGENT)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                close_quietly("browser", browser.close().await);
                return Err(e);
            }
        };

        let page = match context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                close_quietly("context", context.close().await);
                close_quietly("browser", browser.close().await);
                return Err(e);
            }
        };

        Ok(Self {
            page,
            context,
            browser,
            released: false,
        })
    }

    /// The page actions are executed against
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Close the context, then the browser. Failures are logged, not returned.
    pub async fn release(mut self) {
        close_quietly("context", self.context.close().await);
        close_quietly("browser", self.browser.close().await);
        self.released = true;
        debug!("browser session released");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if !self.released {
            warn!("browser session dropped without release; relying on backend teardown");
        }
    }
}

fn close_quietly(what: &str, result: BrowserResult<()>) {
    if let Err(e) = result {
        warn!(error = %e, "failed to close {}", what);
    }
}
