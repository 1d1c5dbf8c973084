//! Executes one browser action against a page.

use tracing::{debug, warn};

use super::script::ScriptBuilder;
use super::types::StepResult;
use crate::browser::Page;
use crate::intent::{Action, VerifyCondition};

/// Delay after navigation for late-rendering content
pub const NAVIGATION_SETTLE_MS: u64 = 2_000;

/// Per-selector timeout for click attempts
pub const CLICK_TIMEOUT_MS: u64 = 5_000;

/// Delay after a successful click
pub const CLICK_SETTLE_MS: u64 = 1_000;

/// Per-selector timeout for success-indicator probes
pub const PROBE_TIMEOUT_MS: u64 = 2_000;

/// Input fields tried in order by `Type`
pub const INPUT_SELECTORS: &[&str] = &[
    r#"input[type="text"]"#,
    r#"input[type="email"]"#,
    r#"input[type="password"]"#,
    "textarea",
];

/// Elements that indicate a successful operation
pub const SUCCESS_SELECTORS: &[&str] = &[".success", ".alert-success", r#"[data-testid="success"]"#];

/// Candidate selectors for a click target, most specific first
pub fn click_selectors(target: &str) -> Vec<String> {
    let known: &[&str] = match target {
        "login" => &[
            r#"button[type="submit"]"#,
            r#"input[type="submit"]"#,
            r#"button:has-text("Login")"#,
            r#"button:has-text("Sign In")"#,
            ".login-button",
            "#login-button",
        ],
        "submit" => &[
            r#"button[type="submit"]"#,
            r#"input[type="submit"]"#,
            r#"button:has-text("Submit")"#,
            ".submit-button",
        ],
        "button" => &["button", r#"input[type="button"]"#, r#"input[type="submit"]"#, ".btn"],
        _ => {
            return vec![
                format!(r#"button:has-text("{}")"#, target),
                format!(".{}", target),
                format!("#{}", target),
            ];
        }
    };
    known.iter().map(|s| s.to_string()).collect()
}

/// Drives a page through single actions, recording script lines as it goes
#[derive(Debug, Clone, Copy)]
pub struct ActionExecutor {
    navigation_timeout_ms: u64,
}

impl ActionExecutor {
    pub fn new(navigation_timeout_ms: u64) -> Self {
        Self {
            navigation_timeout_ms,
        }
    }

    /// Execute `action` on `page`. Never fails; errors become a failed step.
    pub async fn execute(
        &self,
        page: &dyn Page,
        action: &Action,
        script: &mut ScriptBuilder,
    ) -> StepResult {
        let description = action.describe();
        let step = match action {
            Action::Navigate { url } => self.navigate(page, description, url, script).await,
            Action::Click { target } => self.click(page, description, target, script).await,
            Action::Type { text } => self.type_text(page, description, text, script).await,
            Action::Verify { condition } => {
                self.verify(page, description, *condition, script).await
            }
            Action::Screenshot => self.screenshot(page, description, script).await,
        };
        debug!(kind = action.kind(), step = %step.action, status = ?step.status, "action executed");
        step
    }

    async fn navigate(
        &self,
        page: &dyn Page,
        description: String,
        url: &str,
        script: &mut ScriptBuilder,
    ) -> StepResult {
        script.navigate(url);

        if let Err(e) = page.goto(url, self.navigation_timeout_ms).await {
            return StepResult::failed(description, vec![format!("Error executing navigate: {}", e)]);
        }
        let mut logs = vec![format!("Navigated to {}", url)];

        if let Err(e) = page.wait_for_timeout(NAVIGATION_SETTLE_MS).await {
            warn!(error = %e, "settle delay failed");
        }
        let screenshot = capture_best_effort(page, &mut logs, "Screenshot captured successfully").await;
        StepResult::success(description, logs).with_screenshot(screenshot)
    }

    async fn click(
        &self,
        page: &dyn Page,
        description: String,
        target: &str,
        script: &mut ScriptBuilder,
    ) -> StepResult {
        let selectors = click_selectors(target);

        let mut clicked = None;
        for selector in &selectors {
            match page.click(selector, CLICK_TIMEOUT_MS).await {
                Ok(()) => {
                    clicked = Some(selector.as_str());
                    break;
                }
                Err(e) => debug!(selector = %selector, error = %e, "click candidate failed"),
            }
        }

        let Some(selector) = clicked else {
            if let Some(first) = selectors.first() {
                script.click(target, first);
            }
            return StepResult::failed(description, vec![format!("Could not find {} to click", target)]);
        };
        script.click(target, selector);
        let mut logs = vec![format!("Clicked {} using selector: {}", target, selector)];

        if let Err(e) = page.wait_for_timeout(CLICK_SETTLE_MS).await {
            warn!(error = %e, "settle delay failed");
        }
        let screenshot = capture_best_effort(page, &mut logs, "Screenshot captured").await;
        StepResult::success(description, logs).with_screenshot(screenshot)
    }

    async fn type_text(
        &self,
        page: &dyn Page,
        description: String,
        text: &str,
        script: &mut ScriptBuilder,
    ) -> StepResult {

        for selector in INPUT_SELECTORS {
            match page.fill(selector, text).await {
                Ok(()) => {
                    script.fill(selector, text);
                    return StepResult::success(
                        description,
                        vec![format!("Typed '{}' into {}", text, selector)],
                    );
                }
                Err(e) => debug!(selector = %selector, error = %e, "input candidate failed"),
            }
        }

        script.fill(INPUT_SELECTORS[0], text);
        StepResult::failed(
            description,
            vec!["Could not find input field to type into".to_string()],
        )
    }

    async fn verify(
        &self,
        page: &dyn Page,
        description: String,
        condition: VerifyCondition,
        script: &mut ScriptBuilder,
    ) -> StepResult {

        match condition {
            VerifyCondition::PageLoaded => {
                script.verify_title();
                match page.title().await {
                    Ok(title) => StepResult::success(
                        description,
                        vec![format!("Page loaded with title: {}", title)],
                    ),
                    Err(e) => StepResult::failed(
                        description,
                        vec![format!("Error executing verify: {}", e)],
                    ),
                }
            }
            VerifyCondition::ElementPresent => {
                for selector in SUCCESS_SELECTORS {
                    if page.wait_for_selector(selector, PROBE_TIMEOUT_MS).await.is_ok() {
                        script.verify_visible(selector);
                        return StepResult::success(
                            description,
                            vec![format!("Found success element: {}", selector)],
                        );
                    }
                }
                // Known quirk: a missing indicator is logged but the step still passes.
                script.comment("No success element found");
                StepResult::success(description, vec!["No success elements found".to_string()])
            }
            VerifyCondition::SuccessMessage
            | VerifyCondition::ErrorMessage
            | VerifyCondition::PageRedirect => {
                script.comment(format!("Verify {}: no page check performed", condition));
                StepResult::success(
                    description,
                    vec![format!("No page check for condition: {}", condition)],
                )
            }
        }
    }

    async fn screenshot(
        &self,
        page: &dyn Page,
        description: String,
        script: &mut ScriptBuilder,
    ) -> StepResult {
        script.screenshot("screenshot.png");
        match page.screenshot(true).await {
            Ok(png) => StepResult::success(description, vec!["Screenshot captured".to_string()])
                .with_screenshot(Some(png)),
            Err(e) => StepResult::failed(description, vec![format!("Screenshot failed: {}", e)]),
        }
    }
}

async fn capture_best_effort(page: &dyn Page, logs: &mut Vec<String>, ok_message: &str) -> Option<Vec<u8>> {
    match page.screenshot(true).await {
        Ok(png) => {
            logs.push(ok_message.to_string());
            Some(png)
        }
        Err(e) => {
            logs.push(format!("Screenshot failed: {}", e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserSession, MockBrowser, MockSite};
    use crate::intent::TestOptions;
    use crate::runner::types::StepStatus;

    async fn session(site: MockSite) -> (MockBrowser, BrowserSession) {
        let launcher = MockBrowser::new(site);
        let session = BrowserSession::open(&launcher, &TestOptions::default())
            .await
            .unwrap();
        (launcher, session)
    }

    #[test]
    fn test_click_selector_tables() {
        assert_eq!(click_selectors("login").len(), 6);
        assert_eq!(click_selectors("submit")[2], r#"button:has-text("Submit")"#);
        assert_eq!(
            click_selectors("search"),
            vec![
                r#"button:has-text("search")"#.to_string(),
                ".search".to_string(),
                "#search".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_navigate_settles_and_captures() {
        let (launcher, session) = session(MockSite::default()).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Navigate { url: "https://example.com".into() },
                &mut script,
            )
            .await;
        session.release().await;

        assert_eq!(step.status, StepStatus::Success);
        assert_eq!(step.action, "navigate to https://example.com");
        assert!(step.screenshot.is_some());
        let journal = launcher.journal();
        assert!(journal.contains(&"goto https://example.com networkidle".to_string()));
        assert!(journal.contains(&"wait 2000".to_string()));
    }

    #[tokio::test]
    async fn test_navigate_screenshot_failure_does_not_fail_step() {
        let (_launcher, session) = session(MockSite::default().fail_screenshots(true)).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Navigate { url: "https://example.com".into() },
                &mut script,
            )
            .await;
        session.release().await;

        assert!(step.succeeded());
        assert!(step.screenshot.is_none());
        assert!(step.logs[1].starts_with("Screenshot failed:"));
    }

    #[tokio::test]
    async fn test_click_tries_candidates_in_order() {
        let site = MockSite::empty().selector(".btn");
        let (launcher, session) = session(site).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(session.page(), &Action::Click { target: "button".into() }, &mut script)
            .await;
        session.release().await;

        assert!(step.succeeded());
        assert_eq!(step.logs[0], "Clicked button using selector: .btn");
        let clicks: Vec<_> = launcher
            .journal()
            .into_iter()
            .filter(|e| e.starts_with("click "))
            .collect();
        assert_eq!(clicks.len(), 4);
        assert!(script.finish().contains("await page.click('.btn');"));
    }

    #[tokio::test]
    async fn test_click_fails_when_no_candidate_matches() {
        let (_launcher, session) = session(MockSite::empty()).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(session.page(), &Action::Click { target: "login".into() }, &mut script)
            .await;
        session.release().await;

        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.logs, vec!["Could not find login to click".to_string()]);
    }

    #[tokio::test]
    async fn test_type_fills_first_accepting_field() {
        let site = MockSite::empty().selector(r#"input[type="email"]"#);
        let (_launcher, session) = session(site).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Type { text: "test@example.com".into() },
                &mut script,
            )
            .await;
        session.release().await;

        assert!(step.succeeded());
        assert_eq!(
            step.logs[0],
            r#"Typed 'test@example.com' into input[type="email"]"#
        );
    }

    #[tokio::test]
    async fn test_element_present_is_permissive() {
        let (_launcher, session) = session(MockSite::empty()).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Verify { condition: VerifyCondition::ElementPresent },
                &mut script,
            )
            .await;
        session.release().await;

        assert!(step.succeeded());
        assert_eq!(step.logs, vec!["No success elements found".to_string()]);
    }

    #[tokio::test]
    async fn test_element_present_reports_found_indicator() {
        let site = MockSite::empty().selector(r#"[data-testid="success"]"#);
        let (_launcher, session) = session(site).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Verify { condition: VerifyCondition::ElementPresent },
                &mut script,
            )
            .await;
        session.release().await;

        assert!(step.succeeded());
        assert_eq!(step.action, "verify element_present");
        assert_eq!(
            step.logs,
            vec![r#"Found success element: [data-testid="success"]"#.to_string()]
        );
        assert!(script
            .finish()
            .contains(r#"await expect(page.locator('[data-testid="success"]')).toBeVisible();"#));
    }

    #[tokio::test]
    async fn test_page_loaded_logs_title() {
        let (_launcher, session) = session(MockSite::default().title("Login")).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(
                session.page(),
                &Action::Verify { condition: VerifyCondition::PageLoaded },
                &mut script,
            )
            .await;
        session.release().await;

        assert_eq!(step.logs, vec!["Page loaded with title: Login".to_string()]);
    }

    #[tokio::test]
    async fn test_screenshot_failure_fails_step() {
        let (_launcher, session) = session(MockSite::default().fail_screenshots(true)).await;
        let executor = ActionExecutor::new(30_000);
        let mut script = ScriptBuilder::ui();

        let step = executor
            .execute(session.page(), &Action::Screenshot, &mut script)
            .await;
        session.release().await;

        assert_eq!(step.status, StepStatus::Failed);
        assert!(step.screenshot.is_none());
    }
}
