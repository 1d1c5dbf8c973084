//! Test Runner: executes one test request end to end.
//!
//! UI (and mixed) tests open a [`BrowserSession`], run each planned action
//! through the [`ActionExecutor`] until the first failure, take a final
//! screenshot and release the session. API tests issue a single HTTP
//! request. Both paths build a Playwright script as they go.
//!
//! [`TestRunner::run`] never returns an error: job-level failures become a
//! `failed` [`TestResult`] with an error message and a placeholder script.

pub mod actions;
pub mod api;
pub mod script;
pub mod types;

pub use actions::ActionExecutor;
pub use api::ApiRequest;
pub use script::{ScriptBuilder, failure_script};
pub use types::{JobStatus, RunnerError, RunnerResult, StepResult, StepStatus, TestResult};

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::ApiSettings;
use crate::intent::{TestRequest, TestType};

/// Steps and script of a test that ran to the end
struct Outcome {
    steps: Vec<StepResult>,
    script: String,
    passed: bool,
}

/// Runs test requests against a browser backend or an HTTP endpoint
#[derive(Clone)]
pub struct TestRunner {
    launcher: Arc<dyn BrowserLauncher>,
    api: ApiSettings,
}

impl TestRunner {
    /// Runner using the configured API settings
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            api: crate::config::get().api.clone(),
        }
    }

    /// Override API host and timeout
    pub fn with_api_settings(mut self, api: ApiSettings) -> Self {
        self.api = api;
        self
    }

    /// Name of the browser backend in use
    pub fn backend_name(&self) -> &str {
        self.launcher.backend_name()
    }

    /// Execute `request` and report the outcome in-band
    pub async fn run(&self, request: &TestRequest) -> TestResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let test_type = request.intent.test_type;
        info!(
            test_id = %request.test_id,
            test_type = %test_type,
            backend = self.backend_name(),
            "running test"
        );

        let outcome = match test_type {
            TestType::Api => self.run_api(request).await,
            // Mixed tests have no distinct algorithm yet and run the UI path.
            TestType::Ui | TestType::Mixed => self.run_ui(request).await,
        };

        match outcome {
            Ok(outcome) => {
                let result = TestResult::finished(
                    request.test_id.clone(),
                    outcome.passed,
                    outcome.steps,
                    outcome.script,
                    started_at,
                    clock.elapsed(),
                );
                info!(
                    test_id = %request.test_id,
                    status = %result.status,
                    steps = result.steps.len(),
                    "test finished"
                );
                result
            }
            Err(e) => {
                warn!(test_id = %request.test_id, error = %e, "test failed before completing");
                let message = e.to_string();
                let script = failure_script(test_type, &message, &request.prompt);
                TestResult::failure(
                    request.test_id.clone(),
                    message,
                    script,
                    started_at,
                    clock.elapsed(),
                )
            }
        }
    }

    async fn run_ui(&self, request: &TestRequest) -> RunnerResult<Outcome> {
        let options = &request.intent.options;
        let session = BrowserSession::open(self.launcher.as_ref(), options).await?;
        let executor = ActionExecutor::new(options.timeout_ms);
        let mut script = ScriptBuilder::ui();
        let mut steps = Vec::with_capacity(request.intent.actions.len() + 1);

        for action in &request.intent.actions {
            let step = executor.execute(session.page(), action, &mut script).await;
            let failed = !step.succeeded();
            steps.push(step);
            if failed {
                info!(test_id = %request.test_id, step = steps.len(), "stopping at failed step");
                break;
            }
        }

        // The trailing screenshot is recorded but never decides the verdict.
        let passed = steps.iter().all(StepResult::succeeded);
        let final_step = match session.page().screenshot(true).await {
            Ok(png) => {
                script.final_screenshot();
                StepResult::success("final_screenshot", vec!["Final screenshot captured".to_string()])
                    .with_screenshot(Some(png))
            }
            Err(e) => StepResult::failed(
                "final_screenshot",
                vec![format!("Failed to capture final screenshot: {}", e)],
            ),
        };
        steps.push(final_step);

        session.release().await;
        Ok(Outcome {
            steps,
            script: script.finish(),
            passed,
        })
    }

    async fn run_api(&self, request: &TestRequest) -> RunnerResult<Outcome> {
        let client = api::client(&self.api)?;
        let api_request = match request.intent.target_url.as_deref() {
            Some(target) => ApiRequest::for_target(&request.prompt, target),
            None => ApiRequest::parse(&request.prompt, &self.api.base_url),
        };

        let mut script = ScriptBuilder::api();
        let step = api::execute(&client, &api_request, &mut script).await;
        Ok(Outcome {
            passed: step.succeeded(),
            steps: vec![step],
            script: script.finish(),
        })
    }
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("backend", &self.backend_name())
            .field("api", &self.api)
            .finish()
    }
}
