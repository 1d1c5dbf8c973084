//! Entry points used by the web layer and the CLI.
//!
//! [`TestService`] wires the prompt interpreter to the job scheduler: chat
//! messages that ask for a test are queued, explicit execute requests run
//! synchronously, and status/results are looked up by id.

use std::sync::Arc;
use tracing::info;

use crate::intent::{JobId, TestIntent, TestRequest};
use crate::interpreter::{Interpretation, Interpreter, KeywordInterpreter};
use crate::protocol::{ChatMessageRequest, ChatReply, ExecuteRequest, StatusResponse};
use crate::runner::{TestResult, TestRunner};
use crate::scheduler::JobScheduler;

pub struct TestService {
    interpreter: Arc<dyn Interpreter>,
    scheduler: JobScheduler,
}

impl TestService {
    pub fn new(interpreter: Arc<dyn Interpreter>, scheduler: JobScheduler) -> Self {
        Self {
            interpreter,
            scheduler,
        }
    }

    /// Keyword interpreter and a fresh scheduler with `workers` workers
    pub fn start(runner: TestRunner, workers: usize) -> Self {
        Self::new(
            Arc::new(KeywordInterpreter::new()),
            JobScheduler::start(runner, workers),
        )
    }

    pub fn interpreter(&self) -> &dyn Interpreter {
        self.interpreter.as_ref()
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Answer a chat message, queueing a test when it asks for one
    pub fn handle_chat(&self, message: &ChatMessageRequest) -> ChatReply {
        match self.interpreter.interpret(&message.content) {
            Interpretation::Conversation(reply) => ChatReply::assistant(reply),
            Interpretation::Test(intent) => {
                let request = TestRequest::new(message.content.clone(), intent);
                let test_id = self.scheduler.submit(request);
                info!(test_id = %test_id, "chat message started a test");
                ChatReply::test_started(test_id)
            }
        }
    }

    /// Build a test request from an explicit one.
    ///
    /// Explicit fields win. Unset fields come from interpreting the prompt,
    /// with `ui` as the test type when the prompt is not a test request.
    pub fn request_from(&self, request: ExecuteRequest) -> TestRequest {
        let interpretation = self.interpreter.interpret(&request.prompt);
        self.merge(request, interpretation)
    }

    fn merge(&self, request: ExecuteRequest, interpretation: Interpretation) -> TestRequest {
        let interpreted = match interpretation {
            Interpretation::Test(intent) => Some(intent),
            Interpretation::Conversation(_) => None,
        };

        let test_type = request
            .test_type
            .or_else(|| interpreted.as_ref().map(|intent| intent.test_type))
            .unwrap_or_default();
        let explicit_url = request.target_url.filter(|url| !url.trim().is_empty());
        let (target_url, actions) = match (explicit_url, interpreted) {
            (None, Some(intent)) => (intent.target_url, intent.actions),
            (explicit, _) => {
                let target_url = explicit.or_else(|| self.interpreter.target_url(&request.prompt));
                let actions = self
                    .interpreter
                    .plan_actions(&request.prompt, target_url.as_deref());
                (target_url, actions)
            }
        };

        let intent = TestIntent {
            test_type,
            target_url,
            actions,
            options: request.options.unwrap_or_default(),
        };
        TestRequest::new(request.prompt, intent)
    }

    /// Run an explicit request to completion
    pub async fn execute(&self, request: ExecuteRequest) -> TestResult {
        let request = self.request_from(request);
        self.scheduler.run_sync(request).await
    }

    /// Queue a request and return its id.
    ///
    /// Without an explicit test type the prompt must read as a test request;
    /// conversational prompts create no job and return `None`.
    pub fn submit(&self, request: ExecuteRequest) -> Option<JobId> {
        let interpretation = self.interpreter.interpret(&request.prompt);
        if request.test_type.is_none() && !interpretation.is_test() {
            info!(prompt = %request.prompt, "prompt is not a test request, nothing queued");
            return None;
        }
        let request = self.merge(request, interpretation);
        Some(self.scheduler.submit(request))
    }

    pub fn status(&self, test_id: &JobId) -> StatusResponse {
        StatusResponse {
            test_id: test_id.clone(),
            status: self.scheduler.status(test_id),
        }
    }

    pub fn results(&self, test_id: &JobId) -> TestResult {
        self.scheduler.results(test_id)
    }

    pub async fn wait_for(&self, test_id: &JobId) -> TestResult {
        self.scheduler.wait_for(test_id).await
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
