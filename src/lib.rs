//! testpilot - Natural-language driven UI and API testing.
//!
//! This crate provides:
//! - A keyword interpreter turning prompts into typed test intents
//! - A test runner executing intents in isolated browser sessions or over HTTP
//! - A replayable Playwright script generated alongside every run
//! - A background job scheduler with status/result lookup and push events
//! - Artifact sessions for saving screenshots, scripts and results
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use testpilot::{ExecuteRequest, PlaywrightBridge, TestRunner, TestService};
//!
//! # async fn demo() {
//! let runner = TestRunner::new(Arc::new(PlaywrightBridge::default()));
//! let service = TestService::start(runner, 4);
//! let result = service
//!     .execute(ExecuteRequest::new("take a screenshot of https://example.com"))
//!     .await;
//! println!("{}: {}", result.test_id, result.status);
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod intent;
pub mod interpreter;
pub mod protocol;
pub mod runner;
pub mod scheduler;
pub mod service;
pub mod session;

// Re-export the data model
pub use intent::{
    Action, BrowserKind, JobId, TestIntent, TestOptions, TestRequest, TestType, VerifyCondition,
};

// Re-export the interpreter
pub use interpreter::{Interpretation, Interpreter, KeywordInterpreter};

// Re-export browser backends
pub use browser::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, MockBrowser, MockSite,
    PlaywrightBridge,
};

// Re-export runner types
pub use runner::{
    ActionExecutor, JobStatus, RunnerError, ScriptBuilder, StepResult, StepStatus, TestResult,
    TestRunner,
};

// Re-export scheduling and the service surface
pub use protocol::{ChatMessageRequest, ChatReply, ExecuteRequest, StatusResponse};
pub use scheduler::{JobEvent, JobScheduler, StatusStore};
pub use service::TestService;

// Re-export artifact sessions
pub use session::{Session, cleanup_old_sessions};
