//! Typed test intents produced by the interpreter and consumed by the runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default navigation timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Kind of test a prompt asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Ui,
    Api,
    Mixed,
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Ui => write!(f, "ui"),
            TestType::Api => write!(f, "api"),
            TestType::Mixed => write!(f, "mixed"),
        }
    }
}

/// Browser engine to launch for UI tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    /// Name of the engine as Playwright spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution options attached to every intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOptions {
    #[serde(default)]
    pub browser: BrowserKind,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Navigation timeout in milliseconds
    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
}

fn default_headless() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// What a `Verify` action checks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyCondition {
    PageLoaded,
    ElementPresent,
    SuccessMessage,
    ErrorMessage,
    PageRedirect,
}

impl VerifyCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyCondition::PageLoaded => "page_loaded",
            VerifyCondition::ElementPresent => "element_present",
            VerifyCondition::SuccessMessage => "success_message",
            VerifyCondition::ErrorMessage => "error_message",
            VerifyCondition::PageRedirect => "page_redirect",
        }
    }
}

impl fmt::Display for VerifyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single browser action, in plan order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Navigate { url: String },
    Click { target: String },
    Type { text: String },
    Verify { condition: VerifyCondition },
    Screenshot,
}

impl Action {
    /// Human-readable description used as the step label
    pub fn describe(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate to {}", url),
            Action::Click { target } => format!("click {}", target),
            Action::Type { text } => format!("type '{}'", text),
            Action::Verify { condition } => format!("verify {}", condition),
            Action::Screenshot => "screenshot".to_string(),
        }
    }

    /// Short kind name ("navigate", "click", ...)
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Verify { .. } => "verify",
            Action::Screenshot => "screenshot",
        }
    }
}

/// Structured representation of what a prompt asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestIntent {
    pub test_type: TestType,
    pub target_url: Option<String>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub options: TestOptions,
}

/// Identifier of a submitted test
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A test intent bound to the prompt it came from and the job running it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pub test_id: JobId,
    pub prompt: String,
    pub intent: TestIntent,
}

impl TestRequest {
    pub fn new(prompt: impl Into<String>, intent: TestIntent) -> Self {
        Self {
            test_id: JobId::new(),
            prompt: prompt.into(),
            intent,
        }
    }
}
