//! Types for test run results.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::intent::JobId;

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Lifecycle state of a test job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    NotFound,
}

impl JobStatus {
    /// Completed and failed jobs never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::NotFound => "not_found",
        };
        f.write_str(name)
    }
}

/// Record of executing exactly one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Description of the action (e.g. "navigate to https://example.com")
    pub action: String,

    pub status: StepStatus,

    pub logs: Vec<String>,

    /// PNG screenshot, base64 in JSON
    #[serde(default, with = "base64_png", skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,
}

impl StepResult {
    pub fn success(action: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            action: action.into(),
            status: StepStatus::Success,
            logs,
            screenshot: None,
        }
    }

    pub fn failed(action: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            action: action.into(),
            status: StepStatus::Failed,
            logs,
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<Vec<u8>>) -> Self {
        self.screenshot = screenshot;
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Result of a complete test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: JobId,

    /// `completed`, `failed`, or `not_found` for the lookup sentinel
    pub status: JobStatus,

    pub steps: Vec<StepResult>,

    /// Playwright Test source replaying the executed actions
    pub generated_script: String,

    #[serde(with = "duration_secs")]
    pub execution_time: Duration,

    /// Human-readable failure message for job-level failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,
}

impl TestResult {
    /// Build a result with an explicit verdict
    pub fn finished(
        test_id: JobId,
        passed: bool,
        steps: Vec<StepResult>,
        generated_script: String,
        started_at: DateTime<Utc>,
        execution_time: Duration,
    ) -> Self {
        let status = if passed {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        Self {
            test_id,
            status,
            steps,
            generated_script,
            execution_time,
            error: None,
            started_at,
        }
    }

    /// A job-level failure: no steps, the error text, and a fallback script
    pub fn failure(
        test_id: JobId,
        error: impl Into<String>,
        generated_script: String,
        started_at: DateTime<Utc>,
        execution_time: Duration,
    ) -> Self {
        Self {
            test_id,
            status: JobStatus::Failed,
            steps: Vec::new(),
            generated_script,
            execution_time,
            error: Some(error.into()),
            started_at,
        }
    }

    /// Sentinel returned for unknown ids
    pub fn not_found(test_id: JobId) -> Self {
        Self {
            test_id,
            status: JobStatus::NotFound,
            steps: Vec::new(),
            generated_script: String::new(),
            execution_time: Duration::ZERO,
            error: Some("Test results not found".to_string()),
            started_at: Utc::now(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Result type for runner internals
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Failures that abort a whole test rather than a single step
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

mod base64_png {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| {
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
