//! Push notifications for job progress.

use serde::{Deserialize, Serialize};

use crate::intent::JobId;
use crate::runner::{JobStatus, TestResult};

/// A change in a job's state, keyed by test id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// Status transition (pending, running, completed, failed)
    TestUpdate { test_id: JobId, status: JobStatus },
    /// The job finished and its result is stored
    TestComplete {
        test_id: JobId,
        result: Box<TestResult>,
    },
    /// The job failed before producing steps
    TestError { test_id: JobId, error: String },
}

impl JobEvent {
    pub fn test_id(&self) -> &JobId {
        match self {
            JobEvent::TestUpdate { test_id, .. }
            | JobEvent::TestComplete { test_id, .. }
            | JobEvent::TestError { test_id, .. } => test_id,
        }
    }

    /// True for the last event a job emits
    pub fn is_final(&self) -> bool {
        matches!(self, JobEvent::TestComplete { .. } | JobEvent::TestError { .. })
    }

    /// Events announcing that `result` has been stored
    pub fn finished(result: &TestResult) -> Vec<JobEvent> {
        let test_id = result.test_id.clone();
        let last = match &result.error {
            Some(error) => JobEvent::TestError {
                test_id: test_id.clone(),
                error: error.clone(),
            },
            None => JobEvent::TestComplete {
                test_id: test_id.clone(),
                result: Box::new(result.clone()),
            },
        };
        vec![
            JobEvent::TestUpdate {
                test_id,
                status: result.status,
            },
            last,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    #[test]
    fn test_event_wire_format() {
        let event = JobEvent::TestUpdate {
            test_id: JobId::from("abc"),
            status: JobStatus::Running,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "test_update");
        assert_eq!(json["test_id"], "abc");
        assert_eq!(json["status"], "running");
        assert!(!event.is_final());
    }

    #[test]
    fn test_job_level_failure_emits_error_event() {
        let result = TestResult::failure(
            JobId::from("abc"),
            "launch failed",
            String::new(),
            Utc::now(),
            Duration::ZERO,
        );
        let events = JobEvent::finished(&result);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            JobEvent::TestError {
                test_id: JobId::from("abc"),
                error: "launch failed".to_string()
            }
        );
        assert!(events[1].is_final());
    }
}
