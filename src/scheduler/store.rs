//! In-process status and result store keyed by job id.
//!
//! Each record's status and result live behind one lock, so readers see
//! either the previous state or the fully written terminal state.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use crate::intent::{JobId, TestRequest};
use crate::runner::{JobStatus, TestResult};

#[derive(Debug, Clone)]
struct JobRecord {
    request: TestRequest,
    status: JobStatus,
    result: Option<TestResult>,
    finished_at: Option<DateTime<Utc>>,
}

/// Status and results of every job submitted in this process
#[derive(Debug, Default)]
pub struct StatusStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job as pending. Returns false if the id is taken.
    pub fn insert_pending(&self, request: &TestRequest) -> bool {
        self.insert(request, JobStatus::Pending)
    }

    /// Register a job that starts running immediately (synchronous path)
    pub fn insert_running(&self, request: &TestRequest) -> bool {
        self.insert(request, JobStatus::Running)
    }

    fn insert(&self, request: &TestRequest, status: JobStatus) -> bool {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&request.test_id) {
            return false;
        }
        jobs.insert(
            request.test_id.clone(),
            JobRecord {
                request: request.clone(),
                status,
                result: None,
                finished_at: None,
            },
        );
        true
    }

    /// Move a pending job to running
    pub fn mark_running(&self, id: &JobId) -> bool {
        match self.jobs.write().get_mut(id) {
            Some(record) if record.status == JobStatus::Pending => {
                record.status = JobStatus::Running;
                true
            }
            _ => false,
        }
    }

    /// Store the terminal result of a job, status and result together.
    ///
    /// A job finishes once; later writes for the same id are ignored, as
    /// are results for ids that were never registered.
    pub fn finish(&self, mut result: TestResult) -> bool {
        if !result.status.is_terminal() {
            result.status = JobStatus::Failed;
        }
        let mut jobs = self.jobs.write();
        let Some(record) = jobs.get_mut(&result.test_id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        record.status = result.status;
        record.result = Some(result);
        record.finished_at = Some(Utc::now());
        true
    }

    /// Current status, or `NotFound` for unknown ids
    pub fn status(&self, id: &JobId) -> JobStatus {
        self.jobs
            .read()
            .get(id)
            .map(|record| record.status)
            .unwrap_or(JobStatus::NotFound)
    }

    /// Final result, or the not-found sentinel while unknown or unfinished
    pub fn result(&self, id: &JobId) -> TestResult {
        self.jobs
            .read()
            .get(id)
            .and_then(|record| record.result.clone())
            .unwrap_or_else(|| TestResult::not_found(id.clone()))
    }

    /// The request a job was submitted with
    pub fn request(&self, id: &JobId) -> Option<TestRequest> {
        self.jobs.read().get(id).map(|record| record.request.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Drop finished jobs older than `max_age`; returns how many were removed
    pub fn prune_finished(&self, max_age: Duration) -> usize {
        let Ok(max_age) = ChronoDuration::from_std(max_age) else {
            return 0;
        };
        let cutoff = Utc::now().checked_sub_signed(max_age);
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, record| match (record.finished_at, cutoff) {
            (Some(finished), Some(cutoff)) => finished > cutoff,
            _ => true,
        });
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Action, TestIntent, TestOptions, TestType};
    use std::sync::Arc;

    fn request() -> TestRequest {
        TestRequest::new(
            "take a screenshot of https://example.com",
            TestIntent {
                test_type: TestType::Ui,
                target_url: Some("https://example.com".to_string()),
                actions: vec![Action::Screenshot],
                options: TestOptions::default(),
            },
        )
    }

    fn failed(id: &JobId, error: &str) -> TestResult {
        TestResult::failure(
            id.clone(),
            error,
            String::new(),
            Utc::now(),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_lifecycle() {
        let store = StatusStore::new();
        let request = request();
        let id = request.test_id.clone();

        assert!(store.insert_pending(&request));
        assert!(!store.insert_pending(&request));
        assert_eq!(store.request(&id), Some(request));
        assert_eq!(store.status(&id), JobStatus::Pending);
        assert_eq!(store.result(&id).status, JobStatus::NotFound);

        assert!(store.mark_running(&id));
        assert!(!store.mark_running(&id));
        assert_eq!(store.status(&id), JobStatus::Running);

        assert!(store.finish(failed(&id, "boom")));
        assert_eq!(store.status(&id), JobStatus::Failed);
        assert_eq!(store.result(&id).error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_terminal_state_is_final() {
        let store = StatusStore::new();
        let request = request();
        let id = request.test_id.clone();
        store.insert_pending(&request);
        assert!(store.finish(failed(&id, "first")));
        assert!(!store.finish(failed(&id, "second")));
        assert!(!store.mark_running(&id));
        assert_eq!(store.result(&id).error.as_deref(), Some("first"));
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let store = StatusStore::new();
        let id = JobId::from("nonexistent");
        assert_eq!(store.status(&id), JobStatus::NotFound);
        let result = store.result(&id);
        assert_eq!(result.status, JobStatus::NotFound);
        assert_eq!(result.test_id, id);
        assert_eq!(store.request(&id), None);
    }

    #[test]
    fn test_finish_ignores_unregistered_ids() {
        let store = StatusStore::new();
        let id = JobId::from("never-submitted");
        assert!(!store.finish(failed(&id, "stray")));
        assert_eq!(store.status(&id), JobStatus::NotFound);
        assert!(store.is_empty());
    }

    #[test]
    fn test_prune_finished_keeps_active_jobs() {
        let store = StatusStore::new();
        let (done, active) = (request(), request());
        store.insert_pending(&done);
        store.insert_pending(&active);
        let (done, active) = (done.test_id, active.test_id);
        store.finish(failed(&done, "x"));

        assert_eq!(store.prune_finished(Duration::from_secs(3600)), 0);
        assert_eq!(store.prune_finished(Duration::ZERO), 1);
        assert_eq!(store.status(&done), JobStatus::NotFound);
        assert_eq!(store.status(&active), JobStatus::Pending);
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(StatusStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let request = request();
                        let id = request.test_id.clone();
                        store.insert_pending(&request);
                        store.mark_running(&id);
                        store.finish(failed(&id, "x"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 400);
    }
}
