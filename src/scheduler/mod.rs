//! Job Scheduler: runs test requests on a pool of background workers.
//!
//! `submit` records a job as pending, queues it and returns the id at once.
//! A fixed number of tokio worker tasks drain the queue; each job runs in its
//! own spawned task so a panic inside the runner is stored as a `failed`
//! result instead of taking a worker down. `run_sync` takes the same
//! execution path inline.

pub mod events;
pub mod store;

pub use events::JobEvent;
pub use store::StatusStore;

use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::intent::{JobId, TestRequest};
use crate::runner::{JobStatus, TestResult, TestRunner, failure_script};

/// Capacity of the event channel; slow subscribers see `Lagged`
const EVENT_CAPACITY: usize = 256;

/// State shared by the scheduler handle and its workers
struct Shared {
    runner: TestRunner,
    store: Arc<StatusStore>,
    events: broadcast::Sender<JobEvent>,
}

impl Shared {
    fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn record(&self, result: TestResult) {
        let events = JobEvent::finished(&result);
        if self.store.finish(result) {
            for event in events {
                self.publish(event);
            }
        }
    }

    async fn execute(&self, request: TestRequest) -> TestResult {
        let test_id = request.test_id.clone();
        let test_type = request.intent.test_type;
        let prompt = request.prompt.clone();
        let started_at = Utc::now();
        let clock = Instant::now();

        let runner = self.runner.clone();
        let handle = tokio::spawn(async move { runner.run(&request).await });
        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let message = if e.is_panic() {
                    format!("test worker panicked: {}", panic_message(e.into_panic()))
                } else {
                    "test worker was cancelled".to_string()
                };
                error!(test_id = %test_id, error = %message, "test worker failed");
                TestResult::failure(
                    test_id,
                    message.clone(),
                    failure_script(test_type, &message, &prompt),
                    started_at,
                    clock.elapsed(),
                )
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to the worker pool and status store
pub struct JobScheduler {
    shared: Arc<Shared>,
    queue: parking_lot::Mutex<Option<mpsc::UnboundedSender<TestRequest>>>,
    workers: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Start `workers` background workers. Must be called inside a tokio runtime.
    pub fn start(runner: TestRunner, workers: usize) -> Self {
        Self::with_store(runner, workers, Arc::new(StatusStore::new()))
    }

    /// Start workers that record into an existing store
    pub fn with_store(runner: TestRunner, workers: usize, store: Arc<StatusStore>) -> Self {
        let workers = workers.max(1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            runner,
            store,
            events,
        });

        let (sender, receiver) = mpsc::unbounded_channel::<TestRequest>();
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let handles = (0..workers)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(request) = next else {
                            debug!(worker, "job queue closed; worker exiting");
                            break;
                        };
                        run_job(&shared, request).await;
                    }
                })
            })
            .collect();
        info!(workers, backend = shared.runner.backend_name(), "job scheduler started");

        Self {
            shared,
            queue: parking_lot::Mutex::new(Some(sender)),
            workers: AsyncMutex::new(handles),
        }
    }

    /// Queue `request` for background execution and return its id immediately
    pub fn submit(&self, request: TestRequest) -> JobId {
        let test_id = request.test_id.clone();
        if !self.shared.store.insert_pending(&request) {
            warn!(test_id = %test_id, "duplicate job id; ignoring submission");
            return test_id;
        }
        self.shared.publish(JobEvent::TestUpdate {
            test_id: test_id.clone(),
            status: JobStatus::Pending,
        });

        let queued = match self.queue.lock().as_ref() {
            Some(queue) => queue.send(request).map_err(|e| e.0),
            None => Err(request),
        };
        match queued {
            Ok(()) => debug!(test_id = %test_id, "job queued"),
            Err(request) => {
                warn!(test_id = %test_id, "scheduler is shut down; rejecting job");
                let message = "job scheduler is shut down";
                self.shared.record(TestResult::failure(
                    test_id.clone(),
                    message,
                    failure_script(request.intent.test_type, message, &request.prompt),
                    Utc::now(),
                    std::time::Duration::ZERO,
                ));
            }
        }
        test_id
    }

    /// Run `request` inline and return its result; the job is recorded too
    pub async fn run_sync(&self, request: TestRequest) -> TestResult {
        let test_id = request.test_id.clone();
        if self.shared.store.insert_running(&request) {
            self.shared.publish(JobEvent::TestUpdate {
                test_id: test_id.clone(),
                status: JobStatus::Running,
            });
        }
        let result = self.shared.execute(request).await;
        self.shared.record(result.clone());
        result
    }

    /// Current status, `NotFound` for unknown ids
    pub fn status(&self, test_id: &JobId) -> JobStatus {
        self.shared.store.status(test_id)
    }

    /// Stored result, or the not-found sentinel
    pub fn results(&self, test_id: &JobId) -> TestResult {
        self.shared.store.result(test_id)
    }

    /// The request a job was submitted with
    pub fn request(&self, test_id: &JobId) -> Option<TestRequest> {
        self.shared.store.request(test_id)
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.shared.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until `test_id` reaches a terminal state and return its result.
    ///
    /// Unknown ids resolve immediately with the not-found sentinel.
    pub async fn wait_for(&self, test_id: &JobId) -> TestResult {
        let mut events = self.subscribe();
        loop {
            match self.status(test_id) {
                JobStatus::Completed | JobStatus::Failed | JobStatus::NotFound => {
                    return self.results(test_id);
                }
                JobStatus::Pending | JobStatus::Running => {}
            }
            match events.recv().await {
                Ok(event) if event.is_final() && event.test_id() == test_id => {
                    return self.results(test_id);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event subscriber lagged; rechecking store");
                }
                Err(broadcast::error::RecvError::Closed) => return self.results(test_id),
            }
        }
    }

    /// Stop accepting jobs, let queued jobs finish and join the workers
    pub async fn shutdown(&self) {
        self.queue.lock().take();
        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed");
            }
        }
        info!("job scheduler stopped");
    }
}

async fn run_job(shared: &Shared, request: TestRequest) {
    let test_id = request.test_id.clone();
    if shared.store.mark_running(&test_id) {
        shared.publish(JobEvent::TestUpdate {
            test_id: test_id.clone(),
            status: JobStatus::Running,
        });
    }
    let result = shared.execute(request).await;
    info!(test_id = %test_id, status = %result.status, "job finished");
    shared.record(result);
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("jobs", &self.shared.store.len())
            .field("accepting", &self.queue.lock().is_some())
            .finish()
    }
}
