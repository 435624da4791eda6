//! AnnotationQueue: bounded job queue drained by a fixed worker pool

use chrono::Utc;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::{AnnotationJob, AnnotationOutcome, AnnotationStatus, PendingAnnotation};
use super::worker::Annotator;
use crate::config::AnnotationConfig;
use crate::error::{EngineError, EngineResult};
use crate::storage::ObjectId;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<AnnotationJob>>>;

/// A reserved queue slot. Sending through it cannot fail for lack of space.
pub struct AnnotationPermit {
    permit: mpsc::OwnedPermit<AnnotationJob>,
}

impl AnnotationPermit {
    pub fn send(self, job: AnnotationJob) {
        debug!(prompt_id = %job.prompt_id, "annotation job queued");
        self.permit.send(job);
    }
}

/// Bounded annotation queue with a fixed pool of workers.
///
/// Jobs are owned by the pool: dropping the submitter's future never
/// cancels them. Only `shutdown` does, and only before a job has stored
/// its meaning. Finished jobs are published on a
/// broadcast channel; failed ones stay in the pending set until a retry
/// succeeds.
pub struct AnnotationQueue {
    sender: RwLock<Option<mpsc::Sender<AnnotationJob>>>,
    outcomes: broadcast::Sender<AnnotationOutcome>,
    pending: Arc<DashMap<ObjectId, PendingAnnotation>>,
    token: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl AnnotationQueue {
    /// Spawn the worker pool on the current runtime.
    pub fn start(annotator: Annotator, config: &AnnotationConfig) -> Self {
        let annotator = annotator.with_job_timeout(config.job_timeout);
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (outcomes, _) = broadcast::channel(capacity.max(16));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let pending = Arc::new(DashMap::new());
        let token = CancellationToken::new();

        let workers = (0..config.workers.max(1))
            .map(|id| {
                let worker = Worker {
                    id,
                    annotator: annotator.clone(),
                    receiver: receiver.clone(),
                    outcomes: outcomes.clone(),
                    pending: pending.clone(),
                    token: token.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(workers = config.workers.max(1), capacity, "annotation queue started");
        Self {
            sender: RwLock::new(Some(sender)),
            outcomes,
            pending,
            token,
            workers: Mutex::new(workers),
            capacity,
        }
    }

    /// Reserve a slot without waiting. A full queue is `Backpressure`, a
    /// shut-down queue is `Cancelled`.
    pub fn try_reserve(&self) -> EngineResult<AnnotationPermit> {
        let sender = self
            .sender
            .read()
            .unwrap()
            .clone()
            .ok_or(EngineError::Cancelled)?;
        match sender.try_reserve_owned() {
            Ok(permit) => Ok(AnnotationPermit { permit }),
            Err(mpsc::error::TrySendError::Full(_)) => Err(EngineError::Backpressure(self.capacity)),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EngineError::Cancelled),
        }
    }

    /// Queue a job, rejecting it if the queue is full.
    pub fn submit(&self, job: AnnotationJob) -> EngineResult<()> {
        self.try_reserve()?.send(job);
        Ok(())
    }

    /// Receive every outcome published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AnnotationOutcome> {
        self.outcomes.subscribe()
    }

    /// Failed jobs awaiting retry.
    pub fn pending(&self) -> Vec<PendingAnnotation> {
        self.pending.iter().map(|r| r.value().clone()).collect()
    }

    /// Re-queue failed jobs until the queue is full. Returns how many
    /// were queued.
    pub fn retry_pending(&self) -> EngineResult<usize> {
        let mut queued = 0;
        for entry in self.pending() {
            match self.submit(entry.job) {
                Ok(()) => queued += 1,
                Err(EngineError::Backpressure(_)) => break,
                Err(e) => return Err(e),
            }
        }
        if queued > 0 {
            info!(queued, "re-queued failed annotation jobs");
        }
        Ok(queued)
    }

    /// Stop accepting jobs, cancel in-flight ones and wait for the workers.
    pub async fn shutdown(&self) {
        self.sender.write().unwrap().take();
        self.token.cancel();

        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock().unwrap());
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "annotation worker panicked");
            }
        }
        info!(pending = self.pending.len(), "annotation queue stopped");
    }
}

struct Worker {
    id: usize,
    annotator: Annotator,
    receiver: SharedReceiver,
    outcomes: broadcast::Sender<AnnotationOutcome>,
    pending: Arc<DashMap<ObjectId, PendingAnnotation>>,
    token: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            let job = tokio::select! {
                _ = self.token.cancelled() => break,
                job = async { self.receiver.lock().await.recv().await } => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process(job).await;
        }
        debug!(worker = self.id, "annotation worker exiting");
    }

    async fn process(&self, job: AnnotationJob) {
        let token = self.token.child_token();
        let status = match self.annotator.annotate(&job, &token).await {
            Ok(status) => {
                self.pending.remove(&job.prompt_id);
                status
            }
            Err(e) => {
                warn!(worker = self.id, prompt_id = %job.prompt_id, error = %e, "annotation failed");
                let reason = e.to_string();
                self.pending
                    .entry(job.prompt_id.clone())
                    .and_modify(|p| {
                        p.failures += 1;
                        p.last_error = reason.clone();
                        p.last_failed_at = Utc::now();
                    })
                    .or_insert_with(|| PendingAnnotation {
                        job: job.clone(),
                        failures: 1,
                        last_error: reason.clone(),
                        last_failed_at: Utc::now(),
                    });
                AnnotationStatus::Failed { reason }
            }
        };

        // No subscribers is fine
        let _ = self.outcomes.send(AnnotationOutcome {
            prompt_id: job.prompt_id,
            status,
        });
    }
}
