//! Admission scheduler: a bounded queue in front of a fixed worker pool.
//!
//! Submission never blocks. A full queue refuses the request immediately
//! with [`SubmitError::SchedulerSaturated`]. Each accepted request is
//! processed by exactly one worker and its outcome is delivered on a
//! one-shot channel held by the submitter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::Instrument;

use ballot_types::{AdmissionRequest, RequestId, VoteOutcome};

use crate::admission::admit;
use crate::context::PipelineContext;
use crate::queue::{AdmissionQueue, PushError, QueuedAdmission};
use crate::tracing_spans::admission_span;
use crate::SubmitError;

/// A request the scheduler has accepted. Await [`outcome`](Self::outcome)
/// for its definitive result.
#[derive(Debug)]
pub struct PendingAdmission {
    request_id: RequestId,
    outcome: oneshot::Receiver<VoteOutcome>,
}

impl PendingAdmission {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub async fn outcome(self) -> Result<VoteOutcome, SubmitError> {
        self.outcome
            .await
            .map_err(|_| SubmitError::WorkerLost(self.request_id))
    }
}

struct Shared {
    context: Arc<PipelineContext>,
    queue: Mutex<AdmissionQueue>,
    available: Notify,
}

enum Next {
    Work(QueuedAdmission, usize),
    Idle,
    Stop,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, AdmissionQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dequeue under the same lock that guards `closed`, so a worker only
    /// stops once the queue is both closed and drained.
    fn next(&self) -> Next {
        let mut queue = self.queue();
        match queue.pop() {
            Some(entry) => {
                if !queue.is_empty() {
                    self.available.notify_one();
                }
                Next::Work(entry, queue.len())
            }
            None if queue.is_closed() => Next::Stop,
            None => Next::Idle,
        }
    }

    fn close(&self) {
        self.queue().close();
        self.available.notify_waiters();
    }
}

pub struct AdmissionScheduler {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AdmissionScheduler {
    /// Spawn `worker_count` workers on the current tokio runtime.
    pub fn start(context: Arc<PipelineContext>, worker_count: usize, queue_capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            context,
            queue: Mutex::new(AdmissionQueue::new(queue_capacity)),
            available: Notify::new(),
        });
        let workers = (0..worker_count)
            .map(|index| tokio::spawn(run_worker(shared.clone(), index)))
            .collect();
        tracing::info!(workers = worker_count, capacity = queue_capacity, "admission scheduler started");
        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Offer a request to the queue without waiting.
    pub fn submit(&self, request: AdmissionRequest) -> Result<PendingAdmission, SubmitError> {
        let context = &self.shared.context;
        context.stats.record_submitted();
        context.metrics.requests_submitted.inc();

        let request_id = request.id;
        let (tx, rx) = oneshot::channel();
        let pushed = {
            let mut queue = self.shared.queue();
            let pushed = queue.push(request, tx).map_err(|e| match e {
                PushError::Full(_) => SubmitError::SchedulerSaturated {
                    capacity: queue.capacity(),
                },
                PushError::Closed(_) => SubmitError::ShuttingDown,
            });
            context.metrics.queue_depth.set(queue.len() as i64);
            pushed
        };

        match pushed {
            Ok(()) => {
                self.shared.available.notify_one();
                Ok(PendingAdmission {
                    request_id,
                    outcome: rx,
                })
            }
            Err(e) => {
                if matches!(e, SubmitError::SchedulerSaturated { .. }) {
                    context.stats.record_saturated();
                    context.metrics.requests_saturated.inc();
                    tracing::warn!(request = %request_id, "admission queue saturated");
                }
                Err(e)
            }
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.shared.queue().len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.shared.context
    }

    /// Stop accepting requests, let the workers drain the queue, then wait
    /// for every worker to exit.
    pub async fn shutdown(&self) {
        self.shared.close();
        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "admission worker terminated abnormally");
            }
        }
        tracing::info!("admission scheduler stopped");
    }
}

impl Drop for AdmissionScheduler {
    fn drop(&mut self) {
        self.shared.close();
    }
}

async fn run_worker(shared: Arc<Shared>, index: usize) {
    tracing::debug!(worker = index, "admission worker started");
    loop {
        let notified = shared.available.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match shared.next() {
            Next::Work(entry, depth) => {
                shared.context.metrics.queue_depth.set(depth as i64);
                let QueuedAdmission {
                    request,
                    responder,
                    enqueued_at,
                    ..
                } = entry;
                tracing::trace!(
                    request = %request.id,
                    waited_ms = enqueued_at.elapsed().as_millis() as u64,
                    "dequeued admission"
                );
                let outcome = admit(&shared.context, index, &request)
                    .instrument(admission_span(request.id, &request.voter, index))
                    .await;
                if responder.send(outcome).is_err() {
                    tracing::debug!(request = %request.id, "submitter stopped waiting for outcome");
                }
            }
            Next::Stop => break,
            Next::Idle => notified.await,
        }
    }
    tracing::debug!(worker = index, "admission worker stopped");
}
