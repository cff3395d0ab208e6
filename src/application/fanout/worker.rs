//! Fan-out work queue and background worker.
//!
//! Profile edits enqueue a job and return. The worker drains the queue one
//! profile at a time (each pass is itself parallel across trips) and, when
//! a pass leaves stragglers or cannot start, schedules a follow-up pass
//! after `repair_delay`. Passes stop after `max_repair_passes` follow-ups;
//! the next edit of the same profile starts over.
//!
//! An edit that finds the queue full parks its profile id in an overflow
//! set that a single task hands to the worker as room frees up. Parked
//! edits of one profile collapse into one pass, since every pass re-reads
//! the profile.
//!
//! ## Graceful Shutdown
//!
//! The worker listens on a `watch` channel and finishes the pass in hand
//! before stopping. Pending follow-ups are dropped.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::config::FanoutConfig;
use crate::domain::foundation::ProfileId;

use super::engine::{FanoutEngine, FanoutReport};

/// One pass of fan-out for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutJob {
    pub profile_id: ProfileId,
    /// 0 for the pass triggered by an edit, then 1, 2, ... for repairs.
    pub pass: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanoutQueueError {
    #[error("fan-out queue is full")]
    Full,

    #[error("fan-out worker has stopped")]
    Closed,
}

#[derive(Debug, Default)]
struct Overflow {
    parked: BTreeSet<ProfileId>,
    draining: bool,
}

/// Sending half of the work queue.
#[derive(Debug, Clone)]
pub struct FanoutQueue {
    sender: mpsc::Sender<FanoutJob>,
    overflow: Arc<Mutex<Overflow>>,
}

impl FanoutQueue {
    /// Creates a queue and the receiver the worker drains.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<FanoutJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender,
            overflow: Arc::new(Mutex::new(Overflow::default())),
        };
        (queue, receiver)
    }

    /// Enqueues a first pass without waiting.
    pub fn enqueue(&self, profile_id: ProfileId) -> Result<(), FanoutQueueError> {
        self.sender
            .try_send(FanoutJob {
                profile_id,
                pass: 0,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => FanoutQueueError::Full,
                mpsc::error::TrySendError::Closed(_) => FanoutQueueError::Closed,
            })
    }

    /// Enqueues a first pass, parking the profile when the queue is full.
    ///
    /// Returns `Ok(true)` when parked. Must be called inside a Tokio
    /// runtime.
    pub fn enqueue_or_park(&self, profile_id: ProfileId) -> Result<bool, FanoutQueueError> {
        match self.enqueue(profile_id.clone()) {
            Ok(()) => Ok(false),
            Err(FanoutQueueError::Full) => {
                self.park(profile_id);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Profiles waiting for room in the queue.
    pub fn parked(&self) -> usize {
        self.overflow
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .parked
            .len()
    }

    fn park(&self, profile_id: ProfileId) {
        let mut overflow = self.overflow.lock().unwrap_or_else(PoisonError::into_inner);
        overflow.parked.insert(profile_id);
        if overflow.draining {
            return;
        }
        overflow.draining = true;
        drop(overflow);

        let sender = self.sender.clone();
        let overflow = self.overflow.clone();
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut overflow = overflow.lock().unwrap_or_else(PoisonError::into_inner);
                    let next = overflow.parked.pop_first();
                    // Cleared under the same lock a parker checks it under
                    if next.is_none() {
                        overflow.draining = false;
                    }
                    next
                };
                let Some(profile_id) = next else { break };
                if sender.send(FanoutJob { profile_id, pass: 0 }).await.is_err() {
                    tracing::debug!("worker stopped before parked fan-out could run");
                    break;
                }
            }
        });
    }

    fn schedule_repair(&self, job: FanoutJob, delay: Duration) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if sender.send(job).await.is_err() {
                tracing::debug!("worker stopped before repair pass could run");
            }
        });
    }
}

pub struct FanoutWorker {
    engine: Arc<FanoutEngine>,
    queue: FanoutQueue,
    receiver: mpsc::Receiver<FanoutJob>,
    repair_delay: Duration,
    max_repair_passes: u32,
    reports: Option<mpsc::Sender<FanoutReport>>,
}

impl FanoutWorker {
    pub fn new(
        engine: Arc<FanoutEngine>,
        queue: FanoutQueue,
        receiver: mpsc::Receiver<FanoutJob>,
        config: &FanoutConfig,
    ) -> Self {
        Self {
            engine,
            queue,
            receiver,
            repair_delay: config.repair_delay(),
            max_repair_passes: config.max_repair_passes,
            reports: None,
        }
    }

    /// Forwards finished reports, for observers and tests. Reports that
    /// find the sink full are dropped.
    pub fn with_report_sink(mut self, sink: mpsc::Sender<FanoutReport>) -> Self {
        self.reports = Some(sink);
        self
    }

    /// Run the worker loop until shutdown signal is received.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("fan-out worker started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                job = self.receiver.recv() => {
                    match job {
                        Some(job) => self.process(job).await,
                        None => break,
                    }
                }
            }
        }
        tracing::info!("fan-out worker stopped");
    }

    /// Runs one job and schedules its follow-up if needed.
    pub async fn process(&self, job: FanoutJob) {
        let report = match self.engine.run(&job.profile_id).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    profile_id = %job.profile_id,
                    pass = job.pass,
                    error = %e,
                    "fan-out pass could not start"
                );
                self.retry_later(&job, 0);
                return;
            }
        };

        if report.is_partial_failure() {
            self.retry_later(&job, report.failed.len());
        }

        if let Some(sink) = &self.reports {
            if let Err(mpsc::error::TrySendError::Full(_)) = sink.try_send(report) {
                tracing::debug!(profile_id = %job.profile_id, "report sink full, report dropped");
            }
        }
    }

    fn retry_later(&self, job: &FanoutJob, stragglers: usize) {
        if job.pass >= self.max_repair_passes {
            tracing::error!(
                profile_id = %job.profile_id,
                passes = job.pass + 1,
                stragglers,
                "giving up on fan-out; copies stay stale until the next edit"
            );
            return;
        }
        tracing::warn!(
            profile_id = %job.profile_id,
            pass = job.pass,
            stragglers,
            "scheduling repair pass"
        );
        self.queue.schedule_repair(
            FanoutJob {
                profile_id: job.profile_id.clone(),
                pass: job.pass + 1,
            },
            self.repair_delay,
        );
    }
}
