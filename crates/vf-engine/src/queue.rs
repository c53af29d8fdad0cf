//! Job admission, FIFO ordering, cancellation, and failure isolation.
//!
//! All queue state lives behind one mutex; the capacity check and the
//! append happen under the same lock acquisition, so concurrent
//! submitters can never both pass the check at capacity.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use vf_core::error::SubmitError;
use vf_core::params::ValidatedParams;

use crate::job::{ErrorRecord, Job, JobId, JobStatus, StatusReport};

/// What the executor receives for one admitted job.
#[derive(Debug)]
pub struct RunnableJob {
    pub id: JobId,
    pub params: ValidatedParams,
    pub cancel: CancellationToken,
}

/// Terminal outcome the executor reports back.
#[derive(Debug)]
pub enum JobOutcome {
    Success {
        output_path: std::path::PathBuf,
        duration_secs: f32,
        partial: bool,
        note: Option<String>,
    },
    Failure(ErrorRecord),
    Cancelled,
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job never started; it is gone from the queue entirely.
    CancelledBeforeStart,
    /// The running job was flagged; the executor will stop at its
    /// next checkpoint.
    CancelRequested,
    AlreadyTerminal,
    NotFound,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub capacity: usize,
}

struct Inner {
    jobs: HashMap<JobId, Job>,
    order: VecDeque<JobId>,
    running: usize,
}

pub struct JobQueue {
    capacity: usize,
    retention: Duration,
    inner: Mutex<Inner>,
}

impl JobQueue {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            capacity,
            retention,
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                order: VecDeque::new(),
                running: 0,
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        // A panicking job is isolated at the executor boundary, so a
        // poisoned lock only means a panic mid-read; the state is
        // still coherent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admits a job or rejects it with `QueueFull`. Atomic under
    /// concurrent submitters.
    pub fn submit(&self, params: ValidatedParams) -> Result<JobId, SubmitError> {
        let mut inner = self.locked();
        Self::evict_expired(&mut inner, self.retention);

        let live = inner.order.len() + inner.running;
        if live >= self.capacity {
            return Err(SubmitError::QueueFull {
                capacity: self.capacity,
            });
        }

        let job = Job::new(params);
        let id = job.id;
        inner.order.push_back(id);
        inner.jobs.insert(id, job);
        info!("{id} admitted ({} queued)", inner.order.len());
        Ok(id)
    }

    /// Pops the oldest pending job and marks it running.
    pub fn next_runnable(&self) -> Option<RunnableJob> {
        let mut inner = self.locked();
        let id = inner.order.pop_front()?;
        // Ids in `order` always refer to pending jobs: cancellation
        // removes a pending job from both collections at once.
        let job = inner.jobs.get_mut(&id)?;
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        let runnable = RunnableJob {
            id,
            params: job.params.clone(),
            cancel: job.cancel.clone(),
        };
        inner.running += 1;
        Some(runnable)
    }

    /// Cancels a job. Pending jobs leave the queue immediately and
    /// free their capacity unit; running jobs are flagged for the
    /// executor's next checkpoint.
    pub fn cancel(&self, id: JobId) -> CancelOutcome {
        let mut inner = self.locked();
        let status = match inner.jobs.get(&id) {
            Some(job) => job.status,
            None => return CancelOutcome::NotFound,
        };
        match status {
            JobStatus::Pending => {
                inner.order.retain(|queued| *queued != id);
                inner.jobs.remove(&id);
                info!("{id} cancelled before start");
                CancelOutcome::CancelledBeforeStart
            }
            JobStatus::Running => {
                if let Some(job) = inner.jobs.get(&id) {
                    job.cancel.cancel();
                }
                info!("{id} cancellation requested");
                CancelOutcome::CancelRequested
            }
            _ => CancelOutcome::AlreadyTerminal,
        }
    }

    /// Records progress on a running job; ignored once terminal.
    pub fn update_progress(&self, id: JobId, progress: f32) {
        let mut inner = self.locked();
        if let Some(job) = inner.jobs.get_mut(&id) {
            if job.status == JobStatus::Running {
                job.progress = progress.clamp(0.0, 1.0);
            }
        }
    }

    /// Records the terminal outcome of a job the executor ran.
    pub fn complete(&self, id: JobId, outcome: JobOutcome) {
        let mut inner = self.locked();
        inner.running = inner.running.saturating_sub(1);
        let Some(job) = inner.jobs.get_mut(&id) else {
            debug!("{id} completed after eviction");
            return;
        };
        job.finished_at = Some(Utc::now());
        match outcome {
            JobOutcome::Success {
                output_path,
                duration_secs,
                partial,
                note,
            } => {
                job.status = JobStatus::Succeeded;
                job.progress = 1.0;
                job.output_path = Some(output_path);
                job.output_duration_secs = Some(duration_secs);
                job.partial = partial;
                job.note = note;
            }
            JobOutcome::Failure(error) => {
                job.status = JobStatus::Failed;
                job.error = Some(error);
            }
            JobOutcome::Cancelled => {
                job.status = JobStatus::Cancelled;
            }
        }
    }

    /// Status-interface lookup.
    pub fn report(&self, id: JobId, debug_mode: bool) -> Option<StatusReport> {
        self.locked().jobs.get(&id).map(|j| j.report(debug_mode))
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.locked();
        QueueStats {
            pending: inner.order.len(),
            running: inner.running,
            capacity: self.capacity,
        }
    }

    /// Evicts terminal jobs past the retention window. Pending and
    /// running jobs are never touched.
    fn evict_expired(inner: &mut Inner, retention: Duration) {
        let now = Utc::now();
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::MAX);
        inner.jobs.retain(|id, job| {
            let expired = job.status.is_terminal()
                && job
                    .finished_at
                    .is_some_and(|done| now - done > retention);
            if expired {
                debug!("{id} evicted after retention window");
            }
            !expired
        });
    }
}
