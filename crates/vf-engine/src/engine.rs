//! The engine facade the presentation layer talks to.

use std::sync::Arc;

use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vf_core::error::{ModelUnavailable, SubmitError};
use vf_core::params::Submission;

use crate::backend::ModelBackend;
use crate::config::EngineConfig;
use crate::executor::Executor;
use crate::janitor::StorageJanitor;
use crate::job::{JobId, StatusReport};
use crate::loader::ModelLoader;
use crate::probe::ResourceProbe;
use crate::queue::{CancelOutcome, JobQueue, QueueStats};
use crate::validate::validate;

/// Orchestration engine handle.
///
/// Owns the queue, the model loader, and the single worker task that
/// executes jobs. Submission and status calls are cheap and safe from
/// any thread; generation itself is serialized on the worker.
pub struct VideoEngine {
    config: Arc<EngineConfig>,
    queue: Arc<JobQueue>,
    loader: Arc<ModelLoader>,
    shutdown: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl VideoEngine {
    /// Builds the engine and spawns its worker loop. Must be called
    /// within a tokio runtime.
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn ModelBackend>,
        probe: Arc<dyn ResourceProbe>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let janitor = Arc::new(StorageJanitor::new(&config));
        janitor.ensure_dirs()?;

        let queue = Arc::new(JobQueue::new(config.max_queue_size, config.job_retention));
        let loader = Arc::new(ModelLoader::new(backend, probe));

        let executor = Arc::new(Executor::new(
            queue.clone(),
            loader.clone(),
            janitor,
            config.clone(),
        ));
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(executor.run(shutdown.clone()));

        info!(
            "engine ready (queue capacity {}, output {})",
            config.max_queue_size,
            config.output_dir.display()
        );
        Ok(Self {
            config,
            queue,
            loader,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Validates a submission and admits it into the queue.
    pub fn submit(&self, submission: Submission) -> Result<JobId, SubmitError> {
        let params = validate(&submission, &self.config.limits)?;
        self.queue.submit(params)
    }

    /// Status of one job, or `None` once it is unknown or evicted.
    pub fn status(&self, id: JobId) -> Option<StatusReport> {
        self.queue.report(id, self.config.debug_mode)
    }

    /// Cancels a pending job outright, or flags a running one.
    pub fn cancel(&self, id: JobId) -> CancelOutcome {
        self.queue.cancel(id)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Drops the active model and walks the fallback chain again.
    pub async fn reload_model(&self) -> Result<(), ModelUnavailable> {
        self.loader.reload().await.map(|handle| {
            info!(
                "model reloaded: {} ({})",
                handle.tier.id(),
                handle.precision.label()
            );
        })
    }

    /// Stops the worker at its next checkpoint and waits for it.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for VideoEngine {
    fn drop(&mut self) {
        // Best-effort stop if the embedder never called shutdown().
        self.shutdown.cancel();
    }
}
