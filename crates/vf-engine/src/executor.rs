//! The worker loop: runs admitted jobs against the active model,
//! classifies failures, and drives recovery.
//!
//! One executor drains the queue serially; the accelerator is a
//! serially-shared resource. Each job runs inside its own spawned
//! task so a panicking generation is recorded as that job's failure
//! and never takes down the loop or its neighbors.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use vf_core::error::{ErrorKind, RenderError};
use vf_core::params::ValidatedParams;

use crate::backend::{SegmentArtifact, VideoModel};
use crate::config::EngineConfig;
use crate::janitor::StorageJanitor;
use crate::job::{ErrorRecord, JobId};
use crate::loader::ModelLoader;
use crate::queue::{JobOutcome, JobQueue, RunnableJob};

/// How one render run ended, with whatever segments exist.
enum RenderRun {
    Complete(Vec<SegmentArtifact>),
    Cancelled,
    Errored(Vec<SegmentArtifact>, RenderError),
}

pub(crate) struct Executor {
    queue: Arc<JobQueue>,
    loader: Arc<ModelLoader>,
    janitor: Arc<StorageJanitor>,
    config: Arc<EngineConfig>,
}

impl Executor {
    pub(crate) fn new(
        queue: Arc<JobQueue>,
        loader: Arc<ModelLoader>,
        janitor: Arc<StorageJanitor>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            queue,
            loader,
            janitor,
            config,
        }
    }

    /// Drains the queue until shutdown is requested.
    pub(crate) async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!("worker loop started");
        loop {
            let Some(runnable) = self.queue.next_runnable() else {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.worker_poll) => continue,
                }
            };
            self.process(runnable).await;
            if shutdown.is_cancelled() {
                break;
            }
        }
        info!("worker loop stopped");
    }

    async fn process(&self, runnable: RunnableJob) {
        let RunnableJob { id, params, cancel } = runnable;
        info!(
            "{id}: starting ({} scenes, {:.1}s at {})",
            params.scene_count,
            params.duration_secs,
            params.resolution.label()
        );

        // Model load is lazy and cached; exhaustion of the fallback
        // chain is a service-level failure recorded on this job.
        let handle = match self.loader.acquire().await {
            Ok(handle) => handle,
            Err(unavailable) => {
                error!("{id}: {unavailable}");
                self.queue.complete(
                    id,
                    JobOutcome::Failure(ErrorRecord {
                        kind: ErrorKind::ModelUnavailable,
                        summary: "no generation model could be loaded; the service is degraded"
                            .into(),
                        detail: Some(unavailable.detail()),
                    }),
                );
                return;
            }
        };

        let workdir = self.janitor.temp_workdir(id);
        if let Err(e) = fs::create_dir_all(&workdir) {
            self.queue.complete(
                id,
                JobOutcome::Failure(ErrorRecord {
                    kind: ErrorKind::GenerationError,
                    summary: "could not prepare working storage".into(),
                    detail: Some(e.to_string()),
                }),
            );
            return;
        }

        let outcome = self
            .generate(id, &params, handle.model.clone(), &workdir, &cancel)
            .await;

        if matches!(outcome, JobOutcome::Success { .. }) {
            // Best-effort retention pass; never fails the job.
            if let Err(e) = self.janitor.cleanup() {
                warn!("{id}: cleanup deferred: {e}");
            }
        }

        // Working files go unconditionally, whatever the outcome.
        if let Err(e) = fs::remove_dir_all(&workdir) {
            warn!("{id}: could not remove workdir: {e}");
        }

        match &outcome {
            JobOutcome::Success { partial, .. } => {
                info!("{id}: succeeded{}", if *partial { " (partial)" } else { "" })
            }
            JobOutcome::Failure(e) => warn!("{id}: failed ({:?}): {}", e.kind, e.summary),
            JobOutcome::Cancelled => info!("{id}: cancelled"),
        }
        self.queue.complete(id, outcome);
    }

    /// Renders all segments under a wall-clock bound and classifies
    /// the result.
    async fn generate(
        &self,
        id: JobId,
        params: &ValidatedParams,
        model: Arc<dyn VideoModel>,
        workdir: &Path,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let queue = self.queue.clone();
        let render_params = params.clone();
        let render_dir = workdir.to_path_buf();
        let token = cancel.clone();
        let render_model = model.clone();

        let mut task = tokio::spawn(async move {
            let mut segments = Vec::new();
            for index in 0..render_params.scene_count {
                // Checkpoint: cancellation is observed between
                // segments, never mid-segment.
                if token.is_cancelled() {
                    return RenderRun::Cancelled;
                }
                match render_model.render_segment(index, &render_params, &render_dir).await {
                    Ok(segment) => {
                        segments.push(segment);
                        queue.update_progress(
                            id,
                            (index + 1) as f32 / render_params.scene_count as f32,
                        );
                    }
                    Err(e) => return RenderRun::Errored(segments, e),
                }
            }
            RenderRun::Complete(segments)
        });

        let run = match timeout(self.config.generation_timeout, &mut task).await {
            Err(_elapsed) => {
                task.abort();
                cancel.cancel();
                // Wait for the aborted task to settle: nothing may
                // still be writing under the workdir once the caller
                // removes it.
                let _ = task.await;
                return JobOutcome::Failure(ErrorRecord {
                    kind: ErrorKind::Timeout,
                    summary: format!(
                        "generation exceeded the {}s time limit; resubmit to retry",
                        self.config.generation_timeout.as_secs()
                    ),
                    detail: None,
                });
            }
            Ok(Err(join_err)) => {
                // A panic inside generation is isolated here.
                error!("{id}: generation task crashed: {join_err}");
                return JobOutcome::Failure(ErrorRecord {
                    kind: ErrorKind::GenerationError,
                    summary: "generation failed unexpectedly; resubmit to retry".into(),
                    detail: Some(join_err.to_string()),
                });
            }
            Ok(Ok(run)) => run,
        };

        match run {
            RenderRun::Complete(segments) => self.finish(id, params, &model, segments, false).await,
            RenderRun::Cancelled => JobOutcome::Cancelled,
            RenderRun::Errored(segments, RenderError::OutOfMemory(detail)) => {
                self.salvage(id, params, &model, segments, detail).await
            }
            RenderRun::Errored(_, RenderError::Failed(detail)) => {
                JobOutcome::Failure(ErrorRecord {
                    kind: ErrorKind::GenerationError,
                    summary: "generation failed; resubmit to retry".into(),
                    detail: Some(detail),
                })
            }
        }
    }

    /// Partial-recovery path for resource exhaustion: if enough
    /// segments exist, a shorter artifact still counts as success.
    async fn salvage(
        &self,
        id: JobId,
        params: &ValidatedParams,
        model: &Arc<dyn VideoModel>,
        segments: Vec<SegmentArtifact>,
        detail: String,
    ) -> JobOutcome {
        let salvaged: f32 = segments.iter().map(|s| s.duration_secs).sum();
        if segments.is_empty() || salvaged < self.config.min_salvage_secs {
            return JobOutcome::Failure(ErrorRecord {
                kind: ErrorKind::ResourceExhausted,
                summary:
                    "generation ran out of accelerator memory before producing usable output; \
                     try a shorter duration or lower resolution"
                        .into(),
                detail: Some(detail),
            });
        }

        warn!(
            "{id}: out of memory after {salvaged:.1}s of {:.1}s; salvaging partial output",
            params.duration_secs
        );
        match self.finish(id, params, model, segments, true).await {
            JobOutcome::Success {
                output_path,
                duration_secs,
                partial,
                ..
            } => JobOutcome::Success {
                output_path,
                duration_secs,
                partial,
                note: Some(format!(
                    "output truncated to {duration_secs:.1}s after running out of memory"
                )),
            },
            other => other,
        }
    }

    /// Assembles segments into the final artifact and muxes music
    /// when requested.
    async fn finish(
        &self,
        id: JobId,
        params: &ValidatedParams,
        model: &Arc<dyn VideoModel>,
        segments: Vec<SegmentArtifact>,
        partial: bool,
    ) -> JobOutcome {
        let artifact = self.janitor.artifact_path(id);
        let duration_secs = match assemble(&segments, &artifact) {
            Ok(duration) => duration,
            Err(e) => {
                return JobOutcome::Failure(ErrorRecord {
                    kind: ErrorKind::GenerationError,
                    summary: "could not assemble the output artifact".into(),
                    detail: Some(e.to_string()),
                });
            }
        };

        let mut note = None;
        if params.add_music {
            let muxed = artifact.with_extension("music.mp4");
            match model.add_music(&artifact, &muxed).await {
                Ok(()) => {
                    if let Err(e) = fs::rename(&muxed, &artifact) {
                        warn!("{id}: could not swap in muxed video: {e}");
                        let _ = fs::remove_file(&muxed);
                        note =
                            Some("music integration failed; video rendered without audio".into());
                    }
                }
                Err(e) => {
                    // Recoverable: the silent video is still a result.
                    warn!("{id}: music integration failed: {e}");
                    note = Some("music integration failed; video rendered without audio".into());
                }
            }
        }

        JobOutcome::Success {
            output_path: artifact,
            duration_secs,
            partial,
            note,
        }
    }
}

/// Concatenates segment files into `dest`, returning the combined
/// duration. Container-aware stitching is the backend's concern;
/// segments arrive as independently playable fragments.
fn assemble(segments: &[SegmentArtifact], dest: &Path) -> io::Result<f32> {
    let mut out = fs::File::create(dest)?;
    let mut duration = 0.0;
    for segment in segments {
        let mut src = fs::File::open(&segment.path)?;
        io::copy(&mut src, &mut out)?;
        duration += segment.duration_secs;
    }
    Ok(duration)
}
