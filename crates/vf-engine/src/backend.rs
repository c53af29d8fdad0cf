//! The seam between the engine and the generative models.
//!
//! Models are opaque to the engine: an embedder supplies a
//! [`ModelBackend`] that can load a tier at a requested precision and
//! hand back a [`VideoModel`] the executor invokes one segment at a
//! time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use vf_core::error::{LoadError, RenderError};
use vf_core::params::ValidatedParams;
use vf_core::{ModelTier, Precision};

use crate::probe::ResourceReport;

/// One rendered scene segment, written under the job's temp workdir.
#[derive(Debug, Clone)]
pub struct SegmentArtifact {
    pub path: PathBuf,
    pub duration_secs: f32,
}

/// A loaded generative model.
///
/// The executor calls [`render_segment`](VideoModel::render_segment)
/// once per scene; segment boundaries double as cancellation
/// checkpoints, so a segment is the unit of work a model should aim to
/// keep reasonably short.
#[async_trait]
pub trait VideoModel: Send + Sync {
    /// Renders scene `index` into a file under `workdir`.
    async fn render_segment(
        &self,
        index: u32,
        params: &ValidatedParams,
        workdir: &Path,
    ) -> Result<SegmentArtifact, RenderError>;

    /// Muxes a background track into `video`, writing `out`. Failure
    /// here is non-fatal: the engine keeps the silent video and logs.
    async fn add_music(&self, _video: &Path, _out: &Path) -> Result<(), RenderError> {
        Err(RenderError::Failed(
            "music integration not supported by this backend".into(),
        ))
    }
}

/// Loads model tiers on demand.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Attempts to load `tier` at `precision`. Any error aborts this
    /// tier only; the loader records the reason and moves down the
    /// chain.
    async fn load(
        &self,
        tier: ModelTier,
        precision: Precision,
        resources: &ResourceReport,
    ) -> Result<Arc<dyn VideoModel>, LoadError>;
}
