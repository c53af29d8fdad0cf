//! Model loading with the resource-aware fallback chain.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use vf_core::error::{ModelUnavailable, TierFailure};
use vf_core::{ModelTier, Precision};

use crate::backend::{ModelBackend, VideoModel};
use crate::probe::{ResourceProbe, ResourceReport};

/// The active model: which tier loaded, at what precision, and the
/// trail of tier failures accumulated on the way down the chain.
#[derive(Clone)]
pub struct ModelHandle {
    pub tier: ModelTier,
    pub precision: Precision,
    pub model: Arc<dyn VideoModel>,
    pub fallback_trail: Vec<TierFailure>,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("tier", &self.tier)
            .field("precision", &self.precision)
            .field("fallback_trail", &self.fallback_trail)
            .finish_non_exhaustive()
    }
}

/// Produces a ready-to-use model by walking the tier chain in priority
/// order. The first successful tier is cached and reused for every
/// subsequent job; resources are probed once per load decision, not
/// per job.
pub struct ModelLoader {
    backend: Arc<dyn ModelBackend>,
    probe: Arc<dyn ResourceProbe>,
    // Guards against concurrent handle switches.
    active: Mutex<Option<ModelHandle>>,
}

impl ModelLoader {
    pub fn new(backend: Arc<dyn ModelBackend>, probe: Arc<dyn ResourceProbe>) -> Self {
        Self {
            backend,
            probe,
            active: Mutex::new(None),
        }
    }

    /// Returns the active handle, loading it lazily on first use.
    pub async fn acquire(&self) -> Result<ModelHandle, ModelUnavailable> {
        let mut active = self.active.lock().await;
        if let Some(handle) = active.as_ref() {
            return Ok(handle.clone());
        }
        let handle = self.load_chain().await?;
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// Drops the active handle and runs the chain again.
    pub async fn reload(&self) -> Result<ModelHandle, ModelUnavailable> {
        let mut active = self.active.lock().await;
        *active = None;
        let handle = self.load_chain().await?;
        *active = Some(handle.clone());
        Ok(handle)
    }

    async fn load_chain(&self) -> Result<ModelHandle, ModelUnavailable> {
        let report = self.probe.probe();
        info!(
            "probing resources: accelerator={} memory={:?}",
            report.accelerator_present, report.memory_bytes
        );

        let mut attempts = Vec::new();
        for tier in ModelTier::chain() {
            let Some(precision) = plan(tier, &report) else {
                // Precondition check, not a failure: the tier cannot
                // run on this host at all, so it is never attempted.
                debug!("skipping {}: requires an accelerator", tier.id());
                continue;
            };

            info!("loading {} at {} precision", tier.id(), precision.label());
            match self.backend.load(tier, precision, &report).await {
                Ok(model) => {
                    info!("active model: {} ({})", tier.id(), precision.label());
                    return Ok(ModelHandle {
                        tier,
                        precision,
                        model,
                        fallback_trail: attempts,
                    });
                }
                Err(e) => {
                    warn!("{} failed to load: {e}", tier.id());
                    attempts.push(TierFailure {
                        tier,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(ModelUnavailable { attempts })
    }
}

/// Precision policy for one tier given the probed resources, or `None`
/// when the tier must be skipped without an attempt.
///
/// An accelerator with unknown memory is treated as insufficient for
/// on-accelerator execution.
fn plan(tier: ModelTier, report: &ResourceReport) -> Option<Precision> {
    if report.accelerator_present {
        if let Some(memory) = report.memory_bytes {
            if memory >= tier.full_precision_bytes() {
                return Some(Precision::Full);
            }
            if memory >= tier.quantized_bytes() {
                return Some(Precision::FourBit);
            }
        }
    }
    tier.supports_cpu().then_some(Precision::CpuFallback)
}
