//! Error taxonomy for the orchestration engine.
//!
//! Validation and queue-capacity errors are returned synchronously at
//! submission; everything else is recorded on the job and read back
//! through the status interface.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::model_types::ModelTier;

/// Submission rejected before admission. Lists every violated
/// constraint, not just the first, so callers can present complete
/// feedback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid submission: {}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

/// Synchronous rejection at submission time.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("queue is full (capacity {capacity}); try again later")]
    QueueFull { capacity: usize },
}

/// A single tier's failure to load, as reported by the backend.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

/// One attempted-and-failed tier in the fallback chain.
#[derive(Debug, Clone)]
pub struct TierFailure {
    pub tier: ModelTier,
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier.id(), self.reason)
    }
}

/// Terminal loader failure: every eligible tier was attempted without
/// success. Carries one failure reason per attempted tier; tiers
/// skipped by a precondition check do not appear.
#[derive(Debug, Clone, Error)]
pub struct ModelUnavailable {
    pub attempts: Vec<TierFailure>,
}

impl fmt::Display for ModelUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no model tier could be loaded ({} attempted)",
            self.attempts.len()
        )
    }
}

impl ModelUnavailable {
    /// One line per attempted tier, for diagnostic output.
    pub fn detail(&self) -> String {
        self.attempts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Failure classes a model invocation can report.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("out of accelerator memory: {0}")]
    OutOfMemory(String),
    #[error("{0}")]
    Failed(String),
}

/// Terminal error kinds recorded on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ResourceExhausted,
    GenerationError,
    Timeout,
    ModelUnavailable,
}

/// Janitor failure. Never fails the job that triggered cleanup; logged
/// and deferred instead.
#[derive(Debug, Error)]
#[error("storage error on {path}: {source}")]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
