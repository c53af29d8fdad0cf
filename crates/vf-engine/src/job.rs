//! Job state owned by the queue.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vf_core::error::ErrorKind;
use vf_core::params::ValidatedParams;

/// Generator-assigned unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// Error recorded on a failed job. `detail` carries internal
/// diagnostics and is exposed through the status interface only in
/// debug mode.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub params: ValidatedParams,
    pub status: JobStatus,
    pub progress: f32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output_path: Option<PathBuf>,
    /// Duration of the artifact actually produced; shorter than the
    /// requested duration when `partial` is set.
    pub output_duration_secs: Option<f32>,
    pub partial: bool,
    pub note: Option<String>,
    pub error: Option<ErrorRecord>,
    pub cancel: CancellationToken,
}

impl Job {
    pub fn new(params: ValidatedParams) -> Self {
        Self {
            id: JobId::new(),
            params,
            status: JobStatus::Pending,
            progress: 0.0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            output_path: None,
            output_duration_secs: None,
            partial: false,
            note: None,
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Status-interface view of the job. Internal error detail is
    /// stripped unless `debug_mode` is set.
    pub fn report(&self, debug_mode: bool) -> StatusReport {
        StatusReport {
            id: self.id,
            status: self.status,
            progress: self.progress,
            output_path: self
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
            duration_secs: self.output_duration_secs,
            partial: self.partial,
            note: self.note.clone(),
            error: self.error.as_ref().map(|e| ErrorRecord {
                kind: e.kind,
                summary: e.summary.clone(),
                detail: if debug_mode { e.detail.clone() } else { None },
            }),
        }
    }
}

/// What the status interface returns for one job.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[cfg(test)]
mod tests {
    use vf_core::params::Resolution;

    use super::*;

    fn params() -> ValidatedParams {
        ValidatedParams {
            prompt: "a sunset".into(),
            duration_secs: 5.0,
            fps: 24,
            resolution: Resolution::R512,
            scene_count: 1,
            add_music: false,
        }
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(params());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.status.is_active());
        assert!(!job.cancel.is_cancelled());
    }

    #[test]
    fn test_report_gates_error_detail_on_debug_mode() {
        let mut job = Job::new(params());
        job.status = JobStatus::Failed;
        job.error = Some(ErrorRecord {
            kind: ErrorKind::GenerationError,
            summary: "generation failed".into(),
            detail: Some("tier open-sora: CUDA error 700".into()),
        });

        let public = job.report(false);
        assert_eq!(public.error.as_ref().unwrap().detail, None);

        let debug = job.report(true);
        assert!(debug.error.unwrap().detail.unwrap().contains("CUDA"));
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&JobStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
    }
}
