//! Engine configuration from environment-style knobs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::validate::ValidationLimits;

/// Runtime configuration for the engine.
///
/// Defaults match the knobs the service has always shipped with; every
/// field can be overridden through the environment (see
/// [`EngineConfig::from_env`]).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Expose internal diagnostics through the status interface.
    pub debug_mode: bool,
    /// Where finished artifacts land, keyed by job id.
    pub output_dir: PathBuf,
    /// Scratch space for per-job working files.
    pub temp_dir: PathBuf,
    /// Queue capacity: pending + in-flight jobs.
    pub max_queue_size: usize,
    /// Janitor age threshold for output files.
    pub max_file_age_days: u32,
    /// Janitor count threshold for output files.
    pub max_files: usize,
    /// Wall-clock bound on one generation.
    pub generation_timeout: Duration,
    /// Minimum salvageable duration for a partial artifact.
    pub min_salvage_secs: f32,
    /// How long terminal jobs stay queryable before eviction.
    pub job_retention: Duration,
    /// Worker poll interval when the queue is empty.
    pub worker_poll: Duration,
    /// Bounds the validator enforces on submissions.
    pub limits: ValidationLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            output_dir: PathBuf::from("./outputs"),
            temp_dir: PathBuf::from("./temp"),
            max_queue_size: 50,
            max_file_age_days: 7,
            max_files: 50,
            generation_timeout: Duration::from_secs(600),
            min_salvage_secs: 1.0,
            job_retention: Duration::from_secs(3600),
            worker_poll: Duration::from_millis(100),
            limits: ValidationLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the environment, falling back to the
    /// defaults above. A `.env` file is honored when present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let d = Self::default();
        Ok(Self {
            debug_mode: env_bool("DEBUG_MODE", d.debug_mode)?,
            output_dir: env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(d.output_dir),
            temp_dir: env::var("TEMP_DIR").map(PathBuf::from).unwrap_or(d.temp_dir),
            max_queue_size: env_parse("MAX_QUEUE_SIZE", d.max_queue_size)?,
            max_file_age_days: env_parse("MAX_FILE_AGE_DAYS", d.max_file_age_days)?,
            max_files: env_parse("MAX_FILES", d.max_files)?,
            generation_timeout: Duration::from_secs(env_parse(
                "GENERATION_TIMEOUT_SECS",
                d.generation_timeout.as_secs(),
            )?),
            min_salvage_secs: env_parse("MIN_SALVAGE_SECS", d.min_salvage_secs)?,
            job_retention: Duration::from_secs(env_parse(
                "JOB_RETENTION_SECS",
                d.job_retention.as_secs(),
            )?),
            worker_poll: Duration::from_millis(env_parse(
                "WORKER_POLL_MS",
                d.worker_poll.as_millis() as u64,
            )?),
            limits: d.limits,
        })
    }
}

fn env_bool(key: &str, default: bool) -> anyhow::Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => anyhow::bail!("invalid value for {key}: {raw:?}"),
        },
        Err(_) => Ok(default),
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
