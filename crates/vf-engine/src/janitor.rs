//! Output-directory retention and temp-path management.
//!
//! The filesystem is the source of truth: every cleanup re-scans the
//! output directory instead of trusting any in-memory bookkeeping.
//! Cleanup is best-effort and decoupled from job outcome; failures are
//! logged by the caller and never fail the job that triggered them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{info, warn};
use uuid::Uuid;

use vf_core::error::StorageError;

use crate::config::EngineConfig;
use crate::job::JobId;

/// One file in the output directory, as scanned.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStats {
    pub scanned: usize,
    pub removed: usize,
}

pub struct StorageJanitor {
    output_dir: PathBuf,
    temp_dir: PathBuf,
    max_age: Duration,
    max_files: usize,
}

impl StorageJanitor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            temp_dir: config.temp_dir.clone(),
            max_age: Duration::from_secs(u64::from(config.max_file_age_days) * 24 * 60 * 60),
            max_files: config.max_files,
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.output_dir, &self.temp_dir] {
            fs::create_dir_all(dir).map_err(|source| StorageError {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Collision-free working directory for one job: the job id plus a
    /// random suffix, so resubmissions and concurrent jobs never share
    /// a path.
    pub fn temp_workdir(&self, id: JobId) -> PathBuf {
        let suffix = Uuid::new_v4().simple().to_string();
        self.temp_dir.join(format!("{id}-{}", &suffix[..8]))
    }

    /// Final artifact path for a job.
    pub fn artifact_path(&self, id: JobId) -> PathBuf {
        self.output_dir.join(format!("{id}.mp4"))
    }

    /// Applies the retention policy: age rule first, then the count
    /// rule trims the oldest excess. Per-file deletion failures are
    /// logged and skipped.
    pub fn cleanup(&self) -> Result<CleanupStats, StorageError> {
        let records = scan(&self.output_dir)?;
        let mut stats = CleanupStats {
            scanned: records.len(),
            removed: 0,
        };

        for path in plan_cleanup(records, SystemTime::now(), self.max_age, self.max_files) {
            match fs::remove_file(&path) {
                Ok(()) => stats.removed += 1,
                Err(e) => warn!("could not remove {}: {e}", path.display()),
            }
        }

        if stats.removed > 0 {
            info!("janitor removed {} of {} output files", stats.removed, stats.scanned);
        }
        Ok(stats)
    }
}

fn scan(dir: &Path) -> Result<Vec<FileRecord>, StorageError> {
    let entries = fs::read_dir(dir).map_err(|source| StorageError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        records.push(FileRecord {
            path: entry.path(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: meta.len(),
        });
    }
    Ok(records)
}

/// Pure retention planning over scanned records: everything older than
/// `max_age` goes, then the oldest survivors beyond `max_files` go.
fn plan_cleanup(
    records: Vec<FileRecord>,
    now: SystemTime,
    max_age: Duration,
    max_files: usize,
) -> Vec<PathBuf> {
    let cutoff = now.checked_sub(max_age);

    let (expired, mut fresh): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| cutoff.is_some_and(|c| r.modified < c));

    let mut doomed: Vec<PathBuf> = expired.into_iter().map(|r| r.path).collect();

    if fresh.len() > max_files {
        fresh.sort_by_key(|r| r.modified);
        let excess = fresh.len() - max_files;
        doomed.extend(fresh.drain(..excess).map(|r| r.path));
    }
    doomed
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn record(name: &str, age: Duration, now: SystemTime) -> FileRecord {
        FileRecord {
            path: PathBuf::from(name),
            modified: now - age,
            size: 1024,
        }
    }

    #[test]
    fn test_age_rule_removes_expired_files() {
        let now = SystemTime::now();
        let records = vec![
            record("old.mp4", 8 * DAY, now),
            record("fresh.mp4", DAY, now),
        ];
        let doomed = plan_cleanup(records, now, 7 * DAY, 50);
        assert_eq!(doomed, vec![PathBuf::from("old.mp4")]);
    }

    #[test]
    fn test_count_rule_trims_oldest_excess_only() {
        // 60 files, all one day old, cap of 50: the age rule does not
        // apply and the count rule trims exactly the 10 oldest.
        let now = SystemTime::now();
        let records: Vec<_> = (0..60)
            .map(|i| record(&format!("v{i:02}.mp4"), DAY + Duration::from_secs(60 - i), now))
            .collect();
        let doomed = plan_cleanup(records, now, 7 * DAY, 50);
        assert_eq!(doomed.len(), 10);
        // v00 has the largest age offset, so v00..v09 are the oldest.
        for i in 0..10 {
            assert!(doomed.contains(&PathBuf::from(format!("v{i:02}.mp4"))));
        }
    }

    #[test]
    fn test_both_rules_compose() {
        let now = SystemTime::now();
        let mut records = vec![record("ancient.mp4", 30 * DAY, now)];
        records.extend((0..4).map(|i| record(&format!("f{i}.mp4"), Duration::from_secs(i + 1), now)));
        let doomed = plan_cleanup(records, now, 7 * DAY, 3);
        // Age removes one, count trims the oldest fresh file.
        assert_eq!(doomed.len(), 2);
        assert_eq!(doomed[0], PathBuf::from("ancient.mp4"));
        assert_eq!(doomed[1], PathBuf::from("f3.mp4"));
    }

    #[test]
    fn test_under_both_limits_removes_nothing() {
        let now = SystemTime::now();
        let records = vec![record("a.mp4", DAY, now), record("b.mp4", 2 * DAY, now)];
        assert!(plan_cleanup(records, now, 7 * DAY, 50).is_empty());
    }

    #[test]
    fn test_cleanup_applies_count_rule_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            output_dir: dir.path().join("outputs"),
            temp_dir: dir.path().join("temp"),
            max_files: 3,
            ..EngineConfig::default()
        };
        let janitor = StorageJanitor::new(&config);
        janitor.ensure_dirs().unwrap();

        for i in 0..5 {
            fs::write(config.output_dir.join(format!("{i}.mp4")), b"x").unwrap();
        }
        let stats = janitor.cleanup().unwrap();
        assert_eq!(stats.scanned, 5);
        assert_eq!(stats.removed, 2);
        assert_eq!(fs::read_dir(&config.output_dir).unwrap().count(), 3);
    }

    #[test]
    fn test_temp_workdirs_never_collide() {
        let config = EngineConfig::default();
        let janitor = StorageJanitor::new(&config);
        let id = JobId::new();
        assert_ne!(janitor.temp_workdir(id), janitor.temp_workdir(id));
    }
}
