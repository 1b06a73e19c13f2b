//! Discovery of submitted batches.
//!
//! Every batch lives in its own folder holding `metadata.json`, an optional
//! `status.txt` cache and, once downloaded, `raw.zip`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use nlg_core::{IngestResult, circuit_cutoff};
use serde::Deserialize;
use tracing::debug;

use crate::error::IbmError;
use crate::job_service::{JobService, JobStatus};

const METADATA_FILE: &str = "metadata.json";
const STATUS_FILE: &str = "status.txt";
const ARCHIVE_FILE: &str = "raw.zip";

#[derive(Debug, Deserialize)]
struct Metadata {
    /// Nanoseconds since the epoch.
    submitted: i64,
    circuits: Vec<String>,
    backend: String,
    job_id: Vec<String>,
    experiment_id: String,
}

/// One submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub id: String,
    pub backend: String,
    /// Combined status of every job; the first non-terminal one while any
    /// job is still running.
    pub status: JobStatus,
    pub submitted: DateTime<Utc>,
    /// Whether `raw.zip` is present.
    pub downloaded: bool,
    pub jobs: Vec<String>,
    pub strategies: BTreeSet<String>,
    pub folder: PathBuf,
}

impl BatchEntry {
    pub fn archive(&self) -> PathBuf {
        self.folder.join(ARCHIVE_FILE)
    }

    /// Finished successfully, downloaded, and submitted on or after the
    /// cutoff.
    pub fn is_ingestible(&self) -> bool {
        self.status.is_success() && self.downloaded && self.submitted >= circuit_cutoff()
    }
}

/// Strategies are the second dotted component of `game.*` circuit names.
fn strategies(circuits: &[String]) -> BTreeSet<String> {
    circuits
        .iter()
        .filter(|name| name.starts_with("game"))
        .filter_map(|name| name.split('.').nth(1))
        .map(str::to_string)
        .collect()
}

/// One status for a set of job statuses: the first non-terminal status if
/// any, otherwise `DONE` only when every job is done.
fn combine(statuses: Vec<JobStatus>) -> JobStatus {
    if let Some(pending) = statuses.iter().find(|s| !s.is_terminal()) {
        return pending.clone();
    }
    statuses
        .into_iter()
        .find(|s| !s.is_success())
        .unwrap_or(JobStatus::Done)
}

async fn read_metadata(path: &Path) -> IngestResult<Metadata> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IbmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let metadata = serde_json::from_str(&text).map_err(|source| IbmError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(metadata)
}

/// Resolve the status of a batch, consulting the cache first and caching
/// terminal results.
async fn batch_status(
    folder: &Path,
    jobs: &[String],
    service: &dyn JobService,
) -> IngestResult<JobStatus> {
    let cache_file = folder.join(STATUS_FILE);
    match tokio::fs::read_to_string(&cache_file).await {
        Ok(cached) => {
            let Ok(status) = cached.parse::<JobStatus>();
            return Ok(status);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(IbmError::Io {
                path: cache_file,
                source,
            }
            .into());
        }
    }

    let statuses = try_join_all(jobs.iter().map(|job| service.job(job)))
        .await?
        .into_iter()
        .map(|info| info.status)
        .collect();
    let status = combine(statuses);

    if status.is_terminal() {
        tokio::fs::write(&cache_file, status.as_str())
            .await
            .map_err(|source| IbmError::Io {
                path: cache_file.clone(),
                source,
            })?;
        debug!(path = %cache_file.display(), %status, "Cached batch status");
    }
    Ok(status)
}

/// Read one batch folder. `None` for a skipped simulator batch.
async fn load_entry(
    folder: PathBuf,
    service: &dyn JobService,
    real_only: bool,
) -> IngestResult<Option<BatchEntry>> {
    let metadata = read_metadata(&folder.join(METADATA_FILE)).await?;

    let status = if metadata.backend.contains("fake") {
        if real_only {
            debug!(batch = %metadata.experiment_id, backend = %metadata.backend, "Skipping simulator batch");
            return Ok(None);
        }
        JobStatus::Done
    } else {
        batch_status(&folder, &metadata.job_id, service).await?
    };

    let archive = folder.join(ARCHIVE_FILE);
    let downloaded = tokio::fs::try_exists(&archive)
        .await
        .map_err(|source| IbmError::Io {
            path: archive,
            source,
        })?;

    Ok(Some(BatchEntry {
        id: metadata.experiment_id,
        backend: metadata.backend,
        status,
        submitted: DateTime::from_timestamp_nanos(metadata.submitted),
        downloaded,
        jobs: metadata.job_id,
        strategies: strategies(&metadata.circuits),
        folder,
    }))
}

/// Scan `data_dir` for batches, sorted by submission time.
///
/// Batches are read concurrently, and so are the status lookups of their
/// jobs.
///
/// With `real_only`, batches on simulator (`fake*`) backends are left out.
pub async fn discover(
    data_dir: &Path,
    service: &dyn JobService,
    real_only: bool,
) -> IngestResult<Vec<BatchEntry>> {
    let mut folders = Vec::new();
    let mut entries = tokio::fs::read_dir(data_dir)
        .await
        .map_err(|source| IbmError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
    while let Some(entry) = entries.next_entry().await.map_err(|source| IbmError::Io {
        path: data_dir.to_path_buf(),
        source,
    })? {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            folders.push(entry.path());
        }
    }
    folders.sort();

    let mut batches: Vec<BatchEntry> = try_join_all(
        folders
            .into_iter()
            .map(|folder| load_entry(folder, service, real_only)),
    )
    .await?
    .into_iter()
    .flatten()
    .collect();

    batches.sort_by_key(|b| b.submitted);
    Ok(batches)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::job_service::{JobInfo, StaticJobService};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::{Duration, Instant};

    /// Answers like the wrapped service after a fixed delay.
    pub(crate) struct SlowJobService {
        pub(crate) inner: StaticJobService,
        pub(crate) delay: Duration,
    }

    #[async_trait]
    impl JobService for SlowJobService {
        async fn job(&self, job_id: &str) -> IngestResult<JobInfo> {
            tokio::time::sleep(self.delay).await;
            self.inner.job(job_id).await
        }
    }

    pub(crate) fn nanos(date: DateTime<Utc>) -> i64 {
        date.timestamp_nanos_opt().unwrap()
    }

    pub(crate) fn write_batch(
        data_dir: &Path,
        id: &str,
        backend: &str,
        submitted: DateTime<Utc>,
        jobs: &[&str],
    ) -> PathBuf {
        let folder = data_dir.join(id);
        std::fs::create_dir_all(&folder).unwrap();
        let metadata = json!({
            "submitted": nanos(submitted),
            "circuits": ["game.bell_pair.0_0", "game.bell_pair.0_1", "noise.mirror.bell_pair"],
            "backend": backend,
            "job_id": jobs,
            "experiment_id": id,
        });
        std::fs::write(folder.join(METADATA_FILE), metadata.to_string()).unwrap();
        folder
    }

    fn oct(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_strategies() {
        let circuits = vec![
            "game.4q.0_1".to_string(),
            "game.bell_pair.0_0".to_string(),
            "noise.mirror.4q".to_string(),
            "game".to_string(),
        ];
        let found: Vec<_> = strategies(&circuits).into_iter().collect();
        assert_eq!(found, vec!["4q", "bell_pair"]);
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(vec![JobStatus::Done, JobStatus::Done]), JobStatus::Done);
        assert_eq!(combine(vec![JobStatus::Done, JobStatus::Running]), JobStatus::Running);
        assert_eq!(combine(vec![JobStatus::Done, JobStatus::Error]), JobStatus::Error);
    }

    #[tokio::test]
    async fn test_discover_sorts_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let late = write_batch(dir.path(), "b-late", "ibm_sherbrooke", oct(5), &["job-2"]);
        write_batch(dir.path(), "a-early", "ibm_sherbrooke", oct(1), &["job-1"]);
        write_batch(dir.path(), "sim", "fake_sherbrooke", oct(2), &["job-3"]);
        write_batch(dir.path(), "pending", "ibm_kyiv", oct(3), &["job-4"]);
        std::fs::write(late.join(ARCHIVE_FILE), b"").unwrap();

        let service = StaticJobService::new()
            .with_job("job-1", JobStatus::Done, oct(1))
            .with_job("job-2", JobStatus::Done, oct(5))
            .with_job("job-4", JobStatus::Queued, oct(3));

        let batches = discover(dir.path(), &service, true).await.unwrap();
        let ids: Vec<_> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a-early", "pending", "b-late"]);

        assert_eq!(batches[1].status, JobStatus::Queued);
        assert!(!dir.path().join("pending").join(STATUS_FILE).exists());
        assert_eq!(
            std::fs::read_to_string(late.join(STATUS_FILE)).unwrap(),
            "DONE"
        );

        assert!(!batches[0].is_ingestible());
        assert!(batches[2].is_ingestible());
        assert!(batches[2].strategies.contains("bell_pair"));

        let with_sims = discover(dir.path(), &service, false).await.unwrap();
        assert_eq!(with_sims.len(), 4);
    }

    #[tokio::test]
    async fn test_cached_status_skips_the_service() {
        let dir = tempfile::tempdir().unwrap();
        let folder = write_batch(dir.path(), "cached", "ibm_sherbrooke", oct(1), &["job-1"]);
        std::fs::write(folder.join(STATUS_FILE), "CANCELLED\n").unwrap();

        let batches = discover(dir.path(), &StaticJobService::new(), true).await.unwrap();
        assert_eq!(batches[0].status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_before_cutoff_is_not_ingestible() {
        let dir = tempfile::tempdir().unwrap();
        let submitted = Utc.with_ymd_and_hms(2024, 9, 26, 23, 59, 59).unwrap();
        let folder = write_batch(dir.path(), "old", "ibm_sherbrooke", submitted, &["job-1"]);
        std::fs::write(folder.join(STATUS_FILE), "DONE").unwrap();
        std::fs::write(folder.join(ARCHIVE_FILE), b"").unwrap();

        let batches = discover(dir.path(), &StaticJobService::new(), true).await.unwrap();
        assert!(!batches[0].is_ingestible());
    }

    #[tokio::test]
    async fn test_status_lookups_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let mut inner = StaticJobService::new();
        for batch in 0..4 {
            let jobs = [format!("job-{batch}-a"), format!("job-{batch}-b")];
            let refs: Vec<&str> = jobs.iter().map(String::as_str).collect();
            write_batch(dir.path(), &format!("batch-{batch}"), "ibm_kyiv", oct(batch + 1), &refs);
            for job in jobs {
                inner = inner.with_job(job, JobStatus::Running, oct(batch + 1));
            }
        }
        let service = SlowJobService {
            inner,
            delay: Duration::from_millis(100),
        };

        let start = Instant::now();
        let batches = discover(dir.path(), &service, true).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|b| b.status == JobStatus::Running));
        // Eight lookups of 100 ms each; one round when they overlap.
        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let folder = write_batch(dir.path(), "loop", "ibm_sherbrooke", oct(1), &["job-1"]);
        std::fs::write(folder.join(STATUS_FILE), "DONE").unwrap();
        // A self-referencing link cannot be resolved.
        std::os::unix::fs::symlink(folder.join(ARCHIVE_FILE), folder.join(ARCHIVE_FILE)).unwrap();

        let err = discover(dir.path(), &StaticJobService::new(), true).await;
        assert!(matches!(err, Err(nlg_core::IngestError::Io(_))), "{err:?}");
    }

    #[tokio::test]
    async fn test_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("none"), &StaticJobService::new(), true).await;
        assert!(matches!(err, Err(nlg_core::IngestError::MissingData(_))));
    }
}
