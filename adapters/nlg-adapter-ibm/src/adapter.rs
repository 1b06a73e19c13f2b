//! IBM Quantum 2024 adapter.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use nlg_core::outcome::decode_bitstring;
use nlg_core::papers::g14_paper;
use nlg_core::{
    Adapter, CircuitData, CircuitResult, Counts, Device, Experiment, IngestError, IngestRecord,
    IngestResult, NonlocalGame, Object, RawHistogram, RelPath, Winrate, run_blocking,
};
use tracing::{debug, info};

use crate::archive::ExtractedArchive;
use crate::discovery::{BatchEntry, discover};
use crate::game_result::GameResult;
use crate::job_service::JobService;

/// Batch folders, relative to the data folder.
pub const DATA_DIR: &str = "raw_data/ibm_2024";

/// Reads the downloaded 2024 IBM batches.
///
/// A batch is ingested when all of its jobs are done, its archive has been
/// downloaded, and it was submitted on or after the cutoff. Every job in the
/// archive becomes one experiment.
pub struct IbmAdapter {
    game: NonlocalGame,
    data_folder: PathBuf,
    service: Arc<dyn JobService>,
}

impl IbmAdapter {
    pub fn new(
        game: NonlocalGame,
        data_folder: impl Into<PathBuf>,
        service: Arc<dyn JobService>,
    ) -> Self {
        Self {
            game,
            data_folder: data_folder.into(),
            service,
        }
    }

    async fn load_batch(&self, batch: &BatchEntry) -> IngestResult<Vec<IngestRecord>> {
        let archive = batch.archive();
        let scratch = batch.folder.join("raw");
        let backend = batch.backend.clone();

        let results = run_blocking(move || {
            let extracted = ExtractedArchive::extract(&archive, &scratch)?;
            let results = extracted
                .job_folders()?
                .iter()
                .map(|folder| GameResult::load_from_folder(folder, &backend))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(results)
        })
        .await?;

        let jobs = try_join_all(results.iter().map(|r| self.service.job(&r.job_id))).await?;
        let records = results
            .iter()
            .zip(jobs)
            .map(|(result, job)| self.build_record(batch, result, job.creation_date))
            .collect::<IngestResult<Vec<_>>>()?;

        debug!(batch = %batch.id, jobs = records.len(), "Loaded IBM batch");
        Ok(records)
    }

    fn build_record(
        &self,
        batch: &BatchEntry,
        result: &GameResult,
        date: chrono::DateTime<chrono::Utc>,
    ) -> IngestResult<IngestRecord> {
        let shots: BTreeSet<u64> = result
            .counts
            .values()
            .map(|counts| counts.values().sum())
            .collect();
        if shots.len() != 1 {
            return Err(IngestError::InconsistentShots {
                run: batch.id.clone(),
                shots: shots.into_iter().collect(),
            });
        }
        let shots = shots.into_iter().next().unwrap_or_default();

        let winrates = result.win_rate.winrates();
        let archive_path = RelPath::new(format!("{DATA_DIR}/{}/raw.zip", batch.id));
        let name = batch
            .backend
            .split_once('_')
            .map_or(batch.backend.as_str(), |(_, rest)| rest);

        let circuit_data = CircuitData {
            strategy: result.strategy.clone(),
            shots,
            num_circuits: winrates.len(),
            qasm_path: RelPath::new(format!("games/g14/circuits/{}", result.strategy)),
            result_path: archive_path.clone(),
        };

        let mut experiment = Experiment::new(
            &self.game,
            date,
            Device::superconducting("ibm", name),
            Winrate::from_circuit_winrates(&self.game, &winrates, shots)?,
            circuit_data,
        )
        .with_publication(g14_paper())
        .with_object(Object::new(
            "raw data",
            "Full data including memory, counts, and noise characterization",
            archive_path,
        ));
        for (key, value) in result.attributes() {
            experiment.set_attribute(key, value);
        }

        let mut histogram = RawHistogram::new();
        for (&(va, vb), bit_counts) in &result.counts {
            let counts = bit_counts
                .iter()
                .map(|(bits, n)| Ok((decode_bitstring(bits)?, *n)))
                .collect::<IngestResult<Counts>>()?;
            let win_rate = result.win_rate.get(va, vb).unwrap_or(f64::NAN);
            histogram.push(CircuitResult::new(va, vb, win_rate).with_counts(counts));
        }

        Ok((experiment, Some(histogram)))
    }
}

#[async_trait]
impl Adapter for IbmAdapter {
    fn name(&self) -> &str {
        "ibm"
    }

    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>> {
        let data_dir = self.data_folder.join(DATA_DIR);
        let batches = discover(&data_dir, self.service.as_ref(), true).await?;

        let selected: Vec<_> = batches
            .into_iter()
            .filter(|batch| {
                let keep = batch.is_ingestible();
                if !keep {
                    debug!(
                        batch = %batch.id,
                        status = %batch.status,
                        downloaded = batch.downloaded,
                        submitted = %batch.submitted,
                        "Skipping IBM batch"
                    );
                }
                keep
            })
            .collect();

        let records: Vec<IngestRecord> = try_join_all(selected.iter().map(|b| self.load_batch(b)))
            .await?
            .into_iter()
            .flatten()
            .collect();

        info!(adapter = self.name(), batches = selected.len(), experiments = records.len(), "Ingested IBM data");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::discovery::tests::{SlowJobService, write_batch};
    use crate::game_result::tests::job_files;
    use crate::job_service::{JobStatus, StaticJobService};
    use chrono::{TimeZone, Utc};
    use nlg_core::{AttributeValue, Outcome};

    fn g14() -> NonlocalGame {
        NonlocalGame::new("G14", 86.0 / 88.0, 1.0)
    }

    fn service() -> Arc<StaticJobService> {
        let date = Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap();
        Arc::new(
            StaticJobService::new()
                .with_job("job-1", JobStatus::Done, date)
                .with_job("job-2", JobStatus::Done, date),
        )
    }

    fn fixture(files: Vec<(String, String)>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join(DATA_DIR);
        let submitted = Utc.with_ymd_and_hms(2024, 10, 2, 8, 0, 0).unwrap();
        let folder = write_batch(&data_dir, "exp-1", "ibm_sherbrooke", submitted, &["job-1", "job-2"]);
        write_zip(&folder.join("raw.zip"), &files);
        dir
    }

    #[tokio::test]
    async fn test_ingest_batch() {
        let mut files = job_files("job-1", 1000);
        files.extend(job_files("job-2", 1000));
        let dir = fixture(files);

        let adapter = IbmAdapter::new(g14(), dir.path(), service());
        let records = adapter.ingest().await.unwrap();
        assert_eq!(records.len(), 2);

        let (experiment, histogram) = &records[0];
        assert_eq!(experiment.device.name, "sherbrooke");
        assert_eq!(experiment.device.kind, "superconducting");
        assert_eq!(experiment.date.to_rfc3339(), "2024-10-02T09:00:00+00:00");
        assert_eq!(experiment.circuit_data.shots, 1000);
        assert_eq!(experiment.circuit_data.num_circuits, 3);
        assert_eq!(experiment.circuit_data.strategy, "bell_pair");
        assert_eq!(experiment.circuit_data.qasm_path.as_str(), "games/g14/circuits/bell_pair");
        assert_eq!(
            experiment.circuit_data.result_path.as_str(),
            "raw_data/ibm_2024/exp-1/raw.zip"
        );
        assert_eq!(experiment.objects[0].name, "raw data");
        assert!((experiment.win_rate.value - 0.9).abs() < 1e-12);
        assert_eq!(experiment.attributes["job_id"], AttributeValue::Str("job-1".into()));
        assert!(experiment.attributes.contains_key("crosstalk"));

        let histogram = histogram.as_ref().unwrap();
        assert_eq!(histogram.len(), 3);
        let edge = &histogram.results[1];
        assert_eq!(edge.circuit, vec![0, 1]);
        assert!((edge.win_rate - 0.8).abs() < 1e-12);
        assert_eq!(edge.counts.as_ref().unwrap()[&Outcome(2, 1)], 800);

        assert!(!dir.path().join(DATA_DIR).join("exp-1").join("raw").exists());
    }

    #[tokio::test]
    async fn test_creation_dates_are_fetched_concurrently() {
        let mut files = job_files("job-1", 1000);
        files.extend(job_files("job-2", 1000));
        let dir = fixture(files);
        // Status is cached, so only the per-job date lookups hit the service.
        std::fs::write(dir.path().join(DATA_DIR).join("exp-1").join("status.txt"), "DONE").unwrap();

        let service = Arc::new(SlowJobService {
            inner: (*service()).clone(),
            delay: std::time::Duration::from_millis(200),
        });
        let adapter = IbmAdapter::new(g14(), dir.path(), service);

        let start = std::time::Instant::now();
        let records = adapter.ingest().await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(records.len(), 2);
        assert!(elapsed < std::time::Duration::from_millis(380), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_inconsistent_shots_fail_the_adapter() {
        let dir = fixture(job_files("job-1", 999));
        let adapter = IbmAdapter::new(g14(), dir.path(), service());

        let err = adapter.ingest().await.unwrap_err();
        match err {
            IngestError::InconsistentShots { run, shots } => {
                assert_eq!(run, "exp-1");
                assert_eq!(shots, vec![999, 1000]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_filtered_batches_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join(DATA_DIR);
        let submitted = Utc.with_ymd_and_hms(2024, 10, 2, 8, 0, 0).unwrap();
        // Done but never downloaded.
        write_batch(&data_dir, "exp-1", "ibm_sherbrooke", submitted, &["job-1"]);

        let adapter = IbmAdapter::new(g14(), dir.path(), service());
        assert!(adapter.ingest().await.unwrap().is_empty());
    }
}
