//! Legacy IBM adapter.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use nlg_core::papers::g14_paper;
use nlg_core::{
    Adapter, CircuitData, CircuitResult, Counts, Device, Experiment, IngestRecord, IngestResult,
    NonlocalGame, QuestionKind, QuestionTally, RawHistogram, RelPath, Winrate, run_blocking,
};
use tracing::{debug, info};

use crate::error::LegacyError;
use crate::records::{
    ProcessedRow, RawRow, counts_by_question, group_by_job, parse_time, read_csv,
};

/// Export folder, relative to the data folder.
pub const DATA_DIR: &str = "raw_data/ibm_2023";
const PROCESSED_CSV: &str = "ibm_processed.csv";
const RAW_CSV: &str = "ibm_results.csv";

const STRATEGY: &str = "4q";
const QASM_PATH: &str = "games/g14/circuits/4q";

/// Reads the per-question summary and raw counts of the 2023 IBM runs.
///
/// Every job in the summary becomes one experiment. No runs are filtered.
pub struct IbmLegacyAdapter {
    game: NonlocalGame,
    data_folder: PathBuf,
}

impl IbmLegacyAdapter {
    pub fn new(game: NonlocalGame, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            game,
            data_folder: data_folder.into(),
        }
    }

    fn build_job(
        &self,
        job: &str,
        rows: &[ProcessedRow],
        raw_counts: &BTreeMap<(u32, u32), Counts>,
    ) -> IngestResult<IngestRecord> {
        let first = rows
            .first()
            .ok_or_else(|| LegacyError::EmptyJob(job.to_string()))?;

        let shots = first.shots;
        let date = parse_time(job, &first.time)?;
        let name = first
            .backend
            .split_once('_')
            .map_or(first.backend.as_str(), |(_, rest)| rest);

        let winrates: Vec<f64> = rows.iter().map(|r| r.q_winrate).collect();
        let tally: QuestionTally = rows
            .iter()
            .map(|r| (QuestionKind::of(r.va, r.vb), r.q_winrate))
            .collect();

        let histogram: RawHistogram = rows
            .iter()
            .map(|r| {
                let counts = raw_counts.get(&(r.va, r.vb)).cloned().unwrap_or_default();
                CircuitResult::new(r.va, r.vb, r.q_winrate).with_counts(counts)
            })
            .collect();

        let circuit_data = CircuitData {
            strategy: STRATEGY.to_string(),
            shots,
            num_circuits: rows.len(),
            qasm_path: RelPath::new(QASM_PATH),
            result_path: RelPath::new(format!("{DATA_DIR}/{RAW_CSV}")),
        };

        let win_rate = Winrate::from_circuit_winrates(&self.game, &winrates, shots)?;
        let mut experiment = Experiment::new(
            &self.game,
            date,
            Device::superconducting("ibm", name),
            win_rate,
            circuit_data,
        )
        .with_publication(g14_paper())
        .with_attribute("job_id", job);

        for (key, mean) in tally.attributes() {
            experiment.set_attribute(key, mean);
        }

        debug!(job, backend = %first.backend, circuits = rows.len(), "Parsed legacy IBM job");
        Ok((experiment, Some(histogram)))
    }
}

#[async_trait]
impl Adapter for IbmLegacyAdapter {
    fn name(&self) -> &str {
        "ibm-legacy"
    }

    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>> {
        let dir = self.data_folder.join(DATA_DIR);
        let processed_path = dir.join(PROCESSED_CSV);
        let raw_path = dir.join(RAW_CSV);

        let (processed, raw) = futures::try_join!(
            run_blocking(move || Ok(read_csv::<ProcessedRow>(&processed_path)?)),
            run_blocking(move || Ok(read_csv::<RawRow>(&raw_path)?)),
        )?;

        let raw_counts = counts_by_question(raw);
        let records = group_by_job(processed)
            .iter()
            .map(|(job, rows)| self.build_job(job, rows, &raw_counts))
            .collect::<IngestResult<Vec<_>>>()?;

        info!(adapter = self.name(), experiments = records.len(), "Ingested legacy IBM data");
        Ok(records)
    }
}
