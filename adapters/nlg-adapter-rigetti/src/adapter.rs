//! Rigetti adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use nlg_core::papers::g14_paper;
use nlg_core::{
    Adapter, AttributeValue, CircuitData, CircuitResult, Device, Experiment, IngestRecord,
    IngestResult, NonlocalGame, Object, QuestionKind, QuestionTally, RawHistogram, RelPath,
    Winrate, circuit_cutoff, run_blocking,
};
use tracing::{debug, info};

use crate::error::{RigettiError, RigettiResult};
use crate::table::{Table, parse_count, parse_date, win_rates_by_key};

/// Export folder, relative to the data folder.
pub const DATA_DIR: &str = "raw_data/rigetti_2024";

/// Runs on simulators carry this marker in the backend name.
const SIMULATOR_MARKER: &str = "qvm";

/// A strategy and where its files live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyLayout {
    pub strategy: &'static str,
    /// Folder under the data root.
    pub folder: &'static str,
    /// Prefix of the CSV file names.
    pub prefix: &'static str,
}

pub const STRATEGIES: [StrategyLayout; 2] = [
    StrategyLayout {
        strategy: "4q",
        folder: "g14_original",
        prefix: "g14",
    },
    StrategyLayout {
        strategy: "bell_pair",
        folder: "bell_pair",
        prefix: "bell_pair",
    },
];

/// Reads the paired CSV exports of every Ankaa backend folder.
///
/// Each `dataID` is one run. Simulator runs and runs dated before the
/// cutoff are skipped.
pub struct RigettiAdapter {
    game: NonlocalGame,
    data_folder: PathBuf,
}

impl RigettiAdapter {
    pub fn new(game: NonlocalGame, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            game,
            data_folder: data_folder.into(),
        }
    }

    /// Backend folders (`ankaa*`) of every strategy, sorted.
    fn backend_folders(&self) -> RigettiResult<Vec<(StrategyLayout, PathBuf)>> {
        let mut units = Vec::new();
        for layout in STRATEGIES {
            let folder = self.data_folder.join(DATA_DIR).join(layout.folder);
            let entries = match std::fs::read_dir(&folder) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %folder.display(), "No Rigetti data for strategy");
                    continue;
                }
                Err(source) => return Err(RigettiError::Io { path: folder, source }),
            };

            let mut backends = Vec::new();
            for entry in entries {
                let path = entry
                    .map_err(|source| RigettiError::Io {
                        path: folder.clone(),
                        source,
                    })?
                    .path();
                let is_ankaa = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("ankaa"));
                if is_ankaa && path.is_dir() {
                    backends.push(path);
                }
            }
            backends.sort();
            units.extend(backends.into_iter().map(|b| (layout, b)));
        }
        Ok(units)
    }
}

/// Parse every run of one backend folder.
fn load_backend(
    game: &NonlocalGame,
    data_folder: &Path,
    layout: StrategyLayout,
    backend_folder: &Path,
) -> IngestResult<Vec<IngestRecord>> {
    let counts_path = backend_folder.join(format!("{}_raw_counts.csv", layout.prefix));
    let win_rate_path = backend_folder.join(format!("{}_win_rate.csv", layout.prefix));
    let roem_path = backend_folder.join(format!("{}_win_rate_roem.csv", layout.prefix));

    let counts = Table::read(&counts_path)?;
    let win_rates = win_rates_by_key(&Table::read(&win_rate_path)?)?;

    let mut records = Vec::new();
    for (data_id, rows) in counts.group_by("dataID")? {
        let first = rows[0];
        let backend = counts.cell(first, counts.column("backend")?).to_string();
        if backend.contains(SIMULATOR_MARKER) {
            debug!(data_id = %data_id, backend = %backend, "Skipping simulator run");
            continue;
        }

        let date = counts.parse(first, "time", parse_date)?;
        if date < circuit_cutoff() {
            debug!(data_id = %data_id, %date, "Skipping run before cutoff");
            continue;
        }
        let shots = counts.parse(first, "shots", parse_count)?;

        let mut winrates = Vec::with_capacity(rows.len());
        let mut tally = QuestionTally::new();
        let mut histogram = RawHistogram::new();
        for &row in &rows {
            let win_rate = *win_rates
                .get(&counts.key(row)?)
                .ok_or_else(|| RigettiError::MissingWinRate {
                    file: counts.file().to_string(),
                    row,
                })?;
            let va = counts.parse(row, "va", |v| v.parse::<u32>().ok())?;
            let vb = counts.parse(row, "vb", |v| v.parse::<u32>().ok())?;
            let kind = counts.parse(row, "question", |v| QuestionKind::parse(v).ok())?;

            winrates.push(win_rate);
            tally.add(kind, win_rate);
            histogram.push(CircuitResult::new(va, vb, win_rate).with_counts(counts.counts(row)?));
        }

        let circuit_data = CircuitData {
            strategy: layout.strategy.to_string(),
            shots,
            num_circuits: rows.len(),
            qasm_path: RelPath::new(""),
            result_path: RelPath::relative_to(&counts_path, data_folder),
        };

        let cell = |column: &str| -> RigettiResult<AttributeValue> {
            Ok(AttributeValue::from_cell(counts.cell(first, counts.column(column)?)))
        };
        let mut experiment = Experiment::new(
            game,
            date,
            Device::superconducting("rigetti", backend.as_str()),
            Winrate::from_circuit_winrates(game, &winrates, shots)?,
            circuit_data,
        )
        .with_publication(g14_paper())
        .with_attribute("shots", shots)
        .with_attribute("dataID", AttributeValue::from_cell(&data_id))
        .with_attribute("layout", cell("qubits_used")?)
        .with_attribute("wiring", cell("wiring")?)
        .with_object(Object::new(
            "winrate_roem",
            "SPAM-mitigated win rates of the circuits",
            RelPath::relative_to(&roem_path, data_folder),
        ));
        for (key, mean) in tally.attributes() {
            experiment.set_attribute(key, mean);
        }

        records.push((experiment, Some(histogram)));
    }

    debug!(
        folder = %backend_folder.display(),
        strategy = layout.strategy,
        runs = records.len(),
        "Parsed Rigetti backend folder"
    );
    Ok(records)
}

#[async_trait]
impl Adapter for RigettiAdapter {
    fn name(&self) -> &str {
        "rigetti"
    }

    async fn ingest(&self) -> IngestResult<Vec<IngestRecord>> {
        let units = self.backend_folders()?;

        let tasks = units.into_iter().map(|(layout, backend_folder)| {
            let game = self.game.clone();
            let data_folder = self.data_folder.clone();
            run_blocking(move || load_backend(&game, &data_folder, layout, &backend_folder))
        });

        let records: Vec<IngestRecord> = try_join_all(tasks).await?.into_iter().flatten().collect();
        info!(adapter = self.name(), experiments = records.len(), "Ingested Rigetti data");
        Ok(records)
    }
}
