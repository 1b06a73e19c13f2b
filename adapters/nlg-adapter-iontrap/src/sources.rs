//! The four trapped-ion data sources.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use nlg_core::outcome::{decode_bitstring, decode_packed, diagonal_outcomes, parse_binary};
use nlg_core::{
    CircuitData, CircuitResult, Counts, Device, Experiment, IngestError, IngestRecord,
    IngestResult, NonlocalGame, QuestionKind, QuestionTally, RawHistogram, RelPath, Winrate,
};
use serde::Deserialize;

use crate::error::{IonTrapError, IonTrapResult};
use crate::literal::parse_probability_list;
use crate::mapping::CircuitMapping;

/// Root of the collaboration data, relative to the data folder.
pub const COLLAB_FOLDER: &str = "raw_data/duke_collab";
/// Circuit folder, relative to the data folder.
pub const CIRCUITS: &str = "raw_data/duke_collab/circuits";

const STRATEGY: &str = "bell_pair";
/// Two bits per player.
const OUTCOME_BITS: u32 = 4;

/// A trapped-ion data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Duke "silver" trap: per-circuit win rates, no counts.
    Silver,
    /// Duke "gold" trap: bitstring probabilities per circuit.
    Gold,
    /// Duke "blue" trap: packed-index probabilities per circuit.
    Blue,
    /// IonQ Aria: per-circuit win rates, no counts.
    IonQ,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Silver, Source::Gold, Source::Blue, Source::IonQ];

    /// File name inside [`COLLAB_FOLDER`].
    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Silver => "silver_unmitigated.csv",
            Source::Gold => "Gold data.json",
            Source::Blue => "Blue data.txt",
            Source::IonQ => "ionq_winrates.json",
        }
    }

    pub fn device(&self) -> Device {
        match self {
            Source::Silver => Device::trapped_ion("duke", "silver"),
            Source::Gold => Device::trapped_ion("duke", "gold"),
            Source::Blue => Device::trapped_ion("duke", "blue"),
            Source::IonQ => Device::trapped_ion("ionq", "aria"),
        }
    }

    /// Execution day. The exports carry no timestamps.
    fn date(&self) -> (i32, u32, u32) {
        match self {
            Source::Silver => (2024, 7, 18),
            Source::Gold => (2024, 11, 18),
            Source::Blue => (2024, 10, 9),
            Source::IonQ => (2024, 11, 4),
        }
    }

    /// Fixed shot count, if the export does not record one.
    fn shots(&self) -> Option<u64> {
        match self {
            Source::Gold | Source::Blue => Some(2000),
            Source::IonQ => Some(20000),
            Source::Silver => None,
        }
    }

    /// Parse the source into an experiment and, when counts exist, its
    /// histogram.
    pub fn load(
        &self,
        game: &NonlocalGame,
        data_folder: &Path,
        mapping: &CircuitMapping,
    ) -> IngestResult<IngestRecord> {
        let path = data_folder.join(COLLAB_FOLDER).join(self.file_name());
        let text = read(&path)?;

        let run = match self {
            Source::Silver => self.parse_silver(&text)?,
            Source::Gold => self.parse_gold(&text, mapping)?,
            Source::Blue => self.parse_blue(&text, mapping)?,
            Source::IonQ => self.parse_ionq(&text, mapping)?,
        };

        tracing::debug!(
            device = %self.device().name,
            circuits = run.winrates.len(),
            has_counts = run.histogram.is_some(),
            "Parsed trapped-ion source"
        );

        let experiment = self.experiment(game, &run)?;
        Ok((experiment, run.histogram))
    }

    fn experiment(&self, game: &NonlocalGame, run: &ParsedRun) -> IngestResult<Experiment> {
        let (y, m, d) = self.date();
        let date: DateTime<Utc> = Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .ok_or_else(|| IngestError::Validation(format!("invalid date {y}-{m}-{d}")))?;

        let circuit_data = CircuitData {
            strategy: STRATEGY.to_string(),
            shots: run.shots,
            num_circuits: run.winrates.len(),
            qasm_path: RelPath::new(CIRCUITS),
            result_path: RelPath::new(format!("{COLLAB_FOLDER}/{}", self.file_name())),
        };

        let win_rate = Winrate::from_circuit_winrates(game, &run.winrates, run.shots)?;
        let mut experiment = Experiment::new(game, date, self.device(), win_rate, circuit_data);
        for (key, mean) in run.tally.attributes() {
            experiment.set_attribute(key, mean);
        }
        Ok(experiment)
    }

    fn fixed_shots(&self) -> IonTrapResult<u64> {
        self.shots().ok_or_else(|| self.invalid("no shot count recorded"))
    }

    fn invalid(&self, message: impl Into<String>) -> IonTrapError {
        IonTrapError::Invalid {
            file: self.file_name().to_string(),
            message: message.into(),
        }
    }

    fn parse_blue(&self, text: &str, mapping: &CircuitMapping) -> IonTrapResult<ParsedRun> {
        let shots = self.fixed_shots()?;
        let file = self.file_name();
        let data = parse_probability_list(text).map_err(|source| IonTrapError::Literal {
            file: file.to_string(),
            source,
        })?;
        let diagonal = diagonal_outcomes(OUTCOME_BITS);

        let mut run = ParsedRun::new(shots, true);
        for (idx, probs) in data.iter().enumerate() {
            let index = u32::try_from(idx).map_err(|_| self.invalid("too many circuits"))?;
            let ((va, vb), kind) = mapping.lookup(file, index)?;

            let mass: f64 = diagonal
                .iter()
                .filter_map(|x| probs.get(&(*x as u32)))
                .sum();

            let mut counts = Counts::new();
            for (x, p) in probs {
                counts.insert(decode_packed(*x), self.count(shots, *p)?);
            }

            run.push(va, vb, kind, kind.score(mass), Some(counts));
        }
        Ok(run)
    }

    fn parse_gold(&self, text: &str, mapping: &CircuitMapping) -> IonTrapResult<ParsedRun> {
        let shots = self.fixed_shots()?;
        let file = self.file_name();
        let data: BTreeMap<String, BTreeMap<String, f64>> = parse_json(file, text)?;
        let diagonal = diagonal_outcomes(OUTCOME_BITS);

        let mut run = ParsedRun::new(shots, true);
        for (index, probs) in self.by_index(data)? {
            let ((va, vb), kind) = mapping.lookup(file, index)?;

            let mut counts = Counts::new();
            let mut mass = 0.0;
            for (bitstring, p) in &probs {
                let outcome = decode_bitstring(bitstring).map_err(|e| self.invalid(e.to_string()))?;
                counts.insert(outcome, self.count(shots, *p)?);

                let x = parse_binary(bitstring).map_err(|e| self.invalid(e.to_string()))?;
                if diagonal.contains(&(x as usize)) {
                    mass += p;
                }
            }

            run.push(va, vb, kind, kind.score(mass), Some(counts));
        }
        Ok(run)
    }

    fn parse_silver(&self, text: &str) -> IonTrapResult<ParsedRun> {
        #[derive(Deserialize)]
        struct Row {
            va: u32,
            vb: u32,
            shots: u64,
            win_rate: f64,
        }

        let csv_err = |source: csv::Error| IonTrapError::Csv {
            file: self.file_name().to_string(),
            source,
        };

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let rows = reader
            .deserialize::<Row>()
            .collect::<Result<Vec<_>, csv::Error>>()
            .map_err(csv_err)?;

        let shots = rows.first().ok_or_else(|| self.invalid("no rows"))?.shots;
        let mut run = ParsedRun::new(shots, false);
        for row in rows {
            run.push(row.va, row.vb, QuestionKind::of(row.va, row.vb), row.win_rate, None);
        }
        Ok(run)
    }

    fn parse_ionq(&self, text: &str, mapping: &CircuitMapping) -> IonTrapResult<ParsedRun> {
        let shots = self.fixed_shots()?;
        let file = self.file_name();
        let data: BTreeMap<String, f64> = parse_json(file, text)?;

        let mut run = ParsedRun::new(shots, false);
        for (index, win_rate) in self.by_index(data)? {
            let ((va, vb), kind) = mapping.lookup(file, index)?;
            run.push(va, vb, kind, win_rate, None);
        }
        Ok(run)
    }

    /// Re-key a JSON object by numeric circuit index, in index order.
    fn by_index<V>(&self, data: BTreeMap<String, V>) -> IonTrapResult<Vec<(u32, V)>> {
        let mut items = data
            .into_iter()
            .map(|(k, v)| {
                k.trim()
                    .parse::<u32>()
                    .map(|i| (i, v))
                    .map_err(|_| self.invalid(format!("invalid circuit index '{k}'")))
            })
            .collect::<IonTrapResult<Vec<_>>>()?;
        items.sort_by_key(|(i, _)| *i);
        Ok(items)
    }

    /// `round(shots · p)`, ties to even.
    fn count(&self, shots: u64, p: f64) -> IonTrapResult<u64> {
        if !p.is_finite() || p < 0.0 {
            return Err(self.invalid(format!("invalid probability {p}")));
        }
        Ok((shots as f64 * p).round_ties_even() as u64)
    }
}

/// Circuit win rates of one source, before statistics.
struct ParsedRun {
    shots: u64,
    winrates: Vec<f64>,
    tally: QuestionTally,
    histogram: Option<RawHistogram>,
}

impl ParsedRun {
    fn new(shots: u64, with_counts: bool) -> Self {
        Self {
            shots,
            winrates: Vec::new(),
            tally: QuestionTally::new(),
            histogram: with_counts.then(RawHistogram::new),
        }
    }

    fn push(&mut self, va: u32, vb: u32, kind: QuestionKind, win_rate: f64, counts: Option<Counts>) {
        self.winrates.push(win_rate);
        self.tally.add(kind, win_rate);
        if let (Some(histogram), Some(counts)) = (self.histogram.as_mut(), counts) {
            histogram.push(CircuitResult::new(va, vb, win_rate).with_counts(counts));
        }
    }
}

fn read(path: &Path) -> IonTrapResult<String> {
    std::fs::read_to_string(path).map_err(|source| IonTrapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(file: &str, text: &str) -> IonTrapResult<T> {
    serde_json::from_str(text).map_err(|source| IonTrapError::Json {
        file: file.to_string(),
        source,
    })
}
