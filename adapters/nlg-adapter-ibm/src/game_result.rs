//! Results of one job: game circuits plus noise characterization.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use nlg_core::outcome::win_probability;
use nlg_core::{AttributeValue, QuestionKind};
use tracing::warn;

use crate::error::{IbmError, IbmResult};
use crate::files::{read_json, sorted_dirs};
use crate::noise::{Basis, BitCounts, MirrorCounts, SpamMatrix, calibration_date, parse_counts};

/// Win rate per question `(va, vb)`; vertex questions sit on the diagonal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinRateMap {
    entries: BTreeMap<(u32, u32), f64>,
}

impl WinRateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, va: u32, vb: u32, win_rate: f64) {
        self.entries.insert((va, vb), win_rate);
    }

    pub fn get(&self, va: u32, vb: u32) -> Option<f64> {
        self.entries.get(&(va, vb)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest and largest vertex id.
    fn vertex_range(&self) -> Option<(u32, u32)> {
        let vertices = self.entries.keys().flat_map(|&(a, b)| [a, b]);
        let min = vertices.clone().min()?;
        let max = vertices.max()?;
        Some((min, max))
    }

    /// Dense matrix over the contiguous vertex range, `NaN` where no
    /// question was asked. Row and column `i` belong to vertex `min + i`.
    pub fn adjacency_matrix(&self) -> Array2<f64> {
        let Some((min, max)) = self.vertex_range() else {
            return Array2::zeros((0, 0));
        };
        let n = (max - min + 1) as usize;
        let mut matrix = Array2::from_elem((n, n), f64::NAN);
        for (&(va, vb), &w) in &self.entries {
            matrix[[(va - min) as usize, (vb - min) as usize]] = w;
        }
        matrix
    }

    /// Circuit win rates in adjacency-matrix order.
    pub fn winrates(&self) -> Vec<f64> {
        self.entries.values().copied().filter(|w| !w.is_nan()).collect()
    }

    fn mean_of(&self, kind: QuestionKind) -> Option<f64> {
        let values: Vec<f64> = self
            .entries
            .iter()
            .filter(|((va, vb), w)| QuestionKind::of(*va, *vb) == kind && !w.is_nan())
            .map(|(_, w)| *w)
            .collect();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Mean over the vertex questions that were asked.
    pub fn vertex_win_rate(&self) -> Option<f64> {
        self.mean_of(QuestionKind::Vertex)
    }

    /// Mean over the edge questions that were asked.
    pub fn edge_win_rate(&self) -> Option<f64> {
        self.mean_of(QuestionKind::Edge)
    }
}

/// Dense outcome probabilities of a bitstring histogram. The dimension is
/// `2^width` of the bitstrings.
pub fn counts_to_probability(path: &Path, counts: &BitCounts) -> IbmResult<Array1<f64>> {
    let width = counts.keys().map(String::len).max().unwrap_or(0);
    if width == 0 || width >= usize::BITS as usize {
        return Err(IbmError::invalid(path, "histogram has no usable bitstrings"));
    }

    let mut probs = Array1::<f64>::zeros(1usize << width);
    for (outcome, count) in parse_counts(path, counts)? {
        probs[outcome] = count as f64;
    }

    let total = probs.sum();
    if total == 0.0 {
        return Err(IbmError::invalid(path, "histogram has no shots"));
    }
    Ok(probs / total)
}

/// Everything recorded for one job of a batch.
#[derive(Debug, Clone)]
pub struct GameResult {
    pub job_id: String,
    pub backend: String,
    pub strategy: String,
    pub win_rate: WinRateMap,
    /// Win rates after readout-error mitigation with the Z-basis SPAM matrix.
    pub mitigated_win_rate: Option<WinRateMap>,
    pub spam_matrices: BTreeMap<Basis, SpamMatrix>,
    /// Bitstring histogram per question.
    pub counts: BTreeMap<(u32, u32), BitCounts>,
    pub mirror_counts: Option<MirrorCounts>,
    pub calibration_date: Option<DateTime<Utc>>,
}

struct Circuit {
    question: (u32, u32),
    counts: BitCounts,
    probs: Array1<f64>,
}

impl GameResult {
    /// Load a job folder named after the job id.
    ///
    /// The game circuits are required. Noise characterization is optional:
    /// anything that fails to load is logged and left out.
    pub fn load_from_folder(job_folder: &Path, backend: &str) -> IbmResult<Self> {
        let job_id = job_folder
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| IbmError::invalid(job_folder, "job folder has no name"))?
            .to_string();

        let game_dir = job_folder.join("game");
        let strategy_folder = sorted_dirs(&game_dir)?
            .into_iter()
            .next()
            .ok_or_else(|| IbmError::invalid(&game_dir, "no strategy folder"))?;
        let strategy = strategy_folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let circuits = load_circuits(&strategy_folder)?;
        let win_rate = score(&circuits, |probs| Ok(probs.clone()))?;

        let spam_matrices: BTreeMap<Basis, SpamMatrix> = Basis::ALL
            .into_iter()
            .filter_map(|basis| {
                best_effort(&job_id, "spam matrix", SpamMatrix::load(job_folder, basis))
                    .map(|m| (basis, m))
            })
            .collect();

        let mitigated_win_rate = spam_matrices.get(&Basis::Z).and_then(|z| {
            let mitigated = z
                .inverse()
                .and_then(|inv| score(&circuits, |probs| z.mitigate(&inv, probs)));
            best_effort(&job_id, "readout mitigation", mitigated)
        });

        let mirror_counts = best_effort(
            &job_id,
            "mirror counts",
            MirrorCounts::load(job_folder, &strategy),
        );
        let calibration_date =
            best_effort(&job_id, "calibration data", calibration_date(job_folder));

        let counts = circuits
            .into_iter()
            .map(|c| (c.question, c.counts))
            .collect();

        Ok(Self {
            job_id,
            backend: backend.to_string(),
            strategy,
            win_rate,
            mitigated_win_rate,
            spam_matrices,
            counts,
            mirror_counts,
            calibration_date,
        })
    }

    /// Experiment attributes: per-kind means and whichever noise metrics
    /// could be computed.
    pub fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        let mut attributes = BTreeMap::new();
        attributes.insert("job_id".to_string(), AttributeValue::from(self.job_id.as_str()));

        let mut put = |key: String, value: Option<f64>| {
            if let Some(v) = value {
                attributes.insert(key, AttributeValue::Float(v));
            }
        };

        put(QuestionKind::Vertex.attribute(), self.win_rate.vertex_win_rate());
        put(QuestionKind::Edge.attribute(), self.win_rate.edge_win_rate());
        if let Some(mitigated) = &self.mitigated_win_rate {
            put(
                format!("mitigated_{}", QuestionKind::Vertex.attribute()),
                mitigated.vertex_win_rate(),
            );
            put(
                format!("mitigated_{}", QuestionKind::Edge.attribute()),
                mitigated.edge_win_rate(),
            );
        }
        for (basis, matrix) in &self.spam_matrices {
            put(format!("{basis}_spam_fidelity"), Some(matrix.fidelity()));
        }
        put(
            "mirror_fidelity".into(),
            self.mirror_counts
                .as_ref()
                .and_then(|m| best_effort(&self.job_id, "mirror fidelity", m.fidelity())),
        );
        put(
            "crosstalk".into(),
            self.spam_matrices
                .get(&Basis::Z)
                .and_then(|z| best_effort(&self.job_id, "crosstalk", z.crosstalk())),
        );

        if let Some(date) = self.calibration_date {
            attributes.insert("calibration_date".into(), AttributeValue::from(date.to_rfc3339()));
        }
        attributes
    }
}

fn best_effort<T>(job_id: &str, what: &str, result: IbmResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(job_id, error = %e, "Skipping {what}");
            None
        }
    }
}

/// Question folders are named `<...>_<va>_<vb>`.
fn parse_question(folder: &Path) -> IbmResult<(u32, u32)> {
    let name = folder.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let mut parts = name.rsplit('_');
    let (Some(vb), Some(va)) = (parts.next(), parts.next()) else {
        return Err(IbmError::invalid(folder, "expected a '<va>_<vb>' folder name"));
    };
    match (va.parse(), vb.parse()) {
        (Ok(va), Ok(vb)) => Ok((va, vb)),
        _ => Err(IbmError::invalid(folder, "expected a '<va>_<vb>' folder name")),
    }
}

fn load_circuits(strategy_folder: &Path) -> IbmResult<Vec<Circuit>> {
    let mut circuits = Vec::new();
    for folder in sorted_dirs(strategy_folder)? {
        let question = parse_question(&folder)?;
        let counts_file = folder.join("counts.json");
        let counts: BitCounts = read_json(&counts_file)?;
        let probs = counts_to_probability(&counts_file, &counts)?;
        circuits.push(Circuit {
            question,
            counts,
            probs,
        });
    }

    if circuits.is_empty() {
        return Err(IbmError::invalid(strategy_folder, "no game circuits"));
    }
    Ok(circuits)
}

fn score<F>(circuits: &[Circuit], transform: F) -> IbmResult<WinRateMap>
where
    F: Fn(&Array1<f64>) -> IbmResult<Array1<f64>>,
{
    let mut map = WinRateMap::new();
    for circuit in circuits {
        let probs = transform(&circuit.probs)?;
        let (va, vb) = circuit.question;
        let kind = QuestionKind::of(va, vb);
        map.insert(va, vb, win_probability(&probs.to_vec(), kind));
    }
    Ok(map)
}
