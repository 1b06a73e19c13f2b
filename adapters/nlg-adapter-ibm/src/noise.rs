//! Noise characterization shipped with every job.
//!
//! Each job folder carries calibration circuits next to the game circuits:
//!
//! - `noise/spam_matrix/<B>basis_SPAM_<bits>/counts.json`: one circuit per
//!   prepared basis state, measured in basis `B`
//! - `noise/mirror/<strategy>/counts.json`: the strategy followed by its
//!   inverse, ideally always returning zero
//! - `calibration_data.json`: backend properties at execution time

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::{Array1, Array2, linalg::kron};
use serde::Deserialize;

use crate::error::{IbmError, IbmResult};
use crate::files::{read_json, sorted_dirs};

/// Measurement basis of a SPAM calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Basis {
    X,
    Z,
}

impl Basis {
    pub const ALL: [Basis; 2] = [Basis::X, Basis::Z];

    /// Lowercase label used in attribute names.
    pub fn label(&self) -> &'static str {
        match self {
            Basis::X => "x",
            Basis::Z => "z",
        }
    }

    fn folder_prefix(&self) -> &'static str {
        match self {
            Basis::X => "Xbasis_SPAM",
            Basis::Z => "Zbasis_SPAM",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bitstring histogram of one circuit.
pub type BitCounts = BTreeMap<String, u64>;

/// Parse the keys of a bitstring histogram into integers.
pub fn parse_counts(path: &Path, counts: &BitCounts) -> IbmResult<BTreeMap<usize, u64>> {
    counts
        .iter()
        .map(|(bits, n)| {
            usize::from_str_radix(bits, 2)
                .map(|outcome| (outcome, *n))
                .map_err(|_| IbmError::invalid(path, format!("invalid bitstring '{bits}'")))
        })
        .collect()
}

/// Confusion matrix `S[outcome, prepared]`, normalised per prepared state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpamMatrix {
    basis: Basis,
    matrix: Array2<f64>,
}

impl SpamMatrix {
    /// Wrap an existing matrix. It must be square.
    pub fn new(basis: Basis, matrix: Array2<f64>) -> IbmResult<Self> {
        if !matrix.is_square() || matrix.is_empty() {
            return Err(IbmError::Dimension(format!(
                "SPAM matrix in the {basis} basis has shape {:?}",
                matrix.shape()
            )));
        }
        Ok(Self { basis, matrix })
    }

    /// Build the matrix from the calibration circuits of one basis.
    ///
    /// Prepared states are assumed to be `0..=max`; every state must have been
    /// measured with the same number of shots.
    pub fn load(job_folder: &Path, basis: Basis) -> IbmResult<Self> {
        let spam_folder = job_folder.join("noise").join("spam_matrix");

        let mut prepared_counts = BTreeMap::new();
        for circuit_folder in sorted_dirs(&spam_folder)? {
            let Some(name) = circuit_folder.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(basis.folder_prefix()) {
                continue;
            }

            let bits = name.rsplit('_').next().unwrap_or_default();
            let prepared = usize::from_str_radix(bits, 2).map_err(|_| {
                IbmError::invalid(&circuit_folder, format!("invalid prepared state '{bits}'"))
            })?;

            let counts_file = circuit_folder.join("counts.json");
            let counts: BitCounts = read_json(&counts_file)?;
            prepared_counts.insert(prepared, parse_counts(&counts_file, &counts)?);
        }

        let Some(&max_prepared) = prepared_counts.keys().next_back() else {
            return Err(IbmError::invalid(
                &spam_folder,
                format!("no SPAM circuits in the {basis} basis"),
            ));
        };

        let n = max_prepared + 1;
        let mut matrix = Array2::<f64>::zeros((n, n));
        for (prepared, counts) in &prepared_counts {
            for (&outcome, &count) in counts {
                if outcome >= n {
                    return Err(IbmError::invalid(
                        &spam_folder,
                        format!("outcome {outcome} outside of a {n}-state SPAM matrix"),
                    ));
                }
                matrix[[outcome, *prepared]] = count as f64;
            }
        }

        let shots = matrix.sum_axis(ndarray::Axis(0));
        let reference = shots[0];
        if reference == 0.0 || shots.iter().any(|s| *s != reference) {
            return Err(IbmError::invalid(
                &spam_folder,
                format!("not all states in the {basis} basis were prepared with the same shots"),
            ));
        }

        Self::new(basis, matrix / reference)
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Mean probability of reading back the prepared state.
    pub fn fidelity(&self) -> f64 {
        self.matrix.diag().sum() / self.dim() as f64
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    pub fn inverse(&self) -> IbmResult<Array2<f64>> {
        let n = self.dim();
        let mut a = self.matrix.clone();
        let mut inv = Array2::<f64>::eye(n);

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
                .unwrap_or(col);
            if a[[pivot, col]].abs() < 1e-12 {
                return Err(IbmError::SingularMatrix(self.basis.to_string()));
            }
            if pivot != col {
                for k in 0..n {
                    a.swap([pivot, k], [col, k]);
                    inv.swap([pivot, k], [col, k]);
                }
            }

            let p = a[[col, col]];
            a.row_mut(col).mapv_inplace(|v| v / p);
            inv.row_mut(col).mapv_inplace(|v| v / p);

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[[row, col]];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..n {
                    let (da, dinv) = (factor * a[[col, k]], factor * inv[[col, k]]);
                    a[[row, k]] -= da;
                    inv[[row, k]] -= dinv;
                }
            }
        }

        Ok(inv)
    }

    /// Readout-error mitigation: `S⁻¹ · probs`.
    pub fn mitigate(&self, inverse: &Array2<f64>, probs: &Array1<f64>) -> IbmResult<Array1<f64>> {
        if inverse.ncols() != probs.len() {
            return Err(IbmError::Dimension(format!(
                "{}-state SPAM matrix applied to {} outcome probabilities",
                inverse.ncols(),
                probs.len()
            )));
        }
        Ok(inverse.dot(probs))
    }

    /// Distance `‖S − S'‖_F` between the matrix and the tensor product `S'`
    /// of its single-qubit marginals.
    ///
    /// Zero when readout errors are uncorrelated between qubits.
    pub fn crosstalk(&self) -> IbmResult<f64> {
        let states = self.dim();
        if !states.is_power_of_two() || states < 2 {
            return Err(IbmError::Dimension(format!(
                "{states}-state SPAM matrix does not describe whole qubits"
            )));
        }
        let qubits = states.trailing_zeros() as usize;
        let diag = self.matrix.diag();

        let mut marginals = Vec::with_capacity(qubits);
        for qubit in 0..qubits {
            let mask = 1usize << qubit;
            let mut si = Array2::<f64>::zeros((2, 2));
            for prepared in 0..2usize {
                // Distinct states with this qubit forced to the prepared value.
                let idx: std::collections::BTreeSet<usize> = (0..states)
                    .map(|s| if prepared == 0 { s & !mask } else { s | mask })
                    .collect();
                let mean = idx.iter().map(|&i| diag[i]).sum::<f64>() / idx.len() as f64;
                si[[prepared, prepared]] = mean;
                si[[1 - prepared, prepared]] = 1.0 - mean;
            }
            marginals.push(si);
        }

        let mut product = marginals[0].clone();
        for si in &marginals[1..] {
            product = kron(&product, si);
        }

        let diff = &self.matrix - &product;
        Ok(diff.mapv(|v| v * v).sum().sqrt())
    }
}

/// Counts of the mirror circuit, keyed by outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorCounts(BTreeMap<usize, u64>);

impl MirrorCounts {
    pub fn load(job_folder: &Path, strategy: &str) -> IbmResult<Self> {
        let counts_file = job_folder
            .join("noise")
            .join("mirror")
            .join(strategy)
            .join("counts.json");
        let counts: BitCounts = read_json(&counts_file)?;
        Ok(Self(parse_counts(&counts_file, &counts)?))
    }

    /// Fraction of shots returning the all-zero outcome.
    pub fn fidelity(&self) -> IbmResult<f64> {
        let shots: u64 = self.0.values().sum();
        if shots == 0 {
            return Err(IbmError::Dimension("mirror circuit has no shots".into()));
        }
        let zeros = self.0.get(&0).copied().unwrap_or(0);
        Ok(zeros as f64 / shots as f64)
    }
}

impl FromIterator<(usize, u64)> for MirrorCounts {
    fn from_iter<I: IntoIterator<Item = (usize, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationData {
    last_update_date: String,
}

/// Time the backend was last calibrated before the job ran.
pub fn calibration_date(job_folder: &Path) -> IbmResult<DateTime<Utc>> {
    let path = job_folder.join("calibration_data.json");
    let data: CalibrationData = read_json(&path)?;
    parse_timestamp(&data.last_update_date)
        .ok_or_else(|| IbmError::invalid(&path, format!("invalid date '{}'", data.last_update_date)))
}

/// ISO-8601 timestamp; naive values are taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn spam(matrix: Array2<f64>) -> SpamMatrix {
        SpamMatrix::new(Basis::Z, matrix).unwrap()
    }

    fn write_counts(dir: &Path, counts: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join("counts.json"), counts).unwrap();
    }

    #[test]
    fn test_inverse() {
        let s = spam(array![[0.9, 0.2], [0.1, 0.8]]);
        let inv = s.inverse().unwrap();
        let identity = s.matrix().dot(&inv);
        for ((i, j), v) in identity.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_singular_matrix() {
        let s = spam(array![[0.5, 0.5], [0.5, 0.5]]);
        assert!(matches!(s.inverse(), Err(IbmError::SingularMatrix(_))));
    }

    #[test]
    fn test_mitigation_recovers_ideal_distribution() {
        let s = spam(array![[0.9, 0.2], [0.1, 0.8]]);
        let ideal = array![0.75, 0.25];
        let measured = s.matrix().dot(&ideal);

        let inv = s.inverse().unwrap();
        let mitigated = s.mitigate(&inv, &measured).unwrap();
        assert!((mitigated[0] - 0.75).abs() < 1e-12);
        assert!((mitigated[1] - 0.25).abs() < 1e-12);

        assert!(s.mitigate(&inv, &array![1.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_crosstalk() {
        assert!(spam(Array2::eye(4)).crosstalk().unwrap().abs() < 1e-12);
        assert!(spam(array![[0.9, 0.2], [0.1, 0.8]]).crosstalk().unwrap().abs() < 1e-12);

        let correlated = spam(array![
            [0.9, 0.0, 0.0, 0.1],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.1, 0.0, 0.0, 0.9],
        ]);
        assert!((correlated.crosstalk().unwrap() - 0.236_854_385_646_540_3).abs() < 1e-12);

        let odd = spam(Array2::eye(3));
        assert!(odd.crosstalk().is_err());
    }

    #[test]
    fn test_fidelity() {
        let s = spam(array![[0.9, 0.2], [0.1, 0.8]]);
        assert!((s.fidelity() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_load_spam_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let spam_dir = dir.path().join("noise").join("spam_matrix");
        write_counts(&spam_dir.join("Zbasis_SPAM_0"), r#"{"0": 90, "1": 10}"#);
        write_counts(&spam_dir.join("Zbasis_SPAM_1"), r#"{"0": 20, "1": 80}"#);
        write_counts(&spam_dir.join("Xbasis_SPAM_0"), r#"{"0": 100}"#);

        let z = SpamMatrix::load(dir.path(), Basis::Z).unwrap();
        assert_eq!(z.matrix(), &array![[0.9, 0.2], [0.1, 0.8]]);

        let x = SpamMatrix::load(dir.path(), Basis::X).unwrap();
        assert_eq!(x.dim(), 1);
    }

    #[test]
    fn test_load_spam_matrix_rejects_uneven_shots() {
        let dir = tempfile::tempdir().unwrap();
        let spam_dir = dir.path().join("noise").join("spam_matrix");
        write_counts(&spam_dir.join("Zbasis_SPAM_0"), r#"{"0": 90, "1": 10}"#);
        write_counts(&spam_dir.join("Zbasis_SPAM_1"), r#"{"0": 20, "1": 60}"#);

        assert!(SpamMatrix::load(dir.path(), Basis::Z).is_err());
        assert!(SpamMatrix::load(dir.path(), Basis::X).is_err());
    }

    #[test]
    fn test_mirror_fidelity() {
        let dir = tempfile::tempdir().unwrap();
        write_counts(
            &dir.path().join("noise").join("mirror").join("4q"),
            r#"{"0000": 950, "0011": 50}"#,
        );

        let mirror = MirrorCounts::load(dir.path(), "4q").unwrap();
        assert!((mirror.fidelity().unwrap() - 0.95).abs() < 1e-12);

        let no_zero: MirrorCounts = [(3, 10)].into_iter().collect();
        assert_eq!(no_zero.fidelity().unwrap(), 0.0);
    }

    #[test]
    fn test_calibration_date() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("calibration_data.json"),
            r#"{"backend_name": "ibm_sherbrooke", "last_update_date": "2024-10-01T12:00:00Z", "qubits": []}"#,
        )
        .unwrap();
        let date = calibration_date(dir.path()).unwrap();
        assert_eq!(date.to_rfc3339(), "2024-10-01T12:00:00+00:00");

        assert_eq!(
            parse_timestamp("2024-10-01T12:00:00.5").map(|d| d.to_rfc3339()),
            Some("2024-10-01T12:00:00.500+00:00".into())
        );
    }
}
