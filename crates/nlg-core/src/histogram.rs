//! Raw outcome histograms exported next to experiment records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// Answer pair `(a, b)` returned by the two players.
///
/// Serialised as the string `"(a, b)"` so it can key a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outcome(pub u32, pub u32);

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

impl FromStr for Outcome {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IngestError::Validation(format!("invalid outcome key '{s}'"));

        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let mut parts = inner.split(',').map(str::trim);
        let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let parse = |part: &str| -> Result<u32, IngestError> {
            if part.is_empty() || !part.bytes().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        Ok(Outcome(parse(a)?, parse(b)?))
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Outcome counts of one circuit.
pub type Counts = BTreeMap<Outcome, u64>;

/// Result of one circuit, i.e. one question pair under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitResult {
    /// Question sent to the players.
    pub circuit: Vec<u32>,
    /// Success rate of the circuit.
    pub win_rate: f64,
    /// Raw histogram of the answers, if available.
    #[serde(default)]
    pub counts: Option<Counts>,
}

impl CircuitResult {
    pub fn new(va: u32, vb: u32, win_rate: f64) -> Self {
        Self {
            circuit: vec![va, vb],
            win_rate,
            counts: None,
        }
    }

    pub fn with_counts(mut self, counts: Counts) -> Self {
        self.counts = Some(counts);
        self
    }

    /// Sum of all counts, if a histogram is present.
    pub fn total_shots(&self) -> Option<u64> {
        self.counts.as_ref().map(|c| c.values().sum())
    }
}

/// One flattened histogram row.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRow {
    pub circuit: Vec<u32>,
    pub win_rate: f64,
    pub outcome: Option<Outcome>,
    pub count: Option<u64>,
}

impl HistogramRow {
    /// Render as a flat record `{x0, x1, win_rate, a0, a1, count}`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        for (i, x) in self.circuit.iter().enumerate() {
            record.insert(format!("x{i}"), Value::from(*x));
        }
        record.insert("win_rate".into(), Value::from(self.win_rate));
        if let Some(Outcome(a0, a1)) = self.outcome {
            record.insert("a0".into(), Value::from(a0));
            record.insert("a1".into(), Value::from(a1));
        }
        if let Some(count) = self.count {
            record.insert("count".into(), Value::from(count));
        }
        record
    }
}

/// Ordered per-circuit results of one experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHistogram {
    #[serde(default)]
    pub results: Vec<CircuitResult>,
}

impl RawHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: CircuitResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Flatten into one row per outcome, or a single row without outcome
    /// columns for circuits that carry no counts.
    pub fn rows(&self) -> Vec<HistogramRow> {
        let mut rows = Vec::new();
        for result in &self.results {
            match &result.counts {
                Some(counts) => {
                    for (outcome, count) in counts {
                        rows.push(HistogramRow {
                            circuit: result.circuit.clone(),
                            win_rate: result.win_rate,
                            outcome: Some(*outcome),
                            count: Some(*count),
                        });
                    }
                }
                None => rows.push(HistogramRow {
                    circuit: result.circuit.clone(),
                    win_rate: result.win_rate,
                    outcome: None,
                    count: None,
                }),
            }
        }
        rows
    }
}

impl FromIterator<CircuitResult> for RawHistogram {
    fn from_iter<I: IntoIterator<Item = CircuitResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}
