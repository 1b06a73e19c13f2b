//! Outcome decoding and question scoring.
//!
//! Every vendor reports the joint answer of both players differently. A
//! four-colour game uses two bits per player; the conventions are:
//!
//! | Encoding | Key | First player | Second player |
//! |---|---|---|---|
//! | [`OutcomeEncoding::PackedInteger`] | `x` as decimal | `x % 4` | `x / 4` |
//! | [`OutcomeEncoding::Bitstring`] | `b1b0a1a0` | last two bits | first two bits |
//!
//! Questions are scored on the diagonal `{c + c·2^(bits/2)}`, the outcomes
//! where both players return the same colour. Vertex questions win on the
//! diagonal, edge questions win off it.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IngestError, IngestResult};
use crate::histogram::Outcome;

/// Bits per player answer.
const ANSWER_BITS: u32 = 2;
const ANSWER_MASK: u32 = (1 << ANSWER_BITS) - 1;

/// How a vendor encodes the joint answer in a histogram key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEncoding {
    /// Integer index with the first player in the low bits.
    PackedInteger,
    /// Binary string with the first player in the trailing bits.
    Bitstring,
}

impl OutcomeEncoding {
    /// Decode a histogram key.
    pub fn decode(&self, key: &str) -> IngestResult<Outcome> {
        match self {
            OutcomeEncoding::PackedInteger => {
                let x: u32 = key
                    .trim()
                    .parse()
                    .map_err(|_| IngestError::Validation(format!("invalid outcome index '{key}'")))?;
                Ok(decode_packed(x))
            }
            OutcomeEncoding::Bitstring => decode_bitstring(key),
        }
    }

    /// Encode an outcome back into a histogram key.
    pub fn encode(&self, outcome: Outcome) -> String {
        match self {
            OutcomeEncoding::PackedInteger => encode_packed(outcome).to_string(),
            OutcomeEncoding::Bitstring => format!(
                "{:0w$b}{:0w$b}",
                outcome.1,
                outcome.0,
                w = ANSWER_BITS as usize
            ),
        }
    }
}

/// `x → (x % 4, x / 4)`.
pub fn decode_packed(x: u32) -> Outcome {
    Outcome(x & ANSWER_MASK, x >> ANSWER_BITS)
}

pub fn encode_packed(outcome: Outcome) -> u32 {
    outcome.0 + (outcome.1 << ANSWER_BITS)
}

/// `bs → (int(bs[-2:]), int(bs[:2]))`.
pub fn decode_bitstring(bitstring: &str) -> IngestResult<Outcome> {
    let width = ANSWER_BITS as usize;
    if bitstring.len() < width || !bitstring.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(IngestError::Validation(format!(
            "invalid bitstring '{bitstring}'"
        )));
    }

    let a = parse_binary(&bitstring[bitstring.len() - width..])?;
    let b = parse_binary(&bitstring[..width])?;
    Ok(Outcome(a, b))
}

/// Parse a binary string into its integer value.
pub fn parse_binary(bits: &str) -> IngestResult<u32> {
    u32::from_str_radix(bits, 2)
        .map_err(|_| IngestError::Validation(format!("invalid bitstring '{bits}'")))
}

/// Question kind, determined by whether both players got the same vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionKind {
    Vertex,
    Edge,
}

impl QuestionKind {
    pub fn of(va: u32, vb: u32) -> Self {
        if va == vb {
            QuestionKind::Vertex
        } else {
            QuestionKind::Edge
        }
    }

    /// Lowercase label used in attribute names.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Vertex => "vertex",
            QuestionKind::Edge => "edge",
        }
    }

    /// Parse a label such as `vertex` or `Edge`.
    pub fn parse(label: &str) -> IngestResult<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "vertex" => Ok(QuestionKind::Vertex),
            "edge" => Ok(QuestionKind::Edge),
            other => Err(IngestError::Validation(format!(
                "unknown question type '{other}'"
            ))),
        }
    }

    /// Win probability given the probability mass on the diagonal.
    pub fn score(&self, diagonal_mass: f64) -> f64 {
        match self {
            QuestionKind::Vertex => diagonal_mass,
            QuestionKind::Edge => 1.0 - diagonal_mass,
        }
    }

    /// Attribute name of the per-kind mean, e.g. `vertex_win_rate`.
    pub fn attribute(&self) -> String {
        format!("{}_win_rate", self.label())
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome indices where both players answer the same colour, for a
/// probability vector over `bits` bits.
///
/// The colour count is the integer square root of the vector length; the
/// second answer is shifted by `bits / 2`.
pub fn diagonal_outcomes(bits: u32) -> Vec<usize> {
    let half = bits / 2;
    let colors = (1usize << bits).isqrt();
    (0..colors).map(|c| c + (c << half)).collect()
}

/// Win probability of a question from a dense probability vector.
///
/// The vector length must be a power of two.
pub fn win_probability(probs: &[f64], kind: QuestionKind) -> f64 {
    let bits = probs.len().trailing_zeros();
    let mass: f64 = diagonal_outcomes(bits)
        .into_iter()
        .filter_map(|idx| probs.get(idx))
        .sum();
    kind.score(mass)
}

/// Running per-kind mean of circuit win rates.
#[derive(Debug, Default, Clone)]
pub struct QuestionTally {
    sums: BTreeMap<QuestionKind, (f64, usize)>,
}

impl QuestionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: QuestionKind, win_rate: f64) {
        let entry = self.sums.entry(kind).or_insert((0.0, 0));
        entry.0 += win_rate;
        entry.1 += 1;
    }

    /// Mean for a kind, if any circuit of that kind was seen.
    pub fn mean(&self, kind: QuestionKind) -> Option<f64> {
        self.sums
            .get(&kind)
            .map(|(sum, count)| sum / *count as f64)
    }

    /// `(attribute name, mean)` for every kind that was seen.
    pub fn attributes(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        self.sums
            .iter()
            .map(|(kind, (sum, count))| (kind.attribute(), sum / *count as f64))
    }
}

impl FromIterator<(QuestionKind, f64)> for QuestionTally {
    fn from_iter<I: IntoIterator<Item = (QuestionKind, f64)>>(iter: I) -> Self {
        let mut tally = Self::new();
        for (kind, win_rate) in iter {
            tally.add(kind, win_rate);
        }
        tally
    }
}
