//! Circuit index to question mapping.

use std::collections::BTreeMap;
use std::path::Path;

use nlg_core::QuestionKind;

use crate::error::{IonTrapError, IonTrapResult};

/// Question `(va, vb)` asked by each numbered circuit.
///
/// Read from the file names of the circuit folder, which look like
/// `line 12 (3, 7).txt`. Files that do not follow the pattern are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitMapping {
    map: BTreeMap<u32, (u32, u32)>,
}

impl CircuitMapping {
    /// Scan `circuit_dir` for mapping files.
    pub fn load(circuit_dir: &Path) -> IonTrapResult<Self> {
        let io_err = |source: std::io::Error| IonTrapError::Io {
            path: circuit_dir.to_path_buf(),
            source,
        };

        let mut map = BTreeMap::new();
        for entry in std::fs::read_dir(circuit_dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().is_none_or(|ext| ext != "txt") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some((index, question)) = parse_stem(stem) {
                map.insert(index, question);
            }
        }

        tracing::debug!(circuits = map.len(), dir = %circuit_dir.display(), "Loaded circuit mapping");
        Ok(Self { map })
    }

    /// Question of a circuit.
    pub fn question(&self, index: u32) -> Option<(u32, u32)> {
        self.map.get(&index).copied()
    }

    /// Question and kind of a circuit read from `file`.
    pub fn lookup(&self, file: &str, index: u32) -> IonTrapResult<((u32, u32), QuestionKind)> {
        let (va, vb) = self.question(index).ok_or_else(|| IonTrapError::UnknownCircuit {
            file: file.to_string(),
            index,
        })?;
        Ok(((va, vb), QuestionKind::of(va, vb)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(u32, (u32, u32))> for CircuitMapping {
    fn from_iter<I: IntoIterator<Item = (u32, (u32, u32))>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Match `line <n> (<va>, <vb>)` at the start of a file stem.
fn parse_stem(stem: &str) -> Option<(u32, (u32, u32))> {
    let rest = stem.strip_prefix("line ")?;
    let (index, rest) = take_number(rest)?;
    let rest = rest.strip_prefix(" (")?;
    let (va, rest) = take_number(rest)?;
    let rest = rest.strip_prefix(", ")?;
    let (vb, rest) = take_number(rest)?;
    rest.strip_prefix(')')?;
    Some((index, (va, vb)))
}

fn take_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].parse().ok()?, &s[end..]))
}
