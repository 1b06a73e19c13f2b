//! Experiment records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{NonlocalGame, Object, Publication};
use crate::path::RelPath;
use crate::winrate::Winrate;

/// Superconducting runs submitted before this day used invalid circuits.
pub fn circuit_cutoff() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, 9, 27)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_default()
}

/// The quantum device an experiment ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device category, e.g. `trapped-ion` or `superconducting`.
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub name: String,
}

impl Device {
    pub fn new(
        kind: impl Into<String>,
        provider: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            provider: provider.into(),
            name: name.into(),
        }
    }

    pub fn trapped_ion(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("trapped-ion", provider, name)
    }

    pub fn superconducting(provider: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("superconducting", provider, name)
    }
}

/// How the game was realised as circuits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitData {
    /// Strategy label, e.g. `bell_pair` or `4q`.
    pub strategy: String,
    /// Shots per circuit.
    pub shots: u64,
    pub num_circuits: usize,
    /// Folder holding the QASM source of every circuit.
    pub qasm_path: RelPath,
    /// Raw result artifact. Patched once the histogram has been written.
    pub result_path: RelPath,
}

/// Value of a vendor-specific experiment attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttributeValue {
    /// Infer the value of a CSV cell: integer, then float, then text.
    pub fn from_cell(cell: &str) -> Self {
        let cell = cell.trim();
        if let Ok(i) = cell.parse::<i64>() {
            AttributeValue::Int(i)
        } else if let Ok(f) = cell.parse::<f64>() {
            AttributeValue::Float(f)
        } else {
            AttributeValue::Str(cell.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

/// Root persisted unit: one run of a game on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Game this experiment implemented.
    pub game_id: Uuid,
    /// Time of the experiment.
    pub date: DateTime<Utc>,
    pub device: Device,
    pub win_rate: Winrate,
    pub circuit_data: CircuitData,
    /// Publication demonstrating this experiment, if any.
    #[serde(default)]
    pub publication: Option<Publication>,
    /// Vendor-specific extras.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Extra associated files.
    #[serde(default)]
    pub objects: Vec<Object>,
}

impl Experiment {
    /// Start an experiment record for `game`.
    pub fn new(
        game: &NonlocalGame,
        date: DateTime<Utc>,
        device: Device,
        win_rate: Winrate,
        circuit_data: CircuitData,
    ) -> Self {
        Self {
            game_id: game.id,
            date,
            device,
            win_rate,
            circuit_data,
            publication: None,
            attributes: BTreeMap::new(),
            objects: Vec::new(),
        }
    }

    pub fn with_publication(mut self, publication: Publication) -> Self {
        self.publication = Some(publication);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Experiment {
        let game = NonlocalGame::new("G14", 86.0 / 88.0, 1.0);
        let win_rate = Winrate::from_circuit_winrates(&game, &[0.95, 0.80], 2000).unwrap();
        Experiment::new(
            &game,
            Utc.with_ymd_and_hms(2024, 7, 18, 0, 0, 0).unwrap(),
            Device::trapped_ion("duke", "silver"),
            win_rate,
            CircuitData {
                strategy: "bell_pair".into(),
                shots: 2000,
                num_circuits: 2,
                qasm_path: RelPath::new(r"raw_data\duke_collab\circuits"),
                result_path: RelPath::new("raw_data/duke_collab/silver_unmitigated.csv"),
            },
        )
        .with_attribute("vertex_win_rate", 0.95)
        .with_attribute("edge_win_rate", 0.80)
        .with_attribute("has_counts", false)
        .with_attribute("shots", 2000u64)
        .with_attribute("dataID", "17")
    }

    #[test]
    fn test_experiment_round_trip() {
        let experiment = sample();
        let json = serde_json::to_string(&experiment).unwrap();
        let back: Experiment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, experiment);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["device"]["type"], "trapped-ion");
        assert_eq!(json["circuit_data"]["qasm_path"], "raw_data/duke_collab/circuits");
        assert_eq!(json["attributes"]["has_counts"], false);
        assert_eq!(json["attributes"]["shots"], 2000);
        assert_eq!(json["attributes"]["dataID"], "17");
        assert!(json["publication"].is_null());
    }

    #[test]
    fn test_attribute_value_untagged() {
        let v: AttributeValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, AttributeValue::Int(3));
        let v: AttributeValue = serde_json::from_str("0.5").unwrap();
        assert_eq!(v, AttributeValue::Float(0.5));
        let v: AttributeValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, AttributeValue::Bool(true));
        assert_eq!(AttributeValue::Int(2).as_f64(), Some(2.0));
    }

    #[test]
    fn test_circuit_cutoff() {
        assert_eq!(circuit_cutoff().to_rfc3339(), "2024-09-27T00:00:00+00:00");
    }

    #[test]
    fn test_attribute_from_cell() {
        assert_eq!(AttributeValue::from_cell("17"), AttributeValue::Int(17));
        assert_eq!(AttributeValue::from_cell("0.25"), AttributeValue::Float(0.25));
        assert_eq!(
            AttributeValue::from_cell("[0, 1, 2, 3]"),
            AttributeValue::Str("[0, 1, 2, 3]".into())
        );
    }
}
