//! Nonlocal games and the auxiliary references attached to records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IngestError, IngestResult};
use crate::path::RelPath;

/// A paper describing a game or an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPublication")]
pub struct Publication {
    /// Human-readable citation.
    pub citation: String,
    /// Absolute `http(s)` URL.
    pub url: String,
}

#[derive(Deserialize)]
struct RawPublication {
    citation: String,
    url: String,
}

impl TryFrom<RawPublication> for Publication {
    type Error = IngestError;

    fn try_from(raw: RawPublication) -> IngestResult<Self> {
        Publication::new(raw.citation, raw.url)
    }
}

impl Publication {
    /// Create a publication, validating the URL.
    pub fn new(citation: impl Into<String>, url: impl Into<String>) -> IngestResult<Self> {
        let url = url.into();
        validate_url(&url)?;
        Ok(Self {
            citation: citation.into(),
            url,
        })
    }
}

fn validate_url(url: &str) -> IngestResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| IngestError::Validation(format!("URL must be http(s): '{url}'")))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(IngestError::Validation(format!(
            "URL has no valid host: '{url}'"
        )));
    }
    Ok(())
}

/// Named reference to an auxiliary data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub description: String,
    pub path: RelPath,
}

impl Object {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<RelPath>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            path: path.into(),
        }
    }
}

/// A nonlocal game that experiments refer to by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlocalGame {
    /// Stable identifier (UUID v4).
    pub id: Uuid,
    /// Display name, unique within the store.
    pub name: String,
    /// Best success probability of a classical strategy.
    pub optimal_classical_value: f64,
    /// Best success probability of a quantum strategy.
    pub optimal_quantum_value: f64,
    /// Paper where the game is defined.
    #[serde(default)]
    pub publication: Option<Publication>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extra data files for the game.
    #[serde(default)]
    pub objects: Vec<Object>,
}

impl NonlocalGame {
    /// Create a game with a fresh id.
    pub fn new(name: impl Into<String>, classical: f64, quantum: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            optimal_classical_value: classical,
            optimal_quantum_value: quantum,
            publication: None,
            tags: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn with_publication(mut self, publication: Publication) -> Self {
        self.publication = Some(publication);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_object(mut self, object: Object) -> Self {
        self.objects.push(object);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_url_validation() {
        assert!(Publication::new("paper", "https://arxiv.org/abs/1801.03542").is_ok());
        assert!(Publication::new("paper", "http://example.org").is_ok());
        assert!(Publication::new("paper", "ftp://example.org").is_err());
        assert!(Publication::new("paper", "https:///path").is_err());
        assert!(Publication::new("paper", "arxiv.org").is_err());
    }

    #[test]
    fn test_publication_deserialize_validates() {
        let ok = r#"{"citation": "x", "url": "https://example.org/a"}"#;
        assert!(serde_json::from_str::<Publication>(ok).is_ok());

        let bad = r#"{"citation": "x", "url": "not a url"}"#;
        assert!(serde_json::from_str::<Publication>(bad).is_err());
    }

    #[test]
    fn test_game_round_trip() {
        let game = NonlocalGame::new("G14", 86.0 / 88.0, 1.0)
            .with_tag("graph-coloring")
            .with_object(Object::new("graph", "G14 graph", r"games\g14\g14.nx"));

        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["objects"][0]["path"], "games/g14/g14.nx");
        assert_eq!(json["id"].as_str().unwrap(), game.id.to_string());

        let back: NonlocalGame = serde_json::from_value(json).unwrap();
        assert_eq!(back, game);
    }

    #[test]
    fn test_new_games_get_distinct_ids() {
        let a = NonlocalGame::new("A", 0.5, 1.0);
        let b = NonlocalGame::new("A", 0.5, 1.0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.get_version_num(), 4);
    }
}
