//! Data-folder-relative paths as stored in records.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A path relative to the data folder, always rendered with forward slashes.
///
/// Records are shared between machines, so the stored form never contains
/// backslashes or a leading root. An empty path renders as `"."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Normalise a path-like string into its stored form.
    pub fn new(path: impl AsRef<str>) -> Self {
        let parts: Vec<&str> = path
            .as_ref()
            .split(['/', '\\'])
            .filter(|part| !part.is_empty() && *part != ".")
            .collect();

        if parts.is_empty() {
            Self(".".to_string())
        } else {
            Self(parts.join("/"))
        }
    }

    /// Build the stored form of `path` relative to `base`.
    ///
    /// Falls back to the path itself when it does not live under `base`.
    pub fn relative_to(path: &Path, base: &Path) -> Self {
        let rel = path.strip_prefix(base).unwrap_or(path);
        Self::from_path(rel)
    }

    /// Convert a filesystem path, dropping root and prefix components.
    pub fn from_path(path: &Path) -> Self {
        let parts: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect();
        Self::new(parts.join("/"))
    }

    /// The stored string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against a data folder.
    pub fn resolve(&self, data_folder: &Path) -> PathBuf {
        self.0
            .split('/')
            .filter(|part| *part != ".")
            .fold(data_folder.to_path_buf(), |acc, part| acc.join(part))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RelPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslashes_are_normalised() {
        let path = RelPath::new(r"raw_data\ibm_2024\abc\raw.zip");
        assert_eq!(path.as_str(), "raw_data/ibm_2024/abc/raw.zip");
    }

    #[test]
    fn test_empty_path_is_dot() {
        assert_eq!(RelPath::new("").as_str(), ".");
        assert_eq!(RelPath::new("./").as_str(), ".");
    }

    #[test]
    fn test_relative_to_base() {
        let base = Path::new("/data");
        let path = Path::new("/data/raw_data/rigetti_2024/g14_original/ankaa-2/g14_raw_counts.csv");
        assert_eq!(
            RelPath::relative_to(path, base).as_str(),
            "raw_data/rigetti_2024/g14_original/ankaa-2/g14_raw_counts.csv"
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let path = RelPath::new("experiments/result_3.json");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"experiments/result_3.json\"");
        let back: RelPath = serde_json::from_str(r#""experiments\\result_3.json""#).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_resolve() {
        let path = RelPath::new("experiments/result_1.json");
        assert_eq!(
            path.resolve(Path::new("data")),
            Path::new("data").join("experiments").join("result_1.json")
        );
    }
}
