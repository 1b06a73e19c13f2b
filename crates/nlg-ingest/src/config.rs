//! Configuration for an ingestion run.
//!
//! Values come from, highest precedence first:
//! 1. Environment variables (`NLG_` prefix, plus `IBM_QUANTUM_TOKEN`)
//! 2. A YAML configuration file
//! 3. Defaults

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Complete ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the raw corpora and of the written artifacts.
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,

    /// Database file; `<data_folder>/db.json` when unset.
    #[serde(default)]
    pub db_file: Option<PathBuf>,

    /// Enabled vendor adapters.
    #[serde(default = "default_adapters")]
    pub adapters: Vec<String>,

    #[serde(default)]
    pub workers: WorkerConfig,

    #[serde(default)]
    pub ibm: IbmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Blocking worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on threads doing blocking file and archive work.
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,
}

/// Remote job service settings for the 2024 IBM batches.
#[derive(Clone, Serialize, Deserialize)]
pub struct IbmConfig {
    #[serde(default = "default_ibm_endpoint")]
    pub endpoint: String,

    /// API token (also read from `IBM_QUANTUM_TOKEN`).
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for IbmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// The vendor adapters known to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    IonTrap,
    IbmLegacy,
    Ibm,
    Rigetti,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 4] = [
        AdapterKind::IbmLegacy,
        AdapterKind::Rigetti,
        AdapterKind::Ibm,
        AdapterKind::IonTrap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdapterKind::IonTrap => "iontrap",
            AdapterKind::IbmLegacy => "ibm-legacy",
            AdapterKind::Ibm => "ibm",
            AdapterKind::Rigetti => "rigetti",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ConfigError::Validation(format!("Unknown adapter: {s}")))
    }
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("data")
}

fn default_adapters() -> Vec<String> {
    AdapterKind::ALL.iter().map(|k| k.as_str().to_string()).collect()
}

fn default_max_blocking_threads() -> usize {
    8
}

fn default_ibm_endpoint() -> String {
    nlg_adapter_ibm::DEFAULT_ENDPOINT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_folder: default_data_folder(),
            db_file: None,
            adapters: default_adapters(),
            workers: WorkerConfig::default(),
            ibm: IbmConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            max_blocking_threads: default_max_blocking_threads(),
        }
    }
}

impl Default for IbmConfig {
    fn default() -> Self {
        IbmConfig {
            endpoint: default_ibm_endpoint(),
            token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load the file, if any, and apply the process environment.
    ///
    /// Not validated: commands that only read the database do not need a
    /// usable adapter setup. Call [`Config::validate`] before ingesting.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        Ok(config.merge_env(|key| std::env::var(key).ok()))
    }

    /// Apply the variables that `lookup` finds. Absent variables leave
    /// fields unchanged.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("NLG_DATA_FOLDER") {
            self.data_folder = PathBuf::from(v);
        }
        if let Some(v) = lookup("NLG_DB_FILE") {
            self.db_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("NLG_ADAPTERS") {
            self.adapters = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("NLG_MAX_BLOCKING_THREADS") {
            if let Ok(val) = v.parse() {
                self.workers.max_blocking_threads = val;
            }
        }

        if let Some(v) = lookup("NLG_IBM_ENDPOINT") {
            self.ibm.endpoint = v;
        }
        if let Some(token) = lookup("NLG_IBM_TOKEN").or_else(|| lookup("IBM_QUANTUM_TOKEN")) {
            self.ibm.token = Some(token);
        }

        if let Some(v) = lookup("NLG_LOG_LEVEL") {
            self.logging.level = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let kinds = self.adapter_kinds()?;
        if kinds.is_empty() {
            return Err(ConfigError::Validation(
                "at least one adapter must be enabled".to_string(),
            ));
        }

        if self.workers.max_blocking_threads == 0 {
            return Err(ConfigError::Validation(
                "max_blocking_threads must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Validation(format!("Invalid log level: {other}")));
            }
        }

        if kinds.contains(&AdapterKind::Ibm) && self.ibm.token.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Validation(
                "the ibm adapter needs a token; set IBM_QUANTUM_TOKEN or ibm.token".to_string(),
            ));
        }

        Ok(())
    }

    /// Enabled adapters, in configuration order.
    pub fn adapter_kinds(&self) -> Result<Vec<AdapterKind>, ConfigError> {
        self.adapters.iter().map(|name| name.parse()).collect()
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_file
            .clone()
            .unwrap_or_else(|| self.data_folder.join("db.json"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
