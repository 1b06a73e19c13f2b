//! Blocking file helpers shared by the batch readers.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{IbmError, IbmResult};

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> IbmError + '_ {
    move |source| IbmError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read and deserialize a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> IbmResult<T> {
    let text = std::fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&text).map_err(|source| IbmError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Subdirectories of `dir`, sorted by name.
pub(crate) fn sorted_dirs(dir: &Path) -> IbmResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
