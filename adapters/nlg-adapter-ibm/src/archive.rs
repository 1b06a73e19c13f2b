//! Extraction of `raw.zip` result archives.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{IbmError, IbmResult};
use crate::files::{io_error, sorted_dirs};

/// An archive unpacked to a scratch folder. The folder is removed on drop.
#[derive(Debug)]
pub struct ExtractedArchive {
    root: PathBuf,
}

impl ExtractedArchive {
    /// Unpack `archive` into `dest`, replacing any leftovers of an earlier run.
    pub fn extract(archive: &Path, dest: &Path) -> IbmResult<Self> {
        let file = File::open(archive).map_err(io_error(archive))?;
        let zip_error = |source| IbmError::Archive {
            path: archive.to_path_buf(),
            source,
        };
        let mut zip = ZipArchive::new(file).map_err(zip_error)?;

        if dest.exists() {
            std::fs::remove_dir_all(dest).map_err(io_error(dest))?;
        }
        // Owns the folder from here on so a failed extraction is cleaned up too.
        let extracted = Self {
            root: dest.to_path_buf(),
        };
        zip.extract(dest).map_err(zip_error)?;

        debug!(archive = %archive.display(), entries = zip.len(), "Extracted archive");
        Ok(extracted)
    }

    /// Top-level folders of the archive, one per job.
    pub fn job_folders(&self) -> IbmResult<Vec<PathBuf>> {
        sorted_dirs(&self.root)
    }
}

impl Drop for ExtractedArchive {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), error = %e, "Failed to remove extracted archive");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Write a zip archive holding `files` (path, content).
    pub(crate) fn write_zip(path: &Path, files: &[(String, String)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            zip.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_extract_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("raw.zip");
        write_zip(
            &archive,
            &[
                ("job-b/game/4q/0_0/counts.json".into(), "{}".into()),
                ("job-a/calibration_data.json".into(), "{}".into()),
            ],
        );

        let dest = dir.path().join("raw");
        {
            let extracted = ExtractedArchive::extract(&archive, &dest).unwrap();
            let jobs: Vec<_> = extracted
                .job_folders()
                .unwrap()
                .into_iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(jobs, vec!["job-a", "job-b"]);
            assert!(dest.join("job-b/game/4q/0_0/counts.json").is_file());
        }
        assert!(!dest.exists());
    }

    #[test]
    fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("raw.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let err = ExtractedArchive::extract(&archive, &dir.path().join("raw")).unwrap_err();
        assert!(matches!(err, IbmError::Archive { .. }));

        let missing = ExtractedArchive::extract(&dir.path().join("none.zip"), &dir.path().join("raw"));
        assert!(matches!(missing, Err(IbmError::Io { .. })));
    }
}
