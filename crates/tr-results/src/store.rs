//! Run output directories.
//!
//! Every run gets its own `measurements_YYYYMMDD_HHMMSS` directory under the
//! store root, holding the data file, the plot and `manifest.json`.

use crate::export::{MANIFEST_FILE, read_samples_csv};
use crate::types::{RunManifest, Sample};
use crate::{ResultsError, ResultsResult};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const RUN_DIR_PREFIX: &str = "measurements_";

/// A run directory found on disk.
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub dir: PathBuf,
    pub manifest: RunManifest,
}

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Create a fresh directory for a run started at `started_at`.
    ///
    /// Two runs started within the same second get `_1`, `_2`, ... suffixes.
    pub fn create_run_dir(&self, started_at: DateTime<Local>) -> ResultsResult<PathBuf> {
        fs::create_dir_all(&self.root_dir)?;
        let base = format!("{RUN_DIR_PREFIX}{}", started_at.format("%Y%m%d_%H%M%S"));

        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}_{attempt}")
            };
            let dir = self.root_dir.join(name);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    tracing::debug!(dir = %dir.display(), "created run directory");
                    return Ok(dir);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn load_manifest(&self, dir: &Path) -> ResultsResult<RunManifest> {
        let manifest_path = dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                dir: dir.display().to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_samples(&self, dir: &Path) -> ResultsResult<Vec<Sample>> {
        let manifest = self.load_manifest(dir)?;
        read_samples_csv(&dir.join(&manifest.data_file))
    }

    /// Runs under the root with a readable manifest, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<StoredRun>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            let dir = entry.path();
            let is_run_dir = dir.is_dir()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(RUN_DIR_PREFIX);
            if !is_run_dir {
                continue;
            }
            match self.load_manifest(&dir) {
                Ok(manifest) => runs.push(StoredRun { dir, manifest }),
                Err(e) => tracing::debug!(dir = %dir.display(), error = %e, "skipping run directory"),
            }
        }

        runs.sort_by_key(|r| r.manifest.started_at);
        Ok(runs)
    }
}
