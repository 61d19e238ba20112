use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ABUNDANCE_FILE: &str = "abundance.tsv";
pub const DEFAULT_RUN_INFO_FILE: &str = "run_info.json";

/// Relative locations of the files a quantification run leaves in its output directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuantLayout {
    /// Tab-separated abundance table, relative to the run directory
    pub abundance: PathBuf,
    /// Flat JSON run-info record, relative to the run directory
    pub run_info: PathBuf,
}

impl Default for QuantLayout {
    fn default() -> Self {
        QuantLayout {
            abundance: PathBuf::from(DEFAULT_ABUNDANCE_FILE),
            run_info: PathBuf::from(DEFAULT_RUN_INFO_FILE),
        }
    }
}

impl QuantLayout {
    pub fn with_abundance<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.abundance = path.into();
        self
    }

    pub fn with_run_info<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.run_info = path.into();
        self
    }

    pub fn abundance_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.abundance)
    }

    pub fn run_info_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.run_info)
    }
}
