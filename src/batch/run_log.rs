use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Outcome of running the quantification tool on one sample.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleRun {
    pub output_dir: PathBuf,
    /// Captured console output of the run
    #[serde(default)]
    pub log: String,
    /// Structured outcome, when the runner reports one
    #[serde(default)]
    pub success: Option<bool>,
}

impl SampleRun {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(output_dir: P, log: S) -> Self {
        SampleRun {
            output_dir: output_dir.into(),
            log: log.into(),
            success: None,
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Whether this run should be left out of a batch.
    ///
    /// A structured `success` flag decides when present. Otherwise the captured
    /// log is scanned for "warning" or "error", ignoring case. That scan is a
    /// heuristic: the tool prints no machine-readable status of its own.
    pub fn failed(&self) -> bool {
        match self.success {
            Some(success) => !success,
            None => log_reports_failure(&self.log),
        }
    }
}

pub fn log_reports_failure(log: &str) -> bool {
    let log = log.to_lowercase();
    log.contains("warning") || log.contains("error")
}

/// Per-sample run outcomes keyed by sample name, in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRunLog {
    runs: Vec<(String, SampleRun)>,
}

impl BatchRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the run of `sample`. A replaced run keeps its position.
    pub fn insert<S: Into<String>>(&mut self, sample: S, run: SampleRun) {
        let sample = sample.into();
        match self.runs.iter_mut().find(|(name, _)| *name == sample) {
            Some((_, existing)) => *existing = run,
            None => self.runs.push((sample, run)),
        }
    }

    pub fn with_run<S: Into<String>>(mut self, sample: S, run: SampleRun) -> Self {
        self.insert(sample, run);
        self
    }

    /// Parse a JSON object of `{ "<sample>": { "output_dir": ..., "log": ... } }`.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let map: Map<String, Value> = serde_json::from_reader(reader)?;
        let mut log = BatchRunLog::new();
        for (sample, value) in map {
            let run: SampleRun = serde_json::from_value(value)
                .with_context(|| format!("Invalid run entry for sample '{}'", sample))?;
            log.insert(sample, run);
        }
        Ok(log)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open batch run log {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn get(&self, sample: &str) -> Option<&SampleRun> {
        self.runs
            .iter()
            .find(|(name, _)| name == sample)
            .map(|(_, run)| run)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleRun)> {
        self.runs.iter().map(|(name, run)| (name.as_str(), run))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Names of the runs flagged as failed, in run order.
    pub fn failed_samples(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, run)| run.failed())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}
