//! Assembling many quantification runs into one [`QuantExperiment`].
//!
//! Samples come either from a [`BatchRunLog`], in which case failed runs are
//! dropped before anything is read, or from parallel lists of sample names and
//! run directories. The first sample fixes the feature set and the run-info
//! fields for the whole batch.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use single_quant::batch::{aggregate, BatchInput, BatchOptions, NoProgress};
//!
//! let input = BatchInput::samples(
//!     vec!["ctrl".to_string(), "treated".to_string()],
//!     vec!["quant/ctrl".into(), "quant/treated".into()],
//! )?;
//! let experiment = aggregate(&input, &BatchOptions::default(), &mut NoProgress)?;
//! println!("{} x {}", experiment.n_features(), experiment.n_samples());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod progress;
pub mod run_log;

pub use progress::{DotProgress, NoProgress, Progress};
pub use run_log::{BatchRunLog, SampleRun};

use crate::error::QuantError;
use crate::experiment::{BatchWarning, FeatureInfo, QuantExperiment, SampleMetadata, MISSING};
use crate::io::{read_sample, QuantLayout, SampleQuant};
use ndarray::{Array2, ArrayView1, Axis};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

pub const DEFAULT_LOG_OFFSET: f64 = 1.0;

/// Where the samples of a batch come from.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// Outcomes of a previous batch run; failed runs are excluded.
    RunLog(BatchRunLog),
    /// Sample names with their run directories, all assumed successful.
    Samples {
        names: Vec<String>,
        dirs: Vec<PathBuf>,
    },
}

impl BatchInput {
    pub fn samples(names: Vec<String>, dirs: Vec<PathBuf>) -> anyhow::Result<Self> {
        check_lists(&names, &dirs)?;
        Ok(BatchInput::Samples { names, dirs })
    }

    /// Choose the input from optional arguments. A run log takes precedence
    /// and any lists passed alongside it are ignored.
    pub fn from_parts(
        run_log: Option<BatchRunLog>,
        names: Option<Vec<String>>,
        dirs: Option<Vec<PathBuf>>,
    ) -> anyhow::Result<Self> {
        match (run_log, names, dirs) {
            (Some(run_log), names, dirs) => {
                if names.is_some() || dirs.is_some() {
                    log::debug!("Batch run log given, ignoring sample and directory lists");
                }
                Ok(BatchInput::RunLog(run_log))
            }
            (None, Some(names), Some(dirs)) => Self::samples(names, dirs),
            (None, _, _) => Err(QuantError::InvalidArguments(
                "either a batch run log or both sample names and directories are required"
                    .to_string(),
            )
            .into()),
        }
    }
}

fn check_lists(names: &[String], dirs: &[PathBuf]) -> anyhow::Result<()> {
    if names.len() != dirs.len() {
        return Err(QuantError::InvalidArguments(format!(
            "{} sample names but {} directories",
            names.len(),
            dirs.len()
        ))
        .into());
    }
    let mut seen = HashSet::new();
    if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(QuantError::InvalidArguments(format!("duplicate sample name '{}'", dup)).into());
    }
    Ok(())
}

/// Settings for [`aggregate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub layout: QuantLayout,
    /// Added to TPM before taking log2, must be non-negative
    pub log_offset: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            layout: QuantLayout::default(),
            log_offset: DEFAULT_LOG_OFFSET,
        }
    }
}

impl BatchOptions {
    pub fn with_layout(mut self, layout: QuantLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_log_offset(mut self, offset: f64) -> Self {
        self.log_offset = offset;
        self
    }
}

/// Sample names and directories left after failed runs are dropped.
fn resolve(input: &BatchInput) -> anyhow::Result<(Vec<String>, Vec<PathBuf>, Vec<BatchWarning>)> {
    match input {
        BatchInput::Samples { names, dirs } => {
            check_lists(names, dirs)?;
            Ok((names.clone(), dirs.clone(), Vec::new()))
        }
        BatchInput::RunLog(run_log) => {
            let mut names = Vec::with_capacity(run_log.len());
            let mut dirs = Vec::with_capacity(run_log.len());
            let mut excluded = Vec::new();
            for (name, run) in run_log.iter() {
                if run.failed() {
                    excluded.push(name.to_string());
                } else {
                    names.push(name.to_string());
                    dirs.push(run.output_dir.clone());
                }
            }

            let mut warnings = Vec::new();
            if !excluded.is_empty() {
                let warning = BatchWarning::SamplesExcluded(excluded);
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            Ok((names, dirs, warnings))
        }
    }
}

/// Read every sample of a batch and assemble the result matrices.
///
/// Samples are processed sequentially in input order. A sample whose feature
/// set does not line up with the first sample keeps [`MISSING`] in its count
/// and TPM columns and a warning is recorded; every other failure aborts the
/// batch.
///
/// # Errors
/// * [`QuantError::InvalidOffset`] for a negative or NaN `log_offset`
/// * [`QuantError::InvalidArguments`] when names and directories differ in length,
///   or when a sample name appears twice in the lists
/// * [`QuantError::EmptyBatch`] when no sample is left to read
/// * [`QuantError::FileNotFound`] and parse errors from [`read_sample`]
/// * [`QuantError::ShapeMismatch`] when a run-info record has other fields than the first
pub fn aggregate(
    input: &BatchInput,
    options: &BatchOptions,
    progress: &mut dyn Progress,
) -> anyhow::Result<QuantExperiment> {
    let offset = options.log_offset;
    if !offset.is_finite() || offset < 0.0 {
        return Err(QuantError::InvalidOffset(offset).into());
    }

    let (names, dirs, mut warnings) = resolve(input)?;
    if names.is_empty() {
        return Err(QuantError::EmptyBatch.into());
    }
    let n_samples = names.len();

    let first = read_sample(&dirs[0], &options.layout)?;
    let n_features = first.abundance.n_features();
    log::info!(
        "Aggregating {} samples with {} features and {} run info fields",
        n_samples,
        n_features,
        first.run_info.n_fields()
    );

    let features = FeatureInfo::new(
        first.abundance.target_ids.clone(),
        first.abundance.lengths.clone(),
    );
    let mut metadata = SampleMetadata::new(first.run_info.fields().to_vec(), n_samples);
    let mut counts = Array2::from_elem((n_features, n_samples), MISSING);
    let mut tpm = Array2::from_elem((n_features, n_samples), MISSING);

    let mut first = Some(first);
    for (j, (name, dir)) in names.iter().zip(&dirs).enumerate() {
        let sample: SampleQuant = match first.take() {
            Some(sample) => sample,
            None => read_sample(dir, &options.layout)?,
        };

        match check_alignment(&sample, &features, name, dir) {
            Some(warning) => {
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            None => {
                counts
                    .index_axis_mut(Axis(1), j)
                    .assign(&ArrayView1::from(sample.abundance.est_counts.as_slice()));
                tpm.index_axis_mut(Axis(1), j)
                    .assign(&ArrayView1::from(sample.abundance.tpm.as_slice()));
            }
        }

        metadata.set_row(j, name, sample.run_info)?;
        progress.sample_done(j, name);
    }
    progress.finish();

    log::info!(
        "Aggregated {} samples, {} warnings",
        n_samples,
        warnings.len()
    );

    QuantExperiment::new(names, metadata, features, counts, tpm, offset, warnings)
}

/// `None` when the sample's features line up row for row with the batch.
fn check_alignment(
    sample: &SampleQuant,
    features: &FeatureInfo,
    name: &str,
    dir: &std::path::Path,
) -> Option<BatchWarning> {
    let found = sample.abundance.n_features();
    if found != features.len() {
        return Some(BatchWarning::FeatureCountMismatch {
            sample: name.to_string(),
            dir: dir.to_path_buf(),
            expected: features.len(),
            found,
        });
    }
    sample
        .abundance
        .target_ids
        .iter()
        .zip(features.ids())
        .position(|(a, b)| a != b)
        .map(|first_mismatch| BatchWarning::FeatureIdMismatch {
            sample: name.to_string(),
            dir: dir.to_path_buf(),
            first_mismatch,
        })
}
