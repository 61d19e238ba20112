//! The batch result: feature-by-sample expression matrices with their labels.
//!
//! Every matrix in a [`QuantExperiment`] is `n_features x n_samples`. Row `i`
//! always refers to `features().ids()[i]` and column `j` to `samples()[j]`.

use crate::error::QuantError;
use crate::io::RunInfo;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::{Array2, ArrayView1, Axis};
use serde_json::Value;
use std::path::PathBuf;

/// Sentinel for matrix entries of samples that could not be aligned with the batch.
pub const MISSING: f64 = f64::NAN;

/// Conditions tolerated while assembling a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWarning {
    /// Samples flagged as failed by the run log, never read.
    SamplesExcluded(Vec<String>),
    /// A sample reported a different number of features than the first sample.
    FeatureCountMismatch {
        sample: String,
        dir: PathBuf,
        expected: usize,
        found: usize,
    },
    /// Same number of features, but the identifiers differ from the first sample.
    FeatureIdMismatch {
        sample: String,
        dir: PathBuf,
        first_mismatch: usize,
    },
}

impl std::fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchWarning::SamplesExcluded(samples) => write!(
                f,
                "Samples excluded because their runs failed: {}",
                samples.join(", ")
            ),
            BatchWarning::FeatureCountMismatch {
                dir,
                expected,
                found,
                ..
            } => write!(
                f,
                "Feature count mismatch for {}: expected {}, found {}",
                dir.display(),
                expected,
                found
            ),
            BatchWarning::FeatureIdMismatch {
                dir,
                first_mismatch,
                ..
            } => write!(
                f,
                "Feature identifiers of {} differ from the batch at row {}",
                dir.display(),
                first_mismatch
            ),
        }
    }
}

/// Samples x fields table of run metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMetadata {
    fields: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl SampleMetadata {
    /// Table with `n_samples` rows of nulls over the given fields.
    pub(crate) fn new(fields: Vec<String>, n_samples: usize) -> Self {
        let rows = vec![vec![Value::Null; fields.len()]; n_samples];
        SampleMetadata { fields, rows }
    }

    /// Copy one sample's values into row `row`, matching fields by name.
    /// Fails if the record does not carry exactly the table's fields.
    pub(crate) fn set_row(
        &mut self,
        row: usize,
        sample: &str,
        info: RunInfo,
    ) -> anyhow::Result<()> {
        if info.n_fields() != self.fields.len() {
            return Err(QuantError::ShapeMismatch {
                sample: sample.to_string(),
                expected: format!("{} fields", self.fields.len()),
                found: format!("{} fields", info.n_fields()),
            }
            .into());
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match info.get(field) {
                Some(value) => values.push(value.clone()),
                None => {
                    return Err(QuantError::ShapeMismatch {
                        sample: sample.to_string(),
                        expected: format!("field '{}'", field),
                        found: "no such field".to_string(),
                    }
                    .into());
                }
            }
        }
        self.rows[row] = values;
        Ok(())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, field: &str) -> Option<&Value> {
        let col = self.fields.iter().position(|f| f == field)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// All values of one field, in sample order.
    pub fn column(&self, field: &str) -> Option<Vec<&Value>> {
        let col = self.fields.iter().position(|f| f == field)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }
}

/// Per-feature attributes, taken from the first sample of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    ids: Vec<String>,
    lengths: Vec<u64>,
}

impl FeatureInfo {
    pub(crate) fn new(ids: Vec<String>, lengths: Vec<u64>) -> Self {
        FeatureInfo { ids, lengths }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// `log2(value + offset)` for every entry.
pub fn log2_offset(matrix: &Array2<f64>, offset: f64) -> anyhow::Result<Array2<f64>> {
    if !offset.is_finite() || offset < 0.0 {
        return Err(QuantError::InvalidOffset(offset).into());
    }
    Ok(matrix.mapv(|v| (v + offset).log2()))
}

#[derive(Debug, Clone)]
pub struct QuantExperiment {
    samples: Vec<String>,
    sample_metadata: SampleMetadata,
    features: FeatureInfo,
    counts: Array2<f64>,
    tpm: Array2<f64>,
    log_expression: Array2<f64>,
    log_offset: f64,
    warnings: Vec<BatchWarning>,
}

impl QuantExperiment {
    pub(crate) fn new(
        samples: Vec<String>,
        sample_metadata: SampleMetadata,
        features: FeatureInfo,
        counts: Array2<f64>,
        tpm: Array2<f64>,
        log_offset: f64,
        warnings: Vec<BatchWarning>,
    ) -> anyhow::Result<Self> {
        let log_expression = log2_offset(&tpm, log_offset)?;
        Ok(QuantExperiment {
            samples,
            sample_metadata,
            features,
            counts,
            tpm,
            log_expression,
            log_offset,
            warnings,
        })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn sample_metadata(&self) -> &SampleMetadata {
        &self.sample_metadata
    }

    pub fn features(&self) -> &FeatureInfo {
        &self.features
    }

    /// Estimated counts, features x samples.
    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    /// TPM, features x samples.
    pub fn tpm(&self) -> &Array2<f64> {
        &self.tpm
    }

    /// `log2(TPM + offset)`, features x samples.
    pub fn log_expression(&self) -> &Array2<f64> {
        &self.log_expression
    }

    pub fn log_offset(&self) -> f64 {
        self.log_offset
    }

    pub fn warnings(&self) -> &[BatchWarning] {
        &self.warnings
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.features.ids.iter().position(|f| f == feature)
    }

    pub fn count(&self, feature: &str, sample: &str) -> Option<f64> {
        Some(self.counts[[self.feature_index(feature)?, self.sample_index(sample)?]])
    }

    pub fn tpm_value(&self, feature: &str, sample: &str) -> Option<f64> {
        Some(self.tpm[[self.feature_index(feature)?, self.sample_index(sample)?]])
    }

    /// Count column of one sample.
    pub fn sample_counts(&self, sample: &str) -> Option<ArrayView1<'_, f64>> {
        let j = self.sample_index(sample)?;
        Some(self.counts.index_axis(Axis(1), j))
    }

    /// Samples whose columns were left unset.
    pub fn missing_samples(&self) -> Vec<&str> {
        self.counts
            .axis_iter(Axis(1))
            .zip(&self.samples)
            .filter(|(col, _)| col.iter().any(|v| v.is_nan()))
            .map(|(_, s)| s.as_str())
            .collect()
    }

    /// Estimated counts as a sparse samples x features matrix, the orientation
    /// single-cell consumers expect. Fails if any sample has unset columns.
    pub fn counts_csr(&self) -> anyhow::Result<CsrMatrix<f64>> {
        if let Some(sample) = self.missing_samples().first() {
            return Err(QuantError::MissingValues {
                sample: sample.to_string(),
            }
            .into());
        }

        let mut coo = CooMatrix::new(self.n_samples(), self.n_features());
        for ((feature, sample), &value) in self.counts.indexed_iter() {
            if value != 0.0 {
                coo.push(sample, feature, value);
            }
        }
        Ok(CsrMatrix::from(&coo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use serde_json::json;

    fn experiment() -> QuantExperiment {
        let counts = array![[10.0, 0.0, MISSING], [0.0, 3.5, MISSING]];
        let tpm = array![[100.0, 0.0, MISSING], [0.0, 7.0, MISSING]];
        let metadata = SampleMetadata::new(vec!["n_processed".to_string()], 3);
        QuantExperiment::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            metadata,
            FeatureInfo::new(vec!["tx1".to_string(), "tx2".to_string()], vec![100, 200]),
            counts,
            tpm,
            1.0,
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_log2_offset() {
        let tpm = array![[0.0, 1.0], [3.0, 15.0]];
        let result = log2_offset(&tpm, 1.0).unwrap();
        assert_relative_eq!(result[[0, 0]], 0.0);
        assert_relative_eq!(result[[0, 1]], 1.0);
        assert_relative_eq!(result[[1, 0]], 2.0);
        assert_relative_eq!(result[[1, 1]], 4.0);

        let zero_offset = log2_offset(&tpm, 0.0).unwrap();
        assert_eq!(zero_offset[[0, 0]], f64::NEG_INFINITY);

        assert!(log2_offset(&tpm, -1.0).is_err());
        assert!(log2_offset(&tpm, f64::NAN).is_err());
    }

    #[test]
    fn test_lookups() {
        let exp = experiment();
        assert_eq!(exp.count("tx1", "a"), Some(10.0));
        assert_eq!(exp.tpm_value("tx2", "b"), Some(7.0));
        assert_eq!(exp.count("tx3", "a"), None);
        assert!(exp.count("tx1", "c").unwrap().is_nan());
        assert_eq!(exp.sample_counts("b").unwrap().to_vec(), vec![0.0, 3.5]);
        assert_relative_eq!(exp.log_expression()[[0, 0]], 101f64.log2());
    }

    #[test]
    fn test_missing_samples_block_sparse_export() {
        let exp = experiment();
        assert_eq!(exp.missing_samples(), vec!["c"]);
        let err = exp.counts_csr().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QuantError>(),
            Some(QuantError::MissingValues { sample }) if sample == "c"
        ));
    }

    #[test]
    fn test_counts_csr_orientation() {
        let exp = QuantExperiment::new(
            vec!["a".to_string(), "b".to_string()],
            SampleMetadata::new(Vec::new(), 2),
            FeatureInfo::new(vec!["tx1".to_string(), "tx2".to_string()], vec![100, 200]),
            array![[10.0, 0.0], [0.0, 3.5]],
            array![[1.0, 0.0], [0.0, 1.0]],
            1.0,
            Vec::new(),
        )
        .unwrap();

        let csr = exp.counts_csr().unwrap();
        assert_eq!(csr.nrows(), 2);
        assert_eq!(csr.ncols(), 2);
        assert_eq!(csr.nnz(), 2);
        assert_eq!(csr.get_entry(1, 1).unwrap().into_value(), 3.5);
    }

    #[test]
    fn test_metadata_row_shape() {
        let mut metadata =
            SampleMetadata::new(vec!["n_targets".to_string(), "n_processed".to_string()], 2);
        let info = RunInfo::from_iter([
            ("n_targets".to_string(), json!(2)),
            ("n_processed".to_string(), json!(500)),
        ]);
        metadata.set_row(1, "b", info).unwrap();
        assert_eq!(metadata.get(1, "n_processed"), Some(&json!(500)));
        assert_eq!(metadata.row(0), Some(&[Value::Null, Value::Null][..]));
        assert_eq!(metadata.row(2), None);
        assert_eq!(metadata.column("n_targets").unwrap(), vec![&Value::Null, &json!(2)]);

        let short = RunInfo::from_iter([("n_targets".to_string(), json!(2))]);
        assert!(metadata.set_row(0, "a", short).is_err());

        let renamed = RunInfo::from_iter([
            ("n_targets".to_string(), json!(2)),
            ("n_reads".to_string(), json!(1)),
        ]);
        let err = metadata.set_row(0, "a", renamed).unwrap_err();
        assert!(err.to_string().contains("field 'n_processed'"));

        let reordered = RunInfo::from_iter([
            ("n_processed".to_string(), json!(700)),
            ("n_targets".to_string(), json!(4)),
        ]);
        metadata.set_row(0, "a", reordered).unwrap();
        assert_eq!(metadata.row(0), Some(&[json!(4), json!(700)][..]));
    }
}
