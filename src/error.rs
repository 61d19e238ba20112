use std::path::PathBuf;

/// Typed failures raised while reading quantification output or assembling a batch.
///
/// Public functions return `anyhow::Result`, callers that need to branch on the
/// failure kind can `downcast_ref::<QuantError>()` the returned error.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Run info of sample '{sample}' does not fit the batch metadata table: expected {expected}, found {found}")]
    ShapeMismatch {
        sample: String,
        expected: String,
        found: String,
    },

    #[error("Malformed abundance table {}: {reason}", path.display())]
    MalformedAbundance { path: PathBuf, reason: String },

    #[error("Malformed run info {}: {reason}", path.display())]
    MalformedRunInfo { path: PathBuf, reason: String },

    #[error("Log offset must be a non-negative number, got {0}")]
    InvalidOffset(f64),

    #[error("No samples left to aggregate")]
    EmptyBatch,

    #[error("Sample '{sample}' has no values in the batch")]
    MissingValues { sample: String },
}
