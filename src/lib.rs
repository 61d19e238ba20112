//! # single-quant
//!
//! A Rust library for loading RNA-seq quantification results, part of the single-rust ecosystem.
//!
//! Quantification tools write one output directory per sample: an abundance table with
//! estimated counts and TPM per transcript, and a JSON record describing the run. This crate
//! reads those directories and merges them into a single [`experiment::QuantExperiment`]
//! holding feature x sample matrices of counts, TPM and `log2(TPM + offset)`, together with
//! per-sample run metadata.
//!
//! ## Core Features
//!
//! - **Single-sample reading**: abundance tables and run info with configurable file locations
//! - **Batch aggregation**: aligned count and TPM matrices across many samples
//! - **Failure handling**: failed runs from a batch run log are excluded, misaligned samples are
//!   kept as missing columns with a recorded warning
//! - **Sparse export**: counts as a `CsrMatrix` from nalgebra-sparse for downstream analysis
//!
//! ## Module Organization
//!
//! - **[`io`]**: Per-sample file layout and parsers
//! - **[`batch`]**: Batch aggregation, run logs and progress reporting
//! - **[`experiment`]**: The aggregated result container
//! - **[`error`]**: Error types

pub mod batch;
pub mod error;
pub mod experiment;
pub mod io;

pub use batch::{aggregate, BatchInput, BatchOptions};
pub use error::QuantError;
pub use experiment::QuantExperiment;
pub use io::{read_sample, QuantLayout};
