//! Readers for the on-disk output of a single quantification run.
//!
//! A run directory holds a tab-separated abundance table and a JSON run-info
//! record. Where exactly they live inside the directory is described by a
//! [`QuantLayout`], so a new tool version only needs a different layout.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use single_quant::io::{read_sample, QuantLayout};
//!
//! let sample = read_sample("quant/sample_a", &QuantLayout::default())?;
//! println!("{} features", sample.abundance.n_features());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod abundance;
pub mod layout;
pub mod run_info;
mod sample;

pub use abundance::{AbundanceRecord, AbundanceTable};
pub use layout::QuantLayout;
pub use run_info::RunInfo;
pub use sample::{read_sample, SampleQuant};
