use crate::error::QuantError;
use crate::io::{AbundanceTable, QuantLayout, RunInfo};
use std::path::Path;

/// Parsed output of one quantification run.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuant {
    pub abundance: AbundanceTable,
    pub run_info: RunInfo,
}

/// Read the abundance table and run info from one run directory.
///
/// Both files must exist before anything is parsed, so a failure never leaves a
/// partial result behind. The directory is expected to hold exactly one run;
/// nothing here detects a directory that mixes the output of several samples.
///
/// # Errors
/// * [`QuantError::FileNotFound`] if either file is absent (abundance is checked first)
/// * [`QuantError::MalformedAbundance`] / [`QuantError::MalformedRunInfo`] on parse failures
pub fn read_sample<P: AsRef<Path>>(dir: P, layout: &QuantLayout) -> anyhow::Result<SampleQuant> {
    let dir = dir.as_ref();
    let abundance_path = layout.abundance_path(dir);
    let run_info_path = layout.run_info_path(dir);

    for path in [&abundance_path, &run_info_path] {
        if !path.is_file() {
            return Err(QuantError::FileNotFound { path: path.clone() }.into());
        }
    }

    log::debug!("Reading quantification output from {}", dir.display());

    Ok(SampleQuant {
        abundance: AbundanceTable::read(&abundance_path)?,
        run_info: RunInfo::read(&run_info_path)?,
    })
}
