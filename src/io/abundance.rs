use crate::error::QuantError;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// One row of an abundance table, matched to the file by header name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbundanceRecord {
    pub target_id: String,
    pub length: u64,
    pub eff_length: f64,
    pub est_counts: f64,
    pub tpm: f64,
}

/// Per-sample abundance table in canonical column order:
/// identifier, length, effective length, estimated counts, TPM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbundanceTable {
    pub target_ids: Vec<String>,
    pub lengths: Vec<u64>,
    pub eff_lengths: Vec<f64>,
    pub est_counts: Vec<f64>,
    pub tpm: Vec<f64>,
}

impl AbundanceTable {
    /// Read a tab-separated abundance file.
    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QuantError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open abundance table {}", path.display()))?;
        Self::from_reader(file, path)
    }

    /// Parse an abundance table from any reader. `source` only labels errors.
    pub fn from_reader<R: Read>(reader: R, source: &Path) -> anyhow::Result<Self> {
        let malformed = |reason: String| QuantError::MalformedAbundance {
            path: source.to_path_buf(),
            reason,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);

        let mut table = AbundanceTable::default();
        let mut seen = HashSet::new();

        for (i, row) in csv_reader.deserialize::<AbundanceRecord>().enumerate() {
            let record = row.map_err(|e| malformed(e.to_string()))?;
            // header occupies line 1
            let line = i + 2;

            if record.length == 0 {
                return Err(malformed(format!("line {}: length must be positive", line)).into());
            }
            for (name, value) in [
                ("eff_length", record.eff_length),
                ("est_counts", record.est_counts),
                ("tpm", record.tpm),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(malformed(format!(
                        "line {}: {} must be a non-negative number, got {}",
                        line, name, value
                    ))
                    .into());
                }
            }
            if !seen.insert(record.target_id.clone()) {
                return Err(malformed(format!(
                    "line {}: duplicate target id '{}'",
                    line, record.target_id
                ))
                .into());
            }

            table.push(record);
        }

        Ok(table)
    }

    fn push(&mut self, record: AbundanceRecord) {
        self.target_ids.push(record.target_id);
        self.lengths.push(record.length);
        self.eff_lengths.push(record.eff_length);
        self.est_counts.push(record.est_counts);
        self.tpm.push(record.tpm);
    }

    pub fn n_features(&self) -> usize {
        self.target_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }

    /// Iterate rows back out as records, in file order.
    pub fn records(&self) -> impl Iterator<Item = AbundanceRecord> + '_ {
        (0..self.n_features()).map(move |i| AbundanceRecord {
            target_id: self.target_ids[i].clone(),
            length: self.lengths[i],
            eff_length: self.eff_lengths[i],
            est_counts: self.est_counts[i],
            tpm: self.tpm[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(text: &str) -> anyhow::Result<AbundanceTable> {
        AbundanceTable::from_reader(text.as_bytes(), Path::new("abundance.tsv"))
    }

    #[test]
    fn test_reorders_swapped_columns() {
        // tpm before est_counts on disk
        let text = "target_id\tlength\teff_length\ttpm\test_counts\n\
                    tx1\t1500\t1350.5\t120.25\t42\n\
                    tx2\t800\t650\t0\t0\n";
        let table = parse(text).unwrap();

        assert_eq!(table.target_ids, vec!["tx1", "tx2"]);
        assert_eq!(table.lengths, vec![1500, 800]);
        assert_relative_eq!(table.eff_lengths[0], 1350.5);
        assert_relative_eq!(table.est_counts[0], 42.0);
        assert_relative_eq!(table.tpm[0], 120.25);
        assert_relative_eq!(table.tpm[1], 0.0);
    }

    #[test]
    fn test_native_column_order() {
        let text = "target_id\tlength\teff_length\test_counts\ttpm\ntx1\t100\t80\t5\t9.5\n";
        let table = parse(text).unwrap();
        let records: Vec<_> = table.records().collect();
        assert_eq!(records.len(), 1);
        assert_relative_eq!(records[0].est_counts, 5.0);
        assert_relative_eq!(records[0].tpm, 9.5);
    }

    #[test]
    fn test_header_only_is_empty() {
        let table = parse("target_id\tlength\teff_length\test_counts\ttpm\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let text = "target_id\tlength\teff_length\test_counts\ttpm\n\
                    tx1\t100\t80\t5\t9.5\n\
                    tx1\t100\t80\t5\t9.5\n";
        let err = parse(text).unwrap_err();
        assert!(err.to_string().contains("duplicate target id 'tx1'"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_length = "target_id\tlength\teff_length\test_counts\ttpm\ntx1\t0\t80\t5\t9.5\n";
        assert!(parse(zero_length).is_err());

        let negative = "target_id\tlength\teff_length\test_counts\ttpm\ntx1\t10\t8\t-5\t9.5\n";
        let err = parse(negative).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QuantError>(),
            Some(QuantError::MalformedAbundance { .. })
        ));

        let missing_column = "target_id\tlength\teff_length\ttpm\ntx1\t10\t8\t9.5\n";
        assert!(parse(missing_column).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AbundanceTable::read("/nonexistent/abundance.tsv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QuantError>(),
            Some(QuantError::FileNotFound { .. })
        ));
    }
}
