use crate::error::QuantError;
use anyhow::Context;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

/// Run metadata of one quantification run as a single-row table.
///
/// Field order follows the JSON object as written on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInfo {
    fields: Vec<String>,
    values: Vec<Value>,
}

impl RunInfo {
    pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QuantError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open run info {}", path.display()))?;
        Self::from_reader(file, path)
    }

    /// Parse a flat JSON object. `source` only labels errors.
    pub fn from_reader<R: Read>(reader: R, source: &Path) -> anyhow::Result<Self> {
        let malformed = |reason: String| QuantError::MalformedRunInfo {
            path: source.to_path_buf(),
            reason,
        };

        let value: Value =
            serde_json::from_reader(reader).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(malformed("top level is not a JSON object".to_string()).into());
        };

        Self::from_map(map).map_err(|key| {
            malformed(format!("field '{}' is not a scalar value", key)).into()
        })
    }

    /// Build from a JSON object, returning the first non-scalar key on failure.
    fn from_map(map: Map<String, Value>) -> Result<Self, String> {
        let mut info = RunInfo::default();
        for (key, value) in map {
            if value.is_array() || value.is_object() {
                return Err(key);
            }
            info.fields.push(key);
            info.values.push(value);
        }
        Ok(info)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn n_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| &self.values[i])
    }
}

impl FromIterator<(String, Value)> for RunInfo {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let (fields, values) = iter.into_iter().unzip();
        RunInfo { fields, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> anyhow::Result<RunInfo> {
        RunInfo::from_reader(text.as_bytes(), Path::new("run_info.json"))
    }

    #[test]
    fn test_keeps_file_order() {
        let info = parse(
            r#"{"n_targets": 3, "n_processed": 1000, "p_pseudoaligned": 81.2,
                "kallisto_version": "0.46.1", "call": "kallisto quant -i idx"}"#,
        )
        .unwrap();

        assert_eq!(
            info.fields(),
            &["n_targets", "n_processed", "p_pseudoaligned", "kallisto_version", "call"]
        );
        assert_eq!(info.get("n_processed"), Some(&json!(1000)));
        assert_eq!(info.get("kallisto_version"), Some(&json!("0.46.1")));
        assert_eq!(info.get("absent"), None);
    }

    #[test]
    fn test_rejects_nested_values() {
        let err = parse(r#"{"n_targets": 3, "opts": {"bias": true}}"#).unwrap_err();
        assert!(err.to_string().contains("field 'opts' is not a scalar value"));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QuantError>(),
            Some(QuantError::MalformedRunInfo { .. })
        ));
        assert!(parse("not json").is_err());
    }
}
