//! Schema-validated JSON loading
//!
//! Types deriving `schemars::JsonSchema` and `serde::Deserialize` get
//! [`Validatable`] for free: the JSON is first checked against the generated
//! schema, so users get every violation with its location instead of serde's
//! first-error message.

use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::Deserialize;

pub mod error;

pub use error::{Result, SchemaError};

/// Trait for types that can be validated against JSON Schema
pub trait Validatable: JsonSchema + for<'de> Deserialize<'de> {
    /// Load and validate from a JSON file
    fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::IoError(path.display().to_string(), e))?;

        Self::from_json_str(&content)
    }

    /// Load and validate from a JSON string
    fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }

    /// Validate an already parsed document, then deserialize it
    fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let violations = Self::validate_value(&value)?;
        if !violations.is_empty() {
            return Err(SchemaError::ValidationError(violations));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Every schema violation in `value`, empty when valid
    fn validate_value(value: &serde_json::Value) -> Result<Vec<String>> {
        let schema_json = serde_json::to_value(Self::generate_schema())?;
        let validator = jsonschema::validator_for(&schema_json)
            .map_err(|e| SchemaError::ValidationError(vec![e.to_string()]))?;

        Ok(validator
            .iter_errors(value)
            .map(|e| {
                let location = e.instance_path.to_string();
                if location.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", location, e)
                }
            })
            .collect())
    }

    /// Generate JSON Schema for this type
    fn generate_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Self)
    }

    /// Generate JSON Schema as a pretty JSON string
    fn schema_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Self::generate_schema())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    impl Validatable for Sample {}

    #[test]
    fn test_valid_document() {
        let sample = Sample::from_json_str(r#"{"name": "a", "count": 3}"#).unwrap();
        assert_eq!(sample.name, "a");
        assert_eq!(sample.count, 3);
    }

    #[test]
    fn test_violations_are_reported_with_location() {
        let err = Sample::from_json_str(r#"{"name": 5, "count": -1}"#).unwrap_err();
        match err {
            SchemaError::ValidationError(violations) => {
                assert_eq!(violations.len(), 2);
                assert!(violations.iter().any(|v| v.starts_with("/name")));
                assert!(violations.iter().any(|v| v.starts_with("/count")));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(Sample::from_json_str("{"), Err(SchemaError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Sample::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SchemaError::IoError(ref path, _) if path.contains("not/here")));
    }

    #[test]
    fn test_schema_json_mentions_fields() {
        let schema = Sample::schema_json().unwrap();
        assert!(schema.contains("\"name\""));
        assert!(schema.contains("\"count\""));
    }
}
