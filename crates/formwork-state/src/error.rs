//! Error types for value-tree operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for value-tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while mutating a value tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// A container of the wrong type was found on the path.
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: Path,
        /// The expected container type.
        expected: &'static str,
        /// The actual type found.
        found: &'static str,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TreeError {
    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        TreeError::TypeMismatch {
            path,
            expected,
            found,
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = TreeError::type_mismatch(path!("users", 0), "array", "object");
        assert!(err.to_string().contains("type mismatch"));
        assert!(err.to_string().contains("users.0"));
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(value_type_name(&json!(null)), "null");
        assert_eq!(value_type_name(&json!(true)), "boolean");
        assert_eq!(value_type_name(&json!(1)), "number");
        assert_eq!(value_type_name(&json!("x")), "string");
        assert_eq!(value_type_name(&json!([])), "array");
        assert_eq!(value_type_name(&json!({})), "object");
    }
}
