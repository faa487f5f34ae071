//! The pluggable schema-validation contract.
//!
//! Validators are black boxes behind [`SchemaValidator`]: they receive a
//! value tree and return path-keyed errors. Errors are data, never
//! exceptions. A failing validation is a normal, recoverable outcome.

use async_trait::async_trait;
use formwork_state::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors for one path, messages preserved in insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dot-notation path of the failing field.
    pub path: String,
    /// One or more messages for this path, in order.
    pub messages: Vec<String>,
}

impl FieldError {
    /// Create an error for a path.
    pub fn new(path: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            path: path.into(),
            messages,
        }
    }

    /// Create a single-message error for a path.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            messages: vec![message.into()],
        }
    }
}

/// The outcome of running a schema validator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Path-keyed errors; empty means the input passed.
    pub errors: Vec<FieldError>,
    /// Optional parsed/transformed output produced by the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ValidationResult {
    /// A passing result with no output.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A passing result carrying schema output.
    pub fn valid_with_output(output: Value) -> Self {
        Self {
            errors: Vec::new(),
            output: Some(output),
        }
    }

    /// A failing result.
    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            output: None,
        }
    }

    /// Whether the validated input passed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Return a copy with every error path prefixed.
    ///
    /// Groups use this to lift subtree-relative paths into the root
    /// form's path space.
    pub fn prefixed(&self, prefix: &Path) -> Self {
        if prefix.is_empty() {
            return self.clone();
        }
        Self {
            errors: self
                .errors
                .iter()
                .map(|e| FieldError {
                    path: prefix.join(&Path::parse(&e.path)).to_string(),
                    messages: e.messages.clone(),
                })
                .collect(),
            output: self.output.clone(),
        }
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        if other.output.is_some() {
            self.output = other.output;
        }
    }
}

/// How a form or group validates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// A schema function is present and drives validation.
    Schema,
    /// No schema: validity rolls up from children.
    Aggregate,
}

/// A pluggable schema validator.
///
/// Implementations must tolerate arbitrary nested value shapes and
/// return paths in the same dot/escaped-bracket notation the path
/// utility produces.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    /// Validate a value tree.
    async fn parse(&self, values: Value) -> ValidationResult;
}

/// Adapter turning a plain closure into a [`SchemaValidator`].
///
/// Handy for tests and simple inline rules.
pub struct FnValidator<F>(F);

impl<F> FnValidator<F>
where
    F: Fn(Value) -> ValidationResult + Send + Sync,
{
    /// Wrap a synchronous validation closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> SchemaValidator for FnValidator<F>
where
    F: Fn(Value) -> ValidationResult + Send + Sync,
{
    async fn parse(&self, values: Value) -> ValidationResult {
        (self.0)(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_state::path;
    use serde_json::json;

    #[test]
    fn test_result_validity() {
        assert!(ValidationResult::valid().is_valid());
        assert!(!ValidationResult::invalid(vec![FieldError::single("a", "bad")]).is_valid());
    }

    #[test]
    fn test_prefixed_lifts_paths() {
        let result = ValidationResult::invalid(vec![FieldError::single("street", "required")]);
        let lifted = result.prefixed(&path!("address"));
        assert_eq!(lifted.errors[0].path, "address.street");
    }

    #[test]
    fn test_prefixed_root_is_identity() {
        let result = ValidationResult::invalid(vec![FieldError::single("a", "bad")]);
        assert_eq!(result.prefixed(&path!()), result);
    }

    #[test]
    fn test_merge_preserves_message_order() {
        let mut a = ValidationResult::invalid(vec![FieldError::new(
            "x",
            vec!["first".into(), "second".into()],
        )]);
        a.merge(ValidationResult::invalid(vec![FieldError::single(
            "y", "third",
        )]));
        assert_eq!(a.errors[0].messages, vec!["first", "second"]);
        assert_eq!(a.errors[1].path, "y");
    }

    #[tokio::test]
    async fn test_fn_validator() {
        let v = FnValidator::new(|values: Value| {
            if values.get("name").is_some() {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid(vec![FieldError::single("name", "name is required")])
            }
        });

        assert!(v.parse(json!({"name": "kim"})).await.is_valid());
        assert!(!v.parse(json!({})).await.is_valid());
    }

    #[test]
    fn test_field_error_serde() {
        let e = FieldError::new("user.email", vec!["invalid".into()]);
        let json = serde_json::to_string(&e).unwrap();
        let parsed: FieldError = serde_json::from_str(&json).unwrap();
        assert_eq!(e, parsed);
    }
}
