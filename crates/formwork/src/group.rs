//! Path-prefixing validation scopes.
//!
//! A group owns no storage: it is a view over an ancestor form's value
//! subtree, with its own optional schema and its own error bookkeeping.
//! Validation requested on a group cascades up the ancestor chain and
//! terminates at the root form's schema.

use crate::form::Form;
use crate::validation::{FieldError, SchemaValidator, ValidationMode, ValidationResult};
use formwork_state::{Path, Value};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// Where a group hangs: directly under a form, or under another group.
#[derive(Clone)]
pub enum GroupParent {
    /// Direct child of the root form.
    Form(Form),
    /// Nested under another group.
    Group(Arc<FormGroup>),
}

impl From<Form> for GroupParent {
    fn from(form: Form) -> Self {
        GroupParent::Form(form)
    }
}

impl From<Arc<FormGroup>> for GroupParent {
    fn from(group: Arc<FormGroup>) -> Self {
        GroupParent::Group(group)
    }
}

/// A validation-scoping subtree of a form.
pub struct FormGroup {
    parent: GroupParent,
    name: Path,
    schema: Option<Arc<dyn SchemaValidator>>,
    last_reported: Mutex<Vec<String>>,
}

impl FormGroup {
    /// Create a group and register it with the root form's dispatch
    /// list.
    ///
    /// An empty name scopes to the parent's own prefix, with a warning:
    /// a group without a name cannot isolate errors from its siblings.
    pub fn new(
        parent: impl Into<GroupParent>,
        name: &str,
        schema: Option<Arc<dyn SchemaValidator>>,
    ) -> Arc<Self> {
        let name = Path::parse(name);
        if name.is_empty() {
            tracing::warn!("form group mounted without a name; scoping to its parent");
        }
        let group = Arc::new(Self {
            parent: parent.into(),
            name,
            schema,
            last_reported: Mutex::new(Vec::new()),
        });
        group.form().register_group(Arc::downgrade(&group));
        group
    }

    /// The root form this group ultimately belongs to.
    pub fn form(&self) -> Form {
        match &self.parent {
            GroupParent::Form(form) => form.clone(),
            GroupParent::Group(parent) => parent.form(),
        }
    }

    /// This group's own name segment(s).
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// The full prefix from the root form down to this group.
    pub fn prefix(&self) -> Path {
        match &self.parent {
            GroupParent::Form(_) => self.name.clone(),
            GroupParent::Group(parent) => parent.prefix().join(&self.name),
        }
    }

    /// Lift a group-relative path into the root form's path space.
    pub fn resolve(&self, path: &Path) -> Path {
        self.prefix().join(path)
    }

    /// Deep clone of this group's value subtree.
    pub fn values(&self) -> Value {
        self.form()
            .context()
            .get_field_value(&self.prefix())
            .unwrap_or(Value::Object(Default::default()))
    }

    /// Errors at or under this group's prefix.
    pub fn errors(&self) -> Vec<FieldError> {
        let prefix = self.prefix();
        self.form()
            .context()
            .errors()
            .into_iter()
            .filter(|(path, _)| Path::parse(path).starts_with(&prefix))
            .map(|(path, messages)| FieldError::new(path, messages))
            .collect()
    }

    /// Whether nothing at or under the prefix is in error.
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// `Schema` when this group has its own schema, else `Aggregate`.
    pub fn validation_mode(&self) -> ValidationMode {
        if self.schema.is_some() {
            ValidationMode::Schema
        } else {
            ValidationMode::Aggregate
        }
    }

    /// Run this group's own schema against its subtree.
    ///
    /// Clears exactly the error paths this group reported last round,
    /// then writes the new prefixed errors. Sibling scopes are never
    /// touched.
    pub async fn validate_self(&self) -> ValidationResult {
        let Some(schema) = &self.schema else {
            return ValidationResult::valid();
        };
        let result = schema.parse(self.values()).await;
        let prefixed = result.prefixed(&self.prefix());

        let ctx_form = self.form();
        let ctx = ctx_form.context();
        let mut last = self.last_reported.lock().unwrap_or_else(|e| e.into_inner());
        ctx.remove_errors(&last);
        last.clear();
        for error in &prefixed.errors {
            ctx.set_field_errors(&error.path, error.messages.clone());
            last.push(error.path.clone());
        }
        prefixed
    }

    /// Validate this group, then cascade the request up the ancestor
    /// chain to the root form's schema. Returns this group's own result.
    pub fn request_validation(self: &Arc<Self>) -> BoxFuture<'static, ValidationResult> {
        let this = Arc::clone(self);
        Box::pin(async move {
            let result = this.validate_self().await;
            match &this.parent {
                GroupParent::Form(form) => {
                    form.request_validation().await;
                }
                GroupParent::Group(parent) => {
                    parent.request_validation().await;
                }
            }
            result
        })
    }

    /// Create a nested group under this one.
    pub fn group(
        self: &Arc<Self>,
        name: &str,
        schema: Option<Arc<dyn SchemaValidator>>,
    ) -> Arc<FormGroup> {
        FormGroup::new(Arc::clone(self), name, schema)
    }
}

impl std::fmt::Debug for FormGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormGroup")
            .field("prefix", &self.prefix().to_string())
            .field("mode", &self.validation_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormOptions;
    use crate::validation::FnValidator;
    use formwork_state::path;
    use serde_json::json;

    fn require(field: &'static str) -> Arc<dyn SchemaValidator> {
        Arc::new(FnValidator::new(move |values: Value| {
            let missing = values
                .get(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .is_empty();
            if missing {
                ValidationResult::invalid(vec![FieldError::single(field, "required")])
            } else {
                ValidationResult::valid()
            }
        }))
    }

    #[test]
    fn test_prefix_chain() {
        let form = Form::new(FormOptions::default());
        let outer = form.group("address", None);
        let inner = outer.group("street", None);
        assert_eq!(inner.prefix().to_string(), "address.street");
        assert_eq!(inner.resolve(&path!("name")).to_string(), "address.street.name");
    }

    #[test]
    fn test_values_subtree() {
        let form = Form::new(
            FormOptions::default().with_initial_values(json!({"address": {"city": "Oslo"}})),
        );
        let group = form.group("address", None);
        assert_eq!(group.values(), json!({"city": "Oslo"}));
    }

    #[test]
    fn test_aggregate_mode_without_schema() {
        let form = Form::new(FormOptions::default());
        let group = form.group("g", None);
        assert_eq!(group.validation_mode(), ValidationMode::Aggregate);
    }

    #[tokio::test]
    async fn test_errors_written_at_prefixed_path() {
        let form = Form::new(
            FormOptions::default().with_initial_values(json!({"address": {"city": ""}})),
        );
        let group = form.group("address", Some(require("city")));

        let result = group.validate_self().await;
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].path, "address.city");
        assert_eq!(
            form.context().field_errors(&path!("address", "city")),
            vec!["required"]
        );
    }

    #[tokio::test]
    async fn test_revalidate_clears_only_own_errors() {
        let form = Form::new(FormOptions::default().with_initial_values(
            json!({"billing": {"city": ""}, "shipping": {"city": ""}}),
        ));
        let billing = form.group("billing", Some(require("city")));
        let shipping = form.group("shipping", Some(require("city")));

        billing.validate_self().await;
        shipping.validate_self().await;
        assert_eq!(form.errors().len(), 2);

        form.set_field_value("billing.city", json!("Oslo"));
        billing.validate_self().await;

        // Billing's error cleared, shipping's untouched.
        assert!(billing.is_valid());
        assert!(!shipping.is_valid());
        assert_eq!(
            form.context().field_errors(&path!("shipping", "city")),
            vec!["required"]
        );
    }

    #[tokio::test]
    async fn test_cascade_reaches_root_schema() {
        let root_schema = Arc::new(FnValidator::new(|values: Value| {
            if values.get("accepted") == Some(&json!(true)) {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid(vec![FieldError::single("accepted", "must accept")])
            }
        }));
        let form = Form::new(
            FormOptions::default()
                .with_initial_values(json!({"accepted": false, "address": {"city": "x"}}))
                .with_schema(root_schema),
        );
        let group = form.group("address", Some(require("city")));

        let own = group.request_validation().await;
        assert!(own.is_valid());
        // The cascade ran the root schema too.
        assert_eq!(
            form.context().field_errors(&path!("accepted")),
            vec!["must accept"]
        );
    }

    #[tokio::test]
    async fn test_form_validation_round_includes_groups() {
        let form = Form::new(
            FormOptions::default().with_initial_values(json!({"address": {"city": ""}})),
        );
        let group = form.group("address", Some(require("city")));

        let round = form.validate_all().await;
        assert!(!round.is_valid());
        assert!(!group.is_valid());

        form.set_field_value("address.city", json!("Oslo"));
        let round = form.validate_all().await;
        assert!(round.is_valid());
        assert!(form.is_valid());
    }
}
