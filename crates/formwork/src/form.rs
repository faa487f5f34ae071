//! The form handle: construction, settle boundary, validation rounds,
//! and the submit/reset lifecycle.

use crate::config::{self, FormConfig};
use crate::context::{FormContext, SetValuesMode};
use crate::devtools::FormStateSnapshot;
use crate::field::{FieldOptions, FormField};
use crate::group::FormGroup;
use crate::repeater::{Repeater, RepeaterOptions};
use crate::txn::TransactionManager;
use crate::validation::{FieldError, SchemaValidator, ValidationMode, ValidationResult};
use formwork_state::{Path, Value, ValueSource};
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

/// Options for [`Form::new`].
#[derive(Default)]
pub struct FormOptions {
    /// Initial values: immediate, getter, or async.
    pub initial_values: Option<ValueSource>,
    /// Root schema validator, if any.
    pub schema: Option<Arc<dyn SchemaValidator>>,
    /// Config override; defaults to the process-wide config.
    pub config: Option<FormConfig>,
}

impl FormOptions {
    /// Set the initial values (builder pattern).
    pub fn with_initial_values(mut self, source: impl Into<ValueSource>) -> Self {
        self.initial_values = Some(source.into());
        self
    }

    /// Set the root schema (builder pattern).
    pub fn with_schema(mut self, schema: Arc<dyn SchemaValidator>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the config (builder pattern).
    pub fn with_config(mut self, config: FormConfig) -> Self {
        self.config = Some(config);
        self
    }
}

pub(crate) struct FormInner {
    id: String,
    ctx: FormContext,
    txns: TransactionManager,
    schema: Option<Arc<dyn SchemaValidator>>,
    groups: Mutex<Vec<Weak<FormGroup>>>,
    last_reported: Mutex<Vec<String>>,
    config: FormConfig,
}

/// A cheaply clonable handle to one form.
///
/// The form owns the [`FormContext`] and the transaction batch; fields,
/// groups, and repeaters each hold a clone of this handle.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl Form {
    /// Create a form.
    ///
    /// ```
    /// use formwork::{Form, FormOptions};
    /// use serde_json::json;
    ///
    /// let form = Form::new(FormOptions::default().with_initial_values(json!({"name": ""})));
    /// assert!(!form.is_dirty());
    /// ```
    pub fn new(options: FormOptions) -> Self {
        let config = options.config.unwrap_or_else(config::get_config);
        let source = options
            .initial_values
            .unwrap_or(ValueSource::Value(Value::Object(Default::default())));
        Self {
            inner: Arc::new(FormInner {
                id: config::next_id(&config.id_prefix),
                ctx: FormContext::new(source),
                txns: TransactionManager::new(),
                schema: options.schema,
                groups: Mutex::new(Vec::new()),
                last_reported: Mutex::new(Vec::new()),
                config,
            }),
        }
    }

    /// The generated form id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The config captured at construction.
    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    /// The form context (state owner).
    pub fn context(&self) -> &FormContext {
        &self.inner.ctx
    }

    /// The transaction manager collecting this form's pending batch.
    pub fn transactions(&self) -> &TransactionManager {
        &self.inner.txns
    }

    /// Commit the pending transaction batch.
    ///
    /// This is the explicit update-cycle boundary: everything enqueued
    /// since the last settle commits together, in kind-precedence order.
    pub fn settle(&self) {
        self.inner.txns.flush(&self.inner.ctx);
    }

    /// Resolve an async initial-value source, if one is parked.
    ///
    /// Fills the snapshots and merges the resolved tree into live
    /// values. No-op for sync sources or after the first resolution.
    pub async fn hydrate(&self) {
        if let Some(pending) = self.inner.ctx.take_pending_source() {
            let resolved = pending.await;
            self.inner.ctx.complete_hydration(resolved);
        }
    }

    // ===== Consumers =====

    /// Mount a form-bound field at a path.
    pub fn field(&self, path: impl Into<Path>, options: FieldOptions) -> FormField {
        FormField::mount(self.clone(), path.into(), options)
    }

    /// Mount a repeater (array controller) at a path.
    pub fn repeater(&self, path: impl Into<Path>, options: RepeaterOptions) -> Repeater {
        Repeater::mount(self.clone(), path.into(), options)
    }

    /// Create a validation-scoping group directly under this form.
    pub fn group(&self, name: &str, schema: Option<Arc<dyn SchemaValidator>>) -> Arc<FormGroup> {
        FormGroup::new(self.clone(), name, schema)
    }

    pub(crate) fn register_group(&self, group: Weak<FormGroup>) {
        self.inner
            .groups
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(group);
    }

    fn live_groups(&self) -> Vec<Arc<FormGroup>> {
        let mut groups = self.inner.groups.lock().unwrap_or_else(|e| e.into_inner());
        groups.retain(|g| g.strong_count() > 0);
        groups.iter().filter_map(Weak::upgrade).collect()
    }

    // ===== State shortcuts =====

    /// Deep clone of the live values.
    pub fn values(&self) -> Value {
        self.inner.ctx.values()
    }

    /// Read a field value.
    pub fn get_field_value(&self, path: impl Into<Path>) -> Option<Value> {
        self.inner.ctx.get_field_value(&path.into())
    }

    /// Write a field value directly (not batched).
    pub fn set_field_value(&self, path: impl Into<Path>, value: Value) {
        self.inner.ctx.set_field_value(&path.into(), value);
    }

    /// Replace or merge the whole values tree.
    pub fn set_values(&self, values: &Value, mode: SetValuesMode) {
        self.inner.ctx.set_values(values, mode);
    }

    /// Merge new initial values; move `originals` only when asked.
    pub fn set_initial_values(&self, values: &Value, also_originals: bool) {
        self.inner.ctx.set_initial_values(values, also_originals);
    }

    /// Whether live values differ from the reset baseline.
    pub fn is_dirty(&self) -> bool {
        self.inner.ctx.is_dirty()
    }

    /// Whether the error map is empty.
    pub fn is_valid(&self) -> bool {
        self.inner.ctx.is_valid()
    }

    /// Current errors as path-keyed records.
    pub fn errors(&self) -> Vec<FieldError> {
        self.inner
            .ctx
            .errors()
            .into_iter()
            .map(|(path, messages)| FieldError::new(path, messages))
            .collect()
    }

    /// Whether a submit round is in flight.
    pub fn is_submitting(&self) -> bool {
        self.inner.ctx.is_submitting()
    }

    /// Number of submit attempts so far.
    pub fn submit_count(&self) -> u64 {
        self.inner.ctx.submit_count()
    }

    // ===== Validation =====

    /// `Schema` when a root schema is present, else `Aggregate`.
    pub fn validation_mode(&self) -> ValidationMode {
        if self.inner.schema.is_some() {
            ValidationMode::Schema
        } else {
            ValidationMode::Aggregate
        }
    }

    /// Run the root schema only (the terminal step of a group cascade).
    ///
    /// Clears exactly the error paths the root schema reported last
    /// round, so group-owned errors survive.
    pub async fn request_validation(&self) -> ValidationResult {
        let Some(schema) = &self.inner.schema else {
            return ValidationResult::valid();
        };
        let result = schema.parse(self.inner.ctx.values()).await;
        let mut last = self
            .inner
            .last_reported
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        self.inner.ctx.remove_errors(&last);
        last.clear();
        for error in &result.errors {
            self.inner
                .ctx
                .set_field_errors(&error.path, error.messages.clone());
            last.push(error.path.clone());
        }
        result
    }

    /// Run a full validation round: the root schema plus every
    /// registered group's schema, all awaited before returning.
    pub async fn validate_all(&self) -> ValidationResult {
        self.settle();
        let mut aggregate = self.request_validation().await;
        let groups = self.live_groups();
        let results = join_all(groups.iter().map(|g| g.validate_self())).await;
        for result in results {
            aggregate.merge(result);
        }
        aggregate
    }

    // ===== Submit / reset =====

    /// Run the submit lifecycle.
    ///
    /// Settles pending transactions, touches every field, runs a full
    /// validation round, and only if it passes invokes `cb` with a
    /// deep-cloned, disabled-filtered payload. The callback's output is
    /// returned; a failing round returns the error records instead and
    /// never invokes `cb`.
    pub async fn submit<F, Fut, T>(&self, cb: F) -> Result<T, Vec<FieldError>>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = T>,
    {
        self.inner.ctx.set_submitting(true);
        self.inner.ctx.bump_submit_count();
        self.settle();
        self.inner.ctx.touch_all();

        let round = self.validate_all().await;
        let outcome = if round.is_valid() && self.inner.ctx.is_valid() {
            Ok(cb(self.inner.ctx.submit_payload()).await)
        } else {
            Err(self.errors())
        };
        self.inner.ctx.set_submitting(false);
        outcome
    }

    /// Revert to the snapshot baseline.
    ///
    /// With a [`ResetState`], the baseline itself is replaced first.
    pub fn reset(&self, state: Option<ResetState>) {
        if let Some(state) = state {
            if let Some(values) = state.values {
                self.inner.ctx.replace_snapshots(values);
            }
            self.inner.ctx.revert_values();
            self.inner.ctx.revert_touched();
            if let Some(touched) = state.touched {
                self.inner.ctx.set_touched_tree(touched);
            }
        } else {
            self.inner.ctx.revert_values();
            self.inner.ctx.revert_touched();
        }
    }

    /// Read-only state mirror for an external inspector.
    pub fn inspect(&self) -> FormStateSnapshot {
        let ctx = &self.inner.ctx;
        FormStateSnapshot {
            id: self.inner.id.clone(),
            values: ctx.values(),
            errors: ctx.errors(),
            touched: ctx.touched(),
            dirty: ctx.is_dirty(),
            valid: ctx.is_valid(),
            is_submitting: ctx.is_submitting(),
            submit_count: ctx.submit_count(),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<FormInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<FormInner>) -> Option<Form> {
        weak.upgrade().map(|inner| Form { inner })
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.inner.id)
            .field("ctx", &self.inner.ctx)
            .finish()
    }
}

/// Optional overrides for [`Form::reset`].
#[derive(Default)]
pub struct ResetState {
    /// New baseline for both snapshots (and therefore the live values).
    pub values: Option<Value>,
    /// Replacement touched mirror; defaults to fully cleared.
    pub touched: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FnValidator;
    use formwork_state::path;
    use serde_json::json;

    #[test]
    fn test_new_form_state() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        assert_eq!(form.values(), json!({"a": 1}));
        assert!(!form.is_dirty());
        assert!(form.is_valid());
        assert_eq!(form.submit_count(), 0);
    }

    #[test]
    fn test_form_ids_unique() {
        let a = Form::new(FormOptions::default());
        let b = Form::new(FormOptions::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_set_creates_intermediate_containers() {
        let form = Form::new(FormOptions::default());
        form.set_field_value("foo.bar", json!("baz"));
        assert_eq!(form.values(), json!({"foo": {"bar": "baz"}}));
    }

    #[test]
    fn test_reset_returns_to_baseline() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        form.set_field_value("a", json!(2));
        assert!(form.is_dirty());
        form.reset(None);
        assert!(!form.is_dirty());
        assert_eq!(form.values(), json!({"a": 1}));
    }

    #[test]
    fn test_reset_with_new_baseline() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        form.reset(Some(ResetState {
            values: Some(json!({"b": 2})),
            touched: None,
        }));
        assert_eq!(form.values(), json!({"b": 2}));
        assert!(!form.is_dirty());
    }

    #[tokio::test]
    async fn test_validate_all_with_schema() {
        let schema = Arc::new(FnValidator::new(|values: Value| {
            if values.get("name").and_then(|v| v.as_str()).unwrap_or("").is_empty() {
                crate::ValidationResult::invalid(vec![FieldError::single("name", "required")])
            } else {
                crate::ValidationResult::valid()
            }
        }));
        let form = Form::new(
            FormOptions::default()
                .with_initial_values(json!({"name": ""}))
                .with_schema(schema),
        );
        assert_eq!(form.validation_mode(), ValidationMode::Schema);

        let round = form.validate_all().await;
        assert!(!round.is_valid());
        assert!(!form.is_valid());

        form.set_field_value("name", json!("kim"));
        let round = form.validate_all().await;
        assert!(round.is_valid());
        assert!(form.is_valid());
    }

    #[tokio::test]
    async fn test_submit_invokes_callback_when_valid() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        let result = form.submit(|payload| async move { payload }).await;
        assert_eq!(result.unwrap(), json!({"a": 1}));
        assert_eq!(form.submit_count(), 1);
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_skips_callback_when_invalid() {
        let schema = Arc::new(FnValidator::new(|_| {
            crate::ValidationResult::invalid(vec![FieldError::single("a", "bad")])
        }));
        let form = Form::new(FormOptions::default().with_schema(schema));

        let result = form.submit(|_| async move { unreachable!("must not run") }).await;
        let errors: Vec<FieldError> = result.unwrap_err();
        assert_eq!(errors[0].path, "a");
        assert!(!form.is_submitting());
        assert_eq!(form.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_filters_disabled_paths() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1, "b": 2})));
        form.context().set_field_disabled(&path!("b"), true);

        let payload = form.submit(|payload| async move { payload }).await.unwrap();
        assert_eq!(payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_submit_touches_all_fields() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        let _ = form.submit(|_| async {}).await;
        assert!(form.context().is_field_touched(&path!("a")));
    }
}
