//! Per-control binding units.
//!
//! A field is either *form-bound*, where its value is a projection into the
//! owning form's context at a path, or *pathless*, owning a local value
//! and touched cell. The binding is dynamic: [`FormField::set_path`]
//! migrates the value between local storage and the form context, and
//! between paths, through the transaction batch so same-tick rebinding
//! reconciles correctly.
//!
//! Nothing here throws: operations whose preconditions are unmet log a
//! warning and do nothing, so fields stay usable standalone.

use crate::form::Form;
use crate::txn::Transaction;
use formwork_state::{Path, Value};
use std::sync::Mutex;

/// Options for mounting a form-bound field.
#[derive(Clone, Debug, Default)]
pub struct FieldOptions {
    /// The field's own initial value. Authoritative on mount: it wins
    /// over a stale form-provided initial when they differ.
    pub initial: Option<Value>,
    /// Whether the field starts disabled (excluded from submit).
    pub disabled: bool,
}

impl FieldOptions {
    /// Set the initial value (builder pattern).
    pub fn with_initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Set the disabled flag (builder pattern).
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// One control's binding into a form, or freestanding state without one.
pub struct FormField {
    form: Option<Form>,
    path: Mutex<Option<Path>>,
    local_value: Mutex<Value>,
    local_touched: Mutex<bool>,
    initial: Value,
}

impl FormField {
    /// Mount a form-bound field (used by [`Form::field`]).
    pub(crate) fn mount(form: Form, path: Path, options: FieldOptions) -> Self {
        let ctx = form.context();

        // The captured initial drives this field's dirty comparison.
        let initial = options
            .initial
            .clone()
            .or_else(|| ctx.initial_at(&path))
            .or_else(|| ctx.get_field_value(&path))
            .unwrap_or(Value::Null);

        form.transactions().transaction(ctx, |view| {
            match (&options.initial, view.is_field_set(&path)) {
                // Nothing registered yet: claim the path, falling back
                // to the form's pending initial when the field brings
                // none.
                (provided, false) => Some(
                    Transaction::init(path.clone(), provided.clone())
                        .with_disabled(options.disabled),
                ),
                // The form holds a different value than this field's
                // own initial: the field is authoritative on mount.
                (Some(value), true) if view.get_field_value(&path).as_ref() != Some(value) => {
                    Some(
                        Transaction::init(path.clone(), Some(value.clone()))
                            .with_disabled(options.disabled),
                    )
                }
                // Already registered with the right value: only the
                // disabled flag needs recording.
                _ => {
                    view.set_field_disabled(&path, options.disabled);
                    None
                }
            }
        });

        Self {
            form: Some(form),
            path: Mutex::new(Some(path)),
            local_value: Mutex::new(Value::Null),
            local_touched: Mutex::new(false),
            initial,
        }
    }

    /// Create a pathless field owning its own state.
    pub fn detached(initial: Value) -> Self {
        Self {
            form: None,
            path: Mutex::new(None),
            local_value: Mutex::new(initial.clone()),
            local_touched: Mutex::new(false),
            initial,
        }
    }

    fn lock_path(&self) -> std::sync::MutexGuard<'_, Option<Path>> {
        self.path.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The current binding path, if any.
    pub fn path(&self) -> Option<Path> {
        self.lock_path().clone()
    }

    /// Whether this field currently projects into a form.
    pub fn is_bound(&self) -> bool {
        self.form.is_some() && self.lock_path().is_some()
    }

    /// The current value.
    pub fn value(&self) -> Value {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => {
                form.context().get_field_value(path).unwrap_or(Value::Null)
            }
            _ => self
                .local_value
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    /// Write the value, through the form context when bound.
    pub fn set_value(&self, value: Value) {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => form.context().set_field_value(path, value),
            _ => *self.local_value.lock().unwrap_or_else(|e| e.into_inner()) = value,
        }
    }

    /// Whether the field has been interacted with.
    pub fn is_touched(&self) -> bool {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => form.context().is_field_touched(path),
            _ => *self.local_touched.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }

    /// Mark or unmark the field as touched.
    pub fn set_touched(&self, touched: bool) {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => form.context().set_field_touched(path, touched),
            _ => *self.local_touched.lock().unwrap_or_else(|e| e.into_inner()) = touched,
        }
    }

    /// Whether the current value differs from the captured initial.
    ///
    /// Clone-compared, never reference-compared: two structurally equal
    /// trees are clean.
    pub fn is_dirty(&self) -> bool {
        self.value() != self.initial
    }

    /// Current error messages for this field's path.
    pub fn errors(&self) -> Vec<String> {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => form.context().field_errors(path),
            _ => Vec::new(),
        }
    }

    /// Toggle the disabled flag for this field's path.
    pub fn set_disabled(&self, disabled: bool) {
        match (&self.form, self.lock_path().as_ref()) {
            (Some(form), Some(path)) => form.context().set_field_disabled(path, disabled),
            _ => tracing::warn!("set_disabled on a field without a form path is a no-op"),
        }
    }

    /// Rebind the field, migrating its value with the rename.
    ///
    /// Old-path release and new-path claim go through the same batch, so
    /// a sibling reclaiming the old path in the same tick wins over the
    /// release.
    pub fn set_path(&self, new_path: Option<Path>) {
        let Some(form) = &self.form else {
            if new_path.is_some() {
                tracing::warn!("cannot bind a detached field: no owning form");
            }
            return;
        };

        let mut slot = self.lock_path();
        if *slot == new_path {
            return;
        }
        let old_path = slot.clone();

        let (migrated, touched) = match &old_path {
            Some(old) => (
                form.context().get_field_value(old).unwrap_or(Value::Null),
                form.context().is_field_touched(old),
            ),
            None => (
                self.local_value
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone(),
                *self.local_touched.lock().unwrap_or_else(|e| e.into_inner()),
            ),
        };

        if let Some(old) = &old_path {
            form.transactions().enqueue(Transaction::unset(old.clone()));
        }
        match &new_path {
            Some(new) => {
                form.transactions()
                    .enqueue(Transaction::set(new.clone(), migrated).with_touched(touched));
            }
            None => {
                *self.local_value.lock().unwrap_or_else(|e| e.into_inner()) = migrated;
                *self.local_touched.lock().unwrap_or_else(|e| e.into_inner()) = touched;
            }
        }
        *slot = new_path;
    }

    /// Release the field's path permanently (component unmount).
    pub fn unmount(&self) {
        if let (Some(form), Some(path)) = (&self.form, self.lock_path().as_ref()) {
            let path = path.clone();
            form.transactions()
                .transaction(form.context(), |_| Some(Transaction::destroy(path)));
        }
    }
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("path", &self.path())
            .field("bound", &self.is_bound())
            .finish()
    }
}
