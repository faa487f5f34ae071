//! Read-only state mirror for external inspectors.
//!
//! Forms opt in via [`register`]. The registry holds weak handles only,
//! so it never keeps a form alive; dead entries are pruned on access.
//! The control surface is deliberately limited to trigger-validate and
//! trigger-reset; everything else is one-way observation.

use crate::form::{Form, FormInner};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, Weak};

/// A point-in-time mirror of one form's observable state.
#[derive(Clone, Debug, Serialize)]
pub struct FormStateSnapshot {
    /// The form's generated id.
    pub id: String,
    /// Deep clone of the live values.
    pub values: Value,
    /// Path-keyed error messages.
    pub errors: BTreeMap<String, Vec<String>>,
    /// The touched mirror.
    pub touched: Value,
    /// Whether values differ from the reset baseline.
    pub dirty: bool,
    /// Whether the error map is empty.
    pub valid: bool,
    /// Whether a submit round is in flight.
    pub is_submitting: bool,
    /// Submit attempts so far.
    pub submit_count: u64,
}

fn registry() -> &'static Mutex<BTreeMap<String, Weak<FormInner>>> {
    static REGISTRY: OnceLock<Mutex<BTreeMap<String, Weak<FormInner>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn lock() -> std::sync::MutexGuard<'static, BTreeMap<String, Weak<FormInner>>> {
    registry().lock().unwrap_or_else(|e| e.into_inner())
}

/// Register a form for inspection.
pub fn register(form: &Form) {
    lock().insert(form.id().to_owned(), form.downgrade());
}

/// Remove a form from the registry.
pub fn unregister(id: &str) {
    lock().remove(id);
}

/// Ids of all live registered forms.
pub fn form_ids() -> Vec<String> {
    let mut reg = lock();
    reg.retain(|_, weak| weak.strong_count() > 0);
    reg.keys().cloned().collect()
}

fn live_form(id: &str) -> Option<Form> {
    lock().get(id).and_then(Form::upgrade)
}

/// Snapshot a registered form's state.
pub fn inspect(id: &str) -> Option<FormStateSnapshot> {
    live_form(id).map(|form| form.inspect())
}

/// Trigger a full validation round on a registered form.
pub async fn trigger_validate(id: &str) -> bool {
    match live_form(id) {
        Some(form) => {
            form.validate_all().await;
            true
        }
        None => false,
    }
}

/// Trigger a reset on a registered form.
pub fn trigger_reset(id: &str) -> bool {
    match live_form(id) {
        Some(form) => {
            form.reset(None);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormOptions;
    use serde_json::json;

    #[test]
    fn test_register_inspect_unregister() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        register(&form);

        let snapshot = inspect(form.id()).expect("registered");
        assert_eq!(snapshot.values, json!({"a": 1}));
        assert!(snapshot.valid);
        assert!(!snapshot.dirty);

        unregister(form.id());
        assert!(inspect(form.id()).is_none());
    }

    #[test]
    fn test_dropped_form_is_pruned() {
        let id = {
            let form = Form::new(FormOptions::default());
            register(&form);
            form.id().to_owned()
        };
        assert!(!form_ids().contains(&id));
        assert!(inspect(&id).is_none());
    }

    #[test]
    fn test_trigger_reset() {
        let form = Form::new(FormOptions::default().with_initial_values(json!({"a": 1})));
        register(&form);
        form.set_field_value("a", json!(2));

        assert!(trigger_reset(form.id()));
        assert_eq!(form.values(), json!({"a": 1}));

        unregister(form.id());
        assert!(!trigger_reset(form.id()));
    }

    #[test]
    fn test_snapshot_serializes() {
        let form = Form::new(FormOptions::default());
        let json = serde_json::to_value(form.inspect()).unwrap();
        assert!(json.get("submit_count").is_some());
    }
}
