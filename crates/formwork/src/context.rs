//! The form context: exclusive owner of one form's live state.
//!
//! `FormContext` holds the `values` tree, the `touched` mirror, the flat
//! `disabled` and `errors` maps, and the snapshot pair. All mutation goes
//! through its methods; every externally returned tree is a deep clone,
//! so callers can never alias the live state.

use formwork_state::{
    deep_merge, destroy_at, get_as, get_at, is_set, leaf_paths, set_at, unset_at, Path,
    SnapshotStore, TreeResult, ValueSource,
};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// How [`FormContext::set_values`] treats existing state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetValuesMode {
    /// Delete all current top-level keys, then write each incoming
    /// top-level key as a literal map key. Dots in incoming keys are
    /// never interpreted as nesting, since forms may use dotted keys as
    /// opaque identifiers in their submitted shape.
    Replace,
    /// Deep-merge plain objects recursively; arrays and scalars
    /// overwrite.
    Merge,
}

struct ContextInner {
    values: Value,
    touched: Value,
    disabled: BTreeMap<String, bool>,
    errors: BTreeMap<String, Vec<String>>,
    snapshots: SnapshotStore,
    is_submitting: bool,
    submit_count: u64,
}

/// Exclusive owner of the live values/touched/disabled trees for one form.
pub struct FormContext {
    inner: Mutex<ContextInner>,
}

impl FormContext {
    /// Create a context from an initial-value source.
    ///
    /// Sync sources seed the live values immediately; an async source
    /// leaves them empty until [`take_pending_source`] /
    /// [`complete_hydration`] run.
    ///
    /// [`take_pending_source`]: Self::take_pending_source
    /// [`complete_hydration`]: Self::complete_hydration
    pub fn new(source: ValueSource) -> Self {
        let snapshots = SnapshotStore::new(source);
        let values = snapshots.initials().clone();
        Self {
            inner: Mutex::new(ContextInner {
                values,
                touched: Value::Object(Map::new()),
                disabled: BTreeMap::new(),
                errors: BTreeMap::new(),
                snapshots,
                is_submitting: false,
                submit_count: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ContextInner> {
        // A poisoned lock means a panic mid-mutation; the trees may be
        // torn but read access is still the least bad option.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ===== Values =====

    /// Deep clone of the live values tree.
    pub fn values(&self) -> Value {
        self.lock().values.clone()
    }

    /// Read the value at a path.
    pub fn get_field_value(&self, path: &Path) -> Option<Value> {
        get_at(&self.lock().values, path).cloned()
    }

    /// Deserialize the value at a path into a concrete type.
    ///
    /// An absent path is `Ok(None)`; a present value that does not fit
    /// the target type is an error.
    pub fn get_field_as<T: DeserializeOwned>(&self, path: &Path) -> TreeResult<Option<T>> {
        get_as(&self.lock().values, path)
    }

    /// Write a value at a path, creating intermediate containers.
    ///
    /// The value is stored as-is (owned); callers keep no handle into
    /// the tree, which is what prevents mutation at a distance.
    pub fn set_field_value(&self, path: &Path, value: Value) {
        set_at(&mut self.lock().values, path, value);
    }

    /// Blank the leaf at a path without pruning containers.
    ///
    /// Used during path migration, where the slot may be reclaimed by
    /// another field in the same batch.
    pub fn unset_path(&self, path: &Path) {
        unset_at(&mut self.lock().values, path);
    }

    /// Remove a path entirely: values, touched mirror, disabled flag,
    /// and any errors at or under it. Now-empty ancestor containers are
    /// pruned. Used when a field permanently unmounts.
    pub fn destroy_path(&self, path: &Path) {
        let mut inner = self.lock();
        destroy_at(&mut inner.values, path);
        destroy_at(&mut inner.touched, path);
        remove_under(&mut inner.disabled, path);
        remove_under(&mut inner.errors, path);
    }

    /// Distinguish "written (possibly null)" from "never written".
    pub fn is_field_set(&self, path: &Path) -> bool {
        is_set(&self.lock().values, path)
    }

    /// Replace or merge the whole values tree.
    pub fn set_values(&self, new_values: &Value, mode: SetValuesMode) {
        let mut inner = self.lock();
        match mode {
            SetValuesMode::Replace => {
                let mut map = Map::new();
                if let Some(src) = new_values.as_object() {
                    for (key, v) in src {
                        map.insert(key.clone(), v.clone());
                    }
                }
                inner.values = Value::Object(map);
            }
            SetValuesMode::Merge => deep_merge(&mut inner.values, new_values),
        }
    }

    // ===== Touched =====

    /// Deep clone of the touched mirror.
    pub fn touched(&self) -> Value {
        self.lock().touched.clone()
    }

    /// Whether the leaf at a path has been interacted with.
    pub fn is_field_touched(&self, path: &Path) -> bool {
        matches!(
            get_at(&self.lock().touched, path),
            Some(Value::Bool(true))
        )
    }

    /// Mark or unmark a path as touched.
    pub fn set_field_touched(&self, path: &Path, touched: bool) {
        set_at(&mut self.lock().touched, path, Value::Bool(touched));
    }

    /// Mark every current value leaf as touched (submit does this).
    pub fn touch_all(&self) {
        let mut inner = self.lock();
        let leaves = leaf_paths(&inner.values);
        for path in leaves {
            set_at(&mut inner.touched, &path, Value::Bool(true));
        }
    }

    // ===== Disabled =====

    /// Flag a path as disabled (excluded from the submit payload).
    pub fn set_field_disabled(&self, path: &Path, disabled: bool) {
        self.lock().disabled.insert(path.to_string(), disabled);
    }

    /// Whether a path is disabled, directly or through an ancestor flag.
    pub fn is_field_disabled(&self, path: &Path) -> bool {
        self.lock()
            .disabled
            .iter()
            .any(|(key, on)| *on && path.starts_with(&Path::parse(key)))
    }

    // ===== Errors =====

    /// Snapshot of the whole error map.
    pub fn errors(&self) -> BTreeMap<String, Vec<String>> {
        self.lock().errors.clone()
    }

    /// Messages for one path, in insertion order.
    pub fn field_errors(&self, path: &Path) -> Vec<String> {
        self.lock()
            .errors
            .get(&path.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the messages at a path.
    pub fn set_field_errors(&self, path: &str, messages: Vec<String>) {
        let mut inner = self.lock();
        if messages.is_empty() {
            inner.errors.remove(path);
        } else {
            inner.errors.insert(path.to_owned(), messages);
        }
    }

    /// Remove the errors at exactly these paths.
    pub fn remove_errors(&self, paths: &[String]) {
        let mut inner = self.lock();
        for path in paths {
            inner.errors.remove(path);
        }
    }

    /// Remove every error at or under a path prefix.
    pub fn clear_errors_under(&self, prefix: &Path) {
        remove_under(&mut self.lock().errors, prefix);
    }

    /// Whether the error map is empty.
    pub fn is_valid(&self) -> bool {
        self.lock().errors.is_empty()
    }

    // ===== Snapshots =====

    /// Merge new initial values into the snapshot store.
    ///
    /// `originals` only moves when `also_originals` is set; plain
    /// merges must not disturb the reset baseline.
    pub fn set_initial_values(&self, value: &Value, also_originals: bool) {
        self.lock().snapshots.set_initials(value, also_originals);
    }

    /// Replace both snapshots with a new baseline.
    pub fn replace_snapshots(&self, value: Value) {
        self.lock().snapshots.replace(value);
    }

    /// Read-and-clear the `initials` entry at a path (INIT commit).
    pub fn consume_initial(&self, path: &Path) -> Option<Value> {
        self.lock().snapshots.consume_initial(path)
    }

    /// Read the `initials` entry at a path.
    pub fn initial_at(&self, path: &Path) -> Option<Value> {
        self.lock().snapshots.initial_at(path)
    }

    /// Deep clone of the `originals` baseline.
    pub fn originals(&self) -> Value {
        self.lock().snapshots.originals().clone()
    }

    /// Revert live values to `originals` (full replace).
    pub fn revert_values(&self) {
        let mut inner = self.lock();
        let originals = inner.snapshots.originals().clone();
        inner.values = originals;
    }

    /// Clear the touched mirror.
    pub fn revert_touched(&self) {
        self.lock().touched = Value::Object(Map::new());
    }

    /// Replace the touched mirror wholesale (reset override).
    pub fn set_touched_tree(&self, touched: Value) {
        self.lock().touched = touched;
    }

    /// Take the parked async initial-value source, if any.
    pub fn take_pending_source(&self) -> Option<BoxFuture<'static, Value>> {
        self.lock().snapshots.take_pending()
    }

    /// Feed a resolved async source back: fills both snapshots and
    /// merges the resolved tree into live values.
    pub fn complete_hydration(&self, value: Value) {
        let mut inner = self.lock();
        inner.snapshots.hydrate(value.clone());
        deep_merge(&mut inner.values, &value);
    }

    // ===== Dirty / submit bookkeeping =====

    /// Whether live values differ from the `originals` baseline.
    pub fn is_dirty(&self) -> bool {
        let inner = self.lock();
        &inner.values != inner.snapshots.originals()
    }

    /// Whether a submit round is in flight.
    pub fn is_submitting(&self) -> bool {
        self.lock().is_submitting
    }

    /// Set the in-flight submit flag.
    pub fn set_submitting(&self, submitting: bool) {
        self.lock().is_submitting = submitting;
    }

    /// Number of completed or in-flight submit attempts.
    pub fn submit_count(&self) -> u64 {
        self.lock().submit_count
    }

    /// Bump the submit counter.
    pub fn bump_submit_count(&self) {
        self.lock().submit_count += 1;
    }

    /// Deep-cloned values with disabled paths removed.
    ///
    /// Disabled array indices are removed deepest-and-highest first, so
    /// removals within one parent never disturb each other; remaining
    /// siblings shift down (no holes).
    pub fn submit_payload(&self) -> Value {
        let inner = self.lock();
        let mut payload = inner.values.clone();
        let mut disabled: Vec<Path> = inner
            .disabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(key, _)| Path::parse(key))
            .collect();
        drop(inner);
        disabled.sort();
        disabled.reverse();
        for path in disabled {
            destroy_at(&mut payload, &path);
        }
        payload
    }
}

impl std::fmt::Debug for FormContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("FormContext")
            .field("values", &inner.values)
            .field("errors", &inner.errors.len())
            .field("is_submitting", &inner.is_submitting)
            .field("submit_count", &inner.submit_count)
            .finish()
    }
}

/// Remove every entry of a path-keyed flat map at or under a prefix.
fn remove_under<V>(map: &mut BTreeMap<String, V>, prefix: &Path) {
    map.retain(|key, _| !Path::parse(key).starts_with(prefix));
}
