//! Initial-value snapshots for dirty comparison and reset.
//!
//! A [`SnapshotStore`] holds two independent deep clones of a value tree:
//! `initials`, which per-field initialization may consume from and merges
//! may extend, and `originals`, the last explicitly committed baseline
//! that reset reverts to.

use crate::{deep_merge, destroy_at, get_at, Path};
use futures::future::BoxFuture;
use serde_json::{Map, Value};

/// Where initial values come from.
///
/// Sync sources resolve at construction. A future source leaves the
/// snapshots empty until the owner awaits it and calls
/// [`SnapshotStore::hydrate`].
pub enum ValueSource {
    /// An immediate value.
    Value(Value),
    /// A zero-argument getter, invoked once at construction.
    Getter(Box<dyn Fn() -> Value + Send + Sync>),
    /// An asynchronous source, resolved once by the owner.
    Future(BoxFuture<'static, Value>),
}

impl ValueSource {
    /// Convenience constructor for an immediate value.
    pub fn value(v: impl Into<Value>) -> Self {
        ValueSource::Value(v.into())
    }

    /// Convenience constructor for a getter.
    pub fn getter(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        ValueSource::Getter(Box::new(f))
    }

    /// Convenience constructor for an async source.
    pub fn future(fut: impl std::future::Future<Output = Value> + Send + 'static) -> Self {
        ValueSource::Future(Box::pin(fut))
    }
}

impl From<Value> for ValueSource {
    fn from(v: Value) -> Self {
        ValueSource::Value(v)
    }
}

/// Holds the `initials` and `originals` snapshot pair for one form.
pub struct SnapshotStore {
    initials: Value,
    originals: Value,
    pending: Option<BoxFuture<'static, Value>>,
}

impl SnapshotStore {
    /// Create a store from a value source.
    ///
    /// Future sources start both snapshots as empty objects; the owner
    /// takes the parked future via [`take_pending`](Self::take_pending)
    /// and feeds the resolved value back through
    /// [`hydrate`](Self::hydrate). One-shot: there is no re-subscription
    /// after the first resolution.
    pub fn new(source: ValueSource) -> Self {
        match source {
            ValueSource::Value(v) => Self::resolved(v),
            ValueSource::Getter(f) => Self::resolved(f()),
            ValueSource::Future(fut) => Self {
                initials: Value::Object(Map::new()),
                originals: Value::Object(Map::new()),
                pending: Some(fut),
            },
        }
    }

    fn resolved(value: Value) -> Self {
        Self {
            initials: value.clone(),
            originals: value,
            pending: None,
        }
    }

    /// Take the parked async source, if any.
    pub fn take_pending(&mut self) -> Option<BoxFuture<'static, Value>> {
        self.pending.take()
    }

    /// Whether an async source is still unresolved.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fill both snapshots from a resolved async source.
    pub fn hydrate(&mut self, value: Value) {
        self.initials = value.clone();
        self.originals = value;
    }

    /// The current `initials` tree.
    pub fn initials(&self) -> &Value {
        &self.initials
    }

    /// The current `originals` tree.
    pub fn originals(&self) -> &Value {
        &self.originals
    }

    /// Read the `initials` entry at a path.
    pub fn initial_at(&self, path: &Path) -> Option<Value> {
        get_at(&self.initials, path).cloned()
    }

    /// Read and clear the `initials` entry at a path.
    ///
    /// Field initialization consumes its slot so a later field claiming
    /// the same path does not inherit a stale snapshot. `originals` is
    /// untouched.
    pub fn consume_initial(&mut self, path: &Path) -> Option<Value> {
        let value = get_at(&self.initials, path).cloned()?;
        destroy_at(&mut self.initials, path);
        Some(value)
    }

    /// Merge new initial values in, optionally moving `originals` too.
    ///
    /// Plain merge touches only `initials`; `originals` moves only when
    /// the caller explicitly commits a new baseline.
    pub fn set_initials(&mut self, value: &Value, also_originals: bool) {
        deep_merge(&mut self.initials, value);
        if also_originals {
            deep_merge(&mut self.originals, value);
        }
    }

    /// Replace both snapshots outright (reset baseline).
    pub fn replace(&mut self, value: Value) {
        self.initials = value.clone();
        self.originals = value;
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("initials", &self.initials)
            .field("originals", &self.originals)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}
