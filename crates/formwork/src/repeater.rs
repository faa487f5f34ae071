//! Repeatable array fields with min/max bounds.
//!
//! A repeater is a controller over an array slot in the form context.
//! Structural operations that would violate its bounds, or that address
//! an index out of range, log a warning and do nothing; bounds are a
//! usability constraint, not an error condition.

use crate::form::Form;
use formwork_state::{array_at, Path, Value};

/// Options for mounting a [`Repeater`].
#[derive(Clone, Debug)]
pub struct RepeaterOptions {
    /// Floor for `remove`: the array never shrinks below this.
    pub min: usize,
    /// Ceiling for `add`/`insert`; `None` means unbounded.
    pub max: Option<usize>,
    /// Value used for `add()` without an explicit item.
    pub template: Value,
}

impl Default for RepeaterOptions {
    fn default() -> Self {
        Self {
            min: 0,
            max: None,
            template: Value::Null,
        }
    }
}

impl RepeaterOptions {
    /// Set the minimum length (builder pattern).
    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    /// Set the maximum length (builder pattern).
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Set the template for added items (builder pattern).
    pub fn with_template(mut self, template: Value) -> Self {
        self.template = template;
        self
    }
}

/// Controller for a repeatable array at one path.
pub struct Repeater {
    form: Form,
    path: Path,
    min: usize,
    max: Option<usize>,
    template: Value,
}

impl Repeater {
    pub(crate) fn mount(form: Form, path: Path, options: RepeaterOptions) -> Self {
        Self {
            form,
            path,
            min: options.min,
            max: options.max,
            template: options.template,
        }
    }

    /// The array path this repeater controls.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Vec<Value> {
        let values = self.form.context().values();
        match array_at(&values, &self.path) {
            Ok(Some(items)) => items.clone(),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "repeater: treating non-array slot as empty");
                Vec::new()
            }
        }
    }

    fn write(&self, items: Vec<Value>) {
        self.form
            .context()
            .set_field_value(&self.path, Value::Array(items));
    }

    /// Deep clone of the current items.
    pub fn items(&self) -> Vec<Value> {
        self.read()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether `add` would currently be refused.
    pub fn add_disabled(&self) -> bool {
        self.max.is_some_and(|max| self.len() >= max)
    }

    /// Whether `remove` would currently be refused.
    pub fn remove_disabled(&self) -> bool {
        self.len() <= self.min
    }

    /// Append an item, or the template when none is given.
    pub fn add(&self, item: Option<Value>) {
        let mut items = self.read();
        if self.max.is_some_and(|max| items.len() >= max) {
            tracing::warn!(path = %self.path, max = self.max, "repeater: cannot add beyond max");
            return;
        }
        items.push(item.unwrap_or_else(|| self.template.clone()));
        self.write(items);
    }

    /// Insert an item at an index, shifting later items right.
    pub fn insert(&self, index: usize, item: Value) {
        let mut items = self.read();
        if self.max.is_some_and(|max| items.len() >= max) {
            tracing::warn!(path = %self.path, max = self.max, "repeater: cannot add beyond max");
            return;
        }
        if index > items.len() {
            tracing::warn!(path = %self.path, index, len = items.len(), "repeater: insert index out of bounds");
            return;
        }
        items.insert(index, item);
        self.write(items);
    }

    /// Remove the item at an index, shifting later items left.
    pub fn remove(&self, index: usize) {
        let mut items = self.read();
        if items.len() <= self.min {
            tracing::warn!(path = %self.path, min = self.min, "repeater: cannot remove below min");
            return;
        }
        if index >= items.len() {
            tracing::warn!(path = %self.path, index, len = items.len(), "repeater: remove index out of bounds");
            return;
        }
        items.remove(index);
        self.write(items);
    }

    /// Swap two items.
    pub fn swap(&self, a: usize, b: usize) {
        let mut items = self.read();
        if a >= items.len() || b >= items.len() {
            tracing::warn!(path = %self.path, a, b, len = items.len(), "repeater: swap index out of bounds");
            return;
        }
        items.swap(a, b);
        self.write(items);
    }

    /// Move an item from one index to another.
    pub fn move_item(&self, from: usize, to: usize) {
        let mut items = self.read();
        if from >= items.len() || to >= items.len() {
            tracing::warn!(path = %self.path, from, to, len = items.len(), "repeater: move index out of bounds");
            return;
        }
        let item = items.remove(from);
        items.insert(to, item);
        self.write(items);
    }
}

impl std::fmt::Debug for Repeater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repeater")
            .field("path", &self.path.to_string())
            .field("len", &self.len())
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}
