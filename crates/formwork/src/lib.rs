//! Headless form state and validation engine.
//!
//! A [`Form`] owns a path-addressed value tree plus the bookkeeping
//! around it (touched, disabled, errors, snapshots). Consumers attach
//! through three handles:
//!
//! - [`FormField`]: a single value slot, bound to a path or detached
//! - [`FormGroup`]: a validation scope over a subtree, with cascading
//!   revalidation up to the root schema
//! - [`Repeater`]: an array controller with min/max bounds
//!
//! Structural writes (mount, unmount, rebind) go through the
//! [`TransactionManager`] and commit together at [`Form::settle`] in
//! kind-precedence order, so a field that unmounts and another that
//! claims the same path in the same turn resolve deterministically.
//! Validation is pluggable via the async [`SchemaValidator`] trait;
//! the engine never interprets schemas itself.
//!
//! # Quick Start
//!
//! ```
//! use formwork::{Form, FormOptions};
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let form = Form::new(FormOptions::default().with_initial_values(json!({"name": "kim"})));
//! form.set_field_value("email", json!("kim@example.com"));
//!
//! let payload = form.submit(|values| async move { values }).await.unwrap();
//! assert_eq!(payload, json!({"name": "kim", "email": "kim@example.com"}));
//! # });
//! ```

mod config;
mod context;
pub mod devtools;
mod field;
mod form;
mod group;
mod repeater;
mod txn;
mod validation;

pub use config::{configure, get_config, FormConfig};
pub use context::{FormContext, SetValuesMode};
pub use devtools::FormStateSnapshot;
pub use field::{FieldOptions, FormField};
pub use form::{Form, FormOptions, ResetState};
pub use group::{FormGroup, GroupParent};
pub use repeater::{Repeater, RepeaterOptions};
pub use txn::{Transaction, TransactionManager, TxnKind};
pub use validation::{
    FieldError, FnValidator, SchemaValidator, ValidationMode, ValidationResult,
};

pub use formwork_state::{path, Path, Seg, Value, ValueSource};
