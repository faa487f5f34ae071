//! Path-addressed value trees for the formwork form engine.
//!
//! This crate holds the storage primitives the form layer is built on:
//!
//! - **Path**: dot-notation addresses into a nested value tree, with
//!   array-index segments and bracket-escaped literal keys
//! - **Tree ops**: in-place get/set/unset/destroy/merge over
//!   `serde_json::Value`, with automatic intermediate-container creation
//! - **SnapshotStore**: the `initials`/`originals` snapshot pair used for
//!   dirty comparison and reset, with sync, getter, or async sources
//!
//! # Quick Start
//!
//! ```
//! use formwork_state::{get_at, set_at, path};
//! use serde_json::json;
//!
//! let mut values = json!({});
//! set_at(&mut values, &path!("user", "emails", 0), json!("a@b.c"));
//!
//! assert_eq!(values, json!({"user": {"emails": ["a@b.c"]}}));
//! assert_eq!(get_at(&values, &path!("user", "emails", 0)), Some(&json!("a@b.c")));
//! ```

mod error;
mod path;
mod snapshot;
mod tree;

pub use error::{value_type_name, TreeError, TreeResult};
pub use path::{Path, Seg};
pub use snapshot::{SnapshotStore, ValueSource};
pub use tree::{
    array_at, deep_merge, destroy_at, get_as, get_at, get_at_mut, is_set, leaf_paths, set_at,
    unset_at,
};

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
