//! Read and write operations over nested `serde_json::Value` trees.
//!
//! All mutation here is in-place and infallible: a form cannot control the
//! order in which its consumers mount, so writes create (or replace)
//! whatever intermediate containers they need instead of erroring.

use crate::{value_type_name, Path, Seg, TreeError, TreeResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Get a reference to the value at a path.
pub fn get_at<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.segments() {
        match seg {
            Seg::Key(key) => current = current.get(key)?,
            Seg::Index(idx) => current = current.get(idx)?,
        }
    }
    Some(current)
}

/// Get a mutable reference to the value at a path.
pub fn get_at_mut<'a>(doc: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = doc;
    for seg in path.segments() {
        match seg {
            Seg::Key(key) => current = current.get_mut(key)?,
            Seg::Index(idx) => current = current.get_mut(idx)?,
        }
    }
    Some(current)
}

/// Set a value at a path, creating intermediate containers as needed.
///
/// The container kind is chosen by the next segment: a key segment creates
/// an object, an index segment creates an array. Arrays shorter than a
/// claimed index are padded with `Null` so fields can claim indices in any
/// mount order. A container of the wrong kind on the path is replaced.
pub fn set_at(doc: &mut Value, path: &Path, value: Value) {
    set_rec(doc, path.segments(), value);
}

fn set_rec(current: &mut Value, segments: &[Seg], value: Value) {
    match segments {
        [] => *current = value,
        [Seg::Key(key), rest @ ..] => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let obj = current.as_object_mut().unwrap();
            if rest.is_empty() {
                obj.insert(key.clone(), value);
            } else {
                let entry = obj.entry(key.clone()).or_insert(Value::Null);
                set_rec(entry, rest, value);
            }
        }
        [Seg::Index(idx), rest @ ..] => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let arr = current.as_array_mut().unwrap();
            while arr.len() <= *idx {
                arr.push(Value::Null);
            }
            if rest.is_empty() {
                arr[*idx] = value;
            } else {
                set_rec(&mut arr[*idx], rest, value);
            }
        }
    }
}

/// Blank the leaf at a path to `Null` without pruning containers.
///
/// Used for path migration: the old slot stays allocated so another field
/// can reclaim it. No-op if the path does not resolve.
pub fn unset_at(doc: &mut Value, path: &Path) {
    if path.is_empty() {
        return;
    }
    if let Some(node) = get_at_mut(doc, path) {
        *node = Value::Null;
    }
}

/// Remove the node at a path and prune now-empty ancestor containers.
///
/// Removing an array element shifts later siblings down. No-op if the
/// path does not resolve.
pub fn destroy_at(doc: &mut Value, path: &Path) {
    if path.is_empty() {
        *doc = Value::Object(Map::new());
        return;
    }
    if !remove_at(doc, path) {
        return;
    }
    let mut prefix = path.parent();
    while let Some(p) = prefix {
        if p.is_empty() {
            break;
        }
        let now_empty = match get_at(doc, &p) {
            Some(Value::Object(m)) => m.is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            _ => false,
        };
        if !now_empty {
            break;
        }
        remove_at(doc, &p);
        prefix = p.parent();
    }
}

/// Remove the node a path points at. Returns true if something was removed.
fn remove_at(doc: &mut Value, path: &Path) -> bool {
    let Some(last) = path.last().cloned() else {
        return false;
    };
    let parent_path = path.parent().unwrap_or_default();
    let Some(parent) = get_at_mut(doc, &parent_path) else {
        return false;
    };
    match (&last, parent) {
        (Seg::Key(key), Value::Object(obj)) => obj.remove(key).is_some(),
        (Seg::Index(idx), Value::Array(arr)) => {
            if *idx < arr.len() {
                arr.remove(*idx);
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

/// Check whether a path has ever been written.
///
/// This is a container-membership walk, not a value comparison: a path
/// holding an explicit `Null` is still set, while a missing key or an
/// out-of-range index is not.
pub fn is_set(doc: &Value, path: &Path) -> bool {
    if path.is_empty() {
        return true;
    }
    let mut current = doc;
    for seg in path.segments() {
        match (seg, current) {
            (Seg::Key(key), Value::Object(obj)) => match obj.get(key) {
                Some(child) => current = child,
                None => return false,
            },
            (Seg::Index(idx), Value::Array(arr)) => match arr.get(*idx) {
                Some(child) => current = child,
                None => return false,
            },
            _ => return false,
        }
    }
    true
}

/// Deserialize the value at a path into a concrete type.
///
/// An absent path is `Ok(None)`; a present value that does not fit the
/// target type is an error.
pub fn get_as<T: DeserializeOwned>(doc: &Value, path: &Path) -> TreeResult<Option<T>> {
    match get_at(doc, path) {
        Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
        None => Ok(None),
    }
}

/// Borrow the array at a path.
///
/// An absent path is `Ok(None)`; a present non-array node is an error.
pub fn array_at<'a>(doc: &'a Value, path: &Path) -> TreeResult<Option<&'a Vec<Value>>> {
    match get_at(doc, path) {
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(TreeError::type_mismatch(
            path.clone(),
            "array",
            value_type_name(other),
        )),
        None => Ok(None),
    }
}

/// Deep-merge `src` into `dst`.
///
/// Plain objects merge recursively; arrays and scalars overwrite.
pub fn deep_merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (key, v) in s {
                match d.get_mut(key) {
                    Some(slot) if slot.is_object() && v.is_object() => deep_merge(slot, v),
                    _ => {
                        d.insert(key.clone(), v.clone());
                    }
                }
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}

/// Collect the paths of all scalar leaves in a tree.
///
/// Empty containers contribute nothing.
pub fn leaf_paths(doc: &Value) -> Vec<Path> {
    let mut out = Vec::new();
    collect_leaves(doc, Path::root(), &mut out);
    out
}

fn collect_leaves(node: &Value, at: Path, out: &mut Vec<Path>) {
    match node {
        Value::Object(obj) => {
            for (key, child) in obj {
                collect_leaves(child, at.clone().key(key.clone()), out);
            }
        }
        Value::Array(arr) => {
            for (idx, child) in arr.iter().enumerate() {
                collect_leaves(child, at.clone().index(idx), out);
            }
        }
        _ => out.push(at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_set_then_get_round_trip() {
        let mut doc = json!({});
        set_at(&mut doc, &path!("user", "name"), json!("Alice"));
        assert_eq!(get_at(&doc, &path!("user", "name")), Some(&json!("Alice")));
    }

    #[test]
    fn test_set_creates_object_then_array() {
        let mut doc = json!({});
        set_at(&mut doc, &path!("foo", "bar"), json!("baz"));
        assert_eq!(doc, json!({"foo": {"bar": "baz"}}));

        let mut doc = json!({});
        set_at(&mut doc, &path!("items", 1), json!("b"));
        assert_eq!(doc, json!({"items": [null, "b"]}));
    }

    #[test]
    fn test_set_replaces_mismatched_container() {
        let mut doc = json!({"slot": "scalar"});
        set_at(&mut doc, &path!("slot", "inner"), json!(1));
        assert_eq!(doc, json!({"slot": {"inner": 1}}));
    }

    #[test]
    fn test_unset_blanks_without_pruning() {
        let mut doc = json!({"a": {"b": 1}});
        unset_at(&mut doc, &path!("a", "b"));
        assert_eq!(doc, json!({"a": {"b": null}}));
    }

    #[test]
    fn test_unset_missing_is_noop() {
        let mut doc = json!({"a": 1});
        unset_at(&mut doc, &path!("b", "c"));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_destroy_prunes_empty_ancestors() {
        let mut doc = json!({"a": {"b": {"c": 1}}, "x": 2});
        destroy_at(&mut doc, &path!("a", "b", "c"));
        assert_eq!(doc, json!({"x": 2}));
    }

    #[test]
    fn test_destroy_keeps_nonempty_ancestors() {
        let mut doc = json!({"a": {"b": 1, "keep": 2}});
        destroy_at(&mut doc, &path!("a", "b"));
        assert_eq!(doc, json!({"a": {"keep": 2}}));
    }

    #[test]
    fn test_destroy_array_element_shifts() {
        let mut doc = json!({"items": ["a", "b", "c"]});
        destroy_at(&mut doc, &path!("items", 1));
        assert_eq!(doc, json!({"items": ["a", "c"]}));
    }

    #[test]
    fn test_is_set_distinguishes_null_from_absent() {
        let mut doc = json!({"a": 1});
        assert!(!is_set(&doc, &path!("b")));
        unset_at(&mut doc, &path!("a"));
        assert!(is_set(&doc, &path!("a")));
        assert_eq!(get_at(&doc, &path!("a")), Some(&json!(null)));
    }

    #[test]
    fn test_deep_merge_objects_recursive() {
        let mut dst = json!({"a": {"x": 1}, "keep": true});
        deep_merge(&mut dst, &json!({"a": {"y": 2}, "new": 3}));
        assert_eq!(dst, json!({"a": {"x": 1, "y": 2}, "keep": true, "new": 3}));
    }

    #[test]
    fn test_deep_merge_arrays_overwrite() {
        let mut dst = json!({"list": [1, 2, 3]});
        deep_merge(&mut dst, &json!({"list": [9]}));
        assert_eq!(dst, json!({"list": [9]}));
    }

    #[test]
    fn test_get_as_typed() {
        let doc = json!({"user": {"age": 30}});
        assert_eq!(get_as::<u32>(&doc, &path!("user", "age")).unwrap(), Some(30));
        assert_eq!(get_as::<u32>(&doc, &path!("user", "missing")).unwrap(), None);
        assert!(get_as::<String>(&doc, &path!("user", "age")).is_err());
    }

    #[test]
    fn test_array_at_rejects_non_arrays() {
        let doc = json!({"items": [1, 2], "name": "x"});
        assert_eq!(array_at(&doc, &path!("items")).unwrap().unwrap().len(), 2);
        assert_eq!(array_at(&doc, &path!("missing")).unwrap(), None);

        let err = array_at(&doc, &path!("name")).unwrap_err();
        assert!(err.to_string().contains("expected array, found string"));
    }

    #[test]
    fn test_leaf_paths() {
        let doc = json!({"a": {"b": 1}, "list": [true, {"c": null}]});
        let mut leaves: Vec<String> = leaf_paths(&doc).iter().map(|p| p.to_string()).collect();
        leaves.sort();
        assert_eq!(leaves, vec!["a.b", "list.0", "list.1.c"]);
    }
}
