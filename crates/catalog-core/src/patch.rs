//! # Generic Patch Applier
//!
//! Applies a JSON-patch-style document (RFC 6902 operations) to an immutable
//! snapshot, producing a new candidate value or failing with a structural
//! error. The live persisted entity is never mutated before validation:
//!
//! ```text
//! entity ──serialize──► snapshot ──apply(ops)──► candidate ──validate──► persist
//! ```
//!
//! Services treat any structural failure here as a `BusinessRule` violation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structural patch failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("invalid JSON pointer '{0}'")]
    InvalidPointer(String),

    #[error("path '{0}' does not exist")]
    PathNotFound(String),

    #[error("'{0}' does not point into an object or array")]
    NotAContainer(String),

    #[error("array index out of bounds at '{0}'")]
    IndexOutOfBounds(String),

    #[error("test failed at '{0}'")]
    TestFailed(String),
}

/// A single RFC 6902 operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

/// Applies `ops` in order to a clone of `doc`.
///
/// ## Example
/// ```rust
/// use catalog_core::patch::{apply, PatchOp};
/// use serde_json::json;
///
/// let doc = json!({"value": 10, "kind": "percent"});
/// let ops = vec![PatchOp::Replace { path: "/value".into(), value: json!(25) }];
///
/// let patched = apply(&doc, &ops).unwrap();
/// assert_eq!(patched["value"], json!(25));
/// ```
pub fn apply(doc: &Value, ops: &[PatchOp]) -> Result<Value, PatchError> {
    let mut doc = doc.clone();
    for op in ops {
        apply_one(&mut doc, op)?;
    }
    Ok(doc)
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Add { path, value } => add(doc, path, value.clone()),
        PatchOp::Remove { path } => remove(doc, path).map(|_| ()),
        PatchOp::Replace { path, value } => replace(doc, path, value.clone()),
        PatchOp::Move { from, path } => {
            let taken = remove(doc, from)?;
            add(doc, path, taken)
        }
        PatchOp::Copy { from, path } => {
            let copied = resolve(doc, from)?.clone();
            add(doc, path, copied)
        }
        PatchOp::Test { path, value } => {
            if resolve(doc, path)? == value {
                Ok(())
            } else {
                Err(PatchError::TestFailed(path.clone()))
            }
        }
    }
}

/// Splits a JSON pointer into unescaped reference tokens.
fn tokens(pointer: &str) -> Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PatchError::InvalidPointer(pointer.to_string()));
    };
    Ok(rest
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn resolve<'a>(doc: &'a Value, pointer: &str) -> Result<&'a Value, PatchError> {
    let mut current = doc;
    for token in tokens(pointer)? {
        current = match current {
            Value::Object(map) => map
                .get(&token)
                .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(&token, pointer)?;
                items
                    .get(index)
                    .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?
            }
            _ => return Err(PatchError::NotAContainer(pointer.to_string())),
        };
    }
    Ok(current)
}

/// Navigates to the parent container of `pointer`, returning it with the
/// final reference token. Root pointers have no parent.
fn resolve_parent<'a>(
    doc: &'a mut Value,
    pointer: &str,
) -> Result<Option<(&'a mut Value, String)>, PatchError> {
    let mut parts = tokens(pointer)?;
    let Some(last) = parts.pop() else {
        return Ok(None);
    };

    let mut current = doc;
    for token in parts {
        current = match current {
            Value::Object(map) => map
                .get_mut(&token)
                .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(&token, pointer)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?
            }
            _ => return Err(PatchError::NotAContainer(pointer.to_string())),
        };
    }
    Ok(Some((current, last)))
}

fn parse_index(token: &str, pointer: &str) -> Result<usize, PatchError> {
    token
        .parse::<usize>()
        .map_err(|_| PatchError::InvalidPointer(pointer.to_string()))
}

fn add(doc: &mut Value, pointer: &str, value: Value) -> Result<(), PatchError> {
    match resolve_parent(doc, pointer)? {
        None => {
            *doc = value;
            Ok(())
        }
        Some((parent, last)) => match parent {
            Value::Object(map) => {
                map.insert(last, value);
                Ok(())
            }
            Value::Array(items) => {
                if last == "-" {
                    items.push(value);
                    return Ok(());
                }
                let index = parse_index(&last, pointer)?;
                if index > items.len() {
                    return Err(PatchError::IndexOutOfBounds(pointer.to_string()));
                }
                items.insert(index, value);
                Ok(())
            }
            _ => Err(PatchError::NotAContainer(pointer.to_string())),
        },
    }
}

fn remove(doc: &mut Value, pointer: &str) -> Result<Value, PatchError> {
    match resolve_parent(doc, pointer)? {
        None => Err(PatchError::InvalidPointer(pointer.to_string())),
        Some((parent, last)) => match parent {
            Value::Object(map) => map
                .remove(&last)
                .ok_or_else(|| PatchError::PathNotFound(pointer.to_string())),
            Value::Array(items) => {
                let index = parse_index(&last, pointer)?;
                if index >= items.len() {
                    return Err(PatchError::IndexOutOfBounds(pointer.to_string()));
                }
                Ok(items.remove(index))
            }
            _ => Err(PatchError::NotAContainer(pointer.to_string())),
        },
    }
}

fn replace(doc: &mut Value, pointer: &str, value: Value) -> Result<(), PatchError> {
    match resolve_parent(doc, pointer)? {
        None => {
            *doc = value;
            Ok(())
        }
        Some((parent, last)) => match parent {
            Value::Object(map) => {
                let slot = map
                    .get_mut(&last)
                    .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?;
                *slot = value;
                Ok(())
            }
            Value::Array(items) => {
                let index = parse_index(&last, pointer)?;
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| PatchError::PathNotFound(pointer.to_string()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(PatchError::NotAContainer(pointer.to_string())),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "value": 10,
            "kind": "percent",
            "max_uses": null,
            "tags": ["a", "b"]
        })
    }

    #[test]
    fn test_replace() {
        let patched = apply(
            &doc(),
            &[PatchOp::Replace { path: "/value".into(), value: json!(25) }],
        )
        .unwrap();
        assert_eq!(patched["value"], json!(25));
        // snapshot untouched
        assert_eq!(doc()["value"], json!(10));
    }

    #[test]
    fn test_replace_missing_path_fails() {
        let err = apply(
            &doc(),
            &[PatchOp::Replace { path: "/nope".into(), value: json!(1) }],
        )
        .unwrap_err();
        assert_eq!(err, PatchError::PathNotFound("/nope".into()));
    }

    #[test]
    fn test_add_and_remove() {
        let patched = apply(
            &doc(),
            &[
                PatchOp::Add { path: "/extra".into(), value: json!(true) },
                PatchOp::Remove { path: "/kind".into() },
            ],
        )
        .unwrap();
        assert_eq!(patched["extra"], json!(true));
        assert!(patched.get("kind").is_none());
    }

    #[test]
    fn test_remove_missing_fails() {
        let err = apply(&doc(), &[PatchOp::Remove { path: "/nope".into() }]).unwrap_err();
        assert_eq!(err, PatchError::PathNotFound("/nope".into()));
    }

    #[test]
    fn test_array_operations() {
        let patched = apply(
            &doc(),
            &[
                PatchOp::Add { path: "/tags/-".into(), value: json!("c") },
                PatchOp::Replace { path: "/tags/0".into(), value: json!("z") },
                PatchOp::Remove { path: "/tags/1".into() },
            ],
        )
        .unwrap();
        assert_eq!(patched["tags"], json!(["z", "c"]));
    }

    #[test]
    fn test_test_op() {
        assert!(apply(
            &doc(),
            &[PatchOp::Test { path: "/kind".into(), value: json!("percent") }],
        )
        .is_ok());

        let err = apply(
            &doc(),
            &[PatchOp::Test { path: "/kind".into(), value: json!("fixed") }],
        )
        .unwrap_err();
        assert_eq!(err, PatchError::TestFailed("/kind".into()));
    }

    #[test]
    fn test_move_and_copy() {
        let patched = apply(
            &doc(),
            &[
                PatchOp::Copy { from: "/value".into(), path: "/value_copy".into() },
                PatchOp::Move { from: "/kind".into(), path: "/old_kind".into() },
            ],
        )
        .unwrap();
        assert_eq!(patched["value_copy"], json!(10));
        assert_eq!(patched["old_kind"], json!("percent"));
        assert!(patched.get("kind").is_none());
    }

    #[test]
    fn test_pointer_must_start_with_slash() {
        let err = apply(
            &doc(),
            &[PatchOp::Replace { path: "value".into(), value: json!(1) }],
        )
        .unwrap_err();
        assert_eq!(err, PatchError::InvalidPointer("value".into()));
    }

    #[test]
    fn test_escaped_tokens() {
        let doc = json!({"a/b": 1, "c~d": 2});
        let patched = apply(
            &doc,
            &[
                PatchOp::Replace { path: "/a~1b".into(), value: json!(10) },
                PatchOp::Replace { path: "/c~0d".into(), value: json!(20) },
            ],
        )
        .unwrap();
        assert_eq!(patched["a/b"], json!(10));
        assert_eq!(patched["c~d"], json!(20));
    }

    #[test]
    fn test_ops_deserialize_from_json() {
        let ops: Vec<PatchOp> = serde_json::from_value(json!([
            {"op": "replace", "path": "/value", "value": 30},
            {"op": "remove", "path": "/max_uses"}
        ]))
        .unwrap();
        assert_eq!(ops.len(), 2);
        let patched = apply(&doc(), &ops).unwrap();
        assert_eq!(patched["value"], json!(30));
    }
}
