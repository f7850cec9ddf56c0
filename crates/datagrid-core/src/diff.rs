//! Object-graph diffing.
//!
//! Produces the smallest object that, merged field-by-field into the
//! baseline, yields the working object. Arrays of identity-bearing
//! objects reduce to a flat list of entries: `{DB_ID}` deletes the
//! element with that identity, `{DB_ID, ..fields}` modifies it, and a
//! full object without identity inserts a new element. Arrays holding
//! anything else are compared as whole values. The validated entry
//! point additionally checks every changed path against field metadata
//! before anything may leave the client.

use serde_json::{Map, Value};
use thiserror::Error;

use datagrid_util::{deep_equal, is_empty_value};

use crate::annotate::strip;
use crate::schema::{field_meta, FieldMeta};
use crate::{entity_id, id_key, DB_ID, XPATH_PREFIX};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// The caller composed two unrelated entities; diffing them would
    /// risk corrupting an unrelated server record.
    #[error("cannot diff unrelated entities: baseline id `{baseline}`, working id `{working}`")]
    IdentityMismatch { baseline: String, working: String },
    /// The rendering layer let the user change a field the schema does
    /// not know about.
    #[error("changed path `{0}` has no field metadata")]
    UnknownField(String),
    /// The client attempted to write a server-populated field.
    #[error("changed path `{0}` is server-populated and cannot be written")]
    ReadOnlyField(String),
}

/// A field change that must be confirmed by the user before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub path: String,
    pub caption: String,
}

/// A validated, transmission-ready patch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDiff {
    /// Sparse patch object; an empty object means nothing to save.
    pub diff: Value,
    pub confirmations: Vec<Confirmation>,
}

impl SaveDiff {
    pub fn is_empty(&self) -> bool {
        is_empty_value(&self.diff)
    }
}

/// Recursive structural diff: the sparse object of `b`'s departures
/// from `a`. Returns `{}` when the values are equal.
pub fn structural_diff(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ao), Value::Object(bo)) => Value::Object(diff_objects(ao, bo)),
        _ if deep_equal(a, b) => Value::Object(Map::new()),
        _ => b.clone(),
    }
}

fn diff_objects(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, av) in a {
        if key.starts_with(XPATH_PREFIX) {
            continue;
        }
        let Some(bv) = b.get(key) else {
            continue;
        };
        match (av, bv) {
            (Value::Array(aa), Value::Array(ba)) if is_reconcilable(aa, ba) => {
                let entries = diff_arrays(aa, ba);
                if !entries.is_empty() {
                    out.insert(key.clone(), Value::Array(entries));
                }
            }
            (Value::Object(ao), Value::Object(bo)) => {
                let nested = diff_objects(ao, bo);
                if !nested.is_empty() {
                    out.insert(key.clone(), Value::Object(nested));
                }
            }
            _ => {
                if !deep_equal(av, bv) {
                    out.insert(key.clone(), bv.clone());
                }
            }
        }
    }
    // Newly introduced fields.
    for (key, bv) in b {
        if key.starts_with(XPATH_PREFIX) || a.contains_key(key) {
            continue;
        }
        out.insert(key.clone(), bv.clone());
    }
    out
}

fn is_reconcilable(a: &[Value], b: &[Value]) -> bool {
    a.iter().chain(b.iter()).all(Value::is_object)
}

/// Identity-matched array reconciliation.
pub fn diff_arrays(baseline: &[Value], working: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    for el in baseline {
        let Some(id) = entity_id(el) else {
            continue;
        };
        match working.iter().find(|w| entity_id(w) == Some(id)) {
            None => {
                let mut marker = Map::new();
                marker.insert(DB_ID.to_string(), id.clone());
                out.push(Value::Object(marker));
            }
            Some(w) => {
                let nested = structural_diff(el, w);
                if !is_empty_value(&nested) {
                    let mut entry = Map::new();
                    entry.insert(DB_ID.to_string(), id.clone());
                    if let Value::Object(fields) = nested {
                        entry.extend(fields);
                    }
                    out.push(Value::Object(entry));
                }
            }
        }
    }
    // New, never-persisted elements, in working order.
    for w in working {
        if entity_id(w).is_none() {
            out.push(w.clone());
        }
    }
    out
}

/// The validated save pipeline.
///
/// Strips annotations from both sides, refuses unrelated entities,
/// computes the structural diff, stamps the baseline identity onto a
/// non-empty diff (or, for creations, strips null leaves instead), and
/// validates every changed path against `fields`.
pub fn diff_for_save(
    baseline: &Value,
    working: &Value,
    fields: &[FieldMeta],
    is_create: bool,
) -> Result<SaveDiff, DiffError> {
    let base = strip(baseline);
    let work = strip(working);
    if let (Some(a), Some(b)) = (entity_id(&base), entity_id(&work)) {
        if a != b {
            return Err(DiffError::IdentityMismatch {
                baseline: scalar_label(a),
                working: scalar_label(b),
            });
        }
    }
    let mut diff = structural_diff(&base, &work);
    if !is_empty_value(&diff) {
        if is_create {
            // Servers should not receive explicit nulls for never-set
            // optional fields on creation.
            strip_null_fields(&mut diff);
        } else if let Some(id) = entity_id(&base) {
            let id = id.clone();
            if let Value::Object(map) = &mut diff {
                map.insert(DB_ID.to_string(), id);
            }
        }
    }
    let mut confirmations = Vec::new();
    validate(&diff, "", fields, &mut confirmations)?;
    Ok(SaveDiff {
        diff,
        confirmations,
    })
}

fn scalar_label(id: &Value) -> String {
    id_key(id).unwrap_or_else(|| id.to_string())
}

fn validate(
    diff: &Value,
    prefix: &str,
    fields: &[FieldMeta],
    confirmations: &mut Vec<Confirmation>,
) -> Result<(), DiffError> {
    let Value::Object(map) = diff else {
        return Ok(());
    };
    for (key, val) in map {
        if key == DB_ID {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(_) => validate(val, &path, fields, confirmations)?,
            Value::Array(entries) if !entries.is_empty() && entries.iter().all(Value::is_object) => {
                for entry in entries {
                    validate(entry, &path, fields, confirmations)?;
                }
            }
            _ => {
                let Some(meta) = field_meta(fields, &path) else {
                    return Err(DiffError::UnknownField(path));
                };
                if meta.server_populated {
                    return Err(DiffError::ReadOnlyField(path));
                }
                if let Some(caption) = &meta.confirm_caption {
                    confirmations.push(Confirmation {
                        path,
                        caption: caption.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Recursively removes null-valued fields, and object fields that end
/// up empty once their nulls are gone.
pub fn strip_null_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for v in map.values_mut() {
                strip_null_fields(v);
            }
            map.retain(|_, v| !v.is_null() && !matches!(v, Value::Object(m) if m.is_empty()));
        }
        Value::Array(arr) => {
            for v in arr {
                strip_null_fields(v);
            }
        }
        _ => {}
    }
}

/// Merges a sparse diff back onto a baseline, honoring the array
/// delete/modify/insert markers. Inverse of `structural_diff` up to
/// annotation fields.
pub fn apply_diff(baseline: &Value, diff: &Value) -> Value {
    if is_empty_value(diff) {
        return baseline.clone();
    }
    match (baseline, diff) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut target = base.clone();
            merge_object(&mut target, patch);
            Value::Object(target)
        }
        _ => diff.clone(),
    }
}

fn merge_object(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, change) in patch {
        match (target.get_mut(key), change) {
            (Some(Value::Object(nested)), Value::Object(sub)) => merge_object(nested, sub),
            (Some(Value::Array(arr)), Value::Array(entries))
                if !entries.is_empty() && entries.iter().all(Value::is_object) =>
            {
                merge_array(arr, entries);
            }
            _ => {
                target.insert(key.clone(), change.clone());
            }
        }
    }
}

fn merge_array(target: &mut Vec<Value>, entries: &[Value]) {
    for entry in entries {
        let Some(map) = entry.as_object() else {
            continue;
        };
        match map.get(DB_ID).filter(|id| !id.is_null()) {
            // Bare identity: delete marker.
            Some(id) if map.len() == 1 => {
                target.retain(|el| entity_id(el) != Some(id));
            }
            Some(id) => match target.iter_mut().find(|el| entity_id(el) == Some(id)) {
                Some(Value::Object(obj)) => {
                    let mut sub = map.clone();
                    sub.remove(DB_ID);
                    merge_object(obj, &sub);
                }
                _ => target.push(entry.clone()),
            },
            None => target.push(entry.clone()),
        }
    }
}
