//! Annotated working copies.
//!
//! A working tree carries, per primitive field `f`, a sibling string
//! entry `xpath_f` holding that field's schema path, and a transient
//! row id on every array element. The annotations drive schema-path
//! resolution while the live arrays shuffle underneath; they are
//! stripped before any diff comparison or outbound payload.

use serde_json::{Map, Value};

use datagrid_util::clone_stripped;
use datagrid_xpath::{Segment, XPath};

use crate::{generate_row_id, ROW_ID, XPATH_PREFIX};

/// Annotation key for a field: `price` -> `xpath_price`.
pub fn annotation_key(field: &str) -> String {
    format!("{XPATH_PREFIX}{field}")
}

/// Deep copy of `value` with schema-path annotations added, rooted at
/// `base`. This is how a working object is seeded from a baseline.
pub fn annotated_clone(value: &Value, base: &XPath) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, val) in map {
                if key.starts_with(XPATH_PREFIX) {
                    continue;
                }
                let child = base.child(Segment::Field(key.clone()));
                match val {
                    Value::Object(_) => {
                        out.insert(key.clone(), annotated_clone(val, &child));
                    }
                    Value::Array(arr) if arr.iter().all(Value::is_object) => {
                        out.insert(key.clone(), annotate_array(arr, &child));
                    }
                    _ => {
                        out.insert(key.clone(), val.clone());
                        out.insert(annotation_key(key), Value::String(child.to_string()));
                    }
                }
            }
            Value::Object(out)
        }
        // Root-level repeated-entity view: the baseline itself is the array.
        Value::Array(arr) if arr.iter().all(Value::is_object) => annotate_array(arr, base),
        other => other.clone(),
    }
}

fn annotate_array(arr: &[Value], array_path: &XPath) -> Value {
    Value::Array(
        arr.iter()
            .enumerate()
            .map(|(index, el)| annotated_element(el, &array_path.child(Segment::Index(index))))
            .collect(),
    )
}

/// Annotates one array element at its schema position, including the
/// transient row id.
pub fn annotated_element(value: &Value, element_path: &XPath) -> Value {
    let mut annotated = annotated_clone(value, element_path);
    if let Value::Object(map) = &mut annotated {
        map.insert(ROW_ID.to_string(), Value::Number(generate_row_id().into()));
    }
    annotated
}

/// Removes every annotation entry, recursively.
pub fn strip(value: &Value) -> Value {
    clone_stripped(value, XPATH_PREFIX)
}

/// The element's own schema position: any field annotation with its
/// trailing field name dropped, e.g. `orders.items[1].price` ->
/// `orders.items[1]`. `None` for unannotated or non-object elements.
pub fn element_prefix(value: &Value) -> Option<XPath> {
    let map = value.as_object()?;
    for (key, val) in map {
        if !key.starts_with(XPATH_PREFIX) || key == ROW_ID {
            continue;
        }
        let Some(raw) = val.as_str() else {
            continue;
        };
        let Ok(path) = XPath::parse(raw) else {
            continue;
        };
        return Some(path.strip_trailing_field());
    }
    None
}

/// Transient row id of an array element, when present.
pub fn row_id(value: &Value) -> Option<u64> {
    value.as_object()?.get(ROW_ID)?.as_u64()
}
