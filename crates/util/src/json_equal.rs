use serde_json::Value;

/// Performs a deep equality check between two JSON values.
///
/// Values are compared recursively: primitives by value, arrays
/// element-by-element, objects key-by-key (insertion order is ignored).
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datagrid_util::json_equal::deep_equal;
///
/// let a = json!({"qty": 1, "tags": ["x", "y"]});
/// let b = json!({"tags": ["x", "y"], "qty": 1});
/// let c = json!({"qty": 2, "tags": ["x", "y"]});
///
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,

        (Value::Array(arr_a), Value::Array(arr_b)) => {
            if arr_a.len() != arr_b.len() {
                return false;
            }
            arr_a.iter().zip(arr_b).all(|(x, y)| deep_equal(x, y))
        }

        (Value::Object(obj_a), Value::Object(obj_b)) => {
            if obj_a.len() != obj_b.len() {
                return false;
            }
            obj_a
                .iter()
                .all(|(key, val_a)| matches!(obj_b.get(key), Some(val_b) if deep_equal(val_a, val_b)))
        }

        // Different types are never equal
        _ => false,
    }
}

/// Deep equality over business data only: object keys starting with
/// `ignore_prefix` are invisible to the comparison on both sides.
///
/// Used to compare a baseline against an annotated working copy without
/// the transient annotation entries influencing the result.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datagrid_util::json_equal::deep_equal_data;
///
/// let stored = json!({"price": 10});
/// let working = json!({"price": 10, "xpath_price": "items[0].price"});
///
/// assert!(deep_equal_data(&stored, &working, "xpath_"));
/// assert!(!deep_equal_data(&json!({"price": 11}), &working, "xpath_"));
/// ```
pub fn deep_equal_data(a: &Value, b: &Value, ignore_prefix: &str) -> bool {
    match (a, b) {
        (Value::Array(arr_a), Value::Array(arr_b)) => {
            if arr_a.len() != arr_b.len() {
                return false;
            }
            arr_a
                .iter()
                .zip(arr_b)
                .all(|(x, y)| deep_equal_data(x, y, ignore_prefix))
        }

        (Value::Object(obj_a), Value::Object(obj_b)) => {
            let count_a = obj_a
                .keys()
                .filter(|k| !k.starts_with(ignore_prefix))
                .count();
            let count_b = obj_b
                .keys()
                .filter(|k| !k.starts_with(ignore_prefix))
                .count();
            if count_a != count_b {
                return false;
            }
            obj_a
                .iter()
                .filter(|(k, _)| !k.starts_with(ignore_prefix))
                .all(|(key, val_a)| {
                    matches!(obj_b.get(key), Some(val_b) if deep_equal_data(val_a, val_b, ignore_prefix))
                })
        }

        _ => deep_equal(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_compare_by_value() {
        assert!(deep_equal(&json!(1), &json!(1)));
        assert!(!deep_equal(&json!(1), &json!(2)));
        assert!(deep_equal(&json!("a"), &json!("a")));
        assert!(!deep_equal(&json!("a"), &json!("b")));
        assert!(deep_equal(&json!(null), &json!(null)));
    }

    #[test]
    fn different_types_never_equal() {
        assert!(!deep_equal(&json!(0), &json!(null)));
        assert!(!deep_equal(&json!(0), &json!(false)));
        assert!(!deep_equal(&json!(1), &json!(true)));
        assert!(!deep_equal(&json!(""), &json!(null)));
        assert!(!deep_equal(&json!({}), &json!([])));
    }

    #[test]
    fn objects_ignore_key_order() {
        assert!(deep_equal(
            &json!({"a": 1, "b": "2"}),
            &json!({"b": "2", "a": 1})
        ));
    }

    #[test]
    fn objects_differ_on_extra_property() {
        assert!(!deep_equal(
            &json!({"a": 1}),
            &json!({"a": 1, "b": 2})
        ));
    }

    #[test]
    fn arrays_compare_elementwise() {
        assert!(deep_equal(&json!([1, 2, 3]), &json!([1, 2, 3])));
        assert!(!deep_equal(&json!([1, 2, 3]), &json!([1, 2, 4])));
        assert!(!deep_equal(&json!([1, 2, 3]), &json!([1, 2])));
    }

    #[test]
    fn nested_structures_compare_deeply() {
        assert!(deep_equal(
            &json!({"a": [{"b": "c"}]}),
            &json!({"a": [{"b": "c"}]})
        ));
        assert!(!deep_equal(
            &json!({"a": [{"b": "c"}]}),
            &json!({"a": [{"b": "d"}]})
        ));
    }

    #[test]
    fn data_equality_ignores_prefixed_keys() {
        let a = json!({"price": 10, "xpath_price": "items[0].price"});
        let b = json!({"price": 10, "xpath_price": "items[4].price"});
        assert!(deep_equal_data(&a, &b, "xpath_"));
        assert!(!deep_equal(&a, &b));
    }

    #[test]
    fn data_equality_ignores_one_sided_annotations() {
        let stored = json!({"items": [{"qty": 1}]});
        let working = json!({
            "items": [{"qty": 1, "xpath_qty": "items[0].qty", "xpath_row_id": 7}]
        });
        assert!(deep_equal_data(&stored, &working, "xpath_"));
    }

    #[test]
    fn data_equality_still_sees_business_changes() {
        let stored = json!({"qty": 1});
        let working = json!({"qty": 2, "xpath_qty": "items[0].qty"});
        assert!(!deep_equal_data(&stored, &working, "xpath_"));
    }

    #[test]
    fn data_equality_counts_business_keys() {
        let a = json!({"qty": 1, "price": 2});
        let b = json!({"qty": 1, "xpath_qty": "q"});
        assert!(!deep_equal_data(&a, &b, "xpath_"));
    }
}
