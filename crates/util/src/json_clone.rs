use serde_json::{Map, Value};

/// Creates a deep clone of any JSON value.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datagrid_util::json_clone::deep_clone;
///
/// let original = json!({"items": [1, 2, 3]});
/// assert_eq!(deep_clone(&original), original);
/// ```
pub fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => Value::String(s.clone()),
        Value::Array(arr) => Value::Array(arr.iter().map(deep_clone).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, val) in obj {
                out.insert(key.clone(), deep_clone(val));
            }
            Value::Object(out)
        }
    }
}

/// Deep clone that drops every object key starting with `strip_prefix`,
/// recursively.
///
/// This is how an annotated working copy is reduced back to pure
/// business data before it is diffed or sent anywhere.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datagrid_util::json_clone::clone_stripped;
///
/// let working = json!({"price": 10, "xpath_price": "items[0].price"});
/// assert_eq!(clone_stripped(&working, "xpath_"), json!({"price": 10}));
/// ```
pub fn clone_stripped(value: &Value, strip_prefix: &str) -> Value {
    match value {
        Value::Array(arr) => Value::Array(
            arr.iter()
                .map(|el| clone_stripped(el, strip_prefix))
                .collect(),
        ),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, val) in obj {
                if key.starts_with(strip_prefix) {
                    continue;
                }
                out.insert(key.clone(), clone_stripped(val, strip_prefix));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_scalars() {
        for value in [json!(null), json!(true), json!(42), json!("hello")] {
            assert_eq!(deep_clone(&value), value);
        }
    }

    #[test]
    fn clones_nested_structures() {
        let value = json!({
            "array": [1, 2, {"nested": true}],
            "object": {"a": "b"},
            "scalar": 42
        });
        assert_eq!(deep_clone(&value), value);
    }

    #[test]
    fn strips_prefixed_keys_at_every_level() {
        let value = json!({
            "name": "order",
            "xpath_name": "orders[0].name",
            "items": [
                {"qty": 1, "xpath_qty": "orders[0].items[0].qty", "xpath_row_id": 9}
            ]
        });
        assert_eq!(
            clone_stripped(&value, "xpath_"),
            json!({"name": "order", "items": [{"qty": 1}]})
        );
    }

    #[test]
    fn strip_leaves_plain_values_untouched() {
        let value = json!({"a": [1, "x", null]});
        assert_eq!(clone_stripped(&value, "xpath_"), value);
    }

    #[test]
    fn strip_on_scalar_is_identity() {
        assert_eq!(clone_stripped(&json!(7), "xpath_"), json!(7));
    }
}
