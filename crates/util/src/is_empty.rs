use serde_json::Value;

/// Check whether a JSON object value has no properties.
///
/// Non-object values are never "empty" in this sense: a scalar or an
/// array carries content of its own.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use datagrid_util::is_empty::is_empty_value;
///
/// assert!(is_empty_value(&json!({})));
/// assert!(!is_empty_value(&json!({"a": 1})));
/// assert!(!is_empty_value(&json!([])));
/// ```
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}
