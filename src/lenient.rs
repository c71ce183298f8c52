//! Lenient serde helpers for the API's loosely typed JSON
//!
//! The API sends numbers as strings, booleans as `"0"`/`"1"`, and a list with
//! one element as a bare object. Values that cannot be read fall back to the
//! field default instead of failing the whole record.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read an unsigned integer from a number or a numeric string.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a string from a string or a number.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `1`, `"1"` and `true` are true; everything else is false.
pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => as_u64(other) == Some(1),
    }
}

/// Unix seconds to a timestamp. Zero and unreadable values are `None`.
pub fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = as_u64(value).filter(|s| *s > 0)?;
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

/// Decode every element of an array, or a single object as a one-element list.
/// Elements that do not decode (the API sends `""` for empty lists) are skipped.
pub fn as_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map(|item| vec![item])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

// deserialize_with adapters

pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(as_u64(&Value::deserialize(d)?).unwrap_or_default())
}

/// `None` for missing, negative or unreadable values
pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(as_u64(&Value::deserialize(d)?))
}

pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(as_string(&Value::deserialize(d)?).unwrap_or_default())
}

pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(as_flag(&Value::deserialize(d)?))
}

pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(as_timestamp(&Value::deserialize(d)?))
}

pub fn one_or_many<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(as_list(&Value::deserialize(d)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "int")]
        id: u64,
        #[serde(default, deserialize_with = "text")]
        name: String,
        #[serde(default, deserialize_with = "flag")]
        active: bool,
        #[serde(default, deserialize_with = "timestamp")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_numbers_from_strings() {
        assert_eq!(as_u64(&json!("42")), Some(42));
        assert_eq!(as_u64(&json!(" 7 ")), Some(7));
        assert_eq!(as_u64(&json!(9)), Some(9));
        assert_eq!(as_u64(&json!("")), None);
        assert_eq!(as_u64(&json!(null)), None);
    }

    #[test]
    fn test_flags() {
        assert!(as_flag(&json!("1")));
        assert!(as_flag(&json!(1)));
        assert!(as_flag(&json!(true)));
        assert!(!as_flag(&json!("0")));
        assert!(!as_flag(&json!("yes")));
    }

    #[test]
    fn test_record_with_mixed_types() {
        let row: Row = serde_json::from_value(json!({
            "id": "12",
            "name": 300,
            "active": "1",
            "at": "1500000000"
        }))
        .unwrap();
        assert_eq!(row.id, 12);
        assert_eq!(row.name, "300");
        assert!(row.active);
        assert_eq!(row.at.map(|t| t.timestamp()), Some(1_500_000_000));
    }

    #[test]
    fn test_missing_and_garbage_fall_back() {
        let row: Row = serde_json::from_value(json!({ "id": "abc", "at": "0" })).unwrap();
        assert_eq!(row.id, 0);
        assert_eq!(row.name, "");
        assert!(!row.active);
        assert!(row.at.is_none());
    }

    #[test]
    fn test_optional_int() {
        #[derive(Deserialize)]
        struct Parent {
            #[serde(default, deserialize_with = "opt_int")]
            parent: Option<u64>,
        }

        let parse = |v: Value| serde_json::from_value::<Parent>(v).unwrap().parent;
        assert_eq!(parse(json!({ "parent": "4" })), Some(4));
        assert_eq!(parse(json!({ "parent": "-1" })), None);
        assert_eq!(parse(json!({ "parent": -1 })), None);
        assert_eq!(parse(json!({})), None);
    }

    #[test]
    fn test_one_or_many() {
        let single: Vec<Row> = as_list(&json!({ "id": "1" }));
        assert_eq!(single.len(), 1);

        let many: Vec<Row> = as_list(&json!([{ "id": "1" }, "", { "id": 2 }]));
        assert_eq!(many.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let none: Vec<Row> = as_list(&json!(""));
        assert!(none.is_empty());
    }
}
