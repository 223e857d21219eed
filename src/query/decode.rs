//! Reading structured parameters back into typed payloads

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use super::value::Value;

/// A structured parameter that does not match the expected payload shape
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}': expected {expected}, found {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

fn unexpected(field: &str, expected: &'static str, found: &Value) -> PayloadError {
    PayloadError::UnexpectedType {
        field: field.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// View a value as a map
pub fn map<'a>(value: &'a Value, field: &str) -> Result<&'a BTreeMap<String, Value>, PayloadError> {
    value.as_map().ok_or_else(|| unexpected(field, "map", value))
}

/// View a value as a list
pub fn list<'a>(value: &'a Value, field: &str) -> Result<&'a [Value], PayloadError> {
    value.as_list().ok_or_else(|| unexpected(field, "list", value))
}

pub fn field<'a>(entries: &'a BTreeMap<String, Value>, name: &str) -> Result<&'a Value, PayloadError> {
    entries
        .get(name)
        .ok_or_else(|| PayloadError::MissingField(name.to_string()))
}

pub fn str_field<'a>(entries: &'a BTreeMap<String, Value>, name: &str) -> Result<&'a str, PayloadError> {
    let value = field(entries, name)?;
    value.as_str().ok_or_else(|| unexpected(name, "string", value))
}

pub fn datetime_field(entries: &BTreeMap<String, Value>, name: &str) -> Result<DateTime<Utc>, PayloadError> {
    let value = field(entries, name)?;
    value.as_datetime().ok_or_else(|| unexpected(name, "datetime", value))
}

/// Absent and `null` both read as `None`
pub fn opt_datetime_field(
    entries: &BTreeMap<String, Value>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, PayloadError> {
    match entries.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_datetime()
            .map(Some)
            .ok_or_else(|| unexpected(name, "datetime", value)),
    }
}

/// Absent and `null` both read as `false`
pub fn bool_field(entries: &BTreeMap<String, Value>, name: &str) -> Result<bool, PayloadError> {
    match entries.get(name) {
        None | Some(Value::Null) => Ok(false),
        Some(value) => value.as_bool().ok_or_else(|| unexpected(name, "bool", value)),
    }
}

pub fn list_field<'a>(entries: &'a BTreeMap<String, Value>, name: &str) -> Result<&'a [Value], PayloadError> {
    list(field(entries, name)?, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_mistyped_fields_are_reported_by_name() {
        let value = Value::map([("id", Value::Int(7)), ("until", Value::Null)]);
        let entries = map(&value, "entity").unwrap();

        assert!(matches!(str_field(entries, "name"), Err(PayloadError::MissingField(f)) if f == "name"));
        assert!(matches!(
            str_field(entries, "id"),
            Err(PayloadError::UnexpectedType { expected: "string", found: "int", .. })
        ));
        assert_eq!(opt_datetime_field(entries, "until").unwrap(), None);
        assert!(!bool_field(entries, "primary").unwrap());
    }
}
