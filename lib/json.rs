//! Validation helpers for reading configuration JSON.
//!
//! Every failure is an `Error::JsonValidation` carrying the offending value and
//! a description of what was expected.

use crate::Error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

fn literal(value: &Value) -> String {
    match value {
        Value::String(string) => string.clone(),
        other => other.to_string(),
    }
}

pub fn validate_object(value: &Value) -> Result<&Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| Error::json_validation(literal(value), None, "non-null object"))
}

pub fn string(value: &Value) -> Result<&str, Error> {
    value
        .as_str()
        .ok_or_else(|| Error::json_validation(literal(value), None, "string"))
}

fn member<'v>(value: &'v Value, field: &str, expected: &str) -> Result<&'v Value, Error> {
    validate_object(value)?
        .get(field)
        .ok_or_else(|| Error::json_validation(literal(value), Some(field), expected))
}

pub fn string_field<'v>(value: &'v Value, field: &str) -> Result<&'v str, Error> {
    member(value, field, "string")?
        .as_str()
        .ok_or_else(|| Error::json_validation(literal(value), Some(field), "string"))
}

pub fn integer_field(value: &Value, field: &str) -> Result<i64, Error> {
    member(value, field, "integer")?
        .as_i64()
        .ok_or_else(|| Error::json_validation(literal(value), Some(field), "integer"))
}

pub fn object_field<'v>(value: &'v Value, field: &str) -> Result<&'v Map<String, Value>, Error> {
    member(value, field, "non-null object")?
        .as_object()
        .ok_or_else(|| Error::json_validation(literal(value), Some(field), "non-null object"))
}

pub fn nonempty_array_field<'v>(value: &'v Value, field: &str) -> Result<&'v [Value], Error> {
    match member(value, field, "non-empty array")?.as_array() {
        Some(array) if !array.is_empty() => Ok(array.as_slice()),
        _ => Err(Error::json_validation(
            literal(value),
            Some(field),
            "non-empty array",
        )),
    }
}

/// Accepts `null` as the empty array.
pub fn null_or_array(value: &Value) -> Result<&[Value], Error> {
    match value {
        Value::Null => Ok(&[][..]),
        Value::Array(array) => Ok(array.as_slice()),
        other => Err(Error::json_validation(literal(other), None, "null or array")),
    }
}

/// Deserialize a plain data carrier. Failures name the offending value and
/// what serde expected of it.
pub fn deserialize<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    serde_json::from_value(value.clone())
        .map_err(|error| Error::json_validation(literal(value), None, error.to_string()))
}

pub fn check_unexpected_members(value: &Value, expected: &[&str]) -> Result<(), Error> {
    for key in validate_object(value)?.keys() {
        if !expected.contains(&key.as_str()) {
            return Err(Error::json_validation(
                literal(value),
                Some(key.as_str()),
                format!("fields {}", expected.join(", ")),
            ));
        }
    }
    Ok(())
}
