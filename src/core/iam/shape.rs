//! String-or-array decoding for IAM policy fields
//!
//! `Action`, `Resource`, `Statement` and the values under `Principal` may each
//! appear as a single item or as an array. The shape is decided once, up front,
//! into a named [`OneOrMany`] so callers never poke at raw JSON types.

use crate::error::{Result, SnitchError};
use serde_json::Value;

/// A field that was written either as one item or as an array of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    Single(T),
    Multiple(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into an ordered list
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Single(item) => vec![item],
            OneOrMany::Multiple(items) => items,
        }
    }
}

impl OneOrMany<String> {
    /// Decode a string-or-array-of-strings field
    ///
    /// `field` names the JSON key for error messages. An empty array is
    /// rejected: IAM never accepts `"Action": []`.
    pub fn strings(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(OneOrMany::Single(s.clone())),
            Value::Array(items) if items.is_empty() => Err(SnitchError::parse(format!(
                "field {} is an empty array",
                field
            ))),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SnitchError::parse(format!(
                            "field {} must contain only strings, found {}",
                            field,
                            json_kind(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(OneOrMany::Multiple),
            other => Err(SnitchError::parse(format!(
                "field {} must be a string or an array of strings, found {}",
                field,
                json_kind(other)
            ))),
        }
    }
}

impl<'a> OneOrMany<&'a serde_json::Map<String, Value>> {
    /// Decode an object-or-array-of-objects field
    pub fn objects(field: &str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(OneOrMany::Single(map)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        SnitchError::parse(format!(
                            "field {} must contain only objects, found {}",
                            field,
                            json_kind(item)
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(OneOrMany::Multiple),
            other => Err(SnitchError::parse(format!(
                "field {} must be an object or an array of objects, found {}",
                field,
                json_kind(other)
            ))),
        }
    }
}

/// Human-readable JSON type name for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_string() {
        let shape = OneOrMany::strings("Action", &json!("s3:GetObject")).unwrap();
        assert_eq!(shape, OneOrMany::Single("s3:GetObject".to_string()));
        assert_eq!(shape.into_vec(), vec!["s3:GetObject"]);
    }

    #[test]
    fn test_string_array_keeps_order() {
        let shape = OneOrMany::strings("Action", &json!(["b", "a", "b"])).unwrap();
        assert_eq!(shape.into_vec(), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_rejects_non_strings() {
        let err = OneOrMany::strings("Resource", &json!(["arn:aws:s3:::x", 7])).unwrap_err();
        assert!(err.is_parse());
        assert!(err.to_string().contains("found number"));

        assert!(OneOrMany::strings("Resource", &json!({"a": 1})).is_err());
        assert!(OneOrMany::strings("Resource", &json!(null)).is_err());
    }

    #[test]
    fn test_rejects_empty_array() {
        let err = OneOrMany::strings("Action", &json!([])).unwrap_err();
        assert!(err.to_string().contains("empty array"));
    }

    #[test]
    fn test_objects() {
        let single = json!({"Effect": "Allow"});
        assert!(matches!(
            OneOrMany::objects("Statement", &single).unwrap(),
            OneOrMany::Single(_)
        ));

        let many = json!([{"Effect": "Allow"}, {"Effect": "Deny"}]);
        assert_eq!(OneOrMany::objects("Statement", &many).unwrap().into_vec().len(), 2);

        let bad = json!([{"Effect": "Allow"}, "oops"]);
        assert!(OneOrMany::objects("Statement", &bad).is_err());
    }
}
