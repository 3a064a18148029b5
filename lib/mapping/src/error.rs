//! Error types for the mapping crate.
//!
//! Every failure in registry lookup, mapper dispatch and the JSON backends
//! is a [`MappingError`]. Callers in the BPMN layer wrap these with their
//! own context rather than inspecting them.

use serde_json::Value;
use std::fmt;

/// The JSON kind of a wire value, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    /// Classifies a JSON value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Errors from the type registry, mapper dispatch and JSON backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// A discriminator value has no registered variant for the base type.
    UnknownSubtype { base: String, discriminator: String },
    /// A polymorphic value arrived without its discriminator field.
    MissingDiscriminator { base: String, field: String },
    /// A wire value does not fit the target type.
    InvalidValue {
        expected: String,
        actual: String,
        actual_kind: JsonKind,
    },
    /// A type was used that the registry knows nothing about.
    UnregisteredType { type_name: String },
    /// A bean was reached again while it was still being written.
    LoopDetected { type_name: String },
    /// Reading from or writing to the underlying stream failed.
    Io { details: String },
    /// The input is not valid JSON.
    Syntax { details: String },
}

impl MappingError {
    /// Builds an [`MappingError::InvalidValue`] for `actual`.
    #[must_use]
    pub fn invalid(expected: impl Into<String>, actual: &Value) -> Self {
        let mut rendered = actual.to_string();
        if rendered.len() > 80 {
            let cut = (0..=77)
                .rev()
                .find(|i| rendered.is_char_boundary(*i))
                .unwrap_or(0);
            rendered.truncate(cut);
            rendered.push_str("...");
        }
        Self::InvalidValue {
            expected: expected.into(),
            actual: rendered,
            actual_kind: JsonKind::of(actual),
        }
    }

    /// Classifies a serde_json error as I/O or syntax.
    #[must_use]
    pub fn from_json_error(err: &serde_json::Error) -> Self {
        if err.is_io() {
            Self::Io {
                details: err.to_string(),
            }
        } else {
            Self::Syntax {
                details: err.to_string(),
            }
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSubtype {
                base,
                discriminator,
            } => {
                write!(f, "unknown subtype '{discriminator}' for {base}")
            }
            Self::MissingDiscriminator { base, field } => {
                write!(f, "missing discriminator field '{field}' for {base}")
            }
            Self::InvalidValue {
                expected,
                actual,
                actual_kind,
            } => {
                write!(f, "expected {expected}, found {actual_kind} {actual}")
            }
            Self::UnregisteredType { type_name } => {
                write!(f, "type is not registered: {type_name}")
            }
            Self::LoopDetected { type_name } => {
                write!(f, "object graph loops back into {type_name}")
            }
            Self::Io { details } => write!(f, "JSON I/O failed: {details}"),
            Self::Syntax { details } => write!(f, "invalid JSON: {details}"),
        }
    }
}

impl std::error::Error for MappingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_value_reports_kind_and_rendering() {
        let err = MappingError::invalid("i32", &json!(1.5));
        assert_eq!(err.to_string(), "expected i32, found number 1.5");
        assert!(matches!(
            err,
            MappingError::InvalidValue {
                actual_kind: JsonKind::Number,
                ..
            }
        ));
    }

    #[test]
    fn invalid_value_truncates_long_renderings() {
        let long = json!("x".repeat(200));
        let MappingError::InvalidValue { actual, .. } = MappingError::invalid("bool", &long) else {
            panic!("expected InvalidValue");
        };
        assert!(actual.len() <= 80);
        assert!(actual.ends_with("..."));
    }

    #[test]
    fn json_errors_are_classified() {
        let err = serde_json::from_str::<Value>("{").expect_err("truncated");
        assert!(matches!(
            MappingError::from_json_error(&err),
            MappingError::Syntax { .. }
        ));
    }
}
