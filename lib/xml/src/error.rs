//! Error types for the XML crate.

use std::fmt;

/// Errors from parsing or serializing XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// The input is not well-formed XML.
    Parse { position: u64, details: String },
    /// An element or attribute uses a prefix with no namespace binding.
    UnboundPrefix { prefix: String, position: u64 },
    /// The document is well-formed but structurally unusable.
    Structure { details: String },
    /// Writing the element tree failed.
    Write { details: String },
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { position, details } => {
                write!(f, "malformed XML at byte {position}: {details}")
            }
            Self::UnboundPrefix { prefix, position } => {
                write!(f, "unbound namespace prefix '{prefix}' at byte {position}")
            }
            Self::Structure { details } => write!(f, "unusable XML document: {details}"),
            Self::Write { details } => write!(f, "failed to write XML: {details}"),
        }
    }
}

impl std::error::Error for XmlError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_position() {
        let err = XmlError::Parse {
            position: 17,
            details: "unexpected end".to_string(),
        };
        assert_eq!(err.to_string(), "malformed XML at byte 17: unexpected end");
    }

    #[test]
    fn unbound_prefix_names_prefix() {
        let err = XmlError::UnboundPrefix {
            prefix: "camunda".to_string(),
            position: 3,
        };
        assert!(err.to_string().contains("'camunda'"));
    }
}
