//! Error types for the BPMN crate.
//!
//! Failures from the XML and mapping layers arrive as reports of their own
//! error types; the reader and writer put [`BpmnError::Xml`] or
//! [`BpmnError::Mapping`] on top with `.context()`, so the original cause
//! stays in the report.

use std::fmt;

/// Errors from reading, writing and validating BPMN documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BpmnError {
    /// An extension element names a variant the registry does not know.
    UnknownSubtype { base: String, discriminator: String },
    /// Several candidate types match an element and no guard decides.
    AmbiguousElement {
        element: String,
        id: Option<String>,
        candidates: Vec<String>,
    },
    /// An attribute or text does not parse as the expected value.
    InvalidValue {
        element: String,
        expected: String,
        value: String,
    },
    /// A diagram element refers to a model element that does not exist.
    MissingReference { element: String, reference: String },
    /// The document has no `process` element.
    MissingProcess,
    /// The schema validator rejected the document.
    SchemaValidation { message: String },
    /// The document is not well-formed XML, or could not be written.
    Xml,
    /// A value could not be converted to or from JSON.
    Mapping,
    /// A model type has no BPMN element registered.
    UnregisteredType { type_name: String },
}

impl fmt::Display for BpmnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSubtype {
                base,
                discriminator,
            } => write!(f, "unknown {base} type '{discriminator}'"),
            Self::AmbiguousElement {
                element,
                id,
                candidates,
            } => {
                write!(f, "ambiguous element {element}")?;
                if let Some(id) = id {
                    write!(f, " '{id}'")?;
                }
                write!(f, ": could be any of {}", candidates.join(", "))
            }
            Self::InvalidValue {
                element,
                expected,
                value,
            } => write!(f, "invalid value '{value}' in {element}: expected {expected}"),
            Self::MissingReference { element, reference } => {
                write!(f, "{element} refers to unknown element '{reference}'")
            }
            Self::MissingProcess => write!(f, "BPMN definitions contain no process"),
            Self::SchemaValidation { message } => write!(f, "schema validation failed: {message}"),
            Self::Xml => write!(f, "BPMN XML could not be processed"),
            Self::Mapping => write!(f, "BPMN value could not be mapped"),
            Self::UnregisteredType { type_name } => {
                write!(f, "no BPMN element registered for {type_name}")
            }
        }
    }
}

impl std::error::Error for BpmnError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_element_lists_candidates() {
        let err = BpmnError::AmbiguousElement {
            element: "serviceTask".to_string(),
            id: Some("s1".to_string()),
            candidates: vec!["javaServiceTask".to_string(), "httpServiceTask".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous element serviceTask 's1': could be any of javaServiceTask, httpServiceTask"
        );
    }

    #[test]
    fn missing_reference_names_both_sides() {
        let err = BpmnError::MissingReference {
            element: "BPMNEdge 'e1'".to_string(),
            reference: "flow9".to_string(),
        };
        assert_eq!(err.to_string(), "BPMNEdge 'e1' refers to unknown element 'flow9'");
    }
}
