//! Schema validation hook.
//!
//! No XSD engine ships with this crate. Callers that have one plug it in
//! through [`XmlSchemaValidator`]; the mapper runs it on every document it
//! reads.

use crate::error::BpmnError;
use amber_lantern_core::Result;
use std::error::Error;

/// Validates BPMN XML against the BPMN 2.0 schema.
pub trait XmlSchemaValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns the validator's own error describing the first violation.
    fn validate(&self, xml: &str) -> std::result::Result<(), Box<dyn Error + Send + Sync>>;
}

/// Runs `validator` on `xml`.
///
/// Validator errors are often wrapped several times over; the message of
/// the innermost cause is the one that names the offending content, so that
/// is the one reported.
///
/// # Errors
///
/// Returns [`BpmnError::SchemaValidation`] if the validator rejects the
/// document.
pub fn validate_definitions(validator: &dyn XmlSchemaValidator, xml: &str) -> Result<(), BpmnError> {
    validator.validate(xml).map_err(|err| {
        BpmnError::SchemaValidation {
            message: innermost_message(err.as_ref()),
        }
        .into()
    })
}

fn innermost_message(err: &(dyn Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Wrapped {
        message: &'static str,
        source: Option<Box<Wrapped>>,
    }

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn Error + 'static))
        }
    }

    struct Rejecting;

    impl XmlSchemaValidator for Rejecting {
        fn validate(&self, _xml: &str) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
            Err(Box::new(Wrapped {
                message: "validation failed",
                source: Some(Box::new(Wrapped {
                    message: "cvc-complex-type.2.4.a: invalid content starting with element 'bpmn:bogus'",
                    source: None,
                })),
            }))
        }
    }

    struct Accepting;

    impl XmlSchemaValidator for Accepting {
        fn validate(&self, _xml: &str) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
            Ok(())
        }
    }

    #[test]
    fn reports_the_innermost_cause() {
        let err = validate_definitions(&Rejecting, "<definitions/>").expect_err("rejected");
        assert_eq!(
            err.current_context(),
            &BpmnError::SchemaValidation {
                message: "cvc-complex-type.2.4.a: invalid content starting with element 'bpmn:bogus'"
                    .to_string(),
            }
        );
    }

    #[test]
    fn accepted_documents_pass() {
        assert!(validate_definitions(&Accepting, "<definitions/>").is_ok());
    }
}
