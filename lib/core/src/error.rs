//! Error handling foundation for amber-lantern.
//!
//! Only the `Result` alias lives here. The XML, mapping and BPMN crates each
//! define their own error enums and return them as `Report<E>`, adding
//! layer-appropriate context with rootcause's `.context()` as a failure
//! travels from the XML parser up through the BPMN reader.

use rootcause::Report;

/// Result alias over a rootcause [`Report`] with a typed context `C`.
///
/// `Result<Workflow, BpmnError>` reads as "a workflow, or a report whose
/// current context is a `BpmnError`".
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
