//! BPMN 2.0 XML mapping for amber-lantern workflows.
//!
//! [`BpmnMapper`] reads the first process of a BPMN document into a
//! [`Workflow`](amber_lantern_workflow::Workflow) and writes workflows back.
//! Which element becomes which activity is decided by the BPMN rules in the
//! [`TypeRegistry`](amber_lantern_mapping::TypeRegistry); see
//! [`register_bpmn_rules`].
//!
//! Content the mapper does not understand is not lost. It is kept as
//! residue on the activity, transition, scope or workflow it was found in
//! and written back in place, so documents from other modelers survive a
//! read/write cycle.

pub mod config;
mod diagram;
pub mod error;
mod json;
pub mod mapper;
pub mod model;
pub mod reader;
pub mod rules;
pub mod validate;
pub mod writer;

pub use config::{BpmnConfig, UnmatchedElementPolicy};
pub use error::BpmnError;
pub use mapper::{BpmnMapper, default_registry};
pub use model::BpmnMapped;
pub use reader::BpmnReader;
pub use rules::{BPMN_NS, EFFEKTIF_NS, register_bpmn_rules};
pub use validate::{XmlSchemaValidator, validate_definitions};
pub use writer::{BpmnWriter, write_workflow};
