//! Core domain types for the amber-lantern interchange layer.
//!
//! This crate provides the identifier types and the error-handling
//! foundation shared by the XML, mapping, workflow and BPMN crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId, WorkflowId};
