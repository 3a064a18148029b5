//! XML plumbing for the BPMN mapping layer.
//!
//! Two tree shapes live here:
//!
//! - **[`XmlDocument`]**: the immutable, arena-indexed result of parsing.
//!   Readers never mutate it; instead they record what they understood in a
//!   [`Consumption`] set and later ask the document for the *remainder* of a
//!   node, i.e. everything that was not consumed.
//! - **[`XmlElement`]**: an owned, mutable element tree. Remainders are
//!   materialized as `XmlElement`s so they can be stored on model objects,
//!   and the BPMN writer builds its output as an `XmlElement` tree.
//!
//! Parsing and serialization use quick-xml with namespace resolution done
//! here, so every element and attribute carries its namespace URI rather
//! than its document-specific prefix.

pub mod document;
pub mod element;
pub mod error;
pub mod name;
mod parse;
mod serialize;

pub use document::{Consumption, XmlDocument, XmlNodeId};
pub use element::{XmlAttribute, XmlElement, XmlText};
pub use error::XmlError;
pub use name::{XML_NS, XmlName, XmlNamespace};
pub use parse::parse_document;
pub use serialize::{WriteOptions, write_document};
