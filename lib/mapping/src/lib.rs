//! Type registry and JSON mapping for the amber-lantern process model.
//!
//! This crate provides:
//!
//! - **Type Registry**: field tables for plain structs, discriminator tables
//!   for closed unions and BPMN element rules, built once and shared
//! - **Mapper Dispatch**: one [`TypeMapper`] per Rust type, resolved through
//!   overrides or [`JsonMapped`] and cached by `TypeId`
//! - **JSON backends**: a streaming writer over any `io::Write` and a tree
//!   writer producing ordered `serde_json::Value`s, behind one
//!   [`JsonWriter`] trait
//! - **Facades**: [`JsonStreamMapper`] and [`JsonTreeMapper`]
//!
//! Model types opt in with [`BeanType`] plus [`json_bean!`], or with the
//! [`polymorphic!`] and [`json_enum!`] macros.

pub mod bean;
pub mod config;
pub mod container;
pub mod enums;
pub mod error;
pub mod facade;
pub mod mapper;
pub mod polymorphic;
pub mod registry;
pub mod scalar;
pub mod writer;

pub use bean::{BeanMapper, BeanType, FieldMapping, TypeMapping, TypeMappingBuilder};
pub use config::JsonConfig;
pub use enums::{EnumMapper, JsonEnum};
pub use error::{JsonKind, MappingError};
pub use facade::{JsonStreamMapper, JsonTreeMapper};
pub use mapper::{JsonMapped, JsonReadContext, JsonWriteContext, TypeMapper};
pub use polymorphic::{Polymorphic, PolymorphicMapper, PolymorphicMapping, Subtype, VariantMapping};
pub use registry::{
    BpmnElementName, BpmnGuard, BpmnTypeMapping, DEFAULT_DISCRIMINATOR_FIELD, MapperDispatch,
    TypeRegistry, TypeRegistryBuilder,
};
pub use writer::{JsonWriter, StreamingJsonWriter, TreeJsonWriter, write_json_value};
