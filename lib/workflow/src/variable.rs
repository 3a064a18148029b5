//! Process variables.

use crate::data_type::DataType;
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean};
use serde_json::Value;

/// A named, typed value held by a running workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variable {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<DataType>,
    /// Initial value, in the JSON form of `data_type`.
    pub default_value: Option<Value>,
}

impl Variable {
    #[must_use]
    pub fn new(id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Some(id.into()),
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl BeanType for Variable {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |v| &v.id, |v| &mut v.id)
            .field("name", |v| &v.name, |v| &mut v.name)
            .field("description", |v| &v.description, |v| &mut v.description)
            .field_as("data_type", "type", |v| &v.data_type, |v| &mut v.data_type)
            .field_as(
                "default_value",
                "defaultValue",
                |v| &v.default_value,
                |v| &mut v.default_value,
            );
    }
}

json_bean!(Variable);
