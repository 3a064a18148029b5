//! Value bindings.
//!
//! A binding supplies a value to an activity either as a fixed value or as
//! an expression evaluated against process variables at run time.

use crate::data_type::DataType;
use amber_lantern_mapping::{BeanMapper, BeanType, JsonMapped, TypeMapper, TypeMappingBuilder};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A fixed value or an expression producing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    /// The fixed value, if any.
    pub value: Option<T>,
    /// Expression evaluated at run time, e.g. `customer.email`.
    pub expression: Option<String>,
    /// Type of the bound value, when it cannot be inferred.
    pub data_type: Option<DataType>,
    /// Free-form metadata, in wire order.
    pub metadata: Map<String, Value>,
}

impl<T> Default for Binding<T> {
    fn default() -> Self {
        Self {
            value: None,
            expression: None,
            data_type: None,
            metadata: Map::new(),
        }
    }
}

impl<T> Binding<T> {
    /// A binding to a fixed value.
    #[must_use]
    pub fn from_value(value: T) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// A binding to an expression.
    #[must_use]
    pub fn from_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

impl<T: JsonMapped + Send + Sync> BeanType for Binding<T> {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("value", |b| &b.value, |b| &mut b.value)
            .field("expression", |b| &b.expression, |b| &mut b.expression)
            .field_as("data_type", "dataType", |b| &b.data_type, |b| &mut b.data_type)
            .field("metadata", |b| &b.metadata, |b| &mut b.metadata);
    }
}

impl<T: JsonMapped + Send + Sync> JsonMapped for Binding<T> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(BeanMapper::<Self>::new())
    }
}
