//! JSON values embedded in BPMN attributes.
//!
//! Binding values, property values and default values travel as JSON text
//! inside attributes or elements. Hand-written documents often leave plain
//! strings unquoted, so text that is not valid JSON reads as a string.

use crate::error::BpmnError;
use amber_lantern_core::Result;
use amber_lantern_mapping::{
    JsonMapped, JsonReadContext, JsonWriteContext, Polymorphic, TreeJsonWriter, TypeRegistry,
};
use serde_json::Value;

/// Converts `value` to its JSON tree.
pub(crate) fn to_json<V: JsonMapped>(registry: &TypeRegistry, value: &V) -> Result<Value, BpmnError> {
    let mut tree = TreeJsonWriter::new();
    JsonWriteContext::new(registry, &mut tree)
        .write_value(value)
        .map_err(|e| e.context(BpmnError::Mapping))?;
    tree.finish().map_err(|e| e.context(BpmnError::Mapping))
}

/// Converts `value` to compact JSON text.
pub(crate) fn to_json_text<V: JsonMapped>(
    registry: &TypeRegistry,
    value: &V,
) -> Result<String, BpmnError> {
    Ok(to_json(registry, value)?.to_string())
}

/// Reads a value from JSON text, falling back to the text as a string.
pub(crate) fn from_json_text<V: JsonMapped>(
    registry: &TypeRegistry,
    text: &str,
) -> Result<V, BpmnError> {
    let ctx = JsonReadContext::new(registry);
    let raw = Value::String(text.to_string());
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => ctx.read_value::<V>(&parsed).or_else(|err| {
            ctx.read_value::<V>(&raw)
                .map_err(|_| err.context(BpmnError::Mapping))
        }),
        Err(_) => ctx
            .read_value::<V>(&raw)
            .map_err(|e| e.context(BpmnError::Mapping)),
    }
}

/// A default instance of the variant of `B` named `discriminator`.
pub(crate) fn instantiate<B: Polymorphic>(
    registry: &TypeRegistry,
    discriminator: &str,
) -> Result<B, BpmnError> {
    let mapping = registry
        .polymorphic::<B>()
        .map_err(|e| e.context(BpmnError::Mapping))?;
    mapping
        .variant(discriminator)
        .map(|variant| variant.instantiate())
        .ok_or_else(|| {
            BpmnError::UnknownSubtype {
                base: B::base_name().to_string(),
                discriminator: discriminator.to_string(),
            }
            .into()
        })
}

/// Whether `discriminator` names a registered variant of `B`.
pub(crate) fn is_variant<B: Polymorphic>(registry: &TypeRegistry, discriminator: &str) -> bool {
    registry
        .polymorphic::<B>()
        .is_ok_and(|mapping| mapping.variant(discriminator).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::default_registry;
    use amber_lantern_workflow::DataType;
    use serde_json::json;

    #[test]
    fn unquoted_text_reads_as_string() {
        let registry = default_registry();
        let value: String = from_json_text(&registry, "hello").expect("read");
        assert_eq!(value, "hello");
        let number_text: String = from_json_text(&registry, "42").expect("read");
        assert_eq!(number_text, "42");
        let value: Value = from_json_text(&registry, "[1,2]").expect("read");
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn unknown_variant_is_an_unknown_subtype() {
        let registry = default_registry();
        let err = instantiate::<DataType>(&registry, "money").expect_err("unknown");
        assert_eq!(
            err.current_context(),
            &BpmnError::UnknownSubtype {
                base: "DataType".to_string(),
                discriminator: "money".to_string(),
            }
        );
        assert!(is_variant::<DataType>(&registry, "choice"));
    }
}
