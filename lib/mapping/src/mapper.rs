//! Mapper traits and the per-call read/write contexts.

use crate::bean::{BeanMapper, BeanType};
use crate::error::MappingError;
use crate::polymorphic::{Polymorphic, PolymorphicMapper};
use crate::registry::TypeRegistry;
use crate::writer::JsonWriter;
use amber_lantern_core::Result;
use serde_json::Value;
use std::any::{TypeId, type_name};
use std::sync::Arc;

/// Converts values of one type to and from JSON.
///
/// Mappers are stateless and shared through the registry's dispatch cache,
/// so they must be `Send + Sync`. Mappers for composite types look up the
/// mappers of their parts through the context at call time.
pub trait TypeMapper<V>: Send + Sync {
    /// Writes `value` as exactly one JSON value.
    fn write(&self, value: &V, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError>;

    /// Reads a value from its JSON form.
    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<V, MappingError>;

    /// Whether a bean field holding `value` is left out of the output.
    fn is_absent(&self, _value: &V) -> bool {
        false
    }

    /// Keys this value claims when inlined into an enclosing object.
    fn inline_keys(&self, _registry: &TypeRegistry) -> Vec<String> {
        Vec::new()
    }
}

/// Types with a default JSON mapping.
///
/// The registry consults registered overrides first and falls back to
/// [`JsonMapped::json_mapper`].
pub trait JsonMapped: Sized + 'static {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>>;
}

/// State for one write call: the registry, the output and the stack of
/// beans currently being written.
pub struct JsonWriteContext<'a> {
    registry: &'a TypeRegistry,
    writer: &'a mut dyn JsonWriter,
    active: Vec<(usize, TypeId)>,
}

impl<'a> JsonWriteContext<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, writer: &'a mut dyn JsonWriter) -> Self {
        Self {
            registry,
            writer,
            active: Vec::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn writer(&mut self) -> &mut dyn JsonWriter {
        &mut *self.writer
    }

    /// Writes a value with the mapper dispatch selects for `V`.
    ///
    /// # Errors
    ///
    /// Propagates mapper and writer errors.
    pub fn write_value<V: JsonMapped>(&mut self, value: &V) -> Result<(), MappingError> {
        let mapper = self.registry.mapper::<V>();
        mapper.write(value, self)
    }

    /// Pushes a bean onto the active stack.
    ///
    /// Zero-sized values share addresses and are not tracked.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::LoopDetected`] if the same bean is already
    /// being written.
    pub fn enter<T: 'static>(&mut self, value: &T) -> Result<(), MappingError> {
        if size_of::<T>() == 0 {
            return Ok(());
        }
        let key = (std::ptr::from_ref(value) as usize, TypeId::of::<T>());
        if self.active.contains(&key) {
            return Err(MappingError::LoopDetected {
                type_name: type_name::<T>().to_string(),
            }
            .into());
        }
        self.active.push(key);
        Ok(())
    }

    /// Pops the bean pushed by the matching [`JsonWriteContext::enter`].
    pub fn exit<T: 'static>(&mut self) {
        if size_of::<T>() != 0 {
            self.active.pop();
        }
    }
}

/// State for one read call.
#[derive(Clone, Copy)]
pub struct JsonReadContext<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> JsonReadContext<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Reads a value with the mapper dispatch selects for `V`.
    ///
    /// # Errors
    ///
    /// Propagates mapper errors.
    pub fn read_value<V: JsonMapped>(&self, json: &Value) -> Result<V, MappingError> {
        self.registry.mapper::<V>().read(json, self)
    }

    /// Reads bean `T` by its field table, ignoring mapper overrides.
    ///
    /// # Errors
    ///
    /// Propagates mapper errors.
    pub fn read_bean<T: BeanType>(&self, json: &Value) -> Result<T, MappingError> {
        BeanMapper::<T>::new().read(json, self)
    }

    /// Reads a variant of union `B` selected by its discriminator.
    ///
    /// # Errors
    ///
    /// Returns the registry's discriminator errors and propagates mapper
    /// errors.
    pub fn read_polymorphic<B: Polymorphic>(&self, json: &Value) -> Result<B, MappingError> {
        PolymorphicMapper::<B>::new().read(json, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::TreeJsonWriter;

    #[test]
    fn entering_the_same_bean_twice_is_a_loop() {
        let registry = TypeRegistry::builder().build();
        let mut writer = TreeJsonWriter::new();
        let mut ctx = JsonWriteContext::new(&registry, &mut writer);
        let bean = String::from("bean");

        ctx.enter(&bean).expect("first entry");
        let err = ctx.enter(&bean).expect_err("second entry");
        assert!(matches!(
            err.current_context(),
            MappingError::LoopDetected { type_name } if type_name.contains("String")
        ));

        ctx.exit::<String>();
        ctx.enter(&bean).expect("entry after exit");
    }

    #[test]
    fn zero_sized_beans_are_not_tracked() {
        #[derive(Default)]
        struct Marker;

        let registry = TypeRegistry::builder().build();
        let mut writer = TreeJsonWriter::new();
        let mut ctx = JsonWriteContext::new(&registry, &mut writer);
        let marker = Marker;
        ctx.enter(&marker).expect("first");
        ctx.enter(&marker).expect("second");
    }
}
