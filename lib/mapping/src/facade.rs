//! Entry points for converting whole values.
//!
//! [`JsonStreamMapper`] writes to and reads from byte streams;
//! [`JsonTreeMapper`] converts to and from `serde_json::Value` trees.

use crate::config::JsonConfig;
use crate::error::MappingError;
use crate::mapper::{JsonMapped, JsonReadContext, JsonWriteContext};
use crate::registry::TypeRegistry;
use crate::writer::{StreamingJsonWriter, TreeJsonWriter};
use amber_lantern_core::Result;
use serde_json::Value;
use std::any::type_name;
use std::io;
use std::sync::Arc;
use tracing::instrument;

/// Streams values as JSON text.
#[derive(Clone)]
pub struct JsonStreamMapper {
    registry: Arc<TypeRegistry>,
    config: JsonConfig,
}

impl JsonStreamMapper {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, JsonConfig::default())
    }

    #[must_use]
    pub fn with_config(registry: Arc<TypeRegistry>, config: JsonConfig) -> Self {
        Self { registry, config }
    }

    #[must_use]
    pub fn config(&self) -> &JsonConfig {
        &self.config
    }

    /// Writes `value` to `sink` and hands the sink back.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Io`] if the sink fails, or any mapping error.
    #[instrument(skip_all, fields(type_name = type_name::<V>()))]
    pub fn write<V: JsonMapped, W: io::Write>(&self, value: &V, sink: W) -> Result<W, MappingError> {
        let mut writer = StreamingJsonWriter::new(sink).with_pretty(self.config.pretty);
        let mut ctx = JsonWriteContext::new(&self.registry, &mut writer);
        ctx.write_value(value)?;
        let mut sink = writer.into_inner();
        sink.flush().map_err(|e| MappingError::Io {
            details: e.to_string(),
        })?;
        Ok(sink)
    }

    /// Writes `value` as a JSON string.
    ///
    /// # Errors
    ///
    /// Propagates mapping errors.
    pub fn write_to_string<V: JsonMapped>(&self, value: &V) -> Result<String, MappingError> {
        let bytes = self.write(value, Vec::new())?;
        String::from_utf8(bytes).map_err(|e| {
            MappingError::Io {
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Reads one value from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Syntax`] for malformed JSON,
    /// [`MappingError::Io`] if the source fails, or any mapping error.
    #[instrument(skip_all, fields(type_name = type_name::<V>()))]
    pub fn read<V: JsonMapped, R: io::Read>(&self, source: R) -> Result<V, MappingError> {
        let json: Value =
            serde_json::from_reader(source).map_err(|e| MappingError::from_json_error(&e))?;
        JsonReadContext::new(&self.registry).read_value(&json)
    }

    /// Reads one value from a JSON string.
    ///
    /// # Errors
    ///
    /// Same as [`JsonStreamMapper::read`].
    pub fn read_str<V: JsonMapped>(&self, json: &str) -> Result<V, MappingError> {
        self.read(json.as_bytes())
    }
}

/// Converts values to and from JSON trees.
#[derive(Clone)]
pub struct JsonTreeMapper {
    registry: Arc<TypeRegistry>,
}

impl JsonTreeMapper {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Converts `value` to a JSON tree with keys in wire order.
    ///
    /// # Errors
    ///
    /// Propagates mapping errors.
    #[instrument(skip_all, fields(type_name = type_name::<V>()))]
    pub fn write<V: JsonMapped>(&self, value: &V) -> Result<Value, MappingError> {
        let mut writer = TreeJsonWriter::new();
        JsonWriteContext::new(&self.registry, &mut writer).write_value(value)?;
        writer.finish()
    }

    /// Reads a value from a JSON tree.
    ///
    /// # Errors
    ///
    /// Propagates mapping errors.
    #[instrument(skip_all, fields(type_name = type_name::<V>()))]
    pub fn read<V: JsonMapped>(&self, json: &Value) -> Result<V, MappingError> {
        JsonReadContext::new(&self.registry).read_value(json)
    }
}
