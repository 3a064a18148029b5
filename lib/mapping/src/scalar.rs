//! Mappers for scalar values: strings, booleans, numbers, timestamps, ids
//! and raw JSON.
//!
//! Numbers follow one rule set for every numeric field:
//!
//! | wire      | integer field             | float field |
//! |-----------|---------------------------|-------------|
//! | integer   | checked conversion        | widened     |
//! | float     | whole values in range     | as-is       |
//!
//! Any other float read into an integer field is an invalid value.

use crate::error::MappingError;
use crate::mapper::{JsonMapped, JsonReadContext, JsonWriteContext, TypeMapper};
use crate::writer::write_json_value;
use amber_lantern_core::{Result, UserId, WorkflowId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// Maps `String` to a JSON string.
pub struct StringMapper;

impl TypeMapper<String> for StringMapper {
    fn write(&self, value: &String, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().write_string(value)
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<String, MappingError> {
        match json {
            Value::String(s) => Ok(s.clone()),
            other => Err(MappingError::invalid("string", other).into()),
        }
    }
}

impl JsonMapped for String {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(StringMapper)
    }
}

/// Maps `bool` to a JSON boolean.
pub struct BooleanMapper;

impl TypeMapper<bool> for BooleanMapper {
    fn write(&self, value: &bool, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().write_boolean(*value)
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<bool, MappingError> {
        match json {
            Value::Bool(b) => Ok(*b),
            other => Err(MappingError::invalid("boolean", other).into()),
        }
    }
}

impl JsonMapped for bool {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(BooleanMapper)
    }
}

/// Rust numeric types that map to JSON numbers.
pub trait JsonNumber: Copy + Send + Sync + 'static {
    /// Type name used in error messages.
    const NAME: &'static str;

    /// Converts a wire number, or `None` if it does not fit.
    fn from_number(number: &Number) -> Option<Self>;

    /// Converts to a wire number, or `None` for non-finite floats.
    fn to_number(self) -> Option<Number>;
}

macro_rules! integer_number {
    ($($t:ty),+) => {
        $(
            impl JsonNumber for $t {
                const NAME: &'static str = stringify!($t);

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_precision_loss,
                    clippy::cast_sign_loss
                )]
                fn from_number(number: &Number) -> Option<Self> {
                    if let Some(v) = number.as_i64() {
                        return <$t>::try_from(v).ok();
                    }
                    if let Some(v) = number.as_u64() {
                        return <$t>::try_from(v).ok();
                    }
                    // The upper bound is a power of two, exact even where MAX as f64 rounds up.
                    let v = number.as_f64()?;
                    let whole = v.fract() == 0.0;
                    (whole && v >= <$t>::MIN as f64 && v < <$t>::MAX as f64 + 1.0).then(|| v as $t)
                }

                fn to_number(self) -> Option<Number> {
                    Some(Number::from(self))
                }
            }

            impl JsonMapped for $t {
                fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
                    Arc::new(NumberMapper::<$t>::new())
                }
            }
        )+
    };
}

integer_number!(i8, i16, i32, i64, u8, u16, u32, u64);

impl JsonNumber for f64 {
    const NAME: &'static str = "f64";

    fn from_number(number: &Number) -> Option<Self> {
        number.as_f64()
    }

    fn to_number(self) -> Option<Number> {
        Number::from_f64(self)
    }
}

impl JsonNumber for f32 {
    const NAME: &'static str = "f32";

    #[allow(clippy::cast_possible_truncation)]
    fn from_number(number: &Number) -> Option<Self> {
        number.as_f64().map(|v| v as f32)
    }

    fn to_number(self) -> Option<Number> {
        Number::from_f64(f64::from(self))
    }
}

impl JsonMapped for f64 {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(NumberMapper::<f64>::new())
    }
}

impl JsonMapped for f32 {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(NumberMapper::<f32>::new())
    }
}

/// Maps any [`JsonNumber`]. Non-finite floats are written as `null`.
pub struct NumberMapper<N>(PhantomData<fn() -> N>);

impl<N> NumberMapper<N> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N> Default for NumberMapper<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: JsonNumber> TypeMapper<N> for NumberMapper<N> {
    fn write(&self, value: &N, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        match value.to_number() {
            Some(number) => ctx.writer().write_number(&number),
            None => ctx.writer().write_null(),
        }
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<N, MappingError> {
        match json {
            Value::Number(number) => N::from_number(number)
                .ok_or_else(|| MappingError::invalid(N::NAME, json).into()),
            other => Err(MappingError::invalid(N::NAME, other).into()),
        }
    }
}

/// Maps UTC timestamps to ISO-8601 strings with millisecond precision.
pub struct TimestampMapper;

impl TypeMapper<DateTime<Utc>> for TimestampMapper {
    fn write(
        &self,
        value: &DateTime<Utc>,
        ctx: &mut JsonWriteContext<'_>,
    ) -> Result<(), MappingError> {
        ctx.writer()
            .write_string(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<DateTime<Utc>, MappingError> {
        let Value::String(text) = json else {
            return Err(MappingError::invalid("ISO-8601 timestamp", json).into());
        };
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| MappingError::invalid("ISO-8601 timestamp", json).into())
    }
}

impl JsonMapped for DateTime<Utc> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(TimestampMapper)
    }
}

/// Maps a type through its `Display` and `FromStr` forms.
pub struct DisplayMapper<T>(PhantomData<fn() -> T>);

impl<T> DisplayMapper<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DisplayMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Display + FromStr + 'static> TypeMapper<T> for DisplayMapper<T> {
    fn write(&self, value: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().write_string(&value.to_string())
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<T, MappingError> {
        let expected = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("identifier");
        match json {
            Value::String(s) => s
                .parse()
                .map_err(|_| MappingError::invalid(expected, json).into()),
            other => Err(MappingError::invalid(expected, other).into()),
        }
    }
}

impl JsonMapped for WorkflowId {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(DisplayMapper::<WorkflowId>::new())
    }
}

impl JsonMapped for UserId {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(DisplayMapper::<UserId>::new())
    }
}

/// Passes raw JSON through untouched. `null` counts as absent.
pub struct RawValueMapper;

impl TypeMapper<Value> for RawValueMapper {
    fn write(&self, value: &Value, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        write_json_value(ctx.writer(), value)
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<Value, MappingError> {
        Ok(json.clone())
    }

    fn is_absent(&self, value: &Value) -> bool {
        value.is_null()
    }
}

impl JsonMapped for Value {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(RawValueMapper)
    }
}

/// Passes a raw JSON object through. Empty objects count as absent.
pub struct RawObjectMapper;

impl TypeMapper<Map<String, Value>> for RawObjectMapper {
    fn write(
        &self,
        value: &Map<String, Value>,
        ctx: &mut JsonWriteContext<'_>,
    ) -> Result<(), MappingError> {
        let writer = ctx.writer();
        writer.object_start()?;
        for (key, item) in value {
            writer.write_field_name(key)?;
            write_json_value(writer, item)?;
        }
        writer.object_end()
    }

    fn read(
        &self,
        json: &Value,
        _ctx: &JsonReadContext<'_>,
    ) -> Result<Map<String, Value>, MappingError> {
        match json {
            Value::Object(map) => Ok(map.clone()),
            other => Err(MappingError::invalid("object", other).into()),
        }
    }

    fn is_absent(&self, value: &Map<String, Value>) -> bool {
        value.is_empty()
    }
}

impl JsonMapped for Map<String, Value> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(RawObjectMapper)
    }
}
