//! C-like enums mapped to fixed wire strings.

use crate::error::MappingError;
use crate::mapper::{JsonReadContext, JsonWriteContext, TypeMapper};
use amber_lantern_core::Result;
use serde_json::Value;
use std::marker::PhantomData;

/// An enum with a fixed set of wire names.
pub trait JsonEnum: Copy + Send + Sync + 'static {
    /// Every wire name, in declaration order.
    const VALUES: &'static [&'static str];

    fn as_str(self) -> &'static str;

    fn from_json_str(name: &str) -> Option<Self>;
}

/// Maps a [`JsonEnum`] to a JSON string.
pub struct EnumMapper<E>(PhantomData<fn() -> E>);

impl<E> EnumMapper<E> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EnumMapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: JsonEnum> TypeMapper<E> for EnumMapper<E> {
    fn write(&self, value: &E, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().write_string(value.as_str())
    }

    fn read(&self, json: &Value, _ctx: &JsonReadContext<'_>) -> Result<E, MappingError> {
        json.as_str()
            .and_then(E::from_json_str)
            .ok_or_else(|| MappingError::invalid(format!("one of {}", E::VALUES.join(", ")), json).into())
    }
}

/// Declares a C-like enum with wire names.
///
/// ```ignore
/// json_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
///     pub enum HttpMethod {
///         #[default]
///         Get = "GET",
///         Post = "POST",
///     }
/// }
/// ```
#[macro_export]
macro_rules! json_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $crate::JsonEnum for $name {
            const VALUES: &'static [&'static str] = &[$($wire),+];

            fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire, )+
                }
            }

            fn from_json_str(name: &str) -> Option<Self> {
                match name {
                    $( $wire => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl $crate::JsonMapped for $name {
            fn json_mapper() -> ::std::sync::Arc<dyn $crate::TypeMapper<Self>> {
                ::std::sync::Arc::new($crate::EnumMapper::<Self>::new())
            }
        }
    };
}
