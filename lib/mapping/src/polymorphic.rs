//! Closed tagged unions with a discriminator field.
//!
//! A union is a plain enum with one single-field variant per concrete type,
//! generated by [`polymorphic!`](crate::polymorphic). The macro wires up
//! [`Polymorphic`] for the enum and [`Subtype`] for every variant type; the
//! registry then maps discriminator values to variants for reading.
//!
//! A concrete type may belong to several unions under different names. It
//! is registered once per union.

use crate::bean::BeanType;
use crate::error::MappingError;
use crate::mapper::{JsonReadContext, JsonWriteContext, TypeMapper};
use amber_lantern_core::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// A closed union of bean types.
pub trait Polymorphic: Sized + Send + Sync + 'static {
    /// The discriminator of the variant held.
    fn type_name(&self) -> &'static str;

    /// Name of the union, for error messages.
    fn base_name() -> &'static str;
}

/// A bean type that is a variant of union `B`.
pub trait Subtype<B: Polymorphic>: BeanType {
    /// Discriminator value of this variant within `B`.
    const TYPE_NAME: &'static str;

    fn wrap(self) -> B;

    fn project(base: &B) -> Option<&Self>;
}

/// Type-erased handling of one union variant.
pub trait VariantMapping<B>: Send + Sync {
    fn discriminator(&self) -> &'static str;

    /// A default-initialized instance of the variant.
    fn instantiate(&self) -> B;

    /// Writes the variant's fields into the currently open object.
    fn write_fields(&self, value: &B, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError>;

    /// Reads the variant from its object, withholding `excluded` keys from
    /// inline fields.
    fn read(
        &self,
        object: &Map<String, Value>,
        excluded: &[&str],
        ctx: &JsonReadContext<'_>,
    ) -> Result<B, MappingError>;
}

struct Variant<S>(PhantomData<fn() -> S>);

impl<B: Polymorphic, S: Subtype<B>> VariantMapping<B> for Variant<S> {
    fn discriminator(&self) -> &'static str {
        S::TYPE_NAME
    }

    fn instantiate(&self) -> B {
        S::default().wrap()
    }

    fn write_fields(&self, value: &B, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        let Some(inner) = S::project(value) else {
            return Err(MappingError::UnregisteredType {
                type_name: format!("{}::{}", B::base_name(), value.type_name()),
            }
            .into());
        };
        let mapping = ctx.registry().type_mapping::<S>();
        ctx.enter(inner)?;
        mapping.write_fields(inner, ctx)?;
        ctx.exit::<S>();
        Ok(())
    }

    fn read(
        &self,
        object: &Map<String, Value>,
        excluded: &[&str],
        ctx: &JsonReadContext<'_>,
    ) -> Result<B, MappingError> {
        let mut bean = S::default();
        ctx.registry()
            .type_mapping::<S>()
            .read_fields(&mut bean, object, excluded, ctx)?;
        Ok(bean.wrap())
    }
}

/// Discriminator field and variant table of one union.
pub struct PolymorphicMapping<B> {
    discriminator_field: String,
    variants: BTreeMap<&'static str, Arc<dyn VariantMapping<B>>>,
}

impl<B: Polymorphic> PolymorphicMapping<B> {
    pub(crate) fn new(discriminator_field: impl Into<String>) -> Self {
        Self {
            discriminator_field: discriminator_field.into(),
            variants: BTreeMap::new(),
        }
    }

    pub(crate) fn set_discriminator_field(&mut self, field: impl Into<String>) {
        self.discriminator_field = field.into();
    }

    pub(crate) fn add_variant<S: Subtype<B>>(&mut self) {
        self.variants
            .insert(S::TYPE_NAME, Arc::new(Variant::<S>(PhantomData)));
    }

    #[must_use]
    pub fn discriminator_field(&self) -> &str {
        &self.discriminator_field
    }

    #[must_use]
    pub fn variant(&self, discriminator: &str) -> Option<Arc<dyn VariantMapping<B>>> {
        self.variants.get(discriminator).cloned()
    }

    /// Registered discriminators in sorted order.
    pub fn discriminators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.variants.keys().copied()
    }
}

/// Writes a union as an object whose first key is the discriminator.
pub struct PolymorphicMapper<B>(PhantomData<fn() -> B>);

impl<B> PolymorphicMapper<B> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for PolymorphicMapper<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Polymorphic> TypeMapper<B> for PolymorphicMapper<B> {
    fn write(&self, value: &B, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        let mapping = ctx.registry().polymorphic::<B>()?;
        let discriminator = value.type_name();
        let variant = mapping
            .variant(discriminator)
            .ok_or_else(|| MappingError::UnregisteredType {
                type_name: format!("{}::{discriminator}", B::base_name()),
            })?;
        let writer = ctx.writer();
        writer.object_start()?;
        writer.write_field_name(mapping.discriminator_field())?;
        writer.write_string(discriminator)?;
        variant.write_fields(value, ctx)?;
        ctx.writer().object_end()
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<B, MappingError> {
        let Value::Object(object) = json else {
            return Err(MappingError::invalid(B::base_name(), json).into());
        };
        let registry = ctx.registry();
        let variant = registry.concrete_variant::<B>(object)?;
        let field = registry.polymorphic::<B>()?.discriminator_field();
        variant.read(object, &[field], ctx)
    }
}

/// Declares a closed union and its variant bindings.
///
/// ```ignore
/// polymorphic! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub enum Shape {
///         Circle(Circle) = "circle",
///         Square(Square) = "square",
///     }
/// }
/// ```
#[macro_export]
macro_rules! polymorphic {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident($ty:ty) = $discriminator:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant($ty),
            )+
        }

        impl $crate::Polymorphic for $name {
            fn type_name(&self) -> &'static str {
                match self {
                    $( Self::$variant(_) => $discriminator, )+
                }
            }

            fn base_name() -> &'static str {
                stringify!($name)
            }
        }

        $(
            impl $crate::Subtype<$name> for $ty {
                const TYPE_NAME: &'static str = $discriminator;

                fn wrap(self) -> $name {
                    $name::$variant(self)
                }

                fn project(base: &$name) -> Option<&Self> {
                    match base {
                        $name::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$ty> for $name {
                fn from(inner: $ty) -> Self {
                    $name::$variant(inner)
                }
            }
        )+

        impl $crate::JsonMapped for $name {
            fn json_mapper() -> ::std::sync::Arc<dyn $crate::TypeMapper<Self>> {
                ::std::sync::Arc::new($crate::PolymorphicMapper::<Self>::new())
            }
        }
    };
}
