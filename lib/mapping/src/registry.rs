//! The type registry shared by the JSON and BPMN mappers.
//!
//! A registry is assembled once through [`TypeRegistryBuilder`] and then
//! shared as `Arc<TypeRegistry>`. After `build` it only changes through its
//! lazily filled caches (field tables and resolved mappers), which install
//! entries first-writer-wins.

use crate::bean::{BeanType, TypeMapping};
use crate::error::MappingError;
use crate::mapper::{JsonMapped, TypeMapper};
use crate::polymorphic::{Polymorphic, PolymorphicMapping, Subtype, VariantMapping};
use amber_lantern_core::Result;
use serde_json::{Map, Value};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// The discriminator field used when a base does not name its own.
pub const DEFAULT_DISCRIMINATOR_FIELD: &str = "type";

type Erased = Arc<dyn Any + Send + Sync>;

/// Resolves and caches the mapper for each Rust type.
///
/// Overrides registered on the builder win; everything else resolves
/// through [`JsonMapped::json_mapper`] on first use.
#[derive(Default)]
pub struct MapperDispatch {
    overrides: HashMap<TypeId, Erased>,
    cache: RwLock<HashMap<TypeId, Erased>>,
}

impl MapperDispatch {
    fn downcast<V: 'static>(entry: &Erased) -> Option<Arc<dyn TypeMapper<V>>> {
        entry.downcast_ref::<Arc<dyn TypeMapper<V>>>().cloned()
    }

    /// The mapper for `V`.
    pub fn mapper<V: JsonMapped>(&self) -> Arc<dyn TypeMapper<V>> {
        let key = TypeId::of::<V>();
        if let Some(mapper) = self.overrides.get(&key).and_then(Self::downcast::<V>) {
            return mapper;
        }
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(mapper) = cache.get(&key).and_then(Self::downcast::<V>) {
                return mapper;
            }
        }

        // Resolve outside the lock: element mappers of containers are not
        // resolved here, so this never re-enters the cache.
        let resolved = V::json_mapper();
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let installed = cache.entry(key).or_insert_with(|| {
            trace!(type_name = type_name::<V>(), "installed mapper");
            Arc::new(resolved.clone()) as Erased
        });
        Self::downcast::<V>(installed).unwrap_or(resolved)
    }

    /// Number of mappers resolved so far, overrides excluded.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Namespace and local name of a BPMN element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BpmnElementName {
    pub namespace: String,
    pub local: String,
}

impl BpmnElementName {
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

/// Tells candidates for the same BPMN element apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BpmnGuard {
    /// The element carries this attribute with exactly this value.
    Attribute {
        namespace: String,
        local: String,
        value: String,
    },
    /// The element has a child element with this name.
    Child { namespace: String, local: String },
}

/// One candidate variant for a BPMN element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmnTypeMapping {
    discriminator: &'static str,
    element: BpmnElementName,
    guard: Option<BpmnGuard>,
}

impl BpmnTypeMapping {
    /// The discriminator of the variant this element reads into.
    #[must_use]
    pub fn discriminator(&self) -> &'static str {
        self.discriminator
    }

    #[must_use]
    pub fn element(&self) -> &BpmnElementName {
        &self.element
    }

    #[must_use]
    pub fn guard(&self) -> Option<&BpmnGuard> {
        self.guard.as_ref()
    }
}

#[derive(Default)]
struct BpmnRules {
    by_element: HashMap<BpmnElementName, Vec<BpmnTypeMapping>>,
    by_discriminator: HashMap<&'static str, BpmnTypeMapping>,
}

/// Assembles a [`TypeRegistry`].
pub struct TypeRegistryBuilder {
    default_discriminator: String,
    polymorphic: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    bpmn: HashMap<TypeId, BpmnRules>,
    overrides: HashMap<TypeId, Erased>,
}

impl Default for TypeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_discriminator: DEFAULT_DISCRIMINATOR_FIELD.to_string(),
            polymorphic: HashMap::new(),
            bpmn: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Sets the discriminator field for bases registered from now on
    /// without one of their own.
    pub fn with_default_discriminator(&mut self, field: impl Into<String>) -> &mut Self {
        self.default_discriminator = field.into();
        self
    }

    fn with_polymorphic<B: Polymorphic>(&mut self, f: impl FnOnce(&mut PolymorphicMapping<B>)) {
        let default = &self.default_discriminator;
        let entry = self
            .polymorphic
            .entry(TypeId::of::<B>())
            .or_insert_with(|| {
                Box::new(PolymorphicMapping::<B>::new(default.clone())) as Box<dyn Any + Send + Sync>
            });
        if let Some(mapping) = entry.downcast_mut::<PolymorphicMapping<B>>() {
            f(mapping);
        }
    }

    /// Registers union `B` with its discriminator field.
    pub fn register_base<B: Polymorphic>(&mut self, discriminator_field: &str) -> &mut Self {
        self.with_polymorphic::<B>(|mapping| mapping.set_discriminator_field(discriminator_field));
        self
    }

    /// Registers `S` as a variant of `B` under `S::TYPE_NAME`.
    ///
    /// An unregistered base is registered with the default discriminator
    /// field.
    pub fn register_subtype<B: Polymorphic, S: Subtype<B>>(&mut self) -> &mut Self {
        self.with_polymorphic::<B>(PolymorphicMapping::<B>::add_variant::<S>);
        self
    }

    /// Replaces the mapper for exactly `V`.
    pub fn register_mapper<V: 'static>(&mut self, mapper: Arc<dyn TypeMapper<V>>) -> &mut Self {
        self.overrides
            .insert(TypeId::of::<V>(), Arc::new(mapper) as Erased);
        self
    }

    /// Maps BPMN element `element` to variant `S` of `B`, optionally behind
    /// a guard. Also registers the variant.
    pub fn register_bpmn_element<B: Polymorphic, S: Subtype<B>>(
        &mut self,
        element: BpmnElementName,
        guard: Option<BpmnGuard>,
    ) -> &mut Self {
        self.register_subtype::<B, S>();
        let rule = BpmnTypeMapping {
            discriminator: S::TYPE_NAME,
            element: element.clone(),
            guard,
        };
        let rules = self.bpmn.entry(TypeId::of::<B>()).or_default();
        rules
            .by_discriminator
            .entry(S::TYPE_NAME)
            .or_insert_with(|| rule.clone());
        rules.by_element.entry(element).or_default().push(rule);
        self
    }

    #[must_use]
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            polymorphic: self.polymorphic,
            bpmn: self.bpmn,
            dispatch: MapperDispatch {
                overrides: self.overrides,
                cache: RwLock::default(),
            },
            type_mappings: RwLock::default(),
        }
    }
}

/// Field tables, union tables, BPMN rules and mapper dispatch.
pub struct TypeRegistry {
    polymorphic: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    bpmn: HashMap<TypeId, BpmnRules>,
    dispatch: MapperDispatch,
    type_mappings: RwLock<HashMap<TypeId, Erased>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// The field table of bean `T`, built on first use.
    pub fn type_mapping<T: BeanType>(&self) -> Arc<TypeMapping<T>> {
        let key = TypeId::of::<T>();
        {
            let cache = self
                .type_mappings
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(mapping) = cache.get(&key).and_then(|e| e.clone().downcast().ok()) {
                return mapping;
            }
        }
        let built = Arc::new(TypeMapping::<T>::build());
        let mut cache = self
            .type_mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let installed = cache.entry(key).or_insert_with(|| {
            trace!(type_name = type_name::<T>(), "built field table");
            built.clone() as Erased
        });
        installed.clone().downcast().unwrap_or(built)
    }

    /// The mapper dispatch selects for `V`.
    pub fn mapper<V: JsonMapped>(&self) -> Arc<dyn TypeMapper<V>> {
        self.dispatch.mapper::<V>()
    }

    #[must_use]
    pub fn dispatch(&self) -> &MapperDispatch {
        &self.dispatch
    }

    /// The discriminator table of union `B`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnregisteredType`] if no variant of `B` was
    /// registered.
    pub fn polymorphic<B: Polymorphic>(&self) -> Result<&PolymorphicMapping<B>, MappingError> {
        self.polymorphic
            .get(&TypeId::of::<B>())
            .and_then(|entry| entry.downcast_ref::<PolymorphicMapping<B>>())
            .ok_or_else(|| {
                MappingError::UnregisteredType {
                    type_name: B::base_name().to_string(),
                }
                .into()
            })
    }

    /// Picks the variant of `B` named by the discriminator in `object`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingDiscriminator`] when the field is
    /// absent or `null`, and [`MappingError::UnknownSubtype`] when its value
    /// names no registered variant.
    pub fn concrete_variant<B: Polymorphic>(
        &self,
        object: &Map<String, Value>,
    ) -> Result<Arc<dyn VariantMapping<B>>, MappingError> {
        let mapping = self.polymorphic::<B>()?;
        let field = mapping.discriminator_field();
        match object.get(field) {
            None | Some(Value::Null) => Err(MappingError::MissingDiscriminator {
                base: B::base_name().to_string(),
                field: field.to_string(),
            }
            .into()),
            Some(Value::String(discriminator)) => self.variant::<B>(discriminator),
            Some(other) => Err(MappingError::invalid(format!("{field} string"), other).into()),
        }
    }

    /// The variant of `B` registered under `discriminator`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnknownSubtype`] for unknown discriminators.
    pub fn variant<B: Polymorphic>(
        &self,
        discriminator: &str,
    ) -> Result<Arc<dyn VariantMapping<B>>, MappingError> {
        self.polymorphic::<B>()?
            .variant(discriminator)
            .ok_or_else(|| {
                MappingError::UnknownSubtype {
                    base: B::base_name().to_string(),
                    discriminator: discriminator.to_string(),
                }
                .into()
            })
    }

    /// Candidate variants of `B` for a BPMN element, in registration order.
    #[must_use]
    pub fn bpmn_candidates<B: Polymorphic>(&self, namespace: &str, local: &str) -> &[BpmnTypeMapping] {
        let key = BpmnElementName::new(namespace, local);
        self.bpmn
            .get(&TypeId::of::<B>())
            .and_then(|rules| rules.by_element.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    /// The BPMN rule for variant `discriminator` of `B`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnregisteredType`] if the variant has no BPMN
    /// element.
    pub fn bpmn_type_mapping<B: Polymorphic>(
        &self,
        discriminator: &str,
    ) -> Result<&BpmnTypeMapping, MappingError> {
        self.bpmn
            .get(&TypeId::of::<B>())
            .and_then(|rules| rules.by_discriminator.get(discriminator))
            .ok_or_else(|| {
                MappingError::UnregisteredType {
                    type_name: format!("{}::{discriminator} (BPMN)", B::base_name()),
                }
                .into()
            })
    }
}
