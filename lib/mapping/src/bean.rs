//! Field-descriptor tables for plain structs ("beans").
//!
//! A bean describes its JSON fields once, in [`BeanType::describe`]:
//!
//! ```ignore
//! impl BeanType for Transition {
//!     fn describe(fields: &mut TypeMappingBuilder<Self>) {
//!         fields
//!             .field("id", |t| &t.id, |t| &mut t.id)
//!             .field_as("from_id", "from", |t| &t.from_id, |t| &mut t.from_id)
//!             .field("condition", |t| &t.condition, |t| &mut t.condition);
//!     }
//! }
//! ```
//!
//! The registry turns that description into a [`TypeMapping`] on first use
//! and caches it. Struct fields that are not described (BPMN residue, for
//! instance) never reach JSON.
//!
//! Field order on the wire is description order, with fields pulled in
//! through [`TypeMappingBuilder::flatten`] first and any
//! [`TypeMappingBuilder::order`] directive applied last. Inline fields are
//! written after all named fields.

use crate::error::MappingError;
use crate::mapper::{JsonMapped, JsonReadContext, JsonWriteContext, TypeMapper};
use crate::registry::TypeRegistry;
use amber_lantern_core::Result;
use serde_json::{Map, Value};
use std::any::type_name;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

/// A struct whose JSON form is described by a field table.
pub trait BeanType: Default + Send + Sync + 'static {
    fn describe(fields: &mut TypeMappingBuilder<Self>);
}

/// Typed access to one field of a bean.
trait FieldAccess<T>: Send + Sync {
    fn is_absent(&self, bean: &T, registry: &TypeRegistry) -> bool;
    fn write(&self, bean: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError>;
    fn read(&self, bean: &mut T, json: &Value, ctx: &JsonReadContext<'_>)
    -> Result<(), MappingError>;
    fn inline_keys(&self, registry: &TypeRegistry) -> Vec<String>;
}

struct Direct<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T: 'static, V: JsonMapped> FieldAccess<T> for Direct<T, V> {
    fn is_absent(&self, bean: &T, registry: &TypeRegistry) -> bool {
        registry.mapper::<V>().is_absent((self.get)(bean))
    }

    fn write(&self, bean: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.write_value((self.get)(bean))
    }

    fn read(
        &self,
        bean: &mut T,
        json: &Value,
        ctx: &JsonReadContext<'_>,
    ) -> Result<(), MappingError> {
        *(self.get_mut)(bean) = ctx.read_value::<V>(json)?;
        Ok(())
    }

    fn inline_keys(&self, registry: &TypeRegistry) -> Vec<String> {
        registry.mapper::<V>().inline_keys(registry)
    }
}

/// A field of an embedded struct, reached through the outer bean.
struct Nested<T, P> {
    get: fn(&T) -> &P,
    get_mut: fn(&mut T) -> &mut P,
    inner: Arc<dyn FieldAccess<P>>,
}

impl<T: 'static, P: 'static> FieldAccess<T> for Nested<T, P> {
    fn is_absent(&self, bean: &T, registry: &TypeRegistry) -> bool {
        self.inner.is_absent((self.get)(bean), registry)
    }

    fn write(&self, bean: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        self.inner.write((self.get)(bean), ctx)
    }

    fn read(
        &self,
        bean: &mut T,
        json: &Value,
        ctx: &JsonReadContext<'_>,
    ) -> Result<(), MappingError> {
        self.inner.read((self.get_mut)(bean), json, ctx)
    }

    fn inline_keys(&self, registry: &TypeRegistry) -> Vec<String> {
        self.inner.inline_keys(registry)
    }
}

/// One described field of bean `T`.
pub struct FieldMapping<T> {
    name: String,
    json_name: String,
    inline: bool,
    access: Arc<dyn FieldAccess<T>>,
}

impl<T> FieldMapping<T> {
    /// The field name as described.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key used on the wire.
    #[must_use]
    pub fn json_name(&self) -> &str {
        &self.json_name
    }

    /// Whether the field's content is merged into the enclosing object.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.inline
    }
}

/// Collects the field table of a bean.
pub struct TypeMappingBuilder<T> {
    fields: Vec<FieldMapping<T>>,
    flattened: usize,
    order: Vec<String>,
}

impl<T: 'static> TypeMappingBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            flattened: 0,
            order: Vec::new(),
        }
    }

    fn push<V: JsonMapped>(
        &mut self,
        name: &str,
        json_name: &str,
        inline: bool,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.fields.push(FieldMapping {
            name: name.to_string(),
            json_name: json_name.to_string(),
            inline,
            access: Arc::new(Direct { get, get_mut }),
        });
        self
    }

    /// Describes a field whose wire key is its name.
    pub fn field<V: JsonMapped>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.push(name, name, false, get, get_mut)
    }

    /// Describes a field written under a different wire key.
    pub fn field_as<V: JsonMapped>(
        &mut self,
        name: &str,
        json_name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.push(name, json_name, false, get, get_mut)
    }

    /// Describes a field whose object content is merged into this bean's
    /// object. On read it receives every key no named field claimed.
    pub fn inline<V: JsonMapped>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self {
        self.push(name, name, true, get, get_mut)
    }

    /// Pulls in the fields of an embedded bean, ahead of this bean's own.
    pub fn flatten<P: BeanType>(
        &mut self,
        get: fn(&T) -> &P,
        get_mut: fn(&mut T) -> &mut P,
    ) -> &mut Self {
        let mut embedded = TypeMappingBuilder::<P>::new();
        P::describe(&mut embedded);
        for field in embedded.finish() {
            let nested = FieldMapping {
                name: field.name,
                json_name: field.json_name,
                inline: field.inline,
                access: Arc::new(Nested {
                    get,
                    get_mut,
                    inner: field.access,
                }),
            };
            self.fields.insert(self.flattened, nested);
            self.flattened += 1;
        }
        self
    }

    /// Moves the named fields to the front, in the given order.
    pub fn order(&mut self, names: &[&str]) -> &mut Self {
        self.order = names.iter().map(ToString::to_string).collect();
        self
    }

    pub(crate) fn finish(self) -> Vec<FieldMapping<T>> {
        let mut fields = self.fields;
        for name in self.order.iter().rev() {
            if let Some(index) = fields.iter().position(|f| &f.name == name) {
                let field = fields.remove(index);
                fields.insert(0, field);
            }
        }
        fields
    }
}

/// The resolved field table of bean `T`.
pub struct TypeMapping<T> {
    fields: Vec<FieldMapping<T>>,
}

impl<T: BeanType> TypeMapping<T> {
    pub(crate) fn build() -> Self {
        let mut builder = TypeMappingBuilder::new();
        T::describe(&mut builder);
        Self {
            fields: builder.finish(),
        }
    }
}

impl<T: 'static> TypeMapping<T> {
    #[must_use]
    pub fn fields(&self) -> &[FieldMapping<T>] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMapping<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Wire keys claimed by named fields, including named fields of inline
    /// beans.
    #[must_use]
    pub fn named_keys(&self, registry: &TypeRegistry) -> Vec<String> {
        let mut keys = Vec::new();
        for field in &self.fields {
            if field.inline {
                keys.extend(field.access.inline_keys(registry));
            } else {
                keys.push(field.json_name.clone());
            }
        }
        keys
    }

    /// Writes the fields of `bean` into the currently open object.
    ///
    /// # Errors
    ///
    /// Propagates mapper and writer errors.
    pub fn write_fields(&self, bean: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        let registry = ctx.registry();
        for field in self.fields.iter().filter(|f| !f.inline) {
            if field.access.is_absent(bean, registry) {
                continue;
            }
            ctx.writer().write_field_name(&field.json_name)?;
            field.access.write(bean, ctx)?;
        }
        for field in self.fields.iter().filter(|f| f.inline) {
            if field.access.is_absent(bean, registry) {
                continue;
            }
            ctx.writer().inline_start()?;
            field.access.write(bean, ctx)?;
            ctx.writer().inline_end()?;
        }
        Ok(())
    }

    /// Reads the fields of `bean` from `object`.
    ///
    /// Missing and `null` keys leave the field at its default. An inline
    /// field receives the keys claimed by no other field; keys listed in
    /// `excluded` (a discriminator, say) are withheld from all of them.
    ///
    /// # Errors
    ///
    /// Propagates mapper errors.
    pub fn read_fields(
        &self,
        bean: &mut T,
        object: &Map<String, Value>,
        excluded: &[&str],
        ctx: &JsonReadContext<'_>,
    ) -> Result<(), MappingError> {
        for field in self.fields.iter().filter(|f| !f.inline) {
            match object.get(&field.json_name) {
                None | Some(Value::Null) => {}
                Some(value) => field.access.read(bean, value, ctx)?,
            }
        }
        let inline: Vec<&FieldMapping<T>> = self.fields.iter().filter(|f| f.inline).collect();
        if inline.is_empty() {
            return Ok(());
        }
        let registry = ctx.registry();
        let mut parent: HashSet<String> = self
            .fields
            .iter()
            .filter(|f| !f.inline)
            .map(|f| f.json_name.clone())
            .collect();
        parent.extend(excluded.iter().map(ToString::to_string));
        let inline_keys: Vec<Vec<String>> = inline
            .iter()
            .map(|f| f.access.inline_keys(registry))
            .collect();

        // Each inline field sees the keys nobody else claimed.
        for (index, field) in inline.iter().enumerate() {
            let mut claimed = parent.clone();
            for (other, keys) in inline_keys.iter().enumerate() {
                if other != index {
                    claimed.extend(keys.iter().cloned());
                }
            }
            let residual = Value::Object(
                object
                    .iter()
                    .filter(|(key, _)| !claimed.contains(key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            );
            field.access.read(bean, &residual, ctx)?;
        }
        Ok(())
    }
}

/// Maps a [`BeanType`] to a JSON object.
pub struct BeanMapper<T>(PhantomData<fn() -> T>);

impl<T> BeanMapper<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BeanMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BeanType> TypeMapper<T> for BeanMapper<T> {
    fn write(&self, value: &T, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        let mapping = ctx.registry().type_mapping::<T>();
        ctx.enter(value)?;
        ctx.writer().object_start()?;
        mapping.write_fields(value, ctx)?;
        ctx.writer().object_end()?;
        ctx.exit::<T>();
        Ok(())
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<T, MappingError> {
        let Value::Object(object) = json else {
            let expected = type_name::<T>().rsplit("::").next().unwrap_or("object");
            return Err(MappingError::invalid(expected, json).into());
        };
        let mapping = ctx.registry().type_mapping::<T>();
        let mut bean = T::default();
        mapping.read_fields(&mut bean, object, &[], ctx)?;
        Ok(bean)
    }

    fn inline_keys(&self, registry: &TypeRegistry) -> Vec<String> {
        registry.type_mapping::<T>().named_keys(registry)
    }
}

/// Implements [`JsonMapped`] for bean types through [`BeanMapper`].
#[macro_export]
macro_rules! json_bean {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::JsonMapped for $ty {
                fn json_mapper() -> ::std::sync::Arc<dyn $crate::TypeMapper<Self>> {
                    ::std::sync::Arc::new($crate::BeanMapper::<Self>::new())
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::JsonTreeMapper;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Named {
        id: String,
        label: Option<String>,
    }

    impl BeanType for Named {
        fn describe(fields: &mut TypeMappingBuilder<Self>) {
            fields
                .field("id", |n| &n.id, |n| &mut n.id)
                .field("label", |n| &n.label, |n| &mut n.label);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Settings {
        retries: u32,
        tags: Vec<String>,
    }

    impl BeanType for Settings {
        fn describe(fields: &mut TypeMappingBuilder<Self>) {
            fields
                .field("retries", |s| &s.retries, |s| &mut s.retries)
                .field("tags", |s| &s.tags, |s| &mut s.tags);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Task {
        base: Named,
        owner: String,
        settings: Settings,
        extra: Map<String, Value>,
        scratch: String,
    }

    impl BeanType for Task {
        fn describe(fields: &mut TypeMappingBuilder<Self>) {
            fields
                .field_as("owner", "assignee", |t| &t.owner, |t| &mut t.owner)
                .inline("extra", |t| &t.extra, |t| &mut t.extra)
                .inline("settings", |t| &t.settings, |t| &mut t.settings)
                .flatten(|t| &t.base, |t| &mut t.base);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Ordered {
        a: u8,
        b: u8,
        c: u8,
    }

    impl BeanType for Ordered {
        fn describe(fields: &mut TypeMappingBuilder<Self>) {
            fields
                .field("a", |o| &o.a, |o| &mut o.a)
                .field("b", |o| &o.b, |o| &mut o.b)
                .field("c", |o| &o.c, |o| &mut o.c)
                .order(&["c", "b"]);
        }
    }

    crate::json_bean!(Named, Settings, Task, Ordered);

    fn mapper() -> JsonTreeMapper {
        JsonTreeMapper::new(Arc::new(TypeRegistry::builder().build()))
    }

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().expect("object").keys().cloned().collect()
    }

    #[test]
    fn flattened_fields_come_first_and_inline_fields_last() {
        let mut extra = Map::new();
        extra.insert("color".to_string(), json!("red"));
        let task = Task {
            base: Named {
                id: "t1".to_string(),
                label: None,
            },
            owner: "ann".to_string(),
            settings: Settings {
                retries: 3,
                tags: vec!["x".to_string()],
            },
            extra,
            scratch: "not mapped".to_string(),
        };

        let json = mapper().write(&task).expect("write");
        assert_eq!(keys(&json), ["id", "assignee", "color", "retries", "tags"]);
        assert_eq!(json["assignee"], json!("ann"));
        assert!(json.get("scratch").is_none());
    }

    #[test]
    fn inline_map_receives_only_unclaimed_keys() {
        let json = json!({
            "id": "t1",
            "assignee": "ann",
            "retries": 2,
            "tags": [],
            "color": "red",
            "size": 4
        });
        let task: Task = mapper().read(&json).expect("read");

        assert_eq!(task.base.id, "t1");
        assert_eq!(task.settings.retries, 2);
        let extra_keys: Vec<_> = task.extra.keys().cloned().collect();
        assert_eq!(extra_keys, ["color", "size"]);
        assert_eq!(task.scratch, "");
    }

    #[test]
    fn inline_map_never_overrides_named_fields() {
        let mut extra = Map::new();
        extra.insert("id".to_string(), json!("shadow"));
        extra.insert("note".to_string(), json!(1));
        let task = Task {
            base: Named {
                id: "real".to_string(),
                label: None,
            },
            extra,
            ..Task::default()
        };

        let json = mapper().write(&task).expect("write");
        assert_eq!(json, json!({"id": "real", "assignee": "", "note": 1, "retries": 0}));
    }

    #[test]
    fn order_directive_moves_fields_to_front() {
        let json = mapper()
            .write(&Ordered { a: 1, b: 2, c: 3 })
            .expect("write");
        assert_eq!(keys(&json), ["c", "b", "a"]);
    }

    #[test]
    fn absent_values_are_skipped_and_nulls_read_as_default() {
        let m = mapper();
        let json = m
            .write(&Named {
                id: "n".to_string(),
                label: None,
            })
            .expect("write");
        assert_eq!(json, json!({"id": "n"}));

        let named: Named = m.read(&json!({"id": null, "label": "l"})).expect("read");
        assert_eq!(named.id, "");
        assert_eq!(named.label.as_deref(), Some("l"));
    }

    #[test]
    fn bean_read_rejects_non_objects() {
        let err = mapper().read::<Named>(&json!([1])).expect_err("array");
        assert!(err.to_string().contains("expected Named"), "{err}");
    }

    #[test]
    fn named_keys_include_inline_bean_fields() {
        let registry = TypeRegistry::builder().build();
        let keys = registry.type_mapping::<Task>().named_keys(&registry);
        assert_eq!(keys, ["id", "label", "assignee", "retries", "tags"]);
    }

    #[test]
    fn bean_maps_nest_inside_containers() {
        let m = mapper();
        let mut value = BTreeMap::new();
        value.insert(
            "first".to_string(),
            Named {
                id: "1".to_string(),
                label: Some("one".to_string()),
            },
        );
        let json = m.write(&value).expect("write");
        assert_eq!(json, json!({"first": {"id": "1", "label": "one"}}));
        assert_eq!(m.read::<BTreeMap<String, Named>>(&json).expect("read"), value);
    }
}
