//! Container mappers.
//!
//! Element mappers are looked up through the registry when a value is
//! written or read, never when the container mapper is built. That keeps
//! recursive types like `Vec<Condition>` inside `Condition` resolvable.

use crate::error::MappingError;
use crate::mapper::{JsonMapped, JsonReadContext, JsonWriteContext, TypeMapper};
use crate::registry::TypeRegistry;
use amber_lantern_core::Result;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// `None` is written as `null` and counts as absent.
pub struct OptionMapper<T>(PhantomData<fn() -> T>);

impl<T: JsonMapped> TypeMapper<Option<T>> for OptionMapper<T> {
    fn write(&self, value: &Option<T>, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        match value {
            Some(inner) => ctx.write_value(inner),
            None => ctx.writer().write_null(),
        }
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<Option<T>, MappingError> {
        match json {
            Value::Null => Ok(None),
            other => ctx.read_value(other).map(Some),
        }
    }

    fn is_absent(&self, value: &Option<T>) -> bool {
        value.is_none()
    }

    fn inline_keys(&self, registry: &TypeRegistry) -> Vec<String> {
        registry.mapper::<T>().inline_keys(registry)
    }
}

impl<T: JsonMapped> JsonMapped for Option<T> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(OptionMapper(PhantomData))
    }
}

/// Boxes are transparent on the wire.
pub struct BoxMapper<T>(PhantomData<fn() -> T>);

impl<T: JsonMapped> TypeMapper<Box<T>> for BoxMapper<T> {
    fn write(&self, value: &Box<T>, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.write_value(value.as_ref())
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<Box<T>, MappingError> {
        ctx.read_value(json).map(Box::new)
    }
}

impl<T: JsonMapped> JsonMapped for Box<T> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(BoxMapper(PhantomData))
    }
}

/// Maps any collection of `E` to a JSON array. Empty collections count as
/// absent.
pub struct SequenceMapper<C, E>(PhantomData<fn() -> (C, E)>);

impl<C, E> SequenceMapper<C, E> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<C, E> Default for SequenceMapper<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> TypeMapper<C> for SequenceMapper<C, E>
where
    C: FromIterator<E> + 'static,
    for<'a> &'a C: IntoIterator<Item = &'a E>,
    E: JsonMapped,
{
    fn write(&self, value: &C, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().array_start()?;
        for item in value {
            ctx.write_value(item)?;
        }
        ctx.writer().array_end()
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<C, MappingError> {
        let Value::Array(items) = json else {
            return Err(MappingError::invalid("array", json).into());
        };
        items.iter().map(|item| ctx.read_value::<E>(item)).collect()
    }

    fn is_absent(&self, value: &C) -> bool {
        value.into_iter().next().is_none()
    }
}

impl<E: JsonMapped> JsonMapped for Vec<E> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(SequenceMapper::<Vec<E>, E>::new())
    }
}

impl<E: JsonMapped + Ord> JsonMapped for BTreeSet<E> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(SequenceMapper::<BTreeSet<E>, E>::new())
    }
}

impl<E: JsonMapped + Eq + Hash> JsonMapped for HashSet<E> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(SequenceMapper::<HashSet<E>, E>::new())
    }
}

/// Fixed-size arrays must match their length exactly on read.
pub struct ArrayMapper<E, const N: usize>(PhantomData<fn() -> E>);

impl<E: JsonMapped, const N: usize> TypeMapper<[E; N]> for ArrayMapper<E, N> {
    fn write(&self, value: &[E; N], ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        ctx.writer().array_start()?;
        for item in value {
            ctx.write_value(item)?;
        }
        ctx.writer().array_end()
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<[E; N], MappingError> {
        let expected = format!("array of {}", N);
        let Value::Array(items) = json else {
            return Err(MappingError::invalid(expected, json).into());
        };
        let values = items
            .iter()
            .map(|item| ctx.read_value::<E>(item))
            .collect::<Result<Vec<E>, MappingError>>()?;
        values
            .try_into()
            .map_err(|_| MappingError::invalid(expected, json).into())
    }
}

impl<E: JsonMapped, const N: usize> JsonMapped for [E; N] {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(ArrayMapper::<E, N>(PhantomData))
    }
}

/// Maps string-keyed maps to JSON objects. Keys are written sorted, or in
/// the map's own order for maps that keep insertion order. Empty maps count
/// as absent. When inlined, a map claims no keys of its own: it takes
/// whatever the enclosing bean leaves over.
pub struct StringMapMapper<C, V> {
    sorted: bool,
    marker: PhantomData<fn() -> (C, V)>,
}

impl<C, V> StringMapMapper<C, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sorted: true,
            marker: PhantomData,
        }
    }

    /// A mapper that writes keys in iteration order.
    #[must_use]
    pub fn in_order() -> Self {
        Self {
            sorted: false,
            marker: PhantomData,
        }
    }
}

impl<C, V> Default for StringMapMapper<C, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, V> TypeMapper<C> for StringMapMapper<C, V>
where
    C: FromIterator<(String, V)> + 'static,
    for<'a> &'a C: IntoIterator<Item = (&'a String, &'a V)>,
    V: JsonMapped,
{
    fn write(&self, value: &C, ctx: &mut JsonWriteContext<'_>) -> Result<(), MappingError> {
        let mut entries: Vec<(&String, &V)> = value.into_iter().collect();
        if self.sorted {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        ctx.writer().object_start()?;
        for (key, item) in entries {
            ctx.writer().write_field_name(key)?;
            ctx.write_value(item)?;
        }
        ctx.writer().object_end()
    }

    fn read(&self, json: &Value, ctx: &JsonReadContext<'_>) -> Result<C, MappingError> {
        let Value::Object(map) = json else {
            return Err(MappingError::invalid("object", json).into());
        };
        map.iter()
            .map(|(key, item)| ctx.read_value::<V>(item).map(|v| (key.clone(), v)))
            .collect()
    }

    fn is_absent(&self, value: &C) -> bool {
        value.into_iter().next().is_none()
    }
}

impl<V: JsonMapped> JsonMapped for BTreeMap<String, V> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(StringMapMapper::<BTreeMap<String, V>, V>::new())
    }
}

impl<V: JsonMapped> JsonMapped for HashMap<String, V> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(StringMapMapper::<HashMap<String, V>, V>::new())
    }
}

impl<V: JsonMapped> JsonMapped for IndexMap<String, V> {
    fn json_mapper() -> Arc<dyn TypeMapper<Self>> {
        Arc::new(StringMapMapper::<IndexMap<String, V>, V>::in_order())
    }
}

#[cfg(test)]
mod tests {
    use crate::facade::JsonTreeMapper;
    use crate::registry::TypeRegistry;
    use indexmap::IndexMap;
    use serde_json::{Value, json};
    use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
    use std::sync::Arc;

    fn mapper() -> JsonTreeMapper {
        JsonTreeMapper::new(Arc::new(TypeRegistry::builder().build()))
    }

    #[test]
    fn option_writes_null_and_reads_null_as_none() {
        let m = mapper();
        assert_eq!(m.write(&None::<String>).expect("write"), Value::Null);
        assert_eq!(m.read::<Option<i32>>(&Value::Null).expect("read"), None);
        assert_eq!(m.read::<Option<i32>>(&json!(4)).expect("read"), Some(4));
    }

    #[test]
    fn nested_collections_round_trip() {
        let m = mapper();
        let mut value: HashMap<String, Vec<BTreeSet<u16>>> = HashMap::new();
        value.insert("b".to_string(), vec![BTreeSet::from([3, 1])]);
        value.insert("a".to_string(), vec![]);

        let json = m.write(&value).expect("write");
        assert_eq!(json, json!({"a": [], "b": [[1, 3]]}));
        let keys: Vec<_> = json.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(m.read::<HashMap<String, Vec<BTreeSet<u16>>>>(&json).expect("read"), value);
    }

    #[test]
    fn insertion_ordered_maps_keep_their_order() {
        let m = mapper();
        let value = IndexMap::from([
            ("zeta".to_string(), 1_u8),
            ("alpha".to_string(), 2),
            ("mid".to_string(), 3),
        ]);
        let json = m.write(&value).expect("write");
        let keys: Vec<_> = json.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);

        let read: IndexMap<String, u8> = m.read(&json).expect("read");
        assert_eq!(read.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn fixed_arrays_require_exact_length() {
        let m = mapper();
        assert_eq!(m.read::<[u8; 3]>(&json!([1, 2, 3])).expect("read"), [1, 2, 3]);
        let err = m.read::<[u8; 3]>(&json!([1, 2])).expect_err("short");
        assert!(err.to_string().contains("array of 3"), "{err}");
    }

    #[test]
    fn sets_read_from_arrays() {
        let m = mapper();
        let set: HashSet<String> = m.read(&json!(["x", "y", "x"])).expect("read");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn wrong_container_kind_is_invalid() {
        let m = mapper();
        assert!(m.read::<Vec<String>>(&json!({"a": 1})).is_err());
        assert!(m.read::<BTreeMap<String, String>>(&json!(["a"])).is_err());
    }

    #[test]
    fn boxed_values_are_transparent() {
        let m = mapper();
        let boxed = Box::new(7_i64);
        assert_eq!(m.write(&boxed).expect("write"), json!(7));
        assert_eq!(*m.read::<Box<i64>>(&json!(7)).expect("read"), 7);
    }
}
