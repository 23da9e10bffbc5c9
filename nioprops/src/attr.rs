//! Attribute containers.
//!
//! [`AttrDict`] is a mapping whose entries are reachable by key, by
//! attribute-style name and by dotted path. Its [`Shape`] decides how strict
//! it is:
//!
//! - [`Shape::Open`] - keys may be added and removed freely
//! - [`Shape::Locked`] - the key set is fixed at construction
//! - [`Shape::Typed`] - the key set is fixed and every slot keeps the type of
//!   the value it was built with
//!
//! Nested containers are re-wrapped into the parent's shape whenever they are
//! laxer than the parent, so a locked tree stays locked at every depth.

use std::{any::Any, fmt, time::Duration};

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value as Json};

use crate::{
    error::{PropertyError, Result},
    list::TypedList,
    select::TypedEnum,
    value::{Kind, Value},
};

/// Accessor delegation capability.
///
/// A slot holding an accessor does not store a plain value: reads go through
/// [`Accessor::read`] and writes through [`Accessor::write`], which owns its
/// own validation.
pub trait Accessor: fmt::Debug + Send + Sync {
    /// Value observed by readers of the slot.
    fn read(&self) -> Value;

    /// Handle a write to the slot.
    fn write(&mut self, value: Value) -> Result<()>;

    /// Deep copy of the accessor.
    fn clone_box(&self) -> Box<dyn Accessor>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Accessor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Content of a container slot.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Plain stored value.
    Leaf(Value),
    /// Value computed and validated by an accessor.
    Delegate(Box<dyn Accessor>),
}

impl Entry {
    /// Value seen by readers.
    pub fn read(&self) -> Value {
        match self {
            Entry::Leaf(value) => value.clone(),
            Entry::Delegate(accessor) => accessor.read(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Entry::Leaf(value) => Some(value),
            Entry::Delegate(_) => None,
        }
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self, Entry::Delegate(_))
    }

    fn kind(&self) -> Kind {
        match self {
            Entry::Leaf(value) => Kind::of(value),
            Entry::Delegate(accessor) => Kind::of(&accessor.read()),
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::Leaf(a), Entry::Leaf(b)) => a == b,
            (Entry::Delegate(a), Entry::Delegate(b)) => a.read() == b.read(),
            _ => false,
        }
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Entry::Leaf(value)
    }
}

impl From<TypedEnum> for Entry {
    fn from(value: TypedEnum) -> Self {
        Entry::Delegate(Box::new(value))
    }
}

/// Loader tag of a typed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Top-level block properties.
    Properties,
    /// Time interval keyed on interval fields.
    TimeDelta,
    /// Nested object property.
    Object,
}

impl Flavor {
    pub fn type_tag(self) -> &'static str {
        match self {
            Flavor::Properties => "properties",
            Flavor::TimeDelta => "timedelta",
            Flavor::Object => "object",
        }
    }
}

/// Strictness of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Attribute container: keys may be added and removed.
    Open,
    /// Locked container: only present keys may be reassigned.
    Locked,
    /// Typed container: locked, and each slot keeps its type.
    Typed {
        flavor: Flavor,
        /// Attempt coercion of mismatching writes instead of rejecting them.
        convert: bool,
    },
}

impl Shape {
    /// Typed shape with coercion enabled.
    pub const fn typed(flavor: Flavor) -> Self {
        Shape::Typed {
            flavor,
            convert: true,
        }
    }

    pub fn is_locked(self) -> bool {
        !matches!(self, Shape::Open)
    }

    pub fn is_typed(self) -> bool {
        matches!(self, Shape::Typed { .. })
    }

    fn rank(self) -> u8 {
        match self {
            Shape::Open => 0,
            Shape::Locked => 1,
            Shape::Typed { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    kind: Kind,
    entry: Entry,
}

impl Slot {
    fn new(entry: Entry) -> Self {
        Self {
            kind: entry.kind(),
            entry,
        }
    }
}

/// Mapping container with attribute-style access.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrDict {
    shape: Shape,
    slots: IndexMap<String, Slot>,
}

impl Default for AttrDict {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-wrap a nested container that is laxer than `shape`.
fn wrap(shape: Shape, value: Value) -> Value {
    match value {
        Value::Dict(dict) if dict.shape.rank() < shape.rank() => Value::Dict(dict.reshape(shape)),
        other => other,
    }
}

impl AttrDict {
    /// Empty open container.
    pub fn new() -> Self {
        Self {
            shape: Shape::Open,
            slots: IndexMap::new(),
        }
    }

    /// Build a container of the given shape.
    ///
    /// Slot types are pinned here, once, from the initial entries.
    pub fn with_shape<I, K>(shape: Shape, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Entry)>,
        K: Into<String>,
    {
        let slots = entries
            .into_iter()
            .map(|(key, entry)| {
                let entry = match entry {
                    Entry::Leaf(value) => Entry::Leaf(wrap(shape, value)),
                    delegate => delegate,
                };
                (key.into(), Slot::new(entry))
            })
            .collect();
        Self { shape, slots }
    }

    pub fn open<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_values(Shape::Open, entries)
    }

    pub fn locked<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_values(Shape::Locked, entries)
    }

    pub fn typed<I, K, V>(flavor: Flavor, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_values(Shape::typed(flavor), entries)
    }

    fn with_values<I, K, V>(shape: Shape, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_shape(
            shape,
            entries
                .into_iter()
                .map(|(key, value)| (key, Entry::Leaf(value.into()))),
        )
    }

    /// Build a container from a wire mapping.
    pub fn from_json(shape: Shape, map: &Map<String, Json>) -> Self {
        Self::with_shape(
            shape,
            map.iter()
                .map(|(key, value)| (key.clone(), Entry::Leaf(Value::from_json(value)))),
        )
    }

    /// Enable or disable coercion of mismatching writes.
    ///
    /// Only typed containers coerce; other shapes are returned unchanged.
    pub fn with_convert(mut self, convert: bool) -> Self {
        if let Shape::Typed { flavor, .. } = self.shape {
            self.shape = Shape::Typed { flavor, convert };
        }
        self
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn flavor(&self) -> Option<Flavor> {
        match self.shape {
            Shape::Typed { flavor, .. } => Some(flavor),
            _ => None,
        }
    }

    /// Loader tag of a typed container.
    pub fn type_tag(&self) -> Option<&'static str> {
        self.flavor().map(Flavor::type_tag)
    }

    /// Rebuild the container with another shape, re-pinning slot types.
    pub(crate) fn reshape(self, shape: Shape) -> Self {
        if self.shape == shape {
            return self;
        }
        Self::with_shape(
            shape,
            self.slots.into_iter().map(|(key, slot)| (key, slot.entry)),
        )
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Iterate over keys and their read values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.slots
            .iter()
            .map(|(key, slot)| (key.as_str(), slot.entry.read()))
    }

    /// Iterate over keys and raw entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.slots
            .iter()
            .map(|(key, slot)| (key.as_str(), &slot.entry))
    }

    /// Read a value; accessor slots yield their read value.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.entry(key).map(Entry::read)
    }

    /// Raw entry, bypassing accessor delegation.
    pub fn entry(&self, key: &str) -> Result<&Entry> {
        self.slots
            .get(key)
            .map(|slot| &slot.entry)
            .ok_or_else(|| PropertyError::not_found(key))
    }

    /// Type pinned to a slot.
    pub fn kind_of(&self, key: &str) -> Result<&Kind> {
        self.slots
            .get(key)
            .map(|slot| &slot.kind)
            .ok_or_else(|| PropertyError::not_found(key))
    }

    /// Write a value.
    ///
    /// Accessor slots receive the value through their write hook. Slots
    /// holding a typed container or a typed sequence cannot be replaced.
    /// Typed containers convert the value to the slot's pinned type.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let shape = self.shape;

        let Some(slot) = self.slots.get_mut(key) else {
            if shape.is_locked() {
                return Err(PropertyError::SchemaViolation {
                    key: key.to_string(),
                });
            }
            let slot = Slot::new(Entry::Leaf(wrap(shape, value)));
            self.slots.insert(key.to_string(), slot);
            return Ok(());
        };

        match &mut slot.entry {
            Entry::Delegate(accessor) => return accessor.write(value),
            Entry::Leaf(Value::Dict(dict)) if dict.shape.is_typed() => {
                return Err(PropertyError::ProtectedMember {
                    key: key.to_string(),
                });
            }
            Entry::Leaf(Value::List(_)) => {
                return Err(PropertyError::ProtectedMember {
                    key: key.to_string(),
                });
            }
            Entry::Leaf(_) => {}
        }

        let value = match shape {
            Shape::Typed { convert, .. } => {
                if slot.kind.matches(&value) {
                    value
                } else if convert {
                    slot.kind.coerce(value)?
                } else {
                    return Err(slot.kind.mismatch(&value));
                }
            }
            _ => {
                let value = wrap(shape, value);
                slot.kind = Kind::of(&value);
                value
            }
        };
        slot.entry = Entry::Leaf(value);
        Ok(())
    }

    /// Attribute-style read, identical to [`AttrDict::get`].
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        self.get(name)
    }

    /// Attribute-style write, identical to [`AttrDict::set`].
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set(name, value)
    }

    /// Install an accessor into a slot.
    ///
    /// Locked and typed containers only accept existing keys.
    pub fn insert_delegate(&mut self, key: &str, accessor: Box<dyn Accessor>) -> Result<()> {
        if self.shape.is_locked() && !self.slots.contains_key(key) {
            return Err(PropertyError::SchemaViolation {
                key: key.to_string(),
            });
        }
        self.slots
            .insert(key.to_string(), Slot::new(Entry::Delegate(accessor)));
        Ok(())
    }

    /// Remove a key from an open container.
    pub fn remove(&mut self, key: &str) -> Result<Entry> {
        if self.shape.is_locked() {
            return Err(PropertyError::SchemaViolation {
                key: key.to_string(),
            });
        }
        self.slots
            .shift_remove(key)
            .map(|slot| slot.entry)
            .ok_or_else(|| PropertyError::not_found(key))
    }

    /// Write several values in order, stopping at the first failure.
    pub fn update<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Merge a wire mapping into the tree.
    ///
    /// Nested mappings are merged into nested containers, arrays replace the
    /// items of typed sequences, everything else goes through
    /// [`AttrDict::set`]. The merge is applied to a copy and only published
    /// when every write succeeds.
    pub fn merge_json(&mut self, map: &Map<String, Json>) -> Result<()> {
        let mut merged = self.clone();
        merged.merge_in_place(map)?;
        *self = merged;
        Ok(())
    }

    fn merge_in_place(&mut self, map: &Map<String, Json>) -> Result<()> {
        for (key, raw) in map {
            match (self.slots.get_mut(key).map(|slot| &mut slot.entry), raw) {
                (Some(Entry::Leaf(Value::Dict(dict))), Json::Object(inner)) => {
                    dict.merge_in_place(inner)?;
                }
                (Some(Entry::Leaf(Value::List(list))), Json::Array(items)) => {
                    list.replace(items.iter().map(Value::from_json))?;
                }
                _ => self.set(key, Value::from_json(raw))?,
            }
        }
        Ok(())
    }

    /// Nested container stored under `key`.
    pub fn dict(&self, key: &str) -> Result<&AttrDict> {
        match self.entry(key)? {
            Entry::Leaf(Value::Dict(dict)) => Ok(dict),
            other => Err(container_mismatch(other, "container")),
        }
    }

    pub fn dict_mut(&mut self, key: &str) -> Result<&mut AttrDict> {
        match self.entry_mut(key)? {
            Entry::Leaf(Value::Dict(dict)) => Ok(dict),
            other => Err(container_mismatch(other, "container")),
        }
    }

    /// Typed sequence stored under `key`.
    pub fn list(&self, key: &str) -> Result<&TypedList> {
        match self.entry(key)? {
            Entry::Leaf(Value::List(list)) => Ok(list),
            other => Err(container_mismatch(other, "list")),
        }
    }

    pub fn list_mut(&mut self, key: &str) -> Result<&mut TypedList> {
        match self.entry_mut(key)? {
            Entry::Leaf(Value::List(list)) => Ok(list),
            other => Err(container_mismatch(other, "list")),
        }
    }

    /// Enumeration installed under `key`.
    pub fn select(&self, key: &str) -> Result<&TypedEnum> {
        match self.entry(key)? {
            Entry::Delegate(accessor) if accessor.as_any().is::<TypedEnum>() => accessor
                .as_any()
                .downcast_ref::<TypedEnum>()
                .ok_or_else(|| PropertyError::not_found(key)),
            other => Err(container_mismatch(other, "select")),
        }
    }

    pub fn select_mut(&mut self, key: &str) -> Result<&mut TypedEnum> {
        // reports a missing key or a slot of another kind
        self.select(key)?;
        match self.entry_mut(key)? {
            Entry::Delegate(accessor) => accessor
                .as_any_mut()
                .downcast_mut::<TypedEnum>()
                .ok_or_else(|| PropertyError::not_found(key)),
            Entry::Leaf(_) => Err(PropertyError::not_found(key)),
        }
    }

    fn entry_mut(&mut self, key: &str) -> Result<&mut Entry> {
        self.slots
            .get_mut(key)
            .map(|slot| &mut slot.entry)
            .ok_or_else(|| PropertyError::not_found(key))
    }

    /// Read through nested containers with a dot-separated path.
    pub fn lookup(&self, path: &str) -> Result<Value> {
        match path.rsplit_once('.') {
            Some((parent, last)) => self.walk(parent)?.get(last),
            None => self.get(path),
        }
    }

    /// Write through nested containers with a dot-separated path.
    pub fn assign(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        match path.rsplit_once('.') {
            Some((parent, last)) => self.walk_mut(parent)?.set(last, value),
            None => self.set(path, value),
        }
    }

    fn walk(&self, path: &str) -> Result<&AttrDict> {
        path.split('.').try_fold(self, |dict, key| dict.dict(key))
    }

    fn walk_mut(&mut self, path: &str) -> Result<&mut AttrDict> {
        path.split('.').try_fold(self, |dict, key| dict.dict_mut(key))
    }

    /// Copy into open containers at every depth.
    pub fn to_open(&self) -> AttrDict {
        let slots = self
            .slots
            .iter()
            .map(|(key, slot)| {
                let entry = match &slot.entry {
                    Entry::Leaf(Value::Dict(dict)) => Entry::Leaf(Value::Dict(dict.to_open())),
                    other => other.clone(),
                };
                (key.clone(), Slot::new(entry))
            })
            .collect();
        AttrDict {
            shape: Shape::Open,
            slots,
        }
    }

    /// Flatten into a wire mapping.
    pub fn to_map(&self) -> Map<String, Json> {
        self.slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.entry.read().to_json()))
            .collect()
    }

    pub fn to_json(&self) -> Json {
        Json::Object(self.to_map())
    }

    /// Interpret interval fields as a duration.
    ///
    /// Recognized fields are `days`, `hours`, `minutes`, `seconds`,
    /// `milliseconds` and `microseconds`; absent ones count as zero.
    pub fn as_duration(&self) -> Result<Duration> {
        const MICROS: [(&str, f64); 6] = [
            ("days", 86_400_000_000.0),
            ("hours", 3_600_000_000.0),
            ("minutes", 60_000_000.0),
            ("seconds", 1_000_000.0),
            ("milliseconds", 1_000.0),
            ("microseconds", 1.0),
        ];

        let mut total = 0.0;
        for (field, scale) in MICROS {
            let Some(slot) = self.slots.get(field) else {
                continue;
            };
            let value = slot.entry.read();
            let amount = Kind::Float
                .coerce(value.clone())?
                .as_float()
                .ok_or_else(|| Kind::Float.mismatch(&value))?;
            total += amount * scale;
        }

        let total = total.round();
        if !total.is_finite() || total < 0.0 || total > u64::MAX as f64 {
            return Err(PropertyError::TypeMismatch {
                value: format!("{total:?}"),
                expected: "non-negative interval".to_string(),
            });
        }
        Ok(Duration::from_micros(total as u64))
    }
}

fn container_mismatch(entry: &Entry, expected: &str) -> PropertyError {
    PropertyError::TypeMismatch {
        value: entry.read().to_string(),
        expected: expected.to_string(),
    }
}

impl Serialize for AttrDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (key, slot) in &self.slots {
            match &slot.entry {
                Entry::Leaf(value) => map.serialize_entry(key, value)?,
                Entry::Delegate(accessor) => map.serialize_entry(key, &accessor.read())?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => panic!("not a mapping"),
        }
    }

    #[test]
    fn test_open_item_and_attr_access() {
        let mut dict = AttrDict::new();
        dict.set("a", 1).unwrap();
        dict.set_attr("b", "two").unwrap();

        assert_eq!(dict.get_attr("a").unwrap(), Value::Int(1));
        assert_eq!(dict.get("b").unwrap(), Value::from("two"));
        assert_eq!(
            dict.get("missing"),
            Err(PropertyError::NotFound {
                key: "missing".to_string()
            })
        );
        assert_eq!(dict.get_attr("missing"), dict.get("missing"));

        // open containers change their slot types freely
        dict.set("a", "one").unwrap();
        assert_eq!(dict.get("a").unwrap(), Value::from("one"));
        assert_eq!(dict.remove("a").unwrap(), Entry::Leaf("one".into()));
        assert!(!dict.contains_key("a"));
    }

    #[test]
    fn test_nested_mappings_are_wrapped() {
        let map = raw(json!({"outer": {"inner": {"x": 1}}}));
        let dict = AttrDict::from_json(Shape::Locked, &map);

        let outer = dict.dict("outer").unwrap();
        assert_eq!(outer.shape(), Shape::Locked);
        assert_eq!(outer.dict("inner").unwrap().shape(), Shape::Locked);
        assert_eq!(dict.lookup("outer.inner.x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_stricter_nested_container_is_kept() {
        let inner = AttrDict::typed(Flavor::Object, [("x", 1)]);
        let dict = AttrDict::open([("inner", inner)]);
        assert_eq!(
            dict.dict("inner").unwrap().shape(),
            Shape::typed(Flavor::Object)
        );
    }

    #[test]
    fn test_locked_rejects_new_keys() {
        let mut dict = AttrDict::locked([("a", 1)]);
        dict.set("a", "anything").unwrap();
        assert_eq!(
            dict.set("b", 2),
            Err(PropertyError::SchemaViolation {
                key: "b".to_string()
            })
        );
        assert!(matches!(
            dict.remove("a"),
            Err(PropertyError::SchemaViolation { .. })
        ));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_locked_nested_mapping_write_stays_locked() {
        let mut dict = AttrDict::locked([("cfg", AttrDict::new())]);
        dict.set("cfg", AttrDict::open([("x", 1)])).unwrap();
        let cfg = dict.dict("cfg").unwrap();
        assert_eq!(cfg.shape(), Shape::Locked);
        assert_eq!(cfg.get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_typed_coerces_writes() {
        let mut dict = AttrDict::typed(Flavor::Properties, [("timeout", 30)]);
        dict.set("timeout", "45").unwrap();
        assert_eq!(dict.get("timeout").unwrap(), Value::Int(45));

        let err = dict.set("timeout", "soon").unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        assert_eq!(dict.get("timeout").unwrap(), Value::Int(45));
        assert_eq!(dict.kind_of("timeout").unwrap(), &Kind::Int);
    }

    #[test]
    fn test_typed_without_convert() {
        let mut dict = AttrDict::typed(Flavor::Properties, [("ratio", 0.5)]).with_convert(false);
        dict.set("ratio", 0.75).unwrap();
        assert!(matches!(
            dict.set("ratio", 1),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert_eq!(dict.get("ratio").unwrap(), Value::Float(0.75));
    }

    #[test]
    fn test_typed_nested_container_is_protected() {
        let interval = AttrDict::typed(Flavor::TimeDelta, [("seconds", 5)]);
        let mut dict = AttrDict::typed(Flavor::Properties, [("interval", interval)]);

        assert_eq!(
            dict.set("interval", AttrDict::new()),
            Err(PropertyError::ProtectedMember {
                key: "interval".to_string()
            })
        );
        dict.assign("interval.seconds", "10").unwrap();
        assert_eq!(dict.lookup("interval.seconds").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_delegate_routes_writes() {
        let select = TypedEnum::new([("fast", Value::Int(0)), ("slow", Value::Int(1))], None).unwrap();
        let mut dict = AttrDict::with_shape(
            Shape::typed(Flavor::Properties),
            [("mode", Entry::from(select))],
        );

        assert_eq!(dict.get("mode").unwrap(), Value::from("fast"));
        dict.set("mode", 1).unwrap();
        assert_eq!(dict.get("mode").unwrap(), Value::from("slow"));
        assert_eq!(dict.select("mode").unwrap().value(), &Value::Int(1));
        assert!(matches!(
            dict.set("mode", "medium"),
            Err(PropertyError::InvalidEnumValue { .. })
        ));

        dict.select_mut("mode").unwrap().set("fast").unwrap();
        assert_eq!(dict.get("mode").unwrap(), Value::from("fast"));
    }

    #[test]
    fn test_insert_delegate_respects_lock() {
        let select = TypedEnum::new([("a", Value::Int(1))], None).unwrap();
        let mut dict = AttrDict::locked([("x", 1)]);
        assert!(matches!(
            dict.insert_delegate("y", select.clone_box()),
            Err(PropertyError::SchemaViolation { .. })
        ));
        dict.insert_delegate("x", select.clone_box()).unwrap();
        assert_eq!(dict.get("x").unwrap(), Value::from("a"));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let map = raw(json!({"obj": {"a": 1}, "n": 2}));
        let original = AttrDict::from_json(Shape::typed(Flavor::Properties), &map);
        let mut copy = original.clone();
        assert_eq!(copy, original);

        copy.dict_mut("obj").unwrap().set("a", 5).unwrap();
        assert_eq!(original.lookup("obj.a").unwrap(), Value::Int(1));
        assert_eq!(copy.lookup("obj.a").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_to_open_rewraps_every_level() {
        let map = raw(json!({"obj": {"a": 1}}));
        let typed = AttrDict::from_json(Shape::typed(Flavor::Properties), &map);
        let mut open = typed.to_open();

        assert_eq!(open.shape(), Shape::Open);
        assert_eq!(open.dict("obj").unwrap().shape(), Shape::Open);
        open.dict_mut("obj").unwrap().set("b", 2).unwrap();
        assert!(!typed.dict("obj").unwrap().contains_key("b"));
        assert_eq!(open.to_json(), json!({"obj": {"a": 1, "b": 2}}));
    }

    #[test]
    fn test_update_stops_at_first_failure() {
        let mut dict = AttrDict::typed(Flavor::Properties, [("a", 1), ("b", 2)]);
        let result = dict.update([("a", Value::Int(10)), ("c", Value::Int(3))]);
        assert!(matches!(result, Err(PropertyError::SchemaViolation { .. })));
        assert_eq!(dict.get("a").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_merge_json_is_all_or_nothing() {
        let map = raw(json!({"count": 1, "nested": {"flag": false}}));
        let mut dict = AttrDict::from_json(Shape::typed(Flavor::Properties), &map);

        dict.merge_json(&raw(json!({"count": "4", "nested": {"flag": true}})))
            .unwrap();
        assert_eq!(dict.to_json(), json!({"count": 4, "nested": {"flag": true}}));

        let err = dict.merge_json(&raw(json!({"count": 9, "nested": {"nope": 1}})));
        assert!(matches!(err, Err(PropertyError::SchemaViolation { .. })));
        assert_eq!(dict.get("count").unwrap(), Value::Int(4));
    }

    #[test]
    fn test_as_duration() {
        let interval = AttrDict::typed(
            Flavor::TimeDelta,
            [("days", 1), ("seconds", 30), ("microseconds", 500_000)],
        );
        assert_eq!(
            interval.as_duration().unwrap(),
            Duration::from_millis(86_430_500)
        );

        let negative = AttrDict::typed(Flavor::TimeDelta, [("seconds", -1)]);
        assert!(negative.as_duration().is_err());
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let map = raw(json!({"a": [1, 2], "b": {"c": "d"}}));
        let dict = AttrDict::from_json(Shape::Locked, &map);
        assert_eq!(serde_json::to_value(&dict).unwrap(), dict.to_json());
    }
}
