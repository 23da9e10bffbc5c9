use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::Value as Json;

use crate::{
    attr::AttrDict,
    error::{PropertyError, Result},
    value::{Kind, Value},
};

/// Sequence whose elements all share one pinned [`Kind`].
///
/// Every inserted element is converted to the element kind. With `noset`
/// the existing elements cannot be replaced by index, although the sequence
/// can still grow.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedList {
    kind: Kind,
    items: Vec<Value>,
    convert: bool,
    noset: bool,
}

impl TypedList {
    /// Build a sequence of `kind`, converting every initial item.
    pub fn new<I>(kind: Kind, items: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut list = Self::empty(kind);
        list.extend(items)?;
        Ok(list)
    }

    pub fn empty(kind: Kind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            convert: true,
            noset: false,
        }
    }

    /// Reject mismatching elements instead of converting them.
    pub fn with_convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    /// Forbid index assignment.
    pub fn with_noset(mut self, noset: bool) -> Self {
        self.noset = noset;
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_noset(&self) -> bool {
        self.noset
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    fn convert_value(&self, value: Value) -> Result<Value> {
        if self.kind.matches(&value) {
            Ok(value)
        } else if self.convert {
            self.kind.coerce(value)
        } else {
            Err(self.kind.mismatch(&value))
        }
    }

    fn check_index(&self, index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(PropertyError::OutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    pub fn append(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = self.convert_value(value.into())?;
        self.items.push(value);
        Ok(())
    }

    /// Append every item, or none of them if one fails to convert.
    pub fn extend<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let converted = items
            .into_iter()
            .map(|item| self.convert_value(item.into()))
            .collect::<Result<Vec<_>>>()?;
        self.items.extend(converted);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        self.check_index(index, self.items.len() + 1)?;
        let value = self.convert_value(value.into())?;
        self.items.insert(index, value);
        Ok(())
    }

    /// Replace the element at `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        if self.noset {
            return Err(PropertyError::ImmutableElement { index });
        }
        self.check_index(index, self.items.len())?;
        let value = self.convert_value(value.into())?;
        self.items[index] = value;
        Ok(())
    }

    /// Replace the whole contents, keeping the element kind.
    pub fn replace<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let converted = items
            .into_iter()
            .map(|item| self.convert_value(item.into()))
            .collect::<Result<Vec<_>>>()?;
        self.items = converted;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    pub fn remove(&mut self, index: usize) -> Result<Value> {
        self.check_index(index, self.items.len())?;
        Ok(self.items.remove(index))
    }

    /// Nested container stored at `index`.
    pub fn dict_mut(&mut self, index: usize) -> Result<&mut AttrDict> {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(Value::Dict(dict)) => Ok(dict),
            Some(other) => Err(PropertyError::TypeMismatch {
                value: other.to_string(),
                expected: "container".to_string(),
            }),
            None => Err(PropertyError::OutOfRange { index, len }),
        }
    }

    pub fn to_json(&self) -> Json {
        Json::Array(self.items.iter().map(Value::to_json).collect())
    }
}

impl<'a> IntoIterator for &'a TypedList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for TypedList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}
