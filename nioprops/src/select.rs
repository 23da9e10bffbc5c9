use std::{any::Any, fmt, sync::Arc};

use crate::{
    attr::Accessor,
    error::{PropertyError, Result},
    value::Value,
};

type Options = Arc<[(String, Value)]>;

/// One `(name, value)` pair of a [`TypedEnum`].
#[derive(Debug, Clone)]
pub struct Member {
    options: Options,
    index: usize,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.options[self.index].0
    }

    pub fn value(&self) -> &Value {
        &self.options[self.index].1
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.options, &other.options) && self.index == other.index
    }
}

/// Closed set of named values holding exactly one current member.
///
/// When installed into a container slot the enumeration reads as the name of
/// its current member, and writes select a member by name or by raw value.
#[derive(Debug, Clone)]
pub struct TypedEnum {
    options: Options,
    current: usize,
}

impl TypedEnum {
    /// Build from ordered `(name, value)` pairs.
    ///
    /// The first pair is selected unless `default` names another member.
    pub fn new<I, K>(options: I, default: Option<&Value>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let options: Options = options
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        if options.is_empty() {
            return Err(PropertyError::builder("select", "no options declared"));
        }

        let mut select = Self {
            options,
            current: 0,
        };
        if let Some(default) = default {
            select.set(default.clone())?;
        }
        Ok(select)
    }

    /// Name of the current member.
    pub fn name(&self) -> &str {
        &self.options[self.current].0
    }

    /// Raw value of the current member.
    pub fn value(&self) -> &Value {
        &self.options[self.current].1
    }

    pub fn current(&self) -> Member {
        self.member(self.current)
    }

    pub fn members(&self) -> impl Iterator<Item = Member> + '_ {
        (0..self.options.len()).map(|index| self.member(index))
    }

    fn member(&self, index: usize) -> Member {
        Member {
            options: self.options.clone(),
            index,
        }
    }

    /// Select a member by name, or failing that by raw value.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let by_name = match &value {
            Value::Str(name) => self.options.iter().position(|(n, _)| n == name),
            _ => None,
        };
        let index = by_name
            .or_else(|| self.options.iter().position(|(_, v)| v.loose_eq(&value)))
            .ok_or_else(|| PropertyError::InvalidEnumValue {
                value: value.to_string(),
            })?;
        self.current = index;
        Ok(())
    }

    /// Select a member of this enumeration.
    ///
    /// Members of other enumerations are rejected even when their name
    /// matches.
    pub fn set_member(&mut self, member: &Member) -> Result<()> {
        if !Arc::ptr_eq(&self.options, &member.options) {
            return Err(PropertyError::InvalidEnumValue {
                value: member.name().to_string(),
            });
        }
        self.current = member.index;
        Ok(())
    }
}

impl PartialEq for TypedEnum {
    fn eq(&self, other: &Self) -> bool {
        self.options == other.options && self.current == other.current
    }
}

impl fmt::Display for TypedEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.name())
    }
}

impl Accessor for TypedEnum {
    fn read(&self) -> Value {
        Value::Str(self.name().to_string())
    }

    fn write(&mut self, value: Value) -> Result<()> {
        self.set(value)
    }

    fn clone_box(&self) -> Box<dyn Accessor> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
