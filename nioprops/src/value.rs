use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::{Number, Value as Json};

use crate::{
    attr::{AttrDict, Shape},
    error::{PropertyError, Result},
    list::TypedList,
};

/// A node of a property tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Untyped sequence passed through from the wire.
    Seq(Vec<Value>),
    /// Sequence with a pinned element type.
    List(TypedList),
    /// Nested container.
    Dict(AttrDict),
}

/// Type tag pinned to a container slot or a sequence element.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Seq,
    /// Typed sequence of the boxed element kind.
    List(Box<Kind>),
    /// Container of the given shape.
    Dict(Shape),
}

impl Kind {
    /// Type tag of a value.
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Seq(_) => Kind::Seq,
            Value::List(list) => Kind::List(Box::new(list.kind().clone())),
            Value::Dict(dict) => Kind::Dict(dict.shape()),
        }
    }

    /// Whether `value` already has this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Kind::List(elem), Value::List(list)) => **elem == *list.kind(),
            (Kind::Dict(shape), Value::Dict(dict)) => *shape == dict.shape(),
            _ => *self == Kind::of(value),
        }
    }

    /// Convert `value` to this kind.
    ///
    /// Values that already match are returned unchanged.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if self.matches(&value) {
            return Ok(value);
        }

        match self {
            Kind::Null => Err(self.mismatch(&value)),
            Kind::Bool => match &value {
                Value::Null => Ok(Value::Bool(false)),
                Value::Int(i) => Ok(Value::Bool(*i != 0)),
                Value::Float(f) => Ok(Value::Bool(*f != 0.0)),
                Value::Str(s) => parse_bool(s)
                    .map(Value::Bool)
                    .ok_or_else(|| self.mismatch(&value)),
                _ => Err(self.mismatch(&value)),
            },
            Kind::Int => match &value {
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Float(f) => {
                    let t = f.trunc();
                    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                        Ok(Value::Int(t as i64))
                    } else {
                        Err(self.mismatch(&value))
                    }
                }
                Value::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| self.mismatch(&value)),
                _ => Err(self.mismatch(&value)),
            },
            Kind::Float => match &value {
                Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| self.mismatch(&value)),
                _ => Err(self.mismatch(&value)),
            },
            Kind::Str => Ok(Value::Str(match value {
                Value::Str(s) => s,
                Value::Null => "null".to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Int(i) => i.to_string(),
                Value::Float(f) => format!("{f:?}"),
                other => other.to_json().to_string(),
            })),
            Kind::Seq => match value {
                Value::List(list) => Ok(Value::Seq(list.into_items())),
                other => Err(self.mismatch(&other)),
            },
            Kind::List(elem) => match value {
                Value::Seq(items) => Ok(Value::List(TypedList::new((**elem).clone(), items)?)),
                Value::List(list) => Ok(Value::List(TypedList::new(
                    (**elem).clone(),
                    list.into_items(),
                )?)),
                other => Err(self.mismatch(&other)),
            },
            Kind::Dict(shape) => match value {
                Value::Dict(dict) => Ok(Value::Dict(dict.reshape(*shape))),
                other => Err(self.mismatch(&other)),
            },
        }
    }

    pub(crate) fn mismatch(&self, value: &Value) -> PropertyError {
        PropertyError::TypeMismatch {
            value: value.to_string(),
            expected: self.to_string(),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Null => write!(f, "null"),
            Kind::Bool => write!(f, "bool"),
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::Str => write!(f, "str"),
            Kind::Seq => write!(f, "seq"),
            Kind::List(elem) => write!(f, "list<{elem}>"),
            Kind::Dict(Shape::Open) => write!(f, "attrdict"),
            Kind::Dict(Shape::Locked) => write!(f, "solid attrdict"),
            Kind::Dict(Shape::Typed { flavor, .. }) => write!(f, "{}", flavor.type_tag()),
        }
    }
}

impl Value {
    /// Build a value from its wire representation.
    ///
    /// Mappings become open containers and arrays become untyped sequences.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::Seq(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Dict(AttrDict::from_json(Shape::Open, map)),
        }
    }

    /// Flatten into the wire representation.
    ///
    /// Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number(Number::from(*i)),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::Seq(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::List(list) => list.to_json(),
            Value::Dict(dict) => dict.to_json(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as `f64`; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TypedList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&AttrDict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Equality used when resolving raw enumeration values: integers and
    /// floats compare numerically.
    pub(crate) fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v:?}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_unit(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::List(list) => list.serialize(serializer),
            Value::Dict(dict) => dict.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Seq(value)
    }
}

impl From<TypedList> for Value {
    fn from(value: TypedList) -> Self {
        Value::List(value)
    }
}

impl From<AttrDict> for Value {
    fn from(value: AttrDict) -> Self {
        Value::Dict(value)
    }
}

impl From<&Json> for Value {
    fn from(value: &Json) -> Self {
        Value::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Flavor;
    use serde_json::json;

    #[test]
    fn test_coerce_int() {
        assert_eq!(Kind::Int.coerce("45".into()).unwrap(), Value::Int(45));
        assert_eq!(Kind::Int.coerce(" 7 ".into()).unwrap(), Value::Int(7));
        assert_eq!(Kind::Int.coerce(3.9.into()).unwrap(), Value::Int(3));
        assert_eq!(Kind::Int.coerce(true.into()).unwrap(), Value::Int(1));
        assert!(matches!(
            Kind::Int.coerce("4.5".into()),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(Kind::Int.coerce(f64::NAN.into()).is_err());
        assert!(Kind::Int.coerce(9_223_372_036_854_775_808.0.into()).is_err());
        assert_eq!(
            Kind::Int.coerce((-9_223_372_036_854_775_808.0).into()).unwrap(),
            Value::Int(i64::MIN)
        );
        assert!(Kind::Int.coerce(Value::Null).is_err());
    }

    #[test]
    fn test_coerce_float_and_bool() {
        assert_eq!(Kind::Float.coerce(2.into()).unwrap(), Value::Float(2.0));
        assert_eq!(Kind::Float.coerce("0.5".into()).unwrap(), Value::Float(0.5));
        assert_eq!(Kind::Bool.coerce("False".into()).unwrap(), Value::Bool(false));
        assert_eq!(Kind::Bool.coerce(0.into()).unwrap(), Value::Bool(false));
        assert_eq!(Kind::Bool.coerce(2.into()).unwrap(), Value::Bool(true));
        assert!(Kind::Bool.coerce("maybe".into()).is_err());
        assert_eq!(Kind::Bool.coerce(Value::Null).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_coerce_str() {
        assert_eq!(Kind::Str.coerce(7.into()).unwrap(), Value::from("7"));
        assert_eq!(Kind::Str.coerce(1.0.into()).unwrap(), Value::from("1.0"));
        assert_eq!(Kind::Str.coerce(true.into()).unwrap(), Value::from("true"));
        let seq = Value::Seq(vec![1.into(), "a".into()]);
        assert_eq!(Kind::Str.coerce(seq).unwrap(), Value::from("[1,\"a\"]"));
    }

    #[test]
    fn test_coerce_list_elements() {
        let kind = Kind::List(Box::new(Kind::Str));
        let value = kind.coerce(Value::Seq(vec![1.into(), 2.into()])).unwrap();
        let list = value.as_list().unwrap();
        assert_eq!(list.as_slice(), &[Value::from("1"), Value::from("2")]);
        assert!(kind.matches(&value));
    }

    #[test]
    fn test_from_json() {
        let value = Value::from_json(&json!({"a": [1, 2.5, "x"], "b": null}));
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.shape(), Shape::Open);
        assert_eq!(
            dict.get("a").unwrap(),
            Value::Seq(vec![Value::Int(1), Value::Float(2.5), "x".into()])
        );
        assert!(dict.get("b").unwrap().is_null());
        assert_eq!(value.to_json(), json!({"a": [1, 2.5, "x"], "b": null}));
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
        assert!(!Value::Int(1).loose_eq(&Value::from("1")));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::List(Box::new(Kind::Int)).to_string(), "list<int>");
        assert_eq!(Kind::Dict(Shape::typed(Flavor::TimeDelta)).to_string(), "timedelta");
    }
}
