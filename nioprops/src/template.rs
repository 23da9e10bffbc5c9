//! Template loading.
//!
//! A block template served by an instance looks like:
//!
//! ```json
//! {
//!   "properties": {
//!     "timeout": {"type": "int", "default": 30},
//!     "interval": {"type": "timedelta", "default": {"seconds": 5}},
//!     "tags": {"type": "list", "template": {"type": "str"}, "default": ["a"]},
//!     "mode": {"type": "select", "options": {"fast": 0, "slow": 1}, "default": "fast"},
//!     "target": {"type": "object", "template": {"host": {"type": "str"}}}
//!   }
//! }
//! ```
//!
//! Each node carrying a `type` tag is handed to the builder registered for
//! that tag. Nodes without a tag are passed through unchanged.

use std::{fmt, str::FromStr};

use serde_json::{Map, Value as Json};

use crate::{
    attr::{AttrDict, Entry, Flavor, Shape},
    error::{PropertyError, Result},
    list::TypedList,
    select::TypedEnum,
    value::{Kind, Value},
};

/// Type tags understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Str,
    Int,
    Float,
    TimeDelta,
    Object,
    List,
    Select,
}

/// What a builder receives, decided by the fields present on the node.
enum Input<'a> {
    /// Node with a `template` or `options` field.
    Node(&'a Map<String, Json>),
    /// Node with only a `default` field.
    Default(&'a Json),
    /// Node with neither.
    Empty,
}

type Builder = fn(Input<'_>) -> Result<Entry>;

impl TypeTag {
    pub const ALL: [TypeTag; 8] = [
        TypeTag::Bool,
        TypeTag::Str,
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::TimeDelta,
        TypeTag::Object,
        TypeTag::List,
        TypeTag::Select,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::Str => "str",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::TimeDelta => "timedelta",
            TypeTag::Object => "object",
            TypeTag::List => "list",
            TypeTag::Select => "select",
        }
    }

    fn builder(self) -> Builder {
        match self {
            TypeTag::Bool => build_bool,
            TypeTag::Str => build_str,
            TypeTag::Int => build_int,
            TypeTag::Float => build_float,
            TypeTag::TimeDelta => build_timedelta,
            TypeTag::Object => build_object,
            TypeTag::List => build_list,
            TypeTag::Select => build_select,
        }
    }
}

impl FromStr for TypeTag {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| PropertyError::UnknownType { tag: s.to_string() })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load one schema node.
///
/// Nodes that are not mappings, or mappings without a `type` field, are
/// returned verbatim as plain values.
pub fn load_template(node: &Json) -> Result<Entry> {
    let Some((map, tag)) = node
        .as_object()
        .and_then(|map| map.get("type").map(|tag| (map, tag)))
    else {
        return Ok(Entry::Leaf(Value::from_json(node)));
    };

    let tag: TypeTag = match tag.as_str() {
        Some(tag) => tag.parse()?,
        None => {
            return Err(PropertyError::UnknownType {
                tag: tag.to_string(),
            });
        }
    };

    let input = if map.contains_key("template") || map.contains_key("options") {
        Input::Node(map)
    } else if let Some(default) = map.get("default") {
        Input::Default(default)
    } else {
        Input::Empty
    };

    trace!("loading `{tag}` property");
    (tag.builder())(input).inspect_err(|e| debug!("failed to load `{tag}` property: {e}"))
}

/// Load every node of `properties` into a typed container of `flavor`.
///
/// Keys keep the order of the mapping.
pub fn load_properties(properties: &Map<String, Json>, flavor: Flavor) -> Result<AttrDict> {
    let entries = properties
        .iter()
        .map(|(key, node)| Ok((key.clone(), load_template(node)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(AttrDict::with_shape(Shape::typed(flavor), entries))
}

/// Load a `list` node.
///
/// The element kind comes from loading the element `template`; a missing
/// `default` yields an empty sequence.
pub fn load_list(node: &Map<String, Json>) -> Result<TypedList> {
    let template = node
        .get("template")
        .ok_or_else(|| PropertyError::builder("list", "missing element `template`"))?;

    let kind = match load_template(template)? {
        Entry::Leaf(value) => Kind::of(&value),
        Entry::Delegate(_) => {
            return Err(PropertyError::builder(
                "list",
                "`select` cannot be used as an element template",
            ));
        }
    };

    match node.get("default") {
        None | Some(Json::Null) => Ok(TypedList::empty(kind)),
        Some(Json::Array(items)) => TypedList::new(kind, items.iter().map(Value::from_json)),
        Some(other) => Err(PropertyError::builder(
            "list",
            format!("default must be a sequence, got {other}"),
        )),
    }
}

/// Load a full block template into its default configuration.
///
/// The caller's document is only read; the tree is returned once every
/// property loaded successfully.
pub fn load_block(template: &Json) -> Result<AttrDict> {
    let properties = template
        .get("properties")
        .and_then(Json::as_object)
        .ok_or_else(|| PropertyError::Template {
            message: "block template has no `properties` mapping".to_string(),
        })?;

    let config = load_properties(properties, Flavor::Properties)?;
    debug!("loaded block template with {} properties", config.len());
    Ok(config)
}

fn scalar(tag: TypeTag, kind: Kind, zero: Value, input: Input<'_>) -> Result<Entry> {
    let value = match input {
        Input::Empty => zero,
        Input::Default(raw) => kind.coerce(Value::from_json(raw))?,
        Input::Node(_) => {
            return Err(PropertyError::builder(
                tag.as_str(),
                "scalar properties take no `template` or `options`",
            ));
        }
    };
    Ok(Entry::Leaf(value))
}

fn build_bool(input: Input<'_>) -> Result<Entry> {
    scalar(TypeTag::Bool, Kind::Bool, Value::Bool(false), input)
}

fn build_str(input: Input<'_>) -> Result<Entry> {
    scalar(TypeTag::Str, Kind::Str, Value::Str(String::new()), input)
}

fn build_int(input: Input<'_>) -> Result<Entry> {
    scalar(TypeTag::Int, Kind::Int, Value::Int(0), input)
}

fn build_float(input: Input<'_>) -> Result<Entry> {
    scalar(TypeTag::Float, Kind::Float, Value::Float(0.0), input)
}

fn build_timedelta(input: Input<'_>) -> Result<Entry> {
    let interval = match input {
        Input::Node(node) => match node.get("template").and_then(Json::as_object) {
            Some(template) => load_properties(template, Flavor::TimeDelta)?,
            None => {
                return Err(PropertyError::builder(
                    "timedelta",
                    "`template` must be a mapping",
                ));
            }
        },
        Input::Default(Json::Object(fields)) => {
            AttrDict::from_json(Shape::typed(Flavor::TimeDelta), fields)
        }
        Input::Default(other) => {
            return Err(PropertyError::builder(
                "timedelta",
                format!("default must be a mapping of interval fields, got {other}"),
            ));
        }
        Input::Empty => AttrDict::typed(
            Flavor::TimeDelta,
            [("days", 0), ("seconds", 0), ("microseconds", 0)],
        ),
    };
    Ok(Entry::Leaf(Value::Dict(interval)))
}

fn build_object(input: Input<'_>) -> Result<Entry> {
    let object = match input {
        Input::Node(node) => match node.get("template").and_then(Json::as_object) {
            Some(template) => load_properties(template, Flavor::Object)?,
            None => {
                return Err(PropertyError::builder(
                    "object",
                    "missing `template` mapping",
                ));
            }
        },
        Input::Default(Json::Object(fields)) => {
            AttrDict::from_json(Shape::typed(Flavor::Object), fields)
        }
        Input::Default(_) | Input::Empty => {
            return Err(PropertyError::builder(
                "object",
                "missing `template` mapping",
            ));
        }
    };
    Ok(Entry::Leaf(Value::Dict(object)))
}

fn build_list(input: Input<'_>) -> Result<Entry> {
    let list = match input {
        Input::Node(node) => load_list(node)?,
        Input::Default(Json::Array(items)) if !items.is_empty() => {
            let items: Vec<Value> = items.iter().map(Value::from_json).collect();
            TypedList::new(Kind::of(&items[0]), items)?
        }
        Input::Default(_) | Input::Empty => {
            return Err(PropertyError::builder(
                "list",
                "missing element `template`",
            ));
        }
    };
    Ok(Entry::Leaf(Value::List(list)))
}

fn build_select(input: Input<'_>) -> Result<Entry> {
    let Input::Node(node) = input else {
        return Err(PropertyError::builder("select", "missing `options` mapping"));
    };
    let options = node
        .get("options")
        .and_then(Json::as_object)
        .ok_or_else(|| PropertyError::builder("select", "missing `options` mapping"))?;

    let default = node
        .get("default")
        .filter(|default| !default.is_null())
        .map(Value::from_json);
    let select = TypedEnum::new(
        options
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_json(value))),
        default.as_ref(),
    )?;
    Ok(Entry::from(select))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_defaults_are_converted() {
        let cases = [
            (json!({"type": "int", "default": 30}), Value::Int(30)),
            (json!({"type": "int", "default": "30"}), Value::Int(30)),
            (json!({"type": "float", "default": 1}), Value::Float(1.0)),
            (json!({"type": "str", "default": 5}), Value::from("5")),
            (json!({"type": "bool", "default": true}), Value::Bool(true)),
        ];
        for (node, expected) in cases {
            assert_eq!(load_template(&node).unwrap(), Entry::Leaf(expected));
        }
    }

    #[test]
    fn test_zero_argument_builders() {
        assert_eq!(
            load_template(&json!({"type": "bool"})).unwrap(),
            Entry::Leaf(Value::Bool(false))
        );
        assert_eq!(
            load_template(&json!({"type": "str"})).unwrap(),
            Entry::Leaf(Value::from(""))
        );
        let interval = load_template(&json!({"type": "timedelta"})).unwrap();
        assert_eq!(
            interval.read().to_json(),
            json!({"days": 0, "seconds": 0, "microseconds": 0})
        );
    }

    #[test]
    fn test_untyped_nodes_pass_through() {
        assert_eq!(load_template(&json!(5)).unwrap(), Entry::Leaf(Value::Int(5)));
        let raw = json!({"default": 1});
        assert_eq!(load_template(&raw).unwrap().read().to_json(), raw);
    }

    #[test]
    fn test_unknown_and_malformed_tags() {
        assert_eq!(
            load_template(&json!({"type": "complex"})),
            Err(PropertyError::UnknownType {
                tag: "complex".to_string()
            })
        );
        assert!(matches!(
            load_template(&json!({"type": 1})),
            Err(PropertyError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_substructure_tags_without_substructure() {
        for tag in ["object", "list", "select"] {
            let result = load_template(&json!({ "type": tag }));
            assert!(
                matches!(result, Err(PropertyError::Builder { .. })),
                "{tag}: {result:?}"
            );
        }
    }

    #[test]
    fn test_object_template() {
        let node = json!({
            "type": "object",
            "template": {
                "host": {"type": "str", "default": "localhost"},
                "port": {"type": "int", "default": 8181},
            }
        });
        let entry = load_template(&node).unwrap();
        let object = entry.as_leaf().and_then(Value::as_dict).unwrap();
        assert_eq!(object.type_tag(), Some("object"));
        assert_eq!(object.keys().collect::<Vec<_>>(), vec!["host", "port"]);
        assert_eq!(object.get("port").unwrap(), Value::Int(8181));
    }

    #[test]
    fn test_list_of_objects() {
        let node = json!({
            "type": "list",
            "template": {"type": "object", "template": {"n": {"type": "int", "default": 0}}},
            "default": [{"n": 1}, {"n": 2}],
        });
        let entry = load_template(&node).unwrap();
        let list = entry.as_leaf().and_then(Value::as_list).unwrap();
        assert_eq!(list.kind(), &Kind::Dict(Shape::typed(Flavor::Object)));
        assert_eq!(list.to_json(), json!([{"n": 1}, {"n": 2}]));
    }

    #[test]
    fn test_list_without_default_is_empty() {
        let node = json!({"type": "list", "template": {"type": "float"}});
        let entry = load_template(&node).unwrap();
        let list = entry.as_leaf().and_then(Value::as_list).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.kind(), &Kind::Float);
    }

    #[test]
    fn test_list_of_select_is_rejected() {
        let node = json!({
            "type": "list",
            "template": {"type": "select", "options": {"a": 1}},
            "default": [],
        });
        assert!(matches!(
            load_template(&node),
            Err(PropertyError::Builder { .. })
        ));
    }

    #[test]
    fn test_select_without_default_takes_first_option() {
        let node = json!({"type": "select", "options": {"low": 1, "high": 2}});
        let entry = load_template(&node).unwrap();
        assert!(entry.is_delegate());
        assert_eq!(entry.read(), Value::from("low"));
    }

    #[test]
    fn test_select_with_null_default_takes_first_option() {
        let node = json!({"type": "select", "options": {"a": 1, "b": 2}, "default": null});
        let entry = load_template(&node).unwrap();
        assert!(entry.is_delegate());
        assert_eq!(entry.read(), Value::from("a"));
    }

    #[test]
    fn test_bool_with_null_default_is_false() {
        let node = json!({"type": "bool", "default": null});
        assert_eq!(load_template(&node).unwrap(), Entry::Leaf(Value::Bool(false)));
    }

    #[test]
    fn test_load_block_leaves_input_untouched() {
        let template = json!({"properties": {"n": {"type": "int", "default": 1}}});
        let before = template.clone();
        let config = load_block(&template).unwrap();
        assert_eq!(template, before);
        assert_eq!(config.type_tag(), Some("properties"));
    }

    #[test]
    fn test_load_block_requires_properties() {
        assert!(matches!(
            load_block(&json!({"props": {}})),
            Err(PropertyError::Template { .. })
        ));
    }

    #[test]
    fn test_type_tag_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
        }
    }
}
