//! Untyped native values decoded by the fast parser.
//!
//! A [`Value`] has the same layout conventions as the [`Node`] tree (`@`
//! attributes, `#text`, `#cdata`, repeated children as lists) but carries no
//! positions.

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::stream::is_valid_name;
use crate::token::Position;
use crate::tree::{ATTRIBUTE_PREFIX, Array, CDATA_KEY, Literal, Node, Object, TEXT_KEY};

pub type Map = hashbrown::HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum Value {
    String(String),
    Map(Map),
    List(Vec<Value>),
}

impl Default for Value {
    #[inline]
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl Value {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// The text of a string value, or the `#text` (falling back to `#cdata`)
    /// entry of a map. Empty for anything else.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Value::String(s) => s,
            Value::Map(map) => map
                .get(TEXT_KEY)
                .or_else(|| map.get(CDATA_KEY))
                .and_then(Value::as_str)
                .unwrap_or_default(),
            Value::List(_) => "",
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::List(items) => items.is_empty(),
        }
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Map> for Value {
    #[inline]
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

/// Adds a child element to a map, coalescing repeats into a list.
pub(crate) fn insert_child(map: &mut Map, name: String, child: Value) {
    match map.entry(name) {
        hashbrown::hash_map::Entry::Vacant(entry) => {
            entry.insert(child);
        }
        hashbrown::hash_map::Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::List(items) => items.push(child),
            existing => {
                let first = std::mem::take(existing);
                *existing = Value::List(vec![first, child]);
            }
        },
    }
}

/// Converts a tree into its native value, dropping positions.
#[must_use]
pub fn to_native_value(node: &Node) -> Value {
    match node {
        Node::Object(object) => Value::Map(
            object
                .properties
                .iter()
                .map(|(key, child)| (key.clone(), to_native_value(child)))
                .collect(),
        ),
        Node::Literal(literal) => Value::String(literal.value.clone()),
        Node::Array(array) => Value::List(array.items.iter().map(to_native_value).collect()),
    }
}

/// Builds a tree from a native value.
///
/// # Errors
///
/// The root must be a map. Attribute, `#text` and `#cdata` entries must be
/// strings, other `#` keys are rejected, keys must be valid XML names, and
/// lists may not nest.
pub fn from_native_value(value: Value) -> Result<Node> {
    match value {
        Value::Map(map) => Ok(object_from_map(map)?.into()),
        other => Err(invalid(format!(
            "the root must be a map, found {}",
            other.kind()
        ))),
    }
}

fn object_from_map(map: Map) -> Result<Object> {
    let mut object = Object::new(Position::default());
    for (key, value) in map {
        let node = if let Some(attribute) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            if !is_valid_name(attribute) {
                return Err(Error::InvalidName(key));
            }
            literal(value, &key)?
        } else if key == TEXT_KEY || key == CDATA_KEY {
            literal(value, &key)?
        } else if key.starts_with('#') {
            return Err(invalid(format!("unknown special key {key:?}")));
        } else if !is_valid_name(&key) {
            return Err(Error::InvalidName(key));
        } else {
            element(value, &key, true)?
        };
        object.properties.insert(key, node);
    }
    Ok(object)
}

fn literal(value: Value, key: &str) -> Result<Node> {
    match value {
        Value::String(s) => Ok(Literal::new(s, Position::default()).into()),
        other => Err(invalid(format!(
            "{key:?} must hold a string, found {}",
            other.kind()
        ))),
    }
}

fn element(value: Value, key: &str, allow_list: bool) -> Result<Node> {
    match value {
        Value::String(s) => Ok(Literal::new(s, Position::default()).into()),
        Value::Map(map) => Ok(object_from_map(map)?.into()),
        Value::List(_) if !allow_list => Err(invalid(format!(
            "repeated element {key:?} contains a nested list"
        ))),
        Value::List(items) => {
            let items = items
                .into_iter()
                .map(|item| element(item, key, false))
                .collect::<Result<_>>()?;
            Ok(Array {
                items,
                position: Position::default(),
            }
            .into())
        }
    }
}

#[inline]
fn invalid(message: String) -> Error {
    Error::InvalidNative(Cow::Owned(message))
}
