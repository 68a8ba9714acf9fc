//! Generic document tree produced by the AST parser.
//!
//! An element is an [`Object`] whose keys follow a naming convention:
//! `@name` holds an attribute, `#text` and `#cdata` hold character data, and
//! any other key holds a child element. Children that repeat under the same
//! parent are collected into an [`Array`] in encounter order.

use crate::pool;
use crate::token::Position;

pub type Properties = hashbrown::HashMap<String, Node>;

/// Key holding the trimmed, unescaped text content of an element.
pub const TEXT_KEY: &str = "#text";
/// Key holding the concatenated CDATA content of an element.
pub const CDATA_KEY: &str = "#cdata";
/// Prefix of attribute keys.
pub const ATTRIBUTE_PREFIX: char = '@';

#[derive(Clone, Debug)]
pub enum Node {
    Object(Object),
    Literal(Literal),
    Array(Array),
}

#[derive(Clone, Debug, Default)]
pub struct Object {
    pub properties: Properties,
    pub position: Position,
}

#[derive(Clone, Debug, Default)]
pub struct Literal {
    pub value: String,
    pub position: Position,
}

#[derive(Clone, Debug, Default)]
pub struct Array {
    pub items: Vec<Node>,
    pub position: Position,
}

impl Node {
    #[inline]
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Node::Object(object) => object.position,
            Node::Literal(literal) => literal.position,
            Node::Array(array) => array.position,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Literal(literal) => Some(&literal.value),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(array) => Some(&array.items),
            _ => None,
        }
    }

    /// Looks up a property of an object node.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object()?.properties.get(key)
    }

    /// Returns every node and its descendants to the reuse pool.
    #[inline]
    pub fn release(self) {
        pool::release(self);
    }
}

impl Object {
    #[must_use]
    pub fn new(position: Position) -> Self {
        Self {
            properties: pool::take_properties(),
            position,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.properties.get(key)
    }

    /// The value of attribute `name`, without the `@` prefix.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.properties
            .get(format!("{ATTRIBUTE_PREFIX}{name}").as_str())
            .and_then(Node::as_str)
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.get(TEXT_KEY).and_then(Node::as_str)
    }

    #[inline]
    #[must_use]
    pub fn cdata(&self) -> Option<&str> {
        self.get(CDATA_KEY).and_then(Node::as_str)
    }

    /// Child elements, excluding attributes and character data.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.properties
            .iter()
            .filter(|(key, _)| is_child_key(key))
            .map(|(key, node)| (key.as_str(), node))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Adds a child element, promoting an existing same-named child to an
    /// [`Array`] on the second occurrence.
    pub fn insert_child(&mut self, name: String, child: Node) {
        match self.properties.entry(name) {
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(child);
            }
            hashbrown::hash_map::Entry::Occupied(mut entry) => match entry.get_mut() {
                Node::Array(array) => array.items.push(child),
                existing => {
                    let position = existing.position();
                    let first = std::mem::replace(existing, Node::Literal(Literal::default()));
                    let mut items = pool::take_items();
                    items.push(first);
                    items.push(child);
                    *existing = Node::Array(Array { items, position });
                }
            },
        }
    }
}

impl Literal {
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, position: Position) -> Self {
        Self {
            value: value.into(),
            position,
        }
    }
}

impl From<Object> for Node {
    #[inline]
    fn from(value: Object) -> Self {
        Node::Object(value)
    }
}

impl From<Literal> for Node {
    #[inline]
    fn from(value: Literal) -> Self {
        Node::Literal(value)
    }
}

impl From<Array> for Node {
    #[inline]
    fn from(value: Array) -> Self {
        Node::Array(value)
    }
}

#[inline]
#[must_use]
pub(crate) fn is_child_key(key: &str) -> bool {
    !key.starts_with(ATTRIBUTE_PREFIX) && !key.starts_with('#')
}
