//! Structural equality of trees. Positions are ignored, so a parsed tree
//! compares equal to one built by hand or converted from a native value.

use crate::tree::{Array, Literal, Node, Object};
use crate::value::Value;

fn node_eq(lhs: &Node, rhs: &Node) -> bool {
    match (lhs, rhs) {
        (Node::Object(lhs), Node::Object(rhs)) => object_eq(lhs, rhs),
        (Node::Literal(lhs), Node::Literal(rhs)) => lhs.value == rhs.value,
        (Node::Array(lhs), Node::Array(rhs)) => array_eq(lhs, rhs),
        _ => false,
    }
}

fn object_eq(lhs: &Object, rhs: &Object) -> bool {
    // Start by comparing lengths, because it's cheapest.
    if lhs.properties.len() != rhs.properties.len() {
        return false;
    }
    lhs.properties.iter().all(|(key, lhs_value)| {
        rhs.properties
            .get(key)
            .is_some_and(|rhs_value| node_eq(lhs_value, rhs_value))
    })
}

fn array_eq(lhs: &Array, rhs: &Array) -> bool {
    lhs.items.len() == rhs.items.len()
        && lhs.items.iter().zip(&rhs.items).all(|(lhs, rhs)| node_eq(lhs, rhs))
}

fn value_eq(node: &Node, value: &Value) -> bool {
    match (node, value) {
        (Node::Object(object), Value::Map(map)) => {
            object.properties.len() == map.len()
                && object.properties.iter().all(|(key, node)| {
                    map.get(key).is_some_and(|value| value_eq(node, value))
                })
        }
        (Node::Literal(literal), Value::String(s)) => literal.value == *s,
        (Node::Array(array), Value::List(items)) => {
            array.items.len() == items.len()
                && array.items.iter().zip(items).all(|(node, value)| value_eq(node, value))
        }
        _ => false,
    }
}

impl PartialEq for Node {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        node_eq(self, other)
    }
}

impl Eq for Node {}

impl PartialEq for Object {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        object_eq(self, other)
    }
}

impl Eq for Object {}

impl PartialEq for Literal {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Literal {}

impl PartialEq for Array {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        array_eq(self, other)
    }
}

impl Eq for Array {}

impl PartialEq<Value> for Node {
    #[inline]
    fn eq(&self, other: &Value) -> bool {
        value_eq(self, other)
    }
}

impl PartialEq<Node> for Value {
    #[inline]
    fn eq(&self, other: &Node) -> bool {
        value_eq(other, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    fn at(offset: usize) -> Position {
        Position {
            offset,
            row: 1,
            column: offset + 1,
        }
    }

    fn object(offset: usize, entries: Vec<(&str, Node)>) -> Node {
        let mut object = Object::new(at(offset));
        for (key, node) in entries {
            object.properties.insert(key.to_owned(), node);
        }
        Node::Object(object)
    }

    #[test]
    fn positions_are_ignored() {
        let a = object(0, vec![("x", Literal::new("1", at(3)).into())]);
        let b = object(9, vec![("x", Literal::new("1", at(40)).into())]);
        assert_eq!(a, b);

        let c = object(0, vec![("x", Literal::new("2", at(3)).into())]);
        assert_ne!(a, c);
        assert_ne!(a, object(0, vec![]));
    }

    #[test]
    fn arrays_compare_in_order() {
        let one = Node::from(Literal::new("1", at(0)));
        let two = Node::from(Literal::new("2", at(0)));
        let forward = Node::Array(Array {
            items: vec![one.clone(), two.clone()],
            position: at(0),
        });
        let backward = Node::Array(Array {
            items: vec![two, one],
            position: at(0),
        });
        assert_ne!(forward, backward);
    }

    #[test]
    fn against_native_values() {
        let node = object(0, vec![("x", Literal::new("1", at(3)).into())]);
        let mut map = crate::value::Map::new();
        map.insert("x".to_owned(), Value::from("1"));
        assert_eq!(node, Value::Map(map.clone()));
        assert_eq!(Value::Map(map), node);
        assert_ne!(node, Value::from("1"));
    }
}
