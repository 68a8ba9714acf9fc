#![doc = include_str!("../README.md")]

mod compare;
mod decode;
mod encode;
mod error;
pub mod escape;
mod fast;
mod parser;
mod pool;
mod registry;
mod render;
#[cfg(feature = "serde")]
mod serde_support;
mod shape;
mod stream;
mod tags;
mod token;
mod tokenizer;
mod tree;
mod value;
mod writer;

use std::io::Read;

pub use error::*;
pub use parser::{MAX_DEPTH, Parser};
pub use pool::{MAX_POOLED_BUFFER, release};
pub use registry::Registry;
pub use render::{RenderSettings, render, render_indented, render_with_settings, render_value};
pub use shape::{
    ArrayShape, CustomShape, Dynamic, DynReflect, Field, MapShape, MarshalXml, PointerShape,
    Reflect, ScalarKind, ScalarShape, SequenceShape, Shape, StructShape, TypeRef, UnmarshalXml,
};
pub use stream::{DEFAULT_CHUNK_SIZE, Stream};
pub use tags::{FieldInfo, FieldRole};
pub use token::{Position, Token, TokenKind};
pub use tokenizer::Tokenizer;
pub use tree::{ATTRIBUTE_PREFIX, Array, CDATA_KEY, Literal, Node, Object, Properties, TEXT_KEY};
pub use value::{Map, Value, from_native_value, to_native_value};

/// Parses a document into a tree rooted at its root element.
///
/// # Errors
///
/// Returns the first syntax error, with its position.
pub fn parse(xml: impl AsRef<[u8]>) -> Result<Node> {
    let xml = xml.as_ref();
    log::trace!("parsing {} bytes into a tree", xml.len());
    Parser::from_tokenizer(Tokenizer::from_slice(xml))?.parse_document()
}

/// Parses a document read incrementally from `reader`.
///
/// # Errors
///
/// Returns the first syntax error, or the error of a failed read.
pub fn parse_reader<R: Read>(reader: R) -> Result<Node> {
    Parser::from_reader(reader)?.parse_document()
}

/// Checks that `xml` is a well-formed document without building a tree.
///
/// Accepts and rejects exactly the same documents as [`parse`].
///
/// # Errors
///
/// Returns the first syntax error, with its byte offset.
pub fn validate(xml: impl AsRef<[u8]>) -> Result<()> {
    let xml = xml.as_ref();
    log::trace!("validating {} bytes", xml.len());
    fast::validate(Stream::from_slice(xml))
}

/// Checks a document read incrementally from `reader`.
///
/// # Errors
///
/// See [`validate`]. Read failures are reported as [`Error::Io`].
pub fn validate_reader<R: Read>(reader: R) -> Result<()> {
    fast::validate(Stream::from_reader(reader))
}

/// Decodes a document straight into the native value of its root element.
///
/// The result equals `to_native_value(&parse(xml)?)`.
///
/// # Errors
///
/// See [`validate`].
pub fn parse_value(xml: impl AsRef<[u8]>) -> Result<Value> {
    let xml = xml.as_ref();
    log::trace!("decoding {} bytes into a native value", xml.len());
    fast::decode(Stream::from_slice(xml))
}

/// # Errors
///
/// See [`validate_reader`].
pub fn parse_value_reader<R: Read>(reader: R) -> Result<Value> {
    fast::decode(Stream::from_reader(reader))
}

/// Marshals `value` compactly using the global [`Registry`].
///
/// # Errors
///
/// See [`Registry::marshal`].
pub fn marshal<T: Reflect>(value: &T) -> Result<Vec<u8>> {
    Registry::global().marshal(value)
}

/// Marshals `value` with every element on its own line, each line starting
/// with `prefix` followed by one `indent` per nesting level.
///
/// # Errors
///
/// See [`Registry::marshal`].
pub fn marshal_indented<T: Reflect>(value: &T, prefix: &str, indent: &str) -> Result<Vec<u8>> {
    Registry::global().marshal_with_settings(value, &RenderSettings::indented(prefix, indent))
}

/// # Errors
///
/// See [`Registry::marshal`].
pub fn marshal_with_settings<T: Reflect>(value: &T, settings: &RenderSettings<'_>) -> Result<Vec<u8>> {
    Registry::global().marshal_with_settings(value, settings)
}

/// Decodes `xml` into `target` using the global [`Registry`].
///
/// # Errors
///
/// See [`Registry::unmarshal`].
pub fn unmarshal<T: Reflect>(xml: impl AsRef<[u8]>, target: &mut T) -> Result<()> {
    Registry::global().unmarshal(xml.as_ref(), target)
}
