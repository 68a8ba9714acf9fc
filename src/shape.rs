//! Runtime shape descriptions used to marshal and unmarshal typed values.
//!
//! A type takes part in marshaling by implementing [`Reflect`], which
//! describes it as one of a closed set of [`Shape`]s. Built-in
//! implementations cover strings, numbers, booleans, `Option`, `Box`, `Vec`,
//! arrays, maps with string keys, [`Value`](crate::Value) and [`Dynamic`].
//! Structs are described with the [`reflect_struct!`](crate::reflect_struct)
//! macro:
//!
//! ```
//! use xmlshape::reflect_struct;
//!
//! #[derive(Default)]
//! struct Book {
//!     id: u32,
//!     title: String,
//!     notes: Vec<String>,
//! }
//!
//! reflect_struct!(Book {
//!     id: "id,attr",
//!     title,
//!     notes: "note,omitempty",
//! });
//!
//! let xml = xmlshape::marshal(&Book { id: 7, title: "Dune".into(), notes: vec![] }).unwrap();
//! assert_eq!(xml, br#"<Book id="7"><title>Dune</title></Book>"#);
//! ```

mod impls;

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{Error, Result};

/// A type with a static [`Shape`].
pub trait Reflect: Any {
    fn shape() -> Shape;
}

/// Object-safe view of a [`Reflect`] value, used for values whose type is
/// only known at runtime.
pub trait DynReflect: Any {
    fn type_ref(&self) -> TypeRef;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Reflect> DynReflect for T {
    #[inline]
    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<T>()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Identity and shape of a reflected type.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    shape: fn() -> Shape,
}

impl TypeRef {
    #[inline]
    #[must_use]
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            shape: T::shape,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

/// A value of any [`Reflect`] type, or nothing.
///
/// Marshals as its content, or as an empty element when empty. Unmarshaling
/// stores the decoded [`Value`](crate::Value).
#[derive(Default)]
pub struct Dynamic(Option<Box<dyn DynReflect>>);

impl Dynamic {
    #[must_use]
    pub fn new<T: Reflect>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&dyn DynReflect> {
        self.0.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.get()?.as_any().downcast_ref()
    }

    pub fn set<T: Reflect>(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => write!(f, "Dynamic({:?})", value.type_ref()),
            None => f.write_str("Dynamic(None)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Char,
    Bool,
    Int,
    Uint,
    Float,
}

/// The closed set of shapes the encoder and decoder dispatch on.
#[derive(Clone, Copy)]
pub enum Shape {
    /// Text, numbers and booleans.
    Scalar(ScalarShape),
    /// `Option<T>` (nullable) and `Box<T>`.
    Pointer(PointerShape),
    /// [`Dynamic`].
    Dynamic,
    /// [`Value`](crate::Value).
    Native,
    Struct(StructShape),
    Map(MapShape),
    /// Growable sequences.
    Sequence(SequenceShape),
    /// Fixed-length arrays.
    Array(ArrayShape),
    /// Types with their own [`MarshalXml`] and [`UnmarshalXml`].
    Custom(CustomShape),
    /// Types that cannot be represented as XML.
    Unsupported,
}

#[derive(Clone, Copy)]
pub struct ScalarShape {
    pub kind: ScalarKind,
    pub format: for<'a> fn(&'a dyn Any) -> Result<Cow<'a, str>>,
    pub parse: fn(&mut dyn Any, &str) -> Result<()>,
    pub is_zero: fn(&dyn Any) -> Result<bool>,
}

#[derive(Clone, Copy)]
pub struct PointerShape {
    pub target: TypeRef,
    /// Whether the pointer can be empty.
    pub nullable: bool,
    pub get: for<'a> fn(&'a dyn Any) -> Result<Option<&'a dyn Any>>,
    /// The target, created with its default value if the pointer is empty.
    pub get_mut_or_init: for<'a> fn(&'a mut dyn Any) -> Result<&'a mut dyn Any>,
    pub clear: fn(&mut dyn Any) -> Result<()>,
}

#[derive(Clone, Copy)]
pub struct StructShape {
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [Field],
}

#[derive(Clone, Copy)]
pub struct MapShape {
    pub key: TypeRef,
    pub value: TypeRef,
    pub len: fn(&dyn Any) -> Result<usize>,
    pub entries: for<'a> fn(&'a dyn Any) -> Result<Vec<(&'a dyn Any, &'a dyn Any)>>,
    /// Inserts one entry whose key and value are filled in by the callback,
    /// starting from their default values.
    pub insert: fn(&mut dyn Any, &mut dyn FnMut(&mut dyn Any, &mut dyn Any) -> Result<()>) -> Result<()>,
}

#[derive(Clone, Copy)]
pub struct SequenceShape {
    pub element: TypeRef,
    pub len: fn(&dyn Any) -> Result<usize>,
    pub get: for<'a> fn(&'a dyn Any, usize) -> Result<Option<&'a dyn Any>>,
    pub clear: fn(&mut dyn Any) -> Result<()>,
    /// Appends a default element and returns it.
    pub push: for<'a> fn(&'a mut dyn Any) -> Result<&'a mut dyn Any>,
}

#[derive(Clone, Copy)]
pub struct ArrayShape {
    pub element: TypeRef,
    pub len: usize,
    pub get: for<'a> fn(&'a dyn Any, usize) -> Result<Option<&'a dyn Any>>,
    pub get_mut: for<'a> fn(&'a mut dyn Any, usize) -> Result<Option<&'a mut dyn Any>>,
}

#[derive(Clone, Copy)]
pub struct CustomShape {
    pub marshal: fn(&dyn Any, &str) -> Result<Vec<u8>>,
    pub unmarshal: fn(&mut dyn Any, &[u8]) -> Result<()>,
}

/// Types that write their own XML.
pub trait MarshalXml {
    /// Returns one complete element. `name` is the element name the
    /// surrounding value would have used.
    ///
    /// # Errors
    ///
    /// Any error is passed through to the caller of marshal.
    fn marshal_xml(&self, name: &str) -> Result<Vec<u8>>;
}

/// Types that read their own XML.
pub trait UnmarshalXml {
    /// Receives the XML of the element this value is decoded from.
    ///
    /// # Errors
    ///
    /// Any error is passed through to the caller of unmarshal.
    fn unmarshal_xml(&mut self, xml: &[u8]) -> Result<()>;
}

impl Shape {
    /// The shape of a type with its own XML representation, for use in a
    /// [`Reflect`] implementation.
    #[must_use]
    pub fn custom<T: MarshalXml + UnmarshalXml + Any>() -> Self {
        fn marshal<T: MarshalXml + Any>(value: &dyn Any, name: &str) -> Result<Vec<u8>> {
            downcast::<T>(value)?.marshal_xml(name)
        }
        fn unmarshal<T: UnmarshalXml + Any>(value: &mut dyn Any, xml: &[u8]) -> Result<()> {
            downcast_mut::<T>(value)?.unmarshal_xml(xml)
        }
        Shape::Custom(CustomShape {
            marshal: marshal::<T>,
            unmarshal: unmarshal::<T>,
        })
    }

    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Shape::Scalar(scalar) => match scalar.kind {
                ScalarKind::String | ScalarKind::Char => "string",
                ScalarKind::Bool => "bool",
                ScalarKind::Int | ScalarKind::Uint => "integer",
                ScalarKind::Float => "float",
            },
            Shape::Pointer(_) => "pointer",
            Shape::Dynamic => "dynamic value",
            Shape::Native => "native value",
            Shape::Struct(_) => "struct",
            Shape::Map(_) => "map",
            Shape::Sequence(_) => "sequence",
            Shape::Array(_) => "array",
            Shape::Custom(_) => "custom",
            Shape::Unsupported => "unsupported",
        }
    }

    /// Whether `value` counts as empty for `omitempty`: zero numbers,
    /// `false`, empty strings and collections, and empty pointers.
    ///
    /// # Errors
    ///
    /// Fails if `value` is not of the type this shape belongs to.
    pub fn is_empty(&self, value: &dyn Any) -> Result<bool> {
        Ok(match self {
            Shape::Scalar(scalar) => (scalar.is_zero)(value)?,
            Shape::Pointer(pointer) => pointer.nullable && (pointer.get)(value)?.is_none(),
            Shape::Dynamic => downcast::<Dynamic>(value)?.is_empty(),
            Shape::Native => downcast::<crate::Value>(value)?.is_empty(),
            Shape::Map(map) => (map.len)(value)? == 0,
            Shape::Sequence(sequence) => (sequence.len)(value)? == 0,
            Shape::Array(array) => array.len == 0,
            Shape::Struct(_) | Shape::Custom(_) | Shape::Unsupported => false,
        })
    }
}

/// One struct field: its name, tag and a way to reach it.
pub struct Field {
    pub name: &'static str,
    pub tag: &'static str,
    pub ty: TypeRef,
    accessor: Box<dyn Accessor>,
}

impl Field {
    pub fn new<S, F>(
        name: &'static str,
        tag: &'static str,
        get: impl Fn(&S) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut S) -> &mut F + Send + Sync + 'static,
    ) -> Self
    where
        S: Any,
        F: Reflect,
    {
        Self {
            name,
            tag,
            ty: TypeRef::of::<F>(),
            accessor: Box::new(Lens {
                get,
                get_mut,
                marker: PhantomData,
            }),
        }
    }

    /// Borrows this field of `owner`.
    ///
    /// # Errors
    ///
    /// Fails if `owner` is not the struct this field belongs to.
    #[inline]
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Result<&'a dyn Any> {
        self.accessor.get(owner)
    }

    /// Mutably borrows this field of `owner`.
    ///
    /// # Errors
    ///
    /// Fails if `owner` is not the struct this field belongs to.
    #[inline]
    pub fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        self.accessor.get_mut(owner)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

trait Accessor: Send + Sync {
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<&'a dyn Any>;
    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<&'a mut dyn Any>;
}

struct Lens<S, F, G, M> {
    get: G,
    get_mut: M,
    marker: PhantomData<fn(&S) -> &F>,
}

impl<S, F, G, M> Accessor for Lens<S, F, G, M>
where
    S: Any,
    F: Any,
    G: Fn(&S) -> &F + Send + Sync,
    M: Fn(&mut S) -> &mut F + Send + Sync,
{
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<&'a dyn Any> {
        let field: &F = (self.get)(downcast::<S>(owner)?);
        Ok(field as &dyn Any)
    }

    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Result<&'a mut dyn Any> {
        let field: &mut F = (self.get_mut)(downcast_mut::<S>(owner)?);
        Ok(field as &mut dyn Any)
    }
}

pub(crate) fn downcast<T: Any>(value: &dyn Any) -> Result<&T> {
    value.downcast_ref().ok_or(Error::Mismatch {
        found: "value of another type",
        expected: std::any::type_name::<T>(),
    })
}

pub(crate) fn downcast_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T> {
    value.downcast_mut().ok_or(Error::Mismatch {
        found: "value of another type",
        expected: std::any::type_name::<T>(),
    })
}

/// Implements [`Reflect`] for a struct, listing the fields that take part in
/// marshaling. Each field may carry a tag in the form
/// `name[,attr|,chardata|,cdata][,omitempty]`, or `-` to skip it. Untagged
/// fields use their own name as the element name.
///
/// Field types must implement [`Reflect`].
#[macro_export]
macro_rules! reflect_struct {
    (@tag) => {
        ""
    };
    (@tag $tag:literal) => {
        $tag
    };
    ($ty:ident { $($field:ident $(: $tag:literal)?),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn shape() -> $crate::Shape {
                static FIELDS: ::std::sync::LazyLock<::std::vec::Vec<$crate::Field>> =
                    ::std::sync::LazyLock::new(|| {
                        ::std::vec![$(
                            $crate::Field::new(
                                ::core::stringify!($field),
                                $crate::reflect_struct!(@tag $($tag)?),
                                |value: &$ty| &value.$field,
                                |value: &mut $ty| &mut value.$field,
                            ),
                        )*]
                    });
                $crate::Shape::Struct($crate::StructShape {
                    name: ::core::stringify!($ty),
                    fields: FIELDS.as_slice(),
                })
            }
        }
    };
}
