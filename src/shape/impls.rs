//! [`Reflect`] implementations for standard library types.

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::HashMap as StdHashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::mpsc;

use super::{
    ArrayShape, Dynamic, MapShape, PointerShape, Reflect, ScalarKind, ScalarShape, SequenceShape,
    Shape, TypeRef, downcast, downcast_mut,
};
use crate::error::{Error, Result};
use crate::value::Value;

type HashbrownMap<K, V, S> = hashbrown::HashMap<K, V, S>;

trait Scalar: Reflect + Sized {
    const KIND: ScalarKind;
    fn format(&self) -> Cow<'_, str>;
    fn parse(text: &str) -> Option<Self>;
    fn is_zero(&self) -> bool;
}

fn scalar_shape<T: Scalar>() -> Shape {
    fn format<T: Scalar>(value: &dyn Any) -> Result<Cow<'_, str>> {
        Ok(downcast::<T>(value)?.format())
    }
    fn parse<T: Scalar>(value: &mut dyn Any, text: &str) -> Result<()> {
        let parsed = T::parse(text).ok_or_else(|| Error::InvalidScalar {
            value: text.to_owned(),
            expected: type_name::<T>(),
        })?;
        *downcast_mut::<T>(value)? = parsed;
        Ok(())
    }
    fn is_zero<T: Scalar>(value: &dyn Any) -> Result<bool> {
        Ok(downcast::<T>(value)?.is_zero())
    }

    Shape::Scalar(ScalarShape {
        kind: T::KIND,
        format: format::<T>,
        parse: parse::<T>,
        is_zero: is_zero::<T>,
    })
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn format(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }

    fn parse(text: &str) -> Option<Self> {
        Some(text.to_owned())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Scalar for char {
    const KIND: ScalarKind = ScalarKind::Char;

    fn format(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let c = chars.next()?;
        chars.next().is_none().then_some(c)
    }

    fn is_zero(&self) -> bool {
        *self == '\0'
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn format(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "true" } else { "false" })
    }

    fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

macro_rules! impl_numbers {
    ($kind:ident, $zero:literal: $($ty:ty),*) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn format(&self) -> Cow<'_, str> {
                Cow::Owned(self.to_string())
            }

            fn parse(text: &str) -> Option<Self> {
                text.trim().parse().ok()
            }

            #[allow(clippy::float_cmp)]
            fn is_zero(&self) -> bool {
                *self == $zero
            }
        }
    )*};
}

impl_numbers!(Int, 0: i8, i16, i32, i64, i128, isize);
impl_numbers!(Uint, 0: u8, u16, u32, u64, u128, usize);
impl_numbers!(Float, 0.0: f32, f64);

macro_rules! impl_scalar_reflect {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn shape() -> Shape {
                scalar_shape::<Self>()
            }
        }
    )*};
}

impl_scalar_reflect!(
    String, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl<T: Reflect + Default> Reflect for Option<T> {
    fn shape() -> Shape {
        fn get<T: Reflect>(value: &dyn Any) -> Result<Option<&dyn Any>> {
            Ok(downcast::<Option<T>>(value)?
                .as_ref()
                .map(|target| target as &dyn Any))
        }
        fn get_mut_or_init<T: Reflect + Default>(value: &mut dyn Any) -> Result<&mut dyn Any> {
            let target = downcast_mut::<Option<T>>(value)?.get_or_insert_with(T::default);
            Ok(target as &mut dyn Any)
        }
        fn clear<T: Reflect>(value: &mut dyn Any) -> Result<()> {
            *downcast_mut::<Option<T>>(value)? = None;
            Ok(())
        }

        Shape::Pointer(PointerShape {
            target: TypeRef::of::<T>(),
            nullable: true,
            get: get::<T>,
            get_mut_or_init: get_mut_or_init::<T>,
            clear: clear::<T>,
        })
    }
}

impl<T: Reflect + Default> Reflect for Box<T> {
    fn shape() -> Shape {
        fn get<T: Reflect>(value: &dyn Any) -> Result<Option<&dyn Any>> {
            let target: &T = downcast::<Box<T>>(value)?;
            Ok(Some(target as &dyn Any))
        }
        fn get_mut<T: Reflect>(value: &mut dyn Any) -> Result<&mut dyn Any> {
            let target: &mut T = downcast_mut::<Box<T>>(value)?;
            Ok(target as &mut dyn Any)
        }
        fn clear<T: Reflect + Default>(value: &mut dyn Any) -> Result<()> {
            **downcast_mut::<Box<T>>(value)? = T::default();
            Ok(())
        }

        Shape::Pointer(PointerShape {
            target: TypeRef::of::<T>(),
            nullable: false,
            get: get::<T>,
            get_mut_or_init: get_mut::<T>,
            clear: clear::<T>,
        })
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn shape() -> Shape {
        fn len<T: Reflect>(value: &dyn Any) -> Result<usize> {
            Ok(downcast::<Vec<T>>(value)?.len())
        }
        fn get<T: Reflect>(value: &dyn Any, index: usize) -> Result<Option<&dyn Any>> {
            Ok(downcast::<Vec<T>>(value)?
                .get(index)
                .map(|item| item as &dyn Any))
        }
        fn clear<T: Reflect>(value: &mut dyn Any) -> Result<()> {
            downcast_mut::<Vec<T>>(value)?.clear();
            Ok(())
        }
        fn push<T: Reflect + Default>(value: &mut dyn Any) -> Result<&mut dyn Any> {
            let items = downcast_mut::<Vec<T>>(value)?;
            let index = items.len();
            items.push(T::default());
            Ok(&mut items[index] as &mut dyn Any)
        }

        Shape::Sequence(SequenceShape {
            element: TypeRef::of::<T>(),
            len: len::<T>,
            get: get::<T>,
            clear: clear::<T>,
            push: push::<T>,
        })
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> Shape {
        fn get<T: Reflect, const N: usize>(value: &dyn Any, index: usize) -> Result<Option<&dyn Any>> {
            Ok(downcast::<[T; N]>(value)?
                .get(index)
                .map(|item| item as &dyn Any))
        }
        fn get_mut<T: Reflect, const N: usize>(
            value: &mut dyn Any,
            index: usize,
        ) -> Result<Option<&mut dyn Any>> {
            Ok(downcast_mut::<[T; N]>(value)?
                .get_mut(index)
                .map(|item| item as &mut dyn Any))
        }

        Shape::Array(ArrayShape {
            element: TypeRef::of::<T>(),
            len: N,
            get: get::<T, N>,
            get_mut: get_mut::<T, N>,
        })
    }
}

trait MapLike: Any {
    type Key: Reflect + Default;
    type Value: Reflect + Default;

    fn len(&self) -> usize;
    fn entry_refs(&self) -> Vec<(&dyn Any, &dyn Any)>;
    fn put(&mut self, key: Self::Key, value: Self::Value);
}

fn map_shape<M: MapLike>() -> Shape {
    fn len<M: MapLike>(value: &dyn Any) -> Result<usize> {
        Ok(downcast::<M>(value)?.len())
    }
    fn entries<M: MapLike>(value: &dyn Any) -> Result<Vec<(&dyn Any, &dyn Any)>> {
        Ok(downcast::<M>(value)?.entry_refs())
    }
    fn insert<M: MapLike>(
        value: &mut dyn Any,
        fill: &mut dyn FnMut(&mut dyn Any, &mut dyn Any) -> Result<()>,
    ) -> Result<()> {
        let map = downcast_mut::<M>(value)?;
        let mut key = M::Key::default();
        let mut item = M::Value::default();
        fill(&mut key, &mut item)?;
        map.put(key, item);
        Ok(())
    }

    Shape::Map(MapShape {
        key: TypeRef::of::<M::Key>(),
        value: TypeRef::of::<M::Value>(),
        len: len::<M>,
        entries: entries::<M>,
        insert: insert::<M>,
    })
}

macro_rules! impl_map {
    ($map:ident<K, V $(, $hasher:ident)?> where K: $($key_bound:path),+) => {
        impl<K, V $(, $hasher)?> MapLike for $map<K, V $(, $hasher)?>
        where
            K: Reflect + Default $(+ $key_bound)+,
            V: Reflect + Default,
            $($hasher: BuildHasher + Default + 'static,)?
        {
            type Key = K;
            type Value = V;

            fn len(&self) -> usize {
                <$map<K, V $(, $hasher)?>>::len(self)
            }

            fn entry_refs(&self) -> Vec<(&dyn Any, &dyn Any)> {
                self.iter()
                    .map(|(key, value)| (key as &dyn Any, value as &dyn Any))
                    .collect()
            }

            fn put(&mut self, key: K, value: V) {
                self.insert(key, value);
            }
        }

        impl<K, V $(, $hasher)?> Reflect for $map<K, V $(, $hasher)?>
        where
            K: Reflect + Default $(+ $key_bound)+,
            V: Reflect + Default,
            $($hasher: BuildHasher + Default + 'static,)?
        {
            fn shape() -> Shape {
                map_shape::<Self>()
            }
        }
    };
}

impl_map!(StdHashMap<K, V, S> where K: Eq, Hash);
impl_map!(HashbrownMap<K, V, S> where K: Eq, Hash);
impl_map!(BTreeMap<K, V> where K: Ord);

impl Reflect for Value {
    fn shape() -> Shape {
        Shape::Native
    }
}

impl Reflect for Dynamic {
    fn shape() -> Shape {
        Shape::Dynamic
    }
}

impl<T: 'static> Reflect for mpsc::Sender<T> {
    fn shape() -> Shape {
        Shape::Unsupported
    }
}

impl<T: 'static> Reflect for mpsc::Receiver<T> {
    fn shape() -> Shape {
        Shape::Unsupported
    }
}

impl<T: ?Sized + 'static> Reflect for *const T {
    fn shape() -> Shape {
        Shape::Unsupported
    }
}

impl<T: ?Sized + 'static> Reflect for *mut T {
    fn shape() -> Shape {
        Shape::Unsupported
    }
}
