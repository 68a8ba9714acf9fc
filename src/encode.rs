//! Building encoder routines from shapes, and marshaling with them.

use std::any::Any;
use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::registry::{Registry, Routine, Session, routine};
use crate::render::{self, RenderSettings};
use crate::shape::{
    Dynamic, MapShape, Reflect, ScalarKind, ScalarShape, Shape, StructShape, TypeRef, downcast,
};
use crate::stream::is_valid_name;
use crate::tags::FieldRole;
use crate::value::Value;

impl Registry {
    /// Marshals `value` compactly. Structs are written as an element named
    /// after the struct, anything else as an element named `root`.
    ///
    /// # Errors
    ///
    /// Fails if `value` contains an unsupported type, a map whose keys are
    /// not strings or not valid element names, or a custom marshaler fails.
    pub fn marshal<T: Reflect>(&self, value: &T) -> Result<Vec<u8>> {
        self.marshal_with_settings(value, &RenderSettings::default())
    }

    /// Marshals `value` using the root tag and indentation in `settings`.
    ///
    /// # Errors
    ///
    /// See [`Registry::marshal`].
    pub fn marshal_with_settings<T: Reflect>(
        &self,
        value: &T,
        settings: &RenderSettings<'_>,
    ) -> Result<Vec<u8>> {
        let ty = TypeRef::of::<T>();
        let name = root_name(ty, value, settings.root_tag)?;
        let routine = self.routine(ty);
        let mut w = settings.writer();
        routine(self, &mut w, value, name)?;
        Ok(w.finish())
    }
}

/// The element name of a marshaled root: the name of the struct it points
/// to, if any.
fn root_name<'a>(ty: TypeRef, value: &dyn Any, default: &'a str) -> Result<&'a str> {
    match ty.shape() {
        Shape::Struct(shape) => Ok(shape.name),
        Shape::Pointer(pointer) => match (pointer.get)(value)? {
            Some(target) => root_name(pointer.target, target, default),
            None => Ok(default),
        },
        Shape::Dynamic => match downcast::<Dynamic>(value)?.get() {
            Some(inner) => root_name(inner.type_ref(), inner.as_any(), default),
            None => Ok(default),
        },
        _ => Ok(default),
    }
}

pub(crate) fn build(session: &mut Session<'_>, ty: TypeRef) -> Routine {
    match ty.shape() {
        Shape::Scalar(scalar) => routine(move |_, w, value, name| {
            let text = (scalar.format)(value)?;
            w.text_element(name, &text);
            Ok(())
        }),
        Shape::Pointer(pointer) => {
            let target = session.routine(pointer.target);
            routine(move |registry, w, value, name| match (pointer.get)(value)? {
                Some(inner) => target(registry, w, inner, name),
                None => {
                    w.start(name);
                    w.end(name);
                    Ok(())
                }
            })
        }
        Shape::Dynamic => routine(|registry, w, value, name| {
            match downcast::<Dynamic>(value)?.get() {
                Some(inner) => {
                    let target = registry.routine(inner.type_ref());
                    target(registry, w, inner.as_any(), name)
                }
                None => {
                    w.start(name);
                    w.end(name);
                    Ok(())
                }
            }
        }),
        Shape::Native => routine(|_, w, value, name| {
            render::write_element(w, name, downcast::<Value>(value)?);
            Ok(())
        }),
        Shape::Struct(shape) => build_struct(session, ty, &shape),
        Shape::Map(map) => build_map(session, map),
        Shape::Sequence(sequence) => {
            let element = session.routine(sequence.element);
            routine(move |registry, w, value, name| {
                for index in 0..(sequence.len)(value)? {
                    if let Some(item) = (sequence.get)(value, index)? {
                        element(registry, w, item, name).map_err(|err| err.at_index(index))?;
                    }
                }
                Ok(())
            })
        }
        Shape::Array(array) => {
            let element = session.routine(array.element);
            routine(move |registry, w, value, name| {
                for index in 0..array.len {
                    if let Some(item) = (array.get)(value, index)? {
                        element(registry, w, item, name).map_err(|err| err.at_index(index))?;
                    }
                }
                Ok(())
            })
        }
        Shape::Custom(custom) => routine(move |_, w, value, name| {
            let xml = (custom.marshal)(value, name)?;
            w.raw(&xml);
            Ok(())
        }),
        Shape::Unsupported => {
            let type_name = ty.name();
            routine(move |_, _, _, _| Err(Error::UnsupportedType(type_name)))
        }
    }
}

/// A field written as text: an attribute, character data or CDATA.
struct TextField {
    name: Cow<'static, str>,
    field: &'static crate::shape::Field,
    omit_empty: bool,
}

impl TextField {
    fn text<'a>(&self, owner: &'a dyn Any) -> Result<Option<Cow<'a, str>>> {
        let value = self.field.get(owner)?;
        let ty = self.field.ty;
        if self.omit_empty && ty.shape().is_empty(value)? {
            return Ok(None);
        }
        text_of(ty, value)
            .map(|text| text.filter(|text| !text.is_empty()))
            .map_err(|err| err.in_field(self.field.name))
    }
}

struct ChildField {
    name: Cow<'static, str>,
    field: &'static crate::shape::Field,
    shape: Shape,
    omit_empty: bool,
    routine: Routine,
}

/// Formats a scalar, following pointers and dynamic values. `None` for an
/// empty pointer.
fn text_of(ty: TypeRef, value: &dyn Any) -> Result<Option<Cow<'_, str>>> {
    match ty.shape() {
        Shape::Scalar(scalar) => (scalar.format)(value).map(Some),
        Shape::Pointer(pointer) => match (pointer.get)(value)? {
            Some(target) => text_of(pointer.target, target),
            None => Ok(None),
        },
        Shape::Dynamic => match downcast::<Dynamic>(value)?.get() {
            Some(inner) => text_of(inner.type_ref(), inner.as_any()),
            None => Ok(None),
        },
        Shape::Native => Ok(Some(Cow::Borrowed(downcast::<Value>(value)?.text()))),
        _ => Err(Error::NotText(ty.name())),
    }
}

fn build_struct(session: &mut Session<'_>, ty: TypeRef, shape: &StructShape) -> Routine {
    let plan = session.plan(ty, shape);
    let mut attributes = Vec::new();
    let mut chardata = None;
    let mut cdata = None;
    let mut children = Vec::new();

    for planned in &plan.fields {
        let field = planned.field;
        let text_field = || TextField {
            name: planned.info.name.clone(),
            field,
            omit_empty: planned.info.omit_empty,
        };
        match planned.info.role {
            FieldRole::Attribute => attributes.push(text_field()),
            FieldRole::CharData => chardata = Some(text_field()),
            FieldRole::CData => cdata = Some(text_field()),
            FieldRole::Element => children.push(ChildField {
                name: planned.info.name.clone(),
                field,
                shape: field.ty.shape(),
                omit_empty: planned.info.omit_empty,
                routine: session.routine(field.ty),
            }),
        }
    }
    attributes.sort_by(|a, b| a.name.cmp(&b.name));

    routine(move |registry, w, value, name| {
        w.start(name);
        for attribute in &attributes {
            if let Some(text) = attribute.text(value)? {
                w.attribute(&attribute.name, &text);
            }
        }
        if let Some(chardata) = &chardata {
            if let Some(text) = chardata.text(value)? {
                w.text(&text);
            }
        }
        if let Some(cdata) = &cdata {
            if let Some(text) = cdata.text(value)? {
                w.cdata(&text);
            }
        }
        for child in &children {
            let field = child.field.get(value)?;
            if child.omit_empty && child.shape.is_empty(field)? {
                continue;
            }
            (child.routine)(registry, w, field, &child.name)
                .map_err(|err| err.in_field(child.field.name))?;
        }
        w.end(name);
        Ok(())
    })
}

fn build_map(session: &mut Session<'_>, map: MapShape) -> Routine {
    let format = match map.key.shape() {
        Shape::Scalar(ScalarShape {
            kind: ScalarKind::String,
            format,
            ..
        }) => format,
        _ => {
            let key_type = map.key.name();
            return routine(move |_, _, _, _| Err(Error::NonStringMapKey(key_type)));
        }
    };
    let value_routine = session.routine(map.value);

    routine(move |registry, w, value, name| {
        let mut entries = (map.entries)(value)?
            .into_iter()
            .map(|(key, item)| -> Result<_> { Ok((format(key)?, item)) })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        w.start(name);
        for (key, item) in entries {
            if !is_valid_name(&key) {
                return Err(Error::InvalidName(key.into_owned()));
            }
            value_routine(registry, w, item, &key).map_err(|err| err.in_key(&key))?;
        }
        w.end(name);
        Ok(())
    })
}
