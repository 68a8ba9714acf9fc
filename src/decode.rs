//! Assigning decoded native values to typed targets.

use std::any::Any;

use crate::error::{Error, Result};
use crate::fast;
use crate::registry::Registry;
use crate::render::{self, RenderSettings};
use crate::shape::{Dynamic, Reflect, Shape, TypeRef, downcast_mut};
use crate::stream::Stream;
use crate::value::Value;

impl Registry {
    /// Decodes `xml` into `target`.
    ///
    /// Fields are matched by the keys of the decoded root element; content
    /// with no matching field is ignored, and fields with no matching content
    /// keep their current value. A type with a custom shape receives `xml`
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Fails if `xml` is not well-formed, or if the decoded content does not
    /// fit the shape of `T`.
    pub fn unmarshal<T: Reflect>(&self, xml: &[u8], target: &mut T) -> Result<()> {
        if let Shape::Custom(custom) = T::shape() {
            return (custom.unmarshal)(target, xml);
        }
        let value = fast::decode(Stream::from_slice(xml))?;
        self.decode_value(TypeRef::of::<T>(), &value, target, RenderSettings::default().root_tag)
    }

    /// Assigns `value`, the content of an element named `name`, to `target`
    /// of type `ty`.
    pub(crate) fn decode_value(
        &self,
        ty: TypeRef,
        value: &Value,
        target: &mut dyn Any,
        name: &str,
    ) -> Result<()> {
        match (ty.shape(), value) {
            (Shape::Custom(custom), _) => {
                let settings = RenderSettings {
                    root_tag: name,
                    ..RenderSettings::default()
                };
                let xml = render::render_value(value, &settings);
                (custom.unmarshal)(target, &xml)
            }
            (Shape::Dynamic, _) => {
                downcast_mut::<Dynamic>(target)?.set(value.clone());
                Ok(())
            }
            (Shape::Native, _) => {
                *downcast_mut::<Value>(target)? = value.clone();
                Ok(())
            }
            (Shape::Pointer(pointer), Value::Map(map)) if pointer.nullable && map.is_empty() => {
                (pointer.clear)(target)
            }
            (Shape::Pointer(pointer), _) => {
                let inner = (pointer.get_mut_or_init)(target)?;
                self.decode_value(pointer.target, value, inner, name)
            }
            (Shape::Scalar(scalar), Value::String(_) | Value::Map(_)) => {
                (scalar.parse)(target, value.text())
            }
            (Shape::Struct(shape), Value::Map(map)) => {
                let plan = self.plan(ty, &shape);
                for (key, item) in map {
                    let Some(&index) = plan.by_key.get(key.as_str()) else {
                        log::trace!("{}: no field for {key:?}", plan.name);
                        continue;
                    };
                    let planned = &plan.fields[index];
                    let field = planned.field;
                    field
                        .get_mut(target)
                        .and_then(|slot| self.decode_value(field.ty, item, slot, &planned.info.name))
                        .map_err(|err| err.in_field(field.name))?;
                }
                Ok(())
            }
            (Shape::Map(shape), Value::Map(map)) => {
                let Shape::Scalar(key_shape) = shape.key.shape() else {
                    return Err(Error::NonStringMapKey(shape.key.name()));
                };
                for (key, item) in map {
                    (shape.insert)(target, &mut |slot_key: &mut dyn Any, slot: &mut dyn Any| {
                        (key_shape.parse)(slot_key, key)?;
                        self.decode_value(shape.value, item, slot, key)
                    })
                    .map_err(|err| err.in_key(key))?;
                }
                Ok(())
            }
            (Shape::Sequence(sequence), _) => {
                (sequence.clear)(target)?;
                for (index, item) in items(value).iter().enumerate() {
                    let slot = (sequence.push)(target)?;
                    self.decode_value(sequence.element, item, slot, name)
                        .map_err(|err| err.at_index(index))?;
                }
                Ok(())
            }
            (Shape::Array(array), _) => {
                for (index, item) in items(value).iter().enumerate().take(array.len) {
                    if let Some(slot) = (array.get_mut)(target, index)? {
                        self.decode_value(array.element, item, slot, name)
                            .map_err(|err| err.at_index(index))?;
                    }
                }
                Ok(())
            }
            _ => Err(Error::Mismatch {
                found: value.kind(),
                expected: ty.name(),
            }),
        }
    }
}

/// The items of a list, or a single value as a list of one.
fn items(value: &Value) -> &[Value] {
    match value {
        Value::List(items) => items,
        single => std::slice::from_ref(single),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{MarshalXml, UnmarshalXml};

    #[derive(Debug, Default, PartialEq)]
    struct Order {
        id: u32,
        customer: String,
        lines: Vec<Line>,
        note: Option<String>,
        extra: Value,
    }

    crate::reflect_struct!(Order {
        id: "id,attr",
        customer,
        lines: "line",
        note: "note,omitempty",
        extra,
    });

    #[derive(Debug, Default, PartialEq)]
    struct Line {
        sku: String,
        qty: i32,
    }

    crate::reflect_struct!(Line {
        sku: "sku,attr",
        qty: ",chardata",
    });

    fn unmarshal<T: Reflect + Default>(xml: &str) -> Result<T> {
        let mut target = T::default();
        Registry::new().unmarshal(xml.as_bytes(), &mut target)?;
        Ok(target)
    }

    #[test]
    fn decodes_structs() {
        let order: Order = unmarshal(
            r#"<Order id="12">
                <customer>Ann</customer>
                <line sku="a">2</line>
                <line sku="b">5</line>
                <extra><x>1</x></extra>
                <unknown/>
            </Order>"#,
        )
        .unwrap();
        assert_eq!(order.id, 12);
        assert_eq!(order.customer, "Ann");
        assert_eq!(
            order.lines,
            [
                Line { sku: "a".into(), qty: 2 },
                Line { sku: "b".into(), qty: 5 },
            ]
        );
        assert_eq!(order.note, None);
        assert_eq!(order.extra.get("x").map(Value::text), Some("1"));
    }

    #[test]
    fn single_child_fills_a_sequence() {
        let order: Order = unmarshal(r#"<Order><line sku="z">1</line></Order>"#).unwrap();
        assert_eq!(order.lines, [Line { sku: "z".into(), qty: 1 }]);
    }

    #[test]
    fn arrays_truncate() {
        let values: [i32; 2] = unmarshal("<r><v>1</v><v>2</v><v>3</v></r>")
            .map(|map: BTreeMap<String, [i32; 2]>| map["v"])
            .unwrap();
        assert_eq!(values, [1, 2]);
    }

    #[test]
    fn maps_take_every_key() {
        let map: BTreeMap<String, String> = unmarshal(r#"<r a="1"><b>2</b></r>"#).unwrap();
        assert_eq!(map["@a"], "1");
        assert_eq!(map["b"], "2");
    }

    #[test]
    fn empty_element_clears_an_option() {
        let mut order = Order {
            note: Some("old".into()),
            ..Order::default()
        };
        Registry::new().unmarshal(b"<Order><note/></Order>", &mut order).unwrap();
        assert_eq!(order.note, None);
    }

    #[test]
    fn mismatches_name_the_field() {
        let err = unmarshal::<Order>("<Order><customer>a</customer><customer>b</customer></Order>").unwrap_err();
        let Error::Field { field, source } = err else {
            panic!("expected a field error, got {err:?}");
        };
        assert_eq!(field, "customer");
        assert!(matches!(*source, Error::Mismatch { found: "list", .. }));

        let err = unmarshal::<Order>(r#"<Order id="x"/>"#).unwrap_err();
        assert!(err.to_string().starts_with("field id: xml: invalid value \"x\""), "{err}");

        let err = unmarshal::<Order>("<Order><line><a/></line><line>x</line></Order>").unwrap_err();
        assert!(err.to_string().starts_with("field lines: index 1:"), "{err}");
    }

    #[test]
    fn syntax_errors_pass_through() {
        let err = unmarshal::<Order>("<Order>").unwrap_err();
        assert!(err.position().is_some());
    }

    #[derive(Debug, Default, PartialEq)]
    struct Raw(String);

    impl MarshalXml for Raw {
        fn marshal_xml(&self, name: &str) -> Result<Vec<u8>> {
            Ok(format!("<{name}>{}</{name}>", self.0).into_bytes())
        }
    }

    impl UnmarshalXml for Raw {
        fn unmarshal_xml(&mut self, xml: &[u8]) -> Result<()> {
            self.0 = String::from_utf8_lossy(xml).into_owned();
            Ok(())
        }
    }

    impl Reflect for Raw {
        fn shape() -> Shape {
            Shape::custom::<Self>()
        }
    }

    #[derive(Debug, Default)]
    struct Wrapper {
        raw: Raw,
    }

    crate::reflect_struct!(Wrapper { raw: "payload" });

    #[test]
    fn custom_types_receive_xml() {
        let raw: Raw = unmarshal("<any>  <b/></any>").unwrap();
        assert_eq!(raw.0, "<any>  <b/></any>");

        let wrapper: Wrapper = unmarshal(r#"<w><payload k="v"><b>1</b></payload></w>"#).unwrap();
        assert_eq!(wrapper.raw.0, r#"<payload k="v"><b>1</b></payload>"#);
    }

    #[test]
    fn dynamic_takes_the_native_value() {
        #[derive(Default)]
        struct Holder {
            any: Dynamic,
        }
        crate::reflect_struct!(Holder { any });

        let holder: Holder = unmarshal("<h><any>text</any></h>").unwrap();
        let value = holder.any.downcast_ref::<Value>().unwrap();
        assert_eq!(value.text(), "text");
    }
}
