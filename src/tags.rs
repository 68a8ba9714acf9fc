//! Field tags: `name[,attr|,chardata|,cdata][,omitempty]`, or `-` to skip.

use std::borrow::Cow;

use crate::tree::{CDATA_KEY, TEXT_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldRole {
    /// A child element (the default).
    #[default]
    Element,
    Attribute,
    /// The text content of the enclosing element.
    CharData,
    /// The CDATA content of the enclosing element.
    CData,
}

/// Parsed tag of one struct field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// Element or attribute name. Defaults to the field name.
    pub name: Cow<'static, str>,
    pub role: FieldRole,
    pub omit_empty: bool,
    pub skip: bool,
}

impl FieldInfo {
    /// Parses `tag` for the field `field`. Unknown options are ignored, and
    /// when several role options are given the last one wins.
    #[must_use]
    pub fn parse(field: &'static str, tag: &'static str) -> Self {
        if tag == "-" {
            return Self {
                name: Cow::Borrowed(field),
                role: FieldRole::Element,
                omit_empty: false,
                skip: true,
            };
        }

        let mut parts = tag.split(',');
        let name = parts.next().unwrap_or_default();
        let mut info = Self {
            name: Cow::Borrowed(if name.is_empty() { field } else { name }),
            role: FieldRole::Element,
            omit_empty: false,
            skip: false,
        };
        for option in parts {
            match option.trim() {
                "attr" => info.role = FieldRole::Attribute,
                "chardata" => info.role = FieldRole::CharData,
                "cdata" => info.role = FieldRole::CData,
                "omitempty" => info.omit_empty = true,
                other => log::trace!("ignoring unknown option {other:?} on field {field}"),
            }
        }
        info
    }

    /// Key under which the field's content appears in a parsed element.
    #[must_use]
    pub fn key(&self) -> Cow<'static, str> {
        match self.role {
            FieldRole::Element => self.name.clone(),
            FieldRole::Attribute => Cow::Owned(format!("@{}", self.name)),
            FieldRole::CharData => Cow::Borrowed(TEXT_KEY),
            FieldRole::CData => Cow::Borrowed(CDATA_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_field_name() {
        let info = FieldInfo::parse("Title", "");
        assert_eq!(info.name, "Title");
        assert_eq!(info.role, FieldRole::Element);
        assert!(!info.omit_empty && !info.skip);
    }

    #[test]
    fn options() {
        let info = FieldInfo::parse("id", "ID,attr,omitempty");
        assert_eq!(info.name, "ID");
        assert_eq!(info.role, FieldRole::Attribute);
        assert!(info.omit_empty);
        assert_eq!(info.key(), "@ID");

        let info = FieldInfo::parse("body", ",chardata");
        assert_eq!(info.name, "body");
        assert_eq!(info.key(), "#text");

        assert_eq!(FieldInfo::parse("raw", ",cdata").key(), "#cdata");
        assert!(FieldInfo::parse("secret", "-").skip);
    }

    #[test]
    fn unknown_options_are_ignored() {
        let info = FieldInfo::parse("x", "y, attr ,bogus");
        assert_eq!(info.name, "y");
        assert_eq!(info.role, FieldRole::Attribute);
    }
}
