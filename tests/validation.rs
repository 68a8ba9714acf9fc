use std::io::{self, Read};

use indoc::indoc;
use xmlshape::{Error, MAX_DEPTH, Node, SyntaxErrorKind, Value};

const VALID: &[&str] = &[
    "<a/>",
    "<a></a>",
    "  <a/>  ",
    r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#,
    "<!-- before --> <a>t</a> <!-- after -->",
    r#"<a x='1' y="2"><b/><![CDATA[<not a tag>]]></a>"#,
    "<a>one<!-- c -->two</a>",
    "<a>&amp;&lt;&unknown;</a>",
    "<a>AT&amp;T R&D &#32;&#x41;</a>",
    r#"<a v="x &amp; y & z"/>"#,
    r#"<a v="say \"hi\"" w='it\'s'/>"#,
    "<a><b><c><d/></c></b><b/></a>",
    "<a>\u{e9}t\u{e9}</a>",
];

const INVALID: &[&str] = &[
    "",
    "text",
    "<a>",
    "<a></b>",
    "<a/><b/>",
    "<a/>trailing",
    "<a x=1/>",
    "<a x/>",
    r#"<a x="1/>"#,
    r#"<a v="abc></a>"#,
    "<a><!-- </a>",
    "<a><![CDATA[</a>",
    "<?xml version='1.0'",
    "<a><?pi?></a>",
    "</a>",
    "<>",
    "< a/>",
    "<a></ a>",
    "<!-- c --><?xml version='1.0'?><a/>",
];

#[test]
fn both_paths_accept_valid_documents() {
    for text in VALID {
        assert!(xmlshape::validate(text).is_ok(), "validate rejected {text:?}");
        assert!(xmlshape::parse(text).is_ok(), "parse rejected {text:?}");
        assert!(xmlshape::parse_value(text).is_ok(), "parse_value rejected {text:?}");
    }
}

#[test]
fn both_paths_reject_invalid_documents() {
    for text in INVALID {
        assert!(xmlshape::validate(text).is_err(), "validate accepted {text:?}");
        assert!(xmlshape::parse(text).is_err(), "parse accepted {text:?}");
        assert!(xmlshape::parse_value(text).is_err(), "parse_value accepted {text:?}");
    }
}

fn kind(result: xmlshape::Result<()>) -> SyntaxErrorKind {
    match result {
        Err(Error::Syntax(err)) => err.kind,
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn shared_error_kinds() {
    for text in [
        "<a><b></a></b>",
        "<a/> x",
        "<a x/>",
        "<a>text",
        r#"<a v="abc></a>"#,
        "<a v='abc/>",
    ] {
        assert_eq!(
            kind(xmlshape::validate(text)),
            kind(xmlshape::parse(text).map(drop)),
            "{text:?}"
        );
    }
}

#[test]
fn errors_carry_positions() {
    let text = indoc! {"
        <a>
          <b></c>
        </a>
    "};
    let Err(Error::Syntax(err)) = xmlshape::validate(text) else {
        panic!("should fail");
    };
    assert_eq!(err.position.offset, 11);
    assert_eq!(err.position.row, 2);
    assert_eq!(
        err.kind,
        SyntaxErrorKind::MismatchedTags {
            open: "b".into(),
            close: "c".into()
        }
    );
}

#[test]
fn unterminated_attribute_values() {
    let text = r#"<a v="abc></a>"#;
    for result in [xmlshape::validate(text), xmlshape::parse(text).map(drop)] {
        let Err(Error::Syntax(err)) = result else {
            panic!("should fail");
        };
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedString);
        assert_eq!(err.position.offset, 5);
    }
}

/// Text and attribute values as decoded by both parse paths.
fn decoded(text: &str, key: &str) -> (String, String) {
    let tree = xmlshape::parse(text).unwrap();
    let from_tree = tree.get(key).and_then(Node::as_str).unwrap().to_owned();
    let value = xmlshape::parse_value(text).unwrap();
    let from_value = value.get(key).and_then(Value::as_str).unwrap().to_owned();
    (from_tree, from_value)
}

#[test]
fn entity_references_are_decoded() {
    let cases = [
        ("<a>&amp;&lt;&gt;&quot;&apos;</a>", "&<>\"'"),
        ("<a>&#65;&#x42;&#x1F600;</a>", "AB\u{1F600}"),
        ("<a>AT&amp;T &lt;3 R&D</a>", "AT&T <3 R&D"),
        ("<a>&amp;&lt;&unknown;</a>", "&<&unknown;"),
        ("<a>&nbsp;&amp;&</a>", "&nbsp;&&"),
        ("<a>&#32;x&#10;</a>", " x\n"),
    ];
    for (text, expected) in cases {
        let (tree, value) = decoded(text, "#text");
        assert_eq!(tree, expected, "{text:?}");
        assert_eq!(value, expected, "{text:?}");
    }

    let attributes = [
        (r#"<a v="x &amp; y &quot;q&quot; & z"/>"#, r#"x & y "q" & z"#),
        (r#"<a v="&#65;&unknown;&lt;"/>"#, "A&unknown;<"),
        (r#"<a v=" &#32;pad "/>"#, "  pad "),
    ];
    for (text, expected) in attributes {
        let (tree, value) = decoded(text, "@v");
        assert_eq!(tree, expected, "{text:?}");
        assert_eq!(value, expected, "{text:?}");
    }
}

#[test]
fn nesting_limit() {
    let ok = format!("{}{}", "<a>".repeat(MAX_DEPTH), "</a>".repeat(MAX_DEPTH));
    assert!(xmlshape::validate(&ok).is_ok());
    let tree = xmlshape::parse(&ok).unwrap();
    let value = xmlshape::parse_value(&ok).unwrap();
    assert_eq!(tree, value);
    let rendered = xmlshape::render(&tree);
    assert_eq!(xmlshape::parse(&rendered).unwrap(), tree);

    let deep = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
    assert_eq!(kind(xmlshape::validate(&deep)), SyntaxErrorKind::NestingTooDeep(MAX_DEPTH));
    assert_eq!(
        kind(xmlshape::parse(&deep).map(drop)),
        SyntaxErrorKind::NestingTooDeep(MAX_DEPTH)
    );
}

#[test]
fn invalid_utf8_is_rejected() {
    let input: &[u8] = b"<a>\xff</a>";
    assert_eq!(kind(xmlshape::validate(input)), SyntaxErrorKind::InvalidUtf8);
    assert!(xmlshape::parse(input).is_err());
}

/// Hands out at most one byte per read.
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some((&first, rest)) = self.0.split_first() else {
            return Ok(0);
        };
        let Some(slot) = buf.first_mut() else {
            return Ok(0);
        };
        *slot = first;
        self.0 = rest;
        Ok(1)
    }
}

#[test]
fn readers_agree_with_slices() {
    for text in VALID.iter().chain(INVALID) {
        let bytes = text.as_bytes();
        assert_eq!(
            xmlshape::validate_reader(Trickle(bytes)).is_ok(),
            xmlshape::validate(bytes).is_ok(),
            "{text:?}"
        );
        assert_eq!(
            xmlshape::parse_reader(Trickle(bytes)).ok(),
            xmlshape::parse(bytes).ok(),
            "{text:?}"
        );
        assert_eq!(
            xmlshape::parse_value_reader(Trickle(bytes)).ok(),
            xmlshape::parse_value(bytes).ok(),
            "{text:?}"
        );
    }
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk on fire"))
    }
}

#[test]
fn read_failures_are_reported() {
    let err = xmlshape::validate_reader(Broken).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
    assert!(err.position().is_none());

    let err = xmlshape::validate_reader(io::Cursor::new(b"<a>").chain(Broken)).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
}
