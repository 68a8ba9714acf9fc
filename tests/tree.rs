use indoc::indoc;
use xmlshape::{Node, Position, RenderSettings, TokenKind, Tokenizer, Value};

const CATALOG: &str = indoc! {r#"
    <?xml version="1.0"?>
    <!-- weekly catalog -->
    <catalog updated="2024-05-01">
        <book id="b1" lang='en'>
            <title>Dune</title>
            <price>9.99</price>
        </book>
        <book id="b2">
            <title>Fish &amp; Chips</title>
            <blurb><![CDATA[<b>bold</b> claims]]></blurb>
        </book>
        <owner/>
    </catalog>
"#};

#[test]
fn parse_builds_keyed_tree() {
    let tree = xmlshape::parse(CATALOG).unwrap();
    assert_eq!(tree.get("@updated").and_then(Node::as_str), Some("2024-05-01"));

    let books = tree.get("book").and_then(Node::as_array).unwrap();
    assert_eq!(books.len(), 2);
    let first = books[0].as_object().unwrap();
    assert_eq!(first.attribute("id"), Some("b1"));
    assert_eq!(first.attribute("lang"), Some("en"));
    assert_eq!(
        first.get("title").and_then(|t| t.get("#text")).and_then(Node::as_str),
        Some("Dune")
    );

    let second = &books[1];
    assert_eq!(
        second.get("title").and_then(|t| t.get("#text")).and_then(Node::as_str),
        Some("Fish & Chips")
    );
    assert_eq!(
        second.get("blurb").and_then(|b| b.get("#cdata")).and_then(Node::as_str),
        Some("<b>bold</b> claims")
    );
    assert!(tree.get("owner").and_then(Node::as_object).is_some_and(|o| o.is_empty()));
}

#[test]
fn positions_point_into_the_source() {
    let tree = xmlshape::parse(CATALOG).unwrap();
    let catalog = tree.position();
    assert_eq!(catalog.row, 3);
    assert_eq!(catalog.column, 1);
    assert_eq!(&CATALOG[catalog.offset..catalog.offset + 8], "<catalog");

    let owner = tree.get("owner").unwrap().position();
    assert_eq!(owner.row, 12);
    assert_eq!(owner.column, 5);
}

#[test]
fn render_round_trip() {
    let tree = xmlshape::parse(CATALOG).unwrap();
    let rendered = xmlshape::render(&tree);
    let reparsed = xmlshape::parse(&rendered).unwrap();
    assert_eq!(reparsed, tree);
    assert_eq!(xmlshape::render(&reparsed), rendered);
}

#[test]
fn indented_rendering() {
    let tree = xmlshape::parse(r#"<r k="v"><a>1</a><b><c/></b></r>"#).unwrap();
    let xml = String::from_utf8(xmlshape::render_indented(&tree, "> ", "  ")).unwrap();
    assert_eq!(
        xml,
        indoc! {r#"
            > <root k="v">
            >   <a>1</a>
            >   <b>
            >     <c/>
            >   </b>
            > </root>"#}
    );
    assert_eq!(xmlshape::parse(xml.replace("> ", "")).unwrap(), tree);
}

#[test]
fn render_settings() {
    let tree = xmlshape::parse("<x><y>1</y></x>").unwrap();
    let settings = RenderSettings {
        root_tag: "doc",
        ..RenderSettings::indented("", "\t")
    };
    assert_eq!(
        xmlshape::render_with_settings(&tree, &settings),
        b"<doc>\n\t<y>1</y>\n</doc>"
    );
}

#[test]
fn native_values_match_the_tree() {
    let tree = xmlshape::parse(CATALOG).unwrap();
    let value = xmlshape::to_native_value(&tree);
    assert_eq!(value, xmlshape::parse_value(CATALOG).unwrap());
    assert_eq!(tree, value);

    let books = value.get("book").and_then(Value::as_list).unwrap();
    assert_eq!(books[0].get("@id").and_then(Value::as_str), Some("b1"));

    let rebuilt = xmlshape::from_native_value(value.clone()).unwrap();
    assert_eq!(rebuilt, tree);
    assert_eq!(rebuilt.position(), Position::default());
    assert_eq!(xmlshape::render(&rebuilt), xmlshape::render(&tree));
}

#[test]
fn invalid_native_values() {
    let err = xmlshape::from_native_value(Value::from(vec![Value::from("a")])).unwrap_err();
    assert!(matches!(err, xmlshape::Error::InvalidNative(_)), "{err:?}");
}

#[test]
fn released_trees_are_reused() {
    for _ in 0..3 {
        let tree = xmlshape::parse(CATALOG).unwrap();
        let copy = tree.clone();
        xmlshape::release(tree);
        assert_eq!(xmlshape::parse(CATALOG).unwrap(), copy);
    }
}

#[test]
fn tokenizer_reports_every_token() {
    let mut tokenizer = Tokenizer::new(r#"<a k="v">t</a>"#);
    let mut kinds = Vec::new();
    loop {
        let token = tokenizer.next_token().unwrap();
        if token.kind == TokenKind::Eof {
            break;
        }
        kinds.push(token.kind);
    }
    assert_eq!(
        kinds,
        [
            TokenKind::TagOpen,
            TokenKind::Name,
            TokenKind::Name,
            TokenKind::Equals,
            TokenKind::String,
            TokenKind::TagClose,
            TokenKind::Text,
            TokenKind::EndTagOpen,
            TokenKind::Name,
            TokenKind::TagClose,
        ]
    );
}
