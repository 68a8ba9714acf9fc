#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let validated = xmlshape::validate(data).is_ok();
    let parsed = xmlshape::parse(data);
    assert_eq!(validated, parsed.is_ok());

    let decoded = xmlshape::parse_value(data);
    assert_eq!(validated, decoded.is_ok());

    if let (Ok(tree), Ok(value)) = (parsed, decoded) {
        assert_eq!(tree, value);
        let rendered = xmlshape::render(&tree);
        assert_eq!(xmlshape::parse(&rendered).ok(), Some(tree));
    }
});
