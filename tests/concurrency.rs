use std::sync::{Arc, Barrier};
use std::thread;

use xmlshape::{Registry, reflect_struct};

#[derive(Debug, Default, PartialEq)]
struct Node {
    id: u32,
    label: String,
    children: Vec<Node>,
}

reflect_struct!(Node {
    id: "id,attr",
    label,
    children: "node,omitempty",
});

fn sample(depth: u32) -> Node {
    Node {
        id: depth,
        label: format!("level {depth}"),
        children: if depth == 0 {
            Vec::new()
        } else {
            vec![sample(depth - 1), sample(depth - 1)]
        },
    }
}

const THREADS: usize = 8;

#[test]
fn concurrent_first_use_of_a_registry() {
    let registry = Arc::new(Registry::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let expected = Registry::new().marshal(&sample(3)).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..50)
                    .map(|_| registry.marshal(&sample(3)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for xml in handle.join().unwrap() {
            assert_eq!(xml, expected);
        }
    }
    // Node, Vec<Node> and String. The id attribute needs no encoder.
    assert_eq!(registry.encoder_count(), 3);
}

#[test]
fn concurrent_parsing_and_decoding() {
    let xml = Registry::global().marshal(&sample(4)).unwrap();
    let rendered = xmlshape::render(&xmlshape::parse(&xml).unwrap());
    let xml = Arc::new(xml);
    let rendered = Arc::new(rendered);

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let xml = Arc::clone(&xml);
            let rendered = Arc::clone(&rendered);
            thread::spawn(move || {
                for _ in 0..20 {
                    if i % 2 == 0 {
                        let tree = xmlshape::parse(xml.as_slice()).unwrap();
                        assert_eq!(&xmlshape::render(&tree), rendered.as_ref());
                        xmlshape::release(tree);
                    } else {
                        let mut node = Node::default();
                        xmlshape::unmarshal(xml.as_slice(), &mut node).unwrap();
                        assert_eq!(node, sample(4));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
