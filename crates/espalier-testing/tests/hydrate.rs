use std::rc::Rc;

use espalier_core::{
    attrs, create_node, memo, tree_to_json, Content, Host, MountOptions, Store, TreeSource,
    Value,
};
use espalier_testing::TestBed;

fn page(store_text: &str) -> Content {
    Content::Element(create_node(
        "p",
        attrs! {"class" => "lead"},
        store_text,
    ))
}

#[test]
fn serialized_previous_tree_hydrates_without_mutations() {
    let bed = TestBed::new();
    {
        let host = bed.host();
        let mut host = host.borrow_mut();
        let p = host.create_element("p");
        host.set_attribute(p, "class", "lead").unwrap();
        let text = host.create_text("hello");
        host.insert_child(p, text, None).unwrap();
        let root = bed.root();
        host.insert_child(root, p, None).unwrap();
    }
    bed.reset_counters();

    let serialized = tree_to_json(&[page("hello")]);
    let mounted = bed
        .mount_with(
            |_: &Store| page("hello"),
            MountOptions {
                previous: Some(TreeSource::Serialized(serialized)),
                ..MountOptions::default()
            },
        )
        .unwrap();
    // The live markup matched the serialized previous tree: nothing to do.
    assert_eq!(bed.counters().total(), 0);
    assert_eq!(bed.html(), "<p class=\"lead\">hello</p>");
    drop(mounted);
}

thread_local! {
    static HEADER_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn header(_: &Store, key: &Value) -> Vec<Content> {
    HEADER_CALLS.with(|c| c.set(c.get() + 1));
    vec![Content::Element(create_node("h1", key.to_text(), ()))]
}

#[test]
fn memoized_header_survives_unrelated_updates() {
    HEADER_CALLS.with(|c| c.set(0));
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| {
            vec![
                memo(header, store.get("title").unwrap_or(Value::Null)),
                Content::Element(create_node("p", store.text("body"), ())),
            ]
        },
        Value::map([("title", "Espalier"), ("body", "v1")]),
    );
    assert_eq!(HEADER_CALLS.with(std::cell::Cell::get), 1);
    assert_eq!(bed.html(), "<h1>Espalier</h1><p>v1</p>");
    let h1 = bed.node_at(&[0]).unwrap();

    mounted.store().set("body", "v2");
    bed.flush();
    assert_eq!(HEADER_CALLS.with(std::cell::Cell::get), 1);
    assert_eq!(bed.node_at(&[0]), Some(h1));
    assert_eq!(bed.html(), "<h1>Espalier</h1><p>v2</p>");

    mounted.store().set("title", "Espalier 2");
    bed.flush();
    assert_eq!(HEADER_CALLS.with(std::cell::Cell::get), 2);
    assert_eq!(bed.html(), "<h1>Espalier 2</h1><p>v2</p>");
}

#[test]
fn patcher_round_trip_through_serialized_form() {
    let bed = TestBed::new();
    let mut first =
        espalier_core::prepare_patcher(Rc::clone(&bed.host()), bed.root(), None).unwrap();
    first.apply(vec![page("snapshot")]).unwrap();
    assert_eq!(bed.html(), "<p class=\"lead\">snapshot</p>");
    bed.reset_counters();

    // A second patcher picks up where the first left off, its previous tree
    // restored from the serialized form.
    let serialized = tree_to_json(&[page("snapshot")]);
    let mut second = espalier_core::prepare_patcher(
        Rc::clone(&bed.host()),
        bed.root(),
        Some(TreeSource::Serialized(serialized)),
    )
    .unwrap();
    second.apply(vec![page("snapshot")]).unwrap();
    assert_eq!(bed.counters().total(), 0);
    assert_eq!(bed.html(), "<p class=\"lead\">snapshot</p>");
}
