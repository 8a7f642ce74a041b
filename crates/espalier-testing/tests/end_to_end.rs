use std::cell::Cell;
use std::rc::Rc;

use espalier_core::{attrs, create_node, listener, Content, Store, Value};
use espalier_testing::TestBed;

#[test]
fn counter_mount_update_unmount() {
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| create_node("span", store.text("count"), ()),
        Value::map([("count", 0)]),
    );
    assert_eq!(bed.html(), "<span>0</span>");

    let created = bed.counters().created;
    mounted.store().set("count", 1);
    assert_eq!(bed.html(), "<span>0</span>");
    bed.flush();
    assert_eq!(bed.html(), "<span>1</span>");
    // The span and its text node were patched, not rebuilt.
    assert_eq!(bed.counters().created, created);

    mounted.unmount();
    assert_eq!(bed.html(), "");
    mounted.store().set("count", 2);
    assert_eq!(bed.flush(), 0);
}

#[test]
fn three_mutations_one_render() {
    let bed = TestBed::new();
    let renders = Rc::new(Cell::new(0));
    let probe = Rc::clone(&renders);
    let mounted = bed.mount_with_state(
        move |store: &Store| {
            probe.set(probe.get() + 1);
            create_node(
                "p",
                format!("{} {} {}", store.text("x"), store.text("y"), store.text("z")),
                (),
            )
        },
        Value::map([("x", 0), ("y", 0), ("z", 0)]),
    );
    mounted.store().set("x", 1);
    mounted.store().set("y", 2);
    mounted.store().set("z", 3);
    bed.flush();
    assert_eq!(renders.get(), 2);
    assert_eq!(bed.html(), "<p>1 2 3</p>");
}

#[test]
fn list_growth_reuses_existing_items() {
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| {
            let labels = store.get("labels").unwrap_or(Value::Null);
            let items: Vec<Content> = match labels {
                Value::List(labels) => labels
                    .iter()
                    .map(|label| Content::Element(create_node("li", label.to_text(), ())))
                    .collect(),
                _ => Vec::new(),
            };
            create_node("ul", (), items)
        },
        Value::map([("labels", Value::list(["A", "B"]))]),
    );
    assert_eq!(bed.html(), "<ul><li>A</li><li>B</li></ul>");
    let first = bed.node_at(&[0, 0]).unwrap();
    let second = bed.node_at(&[0, 1]).unwrap();

    mounted
        .store()
        .set("labels", Value::list(["A'", "B'", "C"]));
    bed.flush();
    assert_eq!(bed.html(), "<ul><li>A'</li><li>B'</li><li>C</li></ul>");
    // The first two <li> hosts survived in place.
    assert_eq!(bed.node_at(&[0, 0]), Some(first));
    assert_eq!(bed.node_at(&[0, 1]), Some(second));
}

#[test]
fn class_and_style_composition() {
    let bed = TestBed::new();
    bed.mount(|_: &Store| {
        create_node(
            "section",
            attrs! {
                "class" => attrs! {"active" => true, "hidden" => false},
                "style" => attrs! {"marginTop" => "4px"}
            },
            (),
        )
    });
    assert_eq!(
        bed.html(),
        "<section class=\"active\" style=\"margin-top: 4px\"></section>"
    );
}

#[test]
fn rerender_with_identical_output_is_free() {
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| {
            create_node(
                "div",
                attrs! {"class" => "shell"},
                vec![
                    Content::Element(create_node("h1", "title", ())),
                    Content::Element(create_node("p", store.text("body"), ())),
                ],
            )
        },
        Value::map([("body", "text")]),
    );
    bed.reset_counters();
    mounted.request_update();
    bed.flush();
    assert_eq!(bed.counters().total(), 0);
}

#[test]
fn click_handler_drives_state() {
    let bed = TestBed::new();
    let _mounted = bed.mount_with_state(
        |store: &Store| {
            create_node(
                "button",
                attrs! {"click" => listener(|_, store| {
                    let n = store.get("n").and_then(|v| v.as_int()).unwrap_or(0);
                    store.set("n", n + 1);
                })},
                store.text("n"),
            )
        },
        Value::map([("n", 0)]),
    );
    let button = bed.node_at(&[0]).unwrap();
    assert!(bed.dispatch(button, "click"));
    bed.flush();
    assert_eq!(bed.html(), "<button>1</button>");
    bed.dispatch(button, "click");
    bed.dispatch(button, "click");
    bed.flush();
    assert_eq!(bed.html(), "<button>3</button>");
}

#[test]
fn sibling_swap_moves_instead_of_recreating() {
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| {
            let flipped = store.get("flipped") == Some(Value::Bool(true));
            let (a, b) = if flipped {
                ("aside", "main")
            } else {
                ("main", "aside")
            };
            vec![
                Content::Element(create_node(a, a, ())),
                Content::Element(create_node(b, b, ())),
            ]
        },
        Value::map([("flipped", false)]),
    );
    let main = bed.node_at(&[0]).unwrap();
    let aside = bed.node_at(&[1]).unwrap();
    bed.reset_counters();

    mounted.store().set("flipped", true);
    bed.flush();
    assert_eq!(bed.html(), "<aside>aside</aside><main>main</main>");
    assert_eq!(bed.node_at(&[0]), Some(aside));
    assert_eq!(bed.node_at(&[1]), Some(main));
    assert_eq!(bed.counters().created, 0);
    assert_eq!(bed.counters().removed, 0);
}

// Same-tag siblings have no identity beyond their tag: reordering content
// across them patches slots in place rather than moving hosts. Pinned as
// expected first-fit behavior.
#[test]
fn same_tag_reorder_updates_slots_in_place() {
    let bed = TestBed::new();
    let mounted = bed.mount_with_state(
        |store: &Store| {
            let labels = store.get("labels").unwrap_or(Value::Null);
            let items: Vec<Content> = match labels {
                Value::List(labels) => labels
                    .iter()
                    .map(|label| Content::Element(create_node("li", label.to_text(), ())))
                    .collect(),
                _ => Vec::new(),
            };
            create_node("ul", (), items)
        },
        Value::map([("labels", Value::list(["A", "B", "C"]))]),
    );
    let first = bed.node_at(&[0, 0]).unwrap();
    bed.reset_counters();

    mounted.store().set("labels", Value::list(["C", "A", "B"]));
    bed.flush();
    assert_eq!(bed.html(), "<ul><li>C</li><li>A</li><li>B</li></ul>");
    // No host moves: each <li> slot was rewritten.
    assert_eq!(bed.counters().moved, 0);
    assert_eq!(bed.node_at(&[0, 0]), Some(first));
}
