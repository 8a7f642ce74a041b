//! String-encoded trees and state.
//!
//! The serialized tree form is a listener-free JSON mirror of the abstract
//! model; it covers the `previous` argument of mounting and the
//! stringification path. Stringification is not reconciliation and carries
//! no server-rendering correctness guarantees.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::memo::MemoTable;
use crate::node::{AttrMap, AttrValue, Content, Element};
use crate::patch::rendered_attr;
use crate::store::Store;
use crate::value::Value;

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum SerialContent {
    Text(String),
    Element(SerialElement),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerialElement {
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<SerialContent>>,
}

/// Parses a serialized tree. Errors bubble to the caller, which falls back
/// to deriving ground truth from the live host.
pub fn parse_tree(json: &str) -> Result<Vec<Content>, serde_json::Error> {
    let nodes: Vec<SerialContent> = serde_json::from_str(json)?;
    Ok(nodes.into_iter().map(content_from_serial).collect())
}

/// Serializes a tree, dropping listener attributes and resolving memo
/// descriptors with a detached store.
pub fn tree_to_json(nodes: &[Content]) -> String {
    let store = Store::detached();
    let mut memo = MemoTable::new();
    let serial: Vec<SerialContent> = nodes
        .iter()
        .flat_map(|node| serial_from_content(node, &store, &mut memo))
        .collect();
    serde_json::to_string(&serial).unwrap_or_else(|_| "[]".to_owned())
}

pub fn parse_state(json: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(json)
}

fn content_from_serial(node: SerialContent) -> Content {
    match node {
        SerialContent::Text(text) => Content::Text(text),
        SerialContent::Element(el) => {
            let attrs = el.attrs.map(|attrs| {
                attrs
                    .into_iter()
                    .map(|(name, value)| (name, attr_from_value(value)))
                    .collect::<AttrMap>()
            });
            let children = el
                .children
                .map(|children| children.into_iter().map(content_from_serial).collect());
            Content::Element(Element {
                tag: el.tag.to_ascii_lowercase(),
                attrs,
                children,
            })
        }
    }
}

fn serial_from_content(
    node: &Content,
    store: &Store,
    memo: &mut MemoTable,
) -> Vec<SerialContent> {
    match node {
        Content::Text(text) => vec![SerialContent::Text(text.clone())],
        Content::Element(el) => {
            let attrs = el.attrs.as_ref().map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|(name, value)| {
                        attr_to_value(value).map(|v| (name.clone(), v))
                    })
                    .collect::<IndexMap<String, Value>>()
            });
            let children = el.children.as_ref().map(|children| {
                children
                    .iter()
                    .flat_map(|child| serial_from_content(child, store, memo))
                    .collect()
            });
            vec![SerialContent::Element(SerialElement {
                tag: el.tag.clone(),
                attrs,
                children,
            })]
        }
        Content::Memo(m) => {
            let resolved = memo.resolve(m, store);
            resolved
                .iter()
                .flat_map(|child| serial_from_content(child, store, memo))
                .collect()
        }
    }
}

fn attr_from_value(value: Value) -> AttrValue {
    match value {
        Value::Null => AttrValue::Bool(false),
        Value::Bool(b) => AttrValue::Bool(b),
        Value::Int(i) => AttrValue::Num(i as f64),
        Value::Float(f) => AttrValue::Num(f),
        Value::Stamp(ms) => AttrValue::Num(ms as f64),
        Value::Str(s) => AttrValue::Str(s),
        Value::List(items) => {
            AttrValue::List(items.into_iter().map(|v| v.to_text()).collect())
        }
        Value::Map(map) => AttrValue::Map(
            map.into_iter()
                .map(|(name, v)| (name, attr_from_value(v)))
                .collect(),
        ),
    }
}

fn attr_to_value(value: &AttrValue) -> Option<Value> {
    match value {
        AttrValue::Listener(_) => None,
        AttrValue::Bool(b) => Some(Value::Bool(*b)),
        AttrValue::Num(n) => Some(Value::Float(*n)),
        AttrValue::Str(s) => Some(Value::Str(s.clone())),
        AttrValue::List(items) => Some(Value::List(
            items.iter().map(|s| Value::Str(s.clone())).collect(),
        )),
        AttrValue::Map(map) => Some(Value::Map(
            map.iter()
                .filter_map(|(name, v)| attr_to_value(v).map(|v| (name.clone(), v)))
                .collect(),
        )),
    }
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Renders a tree to markup. Memo descriptors resolve against a detached
/// store; listener attributes are dropped.
pub fn render_to_string(nodes: &[Content]) -> String {
    let store = Store::detached();
    let mut memo = MemoTable::new();
    let mut out = String::new();
    write_nodes(&mut out, nodes, &store, &mut memo);
    out
}

fn write_nodes(out: &mut String, nodes: &[Content], store: &Store, memo: &mut MemoTable) {
    for node in nodes {
        match node {
            Content::Text(text) => out.push_str(&escape(text)),
            Content::Element(el) => write_element(out, el, store, memo),
            Content::Memo(m) => {
                let resolved = memo.resolve(m, store);
                write_nodes(out, &resolved, store, memo);
            }
        }
    }
}

fn write_element(out: &mut String, el: &Element, store: &Store, memo: &mut MemoTable) {
    out.push('<');
    out.push_str(&el.tag);
    if let Some(attrs) = &el.attrs {
        for (name, value) in attrs {
            match rendered_attr(name, value) {
                Some(text) if text.is_empty() => {
                    out.push(' ');
                    out.push_str(name);
                }
                Some(text) => {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape(&text));
                    out.push('"');
                }
                None => {}
            }
        }
    }
    out.push('>');
    if VOID_TAGS.contains(&el.tag.as_str()) {
        return;
    }
    if let Some(children) = &el.children {
        write_nodes(out, children, store, memo);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn escape(text: &str) -> String {
    if !text.contains(['&', '<', '>', '"']) {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::node::{create_node, memo};

    #[test]
    fn parses_a_serialized_tree() {
        let json = r#"[
            {"tag": "UL", "attrs": {"class": "menu"}, "children": [
                {"tag": "li", "children": ["one"]},
                {"tag": "li", "children": ["two"]}
            ]},
            "tail"
        ]"#;
        let tree = parse_tree(json).unwrap();
        assert_eq!(tree.len(), 2);
        match &tree[0] {
            Content::Element(el) => {
                assert_eq!(el.tag, "ul");
                assert_eq!(
                    el.attrs.as_ref().unwrap().get("class"),
                    Some(&AttrValue::Str("menu".into()))
                );
                assert_eq!(el.children.as_ref().unwrap().len(), 2);
            }
            other => panic!("expected element, got {other:?}"),
        }
        assert_eq!(tree[1], Content::Text("tail".into()));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_tree("not json").is_err());
        assert!(parse_state("{broken").is_err());
    }

    #[test]
    fn round_trips_listener_free_trees() {
        let tree = vec![Content::Element(create_node(
            "div",
            attrs! {"id" => "app", "hidden" => true},
            vec![Content::Text("hi".into())],
        ))];
        let json = tree_to_json(&tree);
        let back = parse_tree(&json).unwrap();
        match &back[0] {
            Content::Element(el) => {
                assert_eq!(el.tag, "div");
                assert_eq!(
                    el.attrs.as_ref().unwrap().get("id"),
                    Some(&AttrValue::Str("app".into()))
                );
                assert_eq!(
                    el.attrs.as_ref().unwrap().get("hidden"),
                    Some(&AttrValue::Bool(true))
                );
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn listeners_are_dropped_from_serial_form() {
        let tree = vec![Content::Element(create_node(
            "button",
            attrs! {"click" => crate::node::listener(|_, _| {}), "id" => "go"},
            (),
        ))];
        let json = tree_to_json(&tree);
        assert!(!json.contains("click"));
        assert!(json.contains("go"));
    }

    #[test]
    fn renders_markup_with_composed_attributes() {
        let tree = vec![Content::Element(create_node(
            "div",
            attrs! {
                "class" => attrs! {"active" => true, "hidden" => false},
                "style" => attrs! {"marginTop" => "4px"}
            },
            vec![
                Content::Element(create_node("br", (), ())),
                Content::Text("a < b".into()),
            ],
        ))];
        assert_eq!(
            render_to_string(&tree),
            "<div class=\"active\" style=\"margin-top: 4px\"><br>a &lt; b</div>"
        );
    }

    #[test]
    fn renders_memo_content() {
        fn chunk(_: &Store, key: &Value) -> Vec<Content> {
            vec![Content::Element(create_node("i", key.to_text(), ()))]
        }
        let tree = vec![memo(chunk, "deep")];
        assert_eq!(render_to_string(&tree), "<i>deep</i>");
    }
}
