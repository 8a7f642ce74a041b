//! Abstract tree model: the caller-facing description of desired UI.
//!
//! Descriptors are immutable by convention: they are built fresh on every
//! render, diffed against the previous render's tree, and discarded. One
//! [`Element`] corresponds to zero or one host element at a time.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::store::Store;
use crate::value::Value;

/// Ordered attribute mapping for one element.
pub type AttrMap = IndexMap<String, AttrValue>;

/// Event payload handed to listeners together with the reactive store.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(name: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// User event handler, invoked as `(event, store)` by the dispatch boundary.
pub type ListenerFn = Rc<dyn Fn(&Event, &Store)>;

/// Wraps a closure into a listener-valued attribute.
pub fn listener(f: impl Fn(&Event, &Store) + 'static) -> AttrValue {
    AttrValue::Listener(Rc::new(f))
}

/// Attribute values: scalars, class/style composites, nested maps, listeners.
#[derive(Clone)]
pub enum AttrValue {
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<String>),
    Map(IndexMap<String, AttrValue>),
    Listener(ListenerFn),
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Num(a), AttrValue::Num(b)) => a == b,
            (AttrValue::Str(a), AttrValue::Str(b)) => a == b,
            (AttrValue::List(a), AttrValue::List(b)) => a == b,
            (AttrValue::Map(a), AttrValue::Map(b)) => a == b,
            // Listener identity, never structure.
            (AttrValue::Listener(a), AttrValue::Listener(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "Bool({b})"),
            AttrValue::Num(n) => write!(f, "Num({n})"),
            AttrValue::Str(s) => write!(f, "Str({s:?})"),
            AttrValue::List(items) => f.debug_tuple("List").field(items).finish(),
            AttrValue::Map(map) => f.debug_tuple("Map").field(map).finish(),
            AttrValue::Listener(_) => write!(f, "Listener(..)"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Num(f64::from(n))
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Num(n as f64)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Num(n)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(items: Vec<String>) -> Self {
        AttrValue::List(items)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(items: Vec<&str>) -> Self {
        AttrValue::List(items.into_iter().map(str::to_owned).collect())
    }
}

impl From<IndexMap<String, AttrValue>> for AttrValue {
    fn from(map: IndexMap<String, AttrValue>) -> Self {
        AttrValue::Map(map)
    }
}

/// One host element to render: tag, optional attributes, optional children.
///
/// `children: None` (no children specified) is distinct from
/// `Some(vec![])` (explicitly childless); both are valid leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Option<AttrMap>,
    pub children: Option<Vec<Content>>,
}

/// A deferred, cacheable render keyed by function identity plus a deep-equal
/// comparison key.
///
/// `render` is a plain `fn` pointer on purpose: its address is stable across
/// renders, which is what makes the cache lookup meaningful. Data the render
/// depends on travels through `key`.
#[derive(Clone)]
pub struct Memo {
    pub render: MemoRender,
    pub key: Value,
}

pub type MemoRender = fn(&Store, &Value) -> Vec<Content>;

impl PartialEq for Memo {
    fn eq(&self, other: &Self) -> bool {
        self.render as usize == other.render as usize && self.key == other.key
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("render", &(self.render as usize as *const ()))
            .field("key", &self.key)
            .finish()
    }
}

/// Sum type over everything a children sequence may contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Element(Element),
    Memo(Memo),
}

/// Second/third argument to [`create_node`], after `Into` conversion.
pub enum NodeArg {
    Empty,
    Attrs(AttrMap),
    Nodes(Vec<Content>),
}

impl From<()> for NodeArg {
    fn from(_: ()) -> Self {
        NodeArg::Empty
    }
}

impl From<AttrMap> for NodeArg {
    fn from(attrs: AttrMap) -> Self {
        NodeArg::Attrs(attrs)
    }
}

impl From<&str> for NodeArg {
    fn from(text: &str) -> Self {
        NodeArg::Nodes(vec![Content::Text(text.to_owned())])
    }
}

impl From<String> for NodeArg {
    fn from(text: String) -> Self {
        NodeArg::Nodes(vec![Content::Text(text)])
    }
}

impl From<Element> for NodeArg {
    fn from(el: Element) -> Self {
        NodeArg::Nodes(vec![Content::Element(el)])
    }
}

impl From<Content> for NodeArg {
    fn from(node: Content) -> Self {
        NodeArg::Nodes(vec![node])
    }
}

impl From<Vec<Content>> for NodeArg {
    fn from(nodes: Vec<Content>) -> Self {
        NodeArg::Nodes(nodes)
    }
}

/// Builds an element descriptor, disambiguating the second argument.
///
/// A content-shaped second argument (string, node, node sequence) is
/// reinterpreted as children and attributes are absent; the third argument is
/// ignored in that case. Tags are ASCII-lowercased. No deeper validation;
/// malformed input is a programmer error and passes through.
pub fn create_node(
    tag: &str,
    second: impl Into<NodeArg>,
    third: impl Into<NodeArg>,
) -> Element {
    let tag = tag.to_ascii_lowercase();
    let (attrs, children) = match (second.into(), third.into()) {
        (NodeArg::Attrs(attrs), NodeArg::Nodes(children)) => (Some(attrs), Some(children)),
        (NodeArg::Attrs(attrs), _) => (Some(attrs), None),
        (NodeArg::Nodes(children), _) => (None, Some(children)),
        (NodeArg::Empty, NodeArg::Nodes(children)) => (None, Some(children)),
        (NodeArg::Empty, _) => (None, None),
    };
    Element {
        tag,
        attrs,
        children,
    }
}

/// Builds a memoized sub-tree node. See [`Memo`] for the identity rules.
pub fn memo(render: MemoRender, key: impl Into<Value>) -> Content {
    Content::Memo(Memo {
        render,
        key: key.into(),
    })
}

/// Conversion from render-function results into a children sequence.
pub trait IntoTree {
    fn into_tree(self) -> Vec<Content>;
}

impl IntoTree for Vec<Content> {
    fn into_tree(self) -> Vec<Content> {
        self
    }
}

impl IntoTree for Content {
    fn into_tree(self) -> Vec<Content> {
        vec![self]
    }
}

impl IntoTree for Element {
    fn into_tree(self) -> Vec<Content> {
        vec![Content::Element(self)]
    }
}

impl IntoTree for String {
    fn into_tree(self) -> Vec<Content> {
        vec![Content::Text(self)]
    }
}

impl IntoTree for &str {
    fn into_tree(self) -> Vec<Content> {
        vec![Content::Text(self.to_owned())]
    }
}

/// Literal syntax for [`AttrMap`] values.
#[macro_export]
macro_rules! attrs {
    () => { $crate::node::AttrMap::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::node::AttrMap::new();
        $(
            map.insert(
                ::std::string::String::from($name),
                $crate::node::AttrValue::from($value),
            );
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_case_normalized() {
        let el = create_node("DIV", (), ());
        assert_eq!(el.tag, "div");
        assert!(el.attrs.is_none());
        assert!(el.children.is_none());
    }

    #[test]
    fn second_argument_as_attributes() {
        let el = create_node("input", attrs! {"type" => "text"}, ());
        assert!(el.children.is_none());
        let attrs = el.attrs.unwrap();
        assert_eq!(attrs.get("type"), Some(&AttrValue::Str("text".into())));
    }

    #[test]
    fn content_second_argument_becomes_children() {
        let el = create_node("p", "hello", ());
        assert!(el.attrs.is_none());
        assert_eq!(el.children, Some(vec![Content::Text("hello".into())]));
    }

    #[test]
    fn bare_child_is_wrapped_into_a_sequence() {
        let inner = create_node("span", (), ());
        let el = create_node("div", inner.clone(), ());
        assert_eq!(el.children, Some(vec![Content::Element(inner)]));
    }

    #[test]
    fn explicit_empty_children_stay_distinct_from_absent() {
        let absent = create_node("ul", (), ());
        let empty = create_node("ul", (), Vec::<Content>::new());
        assert!(absent.children.is_none());
        assert_eq!(empty.children, Some(vec![]));
    }

    #[test]
    fn attrs_then_children() {
        let el = create_node("li", attrs! {"class" => "row"}, "item");
        assert!(el.attrs.is_some());
        assert_eq!(el.children, Some(vec![Content::Text("item".into())]));
    }

    #[test]
    fn listener_attrs_compare_by_identity() {
        let a = listener(|_, _| {});
        let b = a.clone();
        let c = listener(|_, _| {});
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
