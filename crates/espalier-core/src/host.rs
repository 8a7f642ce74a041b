//! Host-tree abstraction.
//!
//! The engine consumes from its environment only the ability to create,
//! remove and mutate DOM-like elements and to attach/detach event listeners;
//! [`Host`] is that seam. [`MemoryHost`] is the bundled in-memory
//! implementation backing tests and headless use, keeping its nodes in a
//! slab of `Option` slots.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::node::{AttrMap, AttrValue, Content, Element, Event};
use crate::selector::SelectorSpec;

pub type HostId = usize;

/// Handler installed on a host node; already wrapped by the engine's
/// dispatch boundary.
pub type HostHandler = Rc<dyn Fn(&Event)>;

/// Direct property assignment targets (`value`, `checked`).
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { id: HostId },
    NotAnElement { id: HostId },
    BadIndex { id: HostId, index: usize },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host node {id} missing"),
            HostError::NotAnElement { id } => write!(f, "host node {id} is not an element"),
            HostError::BadIndex { id, index } => {
                write!(f, "host node {id} has no child at index {index}")
            }
        }
    }
}

impl std::error::Error for HostError {}

/// DOM-like collaborator interface consumed by reconciliation.
pub trait Host {
    fn create_element(&mut self, tag: &str) -> HostId;
    fn create_text(&mut self, text: &str) -> HostId;

    /// Tag of an element node; `None` for text nodes and missing ids.
    fn tag(&self, id: HostId) -> Option<String>;
    /// Text content of a text node; `None` for elements and missing ids.
    fn text(&self, id: HostId) -> Option<String>;
    fn set_text(&mut self, id: HostId, text: &str) -> Result<(), HostError>;

    fn attributes(&self, id: HostId) -> Vec<(String, String)>;
    fn set_attribute(&mut self, id: HostId, name: &str, value: &str) -> Result<(), HostError>;
    fn remove_attribute(&mut self, id: HostId, name: &str) -> Result<(), HostError>;
    fn set_property(&mut self, id: HostId, name: &str, value: PropValue)
        -> Result<(), HostError>;

    fn child_count(&self, id: HostId) -> usize;
    fn child_at(&self, id: HostId, index: usize) -> Option<HostId>;
    /// Inserts `child` under `parent`; `None` appends. A child already
    /// attached elsewhere is detached first.
    fn insert_child(
        &mut self,
        parent: HostId,
        child: HostId,
        index: Option<usize>,
    ) -> Result<(), HostError>;
    fn move_child(&mut self, parent: HostId, from: usize, to: usize) -> Result<(), HostError>;
    /// Removes the child at `index` together with its subtree.
    fn remove_child(&mut self, parent: HostId, index: usize) -> Result<(), HostError>;

    fn add_listener(
        &mut self,
        id: HostId,
        event: &str,
        handler: HostHandler,
    ) -> Result<(), HostError>;
    fn remove_listener(&mut self, id: HostId, event: &str) -> Result<(), HostError>;

    /// Simple selector query; hosts without one return `None`.
    fn select(&self, selector: &str) -> Option<HostId> {
        let _ = selector;
        None
    }
}

/// Mutation tally kept by [`MemoryHost`]; the idempotence tests key off it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCounters {
    pub created: usize,
    pub removed: usize,
    pub moved: usize,
    pub attr_writes: usize,
    pub text_writes: usize,
    pub listener_changes: usize,
}

impl HostCounters {
    pub fn total(&self) -> usize {
        self.created
            + self.removed
            + self.moved
            + self.attr_writes
            + self.text_writes
            + self.listener_changes
    }
}

enum MemNode {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        props: HashMap<String, PropValue>,
        listeners: HashMap<String, HostHandler>,
        children: Vec<HostId>,
        parent: Option<HostId>,
    },
    Text {
        text: String,
        parent: Option<HostId>,
    },
}

/// In-memory host tree.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemNode>>,
    counters: HostCounters,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live element count, detached nodes included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counters(&self) -> HostCounters {
        self.counters.clone()
    }

    pub fn reset_counters(&mut self) {
        self.counters = HostCounters::default();
    }

    fn node(&self, id: HostId) -> Result<&MemNode, HostError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: HostId) -> Result<&mut MemNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn alloc(&mut self, node: MemNode) -> HostId {
        self.counters.created += 1;
        self.nodes.push(Some(node));
        self.nodes.len() - 1
    }

    fn detach(&mut self, child: HostId) {
        let parent = match self.nodes.get(child).and_then(Option::as_ref) {
            Some(MemNode::Element { parent, .. }) | Some(MemNode::Text { parent, .. }) => *parent,
            None => None,
        };
        if let Some(parent) = parent {
            if let Some(Some(MemNode::Element { children, .. })) = self.nodes.get_mut(parent) {
                children.retain(|&id| id != child);
            }
        }
        match self.nodes.get_mut(child).and_then(Option::as_mut) {
            Some(MemNode::Element { parent, .. }) | Some(MemNode::Text { parent, .. }) => {
                *parent = None;
            }
            None => {}
        }
    }

    fn free_subtree(&mut self, id: HostId) {
        if let Some(Some(MemNode::Element { children, .. })) = self.nodes.get_mut(id) {
            let children = std::mem::take(children);
            for child in children {
                self.free_subtree(child);
            }
        }
        if let Some(slot) = self.nodes.get_mut(id) {
            *slot = None;
        }
    }

    /// Invokes the handler attached to `id` for `event.name`. Returns
    /// whether a handler ran. Handlers must not call back into this host.
    pub fn dispatch(&self, id: HostId, event: &Event) -> bool {
        let handler = match self.node(id) {
            Ok(MemNode::Element { listeners, .. }) => listeners.get(&event.name).cloned(),
            _ => None,
        };
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn listener_names(&self, id: HostId) -> Vec<String> {
        match self.node(id) {
            Ok(MemNode::Element { listeners, .. }) => {
                let mut names: Vec<String> = listeners.keys().cloned().collect();
                names.sort();
                names
            }
            _ => Vec::new(),
        }
    }

    pub fn property(&self, id: HostId, name: &str) -> Option<PropValue> {
        match self.node(id) {
            Ok(MemNode::Element { props, .. }) => props.get(name).cloned(),
            _ => None,
        }
    }

    pub fn attribute(&self, id: HostId, name: &str) -> Option<String> {
        match self.node(id) {
            Ok(MemNode::Element { attrs, .. }) => attrs.get(name).cloned(),
            _ => None,
        }
    }

    /// Markup rendition of a node's subtree, for assertions and debugging.
    pub fn to_html(&self, id: HostId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Markup rendition of a node's children only.
    pub fn inner_html(&self, id: HostId) -> String {
        let mut out = String::new();
        if let Ok(MemNode::Element { children, .. }) = self.node(id) {
            for &child in children {
                self.write_html(child, &mut out);
            }
        }
        out
    }

    fn write_html(&self, id: HostId, out: &mut String) {
        match self.node(id) {
            Ok(MemNode::Text { text, .. }) => out.push_str(text),
            Ok(MemNode::Element {
                tag,
                attrs,
                children,
                ..
            }) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(" {name}=\"{value}\""));
                    }
                }
                out.push('>');
                for &child in children {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
            Err(_) => {}
        }
    }

    fn matches(&self, id: HostId, spec: &SelectorSpec) -> bool {
        let MemNode::Element { tag, attrs, .. } = (match self.node(id) {
            Ok(node) => node,
            Err(_) => return false,
        }) else {
            return false;
        };
        if let Some(want) = &spec.tag {
            if tag != want {
                return false;
            }
        }
        if let Some(want) = &spec.id {
            if attrs.get("id") != Some(want) {
                return false;
            }
        }
        if !spec.classes.is_empty() {
            let classes = attrs.get("class").map(String::as_str).unwrap_or("");
            let have: Vec<&str> = classes.split_whitespace().collect();
            if !spec.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        for (name, value) in &spec.attrs {
            match (attrs.get(name), value) {
                (Some(have), Some(want)) if have == want => {}
                (Some(_), None) => {}
                _ => return false,
            }
        }
        true
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str) -> HostId {
        self.alloc(MemNode::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: IndexMap::new(),
            props: HashMap::new(),
            listeners: HashMap::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn create_text(&mut self, text: &str) -> HostId {
        self.alloc(MemNode::Text {
            text: text.to_owned(),
            parent: None,
        })
    }

    fn tag(&self, id: HostId) -> Option<String> {
        match self.node(id) {
            Ok(MemNode::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    fn text(&self, id: HostId) -> Option<String> {
        match self.node(id) {
            Ok(MemNode::Text { text, .. }) => Some(text.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, id: HostId, new_text: &str) -> Result<(), HostError> {
        match self.node_mut(id)? {
            MemNode::Text { text, .. } => *text = new_text.to_owned(),
            MemNode::Element { .. } => return Err(HostError::NotAnElement { id }),
        }
        self.counters.text_writes += 1;
        Ok(())
    }

    fn attributes(&self, id: HostId) -> Vec<(String, String)> {
        match self.node(id) {
            Ok(MemNode::Element { attrs, .. }) => attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_attribute(&mut self, id: HostId, name: &str, value: &str) -> Result<(), HostError> {
        match self.node_mut(id)? {
            MemNode::Element { attrs, .. } => {
                attrs.insert(name.to_owned(), value.to_owned());
            }
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id }),
        }
        self.counters.attr_writes += 1;
        Ok(())
    }

    fn remove_attribute(&mut self, id: HostId, name: &str) -> Result<(), HostError> {
        let removed = match self.node_mut(id)? {
            MemNode::Element { attrs, .. } => attrs.shift_remove(name).is_some(),
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id }),
        };
        if removed {
            self.counters.attr_writes += 1;
        }
        Ok(())
    }

    fn set_property(
        &mut self,
        id: HostId,
        name: &str,
        value: PropValue,
    ) -> Result<(), HostError> {
        match self.node_mut(id)? {
            MemNode::Element { props, .. } => {
                props.insert(name.to_owned(), value);
                Ok(())
            }
            MemNode::Text { .. } => Err(HostError::NotAnElement { id }),
        }
    }

    fn child_count(&self, id: HostId) -> usize {
        match self.node(id) {
            Ok(MemNode::Element { children, .. }) => children.len(),
            _ => 0,
        }
    }

    fn child_at(&self, id: HostId, index: usize) -> Option<HostId> {
        match self.node(id) {
            Ok(MemNode::Element { children, .. }) => children.get(index).copied(),
            _ => None,
        }
    }

    fn insert_child(
        &mut self,
        parent: HostId,
        child: HostId,
        index: Option<usize>,
    ) -> Result<(), HostError> {
        self.node(child)?;
        self.detach(child);
        let count = self.child_count(parent);
        let index = index.unwrap_or(count);
        match self.node_mut(parent)? {
            MemNode::Element { children, .. } => {
                if index > children.len() {
                    return Err(HostError::BadIndex { id: parent, index });
                }
                children.insert(index, child);
            }
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id: parent }),
        }
        match self.node_mut(child)? {
            MemNode::Element { parent: p, .. } | MemNode::Text { parent: p, .. } => {
                *p = Some(parent);
            }
        }
        Ok(())
    }

    fn move_child(&mut self, parent: HostId, from: usize, to: usize) -> Result<(), HostError> {
        let moved = match self.node_mut(parent)? {
            MemNode::Element { children, .. } => {
                if from >= children.len() || to >= children.len() {
                    let index = from.max(to);
                    return Err(HostError::BadIndex { id: parent, index });
                }
                if from != to {
                    let child = children.remove(from);
                    children.insert(to, child);
                    true
                } else {
                    false
                }
            }
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id: parent }),
        };
        if moved {
            self.counters.moved += 1;
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: HostId, index: usize) -> Result<(), HostError> {
        let child = match self.node_mut(parent)? {
            MemNode::Element { children, .. } => {
                if index >= children.len() {
                    return Err(HostError::BadIndex { id: parent, index });
                }
                children.remove(index)
            }
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id: parent }),
        };
        self.free_subtree(child);
        self.counters.removed += 1;
        Ok(())
    }

    fn add_listener(
        &mut self,
        id: HostId,
        event: &str,
        handler: HostHandler,
    ) -> Result<(), HostError> {
        match self.node_mut(id)? {
            MemNode::Element { listeners, .. } => {
                listeners.insert(event.to_owned(), handler);
            }
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id }),
        }
        self.counters.listener_changes += 1;
        Ok(())
    }

    fn remove_listener(&mut self, id: HostId, event: &str) -> Result<(), HostError> {
        let removed = match self.node_mut(id)? {
            MemNode::Element { listeners, .. } => listeners.remove(event).is_some(),
            MemNode::Text { .. } => return Err(HostError::NotAnElement { id }),
        };
        if removed {
            self.counters.listener_changes += 1;
        }
        Ok(())
    }

    fn select(&self, selector: &str) -> Option<HostId> {
        let spec = SelectorSpec::parse(selector);
        (0..self.nodes.len()).find(|&id| self.matches(id, &spec))
    }
}

/// Derives an abstract children sequence from a host element's live
/// subtree; the ground truth for first mounts and deserialization
/// fallbacks.
pub(crate) fn derive_children<H: Host + ?Sized>(host: &H, parent: HostId) -> Vec<Content> {
    let mut out = Vec::new();
    for index in 0..host.child_count(parent) {
        let Some(id) = host.child_at(parent, index) else {
            continue;
        };
        if let Some(tag) = host.tag(id) {
            let attrs: AttrMap = host
                .attributes(id)
                .into_iter()
                .map(|(name, value)| (name, AttrValue::Str(value)))
                .collect();
            let children = derive_children(host, id);
            out.push(Content::Element(Element {
                tag,
                attrs: if attrs.is_empty() { None } else { Some(attrs) },
                children: if children.is_empty() {
                    None
                } else {
                    Some(children)
                },
            }));
        } else {
            out.push(Content::Text(host.text(id).unwrap_or_default()));
        }
    }
    out
}
