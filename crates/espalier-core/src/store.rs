//! Reactive state store.
//!
//! A [`Store`] is an `Rc`-shared handle over one owned [`Value`] tree.
//! Every structural mutation that actually changes the tree fires the bound
//! change callback exactly once, synchronously. Because the tree is singly
//! owned, replacing or deleting a sub-tree drops it; there is no tracking
//! table to prune and no interception left dangling on removed values.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// One step of a state path: a map key or a list index.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSeg {
    fn from(key: &str) -> Self {
        PathSeg::Key(key.to_owned())
    }
}

impl From<String> for PathSeg {
    fn from(key: String) -> Self {
        PathSeg::Key(key)
    }
}

impl From<usize> for PathSeg {
    fn from(index: usize) -> Self {
        PathSeg::Index(index)
    }
}

/// Anything addressable as a state path.
pub trait IntoPath {
    fn into_path(self) -> Vec<PathSeg>;
}

impl IntoPath for &str {
    fn into_path(self) -> Vec<PathSeg> {
        vec![PathSeg::from(self)]
    }
}

impl IntoPath for String {
    fn into_path(self) -> Vec<PathSeg> {
        vec![PathSeg::Key(self)]
    }
}

impl IntoPath for Vec<PathSeg> {
    fn into_path(self) -> Vec<PathSeg> {
        self
    }
}

impl<const N: usize> IntoPath for [PathSeg; N] {
    fn into_path(self) -> Vec<PathSeg> {
        self.into()
    }
}

/// Literal syntax for state paths: `path!["todos", 0, "done"]`.
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        vec![$($crate::store::PathSeg::from($seg)),*]
    };
}

struct StoreInner {
    root: RefCell<Value>,
    on_change: RefCell<Option<Box<dyn Fn()>>>,
    active: Cell<bool>,
}

#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                root: RefCell::new(initial),
                on_change: RefCell::new(None),
                active: Cell::new(true),
            }),
        }
    }

    /// A store with no change callback and no scheduler behind it, used by
    /// the state-free patcher and by tree stringification.
    pub fn detached() -> Self {
        let store = Store::new(Value::Map(IndexMap::new()));
        store.inner.active.set(false);
        store
    }

    pub(crate) fn bind(&self, on_change: impl Fn() + 'static) {
        *self.inner.on_change.borrow_mut() = Some(Box::new(on_change));
        self.inner.active.set(true);
    }

    pub(crate) fn unbind(&self) {
        self.inner.on_change.borrow_mut().take();
        self.inner.active.set(false);
    }

    /// Reads the value at `path`, deep-cloned out of the tree.
    pub fn get(&self, path: impl IntoPath) -> Option<Value> {
        let path = path.into_path();
        let root = self.inner.root.borrow();
        read_at(&root, &path).cloned()
    }

    /// Writes `value` at `path`. Fires the change callback once iff the
    /// stored value actually changes. Missing intermediate map keys are
    /// created; a list write at the list's length appends; writes beyond it
    /// are ignored with a warning.
    pub fn set(&self, path: impl IntoPath, value: impl Into<Value>) {
        let path = path.into_path();
        let value = value.into();
        let changed = write_at(&mut self.inner.root.borrow_mut(), &path, value);
        if changed {
            self.notify();
        }
    }

    /// Removes the entry at `path`. Fires only if the entry existed.
    pub fn delete(&self, path: impl IntoPath) -> bool {
        let path = path.into_path();
        let removed = delete_at(&mut self.inner.root.borrow_mut(), &path);
        if removed {
            self.notify();
        }
        removed
    }

    /// Read access to the whole tree, for render functions.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.root.borrow())
    }

    pub fn snapshot(&self) -> Value {
        self.inner.root.borrow().clone()
    }

    /// Convenience: text rendition of the value at `path` (empty for
    /// missing entries).
    pub fn text(&self, path: impl IntoPath) -> String {
        self.get(path).map(|v| v.to_text()).unwrap_or_default()
    }

    fn notify(&self) {
        if !self.inner.active.get() {
            return;
        }
        if let Some(on_change) = self.inner.on_change.borrow().as_ref() {
            on_change();
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.inner.root.borrow())
            .field("active", &self.inner.active.get())
            .finish()
    }
}

fn read_at<'a>(slot: &'a Value, path: &[PathSeg]) -> Option<&'a Value> {
    match path {
        [] => Some(slot),
        [seg, rest @ ..] => match (slot, seg) {
            (Value::Map(map), PathSeg::Key(key)) => read_at(map.get(key)?, rest),
            (Value::List(list), PathSeg::Index(index)) => read_at(list.get(*index)?, rest),
            _ => None,
        },
    }
}

fn write_at(slot: &mut Value, path: &[PathSeg], value: Value) -> bool {
    match path {
        [] => {
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        }
        [PathSeg::Key(key), rest @ ..] => match slot {
            Value::Map(map) => {
                if rest.is_empty() {
                    match map.get(key) {
                        Some(old) if *old == value => false,
                        _ => {
                            map.insert(key.clone(), value);
                            true
                        }
                    }
                } else {
                    let entry = map
                        .entry(key.clone())
                        .or_insert_with(|| Value::Map(IndexMap::new()));
                    write_at(entry, rest, value)
                }
            }
            _ => {
                log::warn!("state write through non-map value at key {key:?}");
                false
            }
        },
        [PathSeg::Index(index), rest @ ..] => match slot {
            Value::List(list) => {
                if *index < list.len() {
                    write_at(&mut list[*index], rest, value)
                } else if *index == list.len() && rest.is_empty() {
                    list.push(value);
                    true
                } else {
                    log::warn!(
                        "state write out of bounds: index {index} of {}",
                        list.len()
                    );
                    false
                }
            }
            _ => {
                log::warn!("state write through non-list value at index {index}");
                false
            }
        },
    }
}

fn delete_at(slot: &mut Value, path: &[PathSeg]) -> bool {
    match path {
        [] => false,
        [PathSeg::Key(key)] => match slot {
            Value::Map(map) => map.shift_remove(key).is_some(),
            _ => false,
        },
        [PathSeg::Index(index)] => match slot {
            Value::List(list) if *index < list.len() => {
                list.remove(*index);
                true
            }
            _ => false,
        },
        [seg, rest @ ..] => match (slot, seg) {
            (Value::Map(map), PathSeg::Key(key)) => match map.get_mut(key) {
                Some(entry) => delete_at(entry, rest),
                None => false,
            },
            (Value::List(list), PathSeg::Index(index)) => match list.get_mut(*index) {
                Some(entry) => delete_at(entry, rest),
                None => false,
            },
            _ => false,
        },
    }
}
