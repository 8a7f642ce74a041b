//! Render-output memoization, two generations deep.
//!
//! Entries are keyed by the render function's address and guarded by deep
//! equality of the opaque memo key. After every completed render+reconcile
//! pass the current generation becomes the previous one and the stale
//! generation is dropped, so the cache holds exactly the memo descriptors
//! the latest render used. No TTL, no size limit.

use ahash::AHashMap;

use crate::node::{Content, Memo, MemoRender};
use crate::store::Store;
use crate::value::Value;

pub(crate) struct MemoEntry {
    #[allow(dead_code)]
    pub(crate) render: MemoRender,
    pub(crate) key: Value,
    pub(crate) content: Vec<Content>,
}

#[derive(Default)]
pub(crate) struct MemoTable {
    current: AHashMap<usize, MemoEntry>,
    previous: AHashMap<usize, MemoEntry>,
}

impl MemoTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resolves a memo descriptor to its content sequence.
    ///
    /// Cache hits return a deep clone, never the cached instances: the
    /// returned sequence gets spliced into the new tree and mutated by
    /// reconciliation bookkeeping.
    pub(crate) fn resolve(&mut self, memo: &Memo, store: &Store) -> Vec<Content> {
        let id = memo.render as usize;
        if let Some(entry) = self.current.get(&id) {
            if entry.key == memo.key {
                return entry.content.clone();
            }
        }
        if let Some(entry) = self.previous.get(&id) {
            if entry.key == memo.key {
                let content = entry.content.clone();
                self.current.insert(
                    id,
                    MemoEntry {
                        render: memo.render,
                        key: memo.key.clone(),
                        content: content.clone(),
                    },
                );
                return content;
            }
        }
        let content = (memo.render)(store, &memo.key);
        self.current.insert(
            id,
            MemoEntry {
                render: memo.render,
                key: memo.key.clone(),
                content: content.clone(),
            },
        );
        content
    }

    /// Rotates generations at the end of an update pass.
    pub(crate) fn swap(&mut self) {
        self.previous = std::mem::take(&mut self.current);
    }

    pub(crate) fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{create_node, Content};
    use std::cell::Cell;

    thread_local! {
        static CALLS: Cell<usize> = const { Cell::new(0) };
    }

    fn row(_: &Store, key: &Value) -> Vec<Content> {
        CALLS.with(|c| c.set(c.get() + 1));
        vec![Content::Element(create_node("li", key.to_text(), ()))]
    }

    fn other(_: &Store, _: &Value) -> Vec<Content> {
        CALLS.with(|c| c.set(c.get() + 1));
        vec![Content::Text("other".into())]
    }

    fn memo_of(render: MemoRender, key: impl Into<Value>) -> Memo {
        Memo {
            render,
            key: key.into(),
        }
    }

    #[test]
    fn equal_key_skips_the_render_across_generations() {
        CALLS.with(|c| c.set(0));
        let store = Store::detached();
        let mut table = MemoTable::new();
        let first = table.resolve(&memo_of(row, Value::list([1, 2])), &store);
        table.swap();
        let second = table.resolve(&memo_of(row, Value::list([1, 2])), &store);
        assert_eq!(CALLS.with(Cell::get), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn unequal_key_re_invokes() {
        CALLS.with(|c| c.set(0));
        let store = Store::detached();
        let mut table = MemoTable::new();
        table.resolve(&memo_of(row, Value::list([1, 2])), &store);
        table.swap();
        table.resolve(&memo_of(row, Value::list([1, 3])), &store);
        assert_eq!(CALLS.with(Cell::get), 2);
    }

    #[test]
    fn distinct_functions_do_not_share_entries() {
        CALLS.with(|c| c.set(0));
        let store = Store::detached();
        let mut table = MemoTable::new();
        table.resolve(&memo_of(row, 1), &store);
        table.resolve(&memo_of(other, 1), &store);
        assert_eq!(CALLS.with(Cell::get), 2);
    }

    #[test]
    fn hits_return_fresh_instances() {
        let store = Store::detached();
        let mut table = MemoTable::new();
        let mut first = table.resolve(&memo_of(row, 7), &store);
        table.swap();
        // Mutate the returned sequence the way reconciliation would.
        first.clear();
        let second = table.resolve(&memo_of(row, 7), &store);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn unused_entries_drop_after_two_swaps() {
        CALLS.with(|c| c.set(0));
        let store = Store::detached();
        let mut table = MemoTable::new();
        table.resolve(&memo_of(row, 1), &store);
        table.swap();
        // A pass that does not use `row` at all.
        table.swap();
        table.resolve(&memo_of(row, 1), &store);
        assert_eq!(CALLS.with(Cell::get), 2);
    }
}
