//! Tree reconciliation: a greedy positional diff between the previous and
//! next children sequences of one host element.
//!
//! Matching is by structural type only: two elements match when their tags
//! are equal, two text nodes match unconditionally. There is no key-based
//! identity: two same-tag siblings are "the same logical slot, updated",
//! never removed+recreated. That is what enables structural reuse without
//! keys, and it means non-adjacent reordering may produce extra host moves;
//! both are expected behavior, not defects.
//!
//! The previous sequence is consumed as a bookkeeping array (entries are
//! spliced as matches are placed) and must not be reused afterward.

use crate::host::{Host, HostError, HostId};
use crate::memo::MemoTable;
use crate::node::Content;
use crate::patch::patch_attributes;
use crate::runtime::PatchCtx;

/// Mutates `parent`'s host children in place to match `new`.
///
/// Invariant maintained across the loop: after `i` positions are processed
/// with `inserted` creations, host children `0..i` realize `new[0..i]`, the
/// first `i - inserted` entries of `prev` are the placed old nodes in new
/// order, and the remaining entry at `prev[k]` mirrors the host child at
/// `k + inserted`.
pub(crate) fn reconcile_children<H: Host + ?Sized>(
    host: &mut H,
    parent: HostId,
    new: &mut Vec<Content>,
    prev: &mut Vec<Content>,
    memo: &mut MemoTable,
    ctx: &PatchCtx,
) -> Result<(), HostError> {
    let mut inserted = 0usize;
    let mut i = 0usize;
    while i < new.len() {
        if let Content::Memo(m) = &new[i] {
            let resolved = memo.resolve(m, &ctx.store);
            // Splice in place of the descriptor and reprocess this index:
            // the spliced nodes are not assumed memo-free.
            new.splice(i..=i, resolved);
            continue;
        }

        let search_from = i - inserted;
        let matched = prev
            .iter()
            .enumerate()
            .skip(search_from)
            .find(|(_, old)| shape_matches(&new[i], old))
            .map(|(j, _)| j);

        match matched {
            Some(j) => {
                let mut old_entry = prev.remove(j);
                let from = j + inserted;
                if from != i {
                    host.move_child(parent, from, i)?;
                }
                let child = host.child_at(parent, i).ok_or(HostError::BadIndex {
                    id: parent,
                    index: i,
                })?;
                match (&mut new[i], &mut old_entry) {
                    (Content::Element(next), Content::Element(old)) => {
                        patch_attributes(
                            host,
                            child,
                            old.attrs.as_ref(),
                            next.attrs.as_ref(),
                            ctx,
                        )?;
                        let had_children = next.children.is_some();
                        let mut next_children = next.children.take().unwrap_or_default();
                        let mut old_children = old.children.take().unwrap_or_default();
                        reconcile_children(
                            host,
                            child,
                            &mut next_children,
                            &mut old_children,
                            memo,
                            ctx,
                        )?;
                        if had_children || !next_children.is_empty() {
                            next.children = Some(next_children);
                        }
                    }
                    (Content::Text(next), Content::Text(old)) => {
                        if next != old {
                            host.set_text(child, next)?;
                        }
                    }
                    // shape_matches admits no other pairing.
                    _ => {}
                }
                // Splice the consumed entry back into its placed position so
                // later searches see correct indices.
                prev.insert(i - inserted, old_entry);
            }
            None => {
                create_at(host, parent, new, i, memo, ctx)?;
                inserted += 1;
            }
        }
        i += 1;
    }

    // Surviving previous children beyond the new length sit past the end of
    // the placed region; drop them in reverse order so indices stay stable.
    let keep = new.len();
    for index in (keep..host.child_count(parent)).rev() {
        host.remove_child(parent, index)?;
    }
    Ok(())
}

fn shape_matches(new: &Content, old: &Content) -> bool {
    match (new, old) {
        (Content::Element(a), Content::Element(b)) => a.tag == b.tag,
        // Text matches text unconditionally; content equality is not
        // required for a match.
        (Content::Text(_), Content::Text(_)) => true,
        _ => false,
    }
}

/// Creates the host node for `new[i]` and inserts it at position `i`.
fn create_at<H: Host + ?Sized>(
    host: &mut H,
    parent: HostId,
    new: &mut Vec<Content>,
    i: usize,
    memo: &mut MemoTable,
    ctx: &PatchCtx,
) -> Result<(), HostError> {
    let count = host.child_count(parent);
    let position = if i < count { Some(i) } else { None };
    match &mut new[i] {
        Content::Text(text) => {
            let id = host.create_text(text);
            host.insert_child(parent, id, position)?;
        }
        Content::Element(next) => {
            let id = host.create_element(&next.tag);
            host.insert_child(parent, id, position)?;
            patch_attributes(host, id, None, next.attrs.as_ref(), ctx)?;
            let had_children = next.children.is_some();
            let mut children = next.children.take().unwrap_or_default();
            let mut no_prev = Vec::new();
            reconcile_children(host, id, &mut children, &mut no_prev, memo, ctx)?;
            if had_children || !children.is_empty() {
                next.children = Some(children);
            }
        }
        Content::Memo(_) => unreachable!("memo descriptors are resolved before placement"),
    }
    Ok(())
}
