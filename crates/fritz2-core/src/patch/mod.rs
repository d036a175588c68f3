#![forbid(unsafe_code)]

//! Structural edits describing an ordered-list transition.
//!
//! A batch of [`Patch`]es is applied strictly in order. Every index refers to
//! the list *as it stands when that patch is applied*, not to the old or new
//! list, so a consumer can replay a batch against its own mirror of the list
//! without any lookahead.
//!
//! # Invariants
//!
//! 1. Applying a batch computed for `old -> new` to `old` yields `new`.
//! 2. An id present in both versions is never deleted and re-inserted.
//! 3. `Move { from, to }` means "remove at `from`, then insert at `to`".

pub mod diff;
pub mod stream;

pub use diff::{ListDiffer, diff_keyed};
pub use stream::PatchStream;

use crate::error::{DiffError, Result};

/// One structural edit, keyed by the element's stable id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch<T, K> {
    Insert { id: K, index: usize, item: T },
    Delete { id: K, index: usize },
    Move { id: K, from: usize, to: usize },
}

impl<T, K> Patch<T, K> {
    /// The stable id this patch concerns.
    pub fn id(&self) -> &K {
        match self {
            Self::Insert { id, .. } | Self::Delete { id, .. } | Self::Move { id, .. } => id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::Move { .. } => "move",
        }
    }

    /// Apply to a mirror list, building inserted elements with `make`.
    pub fn apply_with<V>(&self, list: &mut Vec<V>, make: impl FnOnce(&T) -> V) -> Result<()> {
        let len = list.len();
        match self {
            Self::Insert { index, item, .. } => {
                check(self.kind(), *index, len + 1)?;
                list.insert(*index, make(item));
            }
            Self::Delete { index, .. } => {
                check(self.kind(), *index, len)?;
                list.remove(*index);
            }
            Self::Move { from, to, .. } => {
                check(self.kind(), *from, len)?;
                check(self.kind(), *to, len)?;
                let moved = list.remove(*from);
                list.insert(*to, moved);
            }
        }
        Ok(())
    }
}

impl<T: Clone, K> Patch<T, K> {
    /// Apply to a list of the items themselves.
    pub fn apply_to(&self, list: &mut Vec<T>) -> Result<()> {
        self.apply_with(list, T::clone)
    }
}

/// Apply a whole batch in order, stopping at the first invalid patch.
pub fn apply_batch<T: Clone, K>(list: &mut Vec<T>, batch: &[Patch<T, K>]) -> Result<()> {
    batch.iter().try_for_each(|patch| patch.apply_to(list))
}

fn check(op: &'static str, index: usize, bound: usize) -> Result<()> {
    if index < bound {
        Ok(())
    } else {
        Err(DiffError::OutOfBounds {
            op,
            index,
            len: bound.saturating_sub(usize::from(op == "insert")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_sequential_batch() {
        let mut list = vec!['a', 'b', 'c'];
        let batch = vec![
            Patch::Delete { id: 'b', index: 1 },
            Patch::Move {
                id: 'c',
                from: 1,
                to: 0,
            },
            Patch::Insert {
                id: 'd',
                index: 2,
                item: 'd',
            },
        ];
        apply_batch(&mut list, &batch).unwrap();
        assert_eq!(list, vec!['c', 'a', 'd']);
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut list = vec![1];
        let err = Patch::<i32, i32>::Delete { id: 1, index: 3 }
            .apply_to(&mut list)
            .unwrap_err();
        assert_eq!(
            err,
            DiffError::OutOfBounds {
                op: "delete",
                index: 3,
                len: 1
            }
        );
        assert_eq!(list, vec![1]);
    }

    #[test]
    fn insert_may_append() {
        let mut list = vec![1];
        Patch::Insert {
            id: 2,
            index: 1,
            item: 2,
        }
        .apply_to(&mut list)
        .unwrap();
        assert_eq!(list, vec![1, 2]);
    }

    #[test]
    fn apply_with_maps_items() {
        let mut rendered: Vec<String> = Vec::new();
        Patch::Insert {
            id: 1,
            index: 0,
            item: 10,
        }
        .apply_with(&mut rendered, |v| format!("<li>{v}</li>"))
        .unwrap();
        assert_eq!(rendered, vec!["<li>10</li>"]);
    }
}
