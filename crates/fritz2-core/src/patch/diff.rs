#![forbid(unsafe_code)]

//! Keyed list differ.
//!
//! Computes a [`Patch`] batch turning the previously rendered key sequence
//! into a new list of items, where each item's identity comes from a
//! caller-supplied id function.
//!
//! # Algorithm
//!
//! ```text
//! 1. index new ids (reject duplicates)
//! 2. delete old ids missing from new, highest index first
//! 3. survivors = remaining old ids, in old order
//! 4. stable = longest increasing subsequence of survivor positions,
//!    walked in new order
//! 5. for each new id, left to right:
//!      stable          -> leave in place
//!      other survivor  -> move directly after its new-order predecessor
//!      unknown id      -> insert directly after its new-order predecessor
//! ```
//!
//! Every moved or inserted element is glued to its predecessor, and stable
//! elements never change relative order, so the final sequence equals the new
//! order. The move count is `survivors - |LIS|`, which is small but not a
//! minimal edit script in every case.
//!
//! # Complexity
//!
//! `O(n log n)` for the LIS plus `O(n)` position lookups per moved or inserted
//! element against the working mirror.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Duplicate id in new list | `DiffError::DuplicateKey`, differ state unchanged |
//! | Duplicate id in old keys | Debug assertion; release builds diff against the first occurrence |

use std::fmt::Debug;
use std::hash::Hash;

use ahash::{AHashMap, AHashSet};

use super::Patch;
use crate::error::{DiffError, Result};

/// Diff `old` keys against `new` items.
pub fn diff_keyed<T, K>(old: &[K], new: &[T], id: impl Fn(&T) -> K) -> Result<Vec<Patch<T, K>>>
where
    T: Clone,
    K: Hash + Eq + Clone + Debug,
{
    let new_keys: Vec<K> = new.iter().map(&id).collect();
    let mut new_index: AHashMap<&K, usize> = AHashMap::with_capacity(new_keys.len());
    for (index, key) in new_keys.iter().enumerate() {
        if new_index.insert(key, index).is_some() {
            return Err(DiffError::DuplicateKey {
                key: format!("{key:?}"),
                index,
            });
        }
    }
    debug_assert_eq!(
        old.iter().collect::<AHashSet<_>>().len(),
        old.len(),
        "old key sequence must be duplicate-free"
    );

    let mut batch = Vec::new();

    for (index, key) in old.iter().enumerate().rev() {
        if !new_index.contains_key(key) {
            batch.push(Patch::Delete {
                id: key.clone(),
                index,
            });
        }
    }

    let mut work: Vec<K> = old
        .iter()
        .filter(|key| new_index.contains_key(key))
        .cloned()
        .collect();

    let stable = stable_keys(&work, &new_keys);

    for (i, key) in new_keys.iter().enumerate() {
        if stable.contains(key) {
            continue;
        }
        let target = match i {
            0 => 0,
            _ => position(&work, &new_keys[i - 1]) + 1,
        };
        match work.iter().position(|k| k == key) {
            Some(from) => {
                let to = if from < target { target - 1 } else { target };
                if from != to {
                    let moved = work.remove(from);
                    work.insert(to, moved);
                    batch.push(Patch::Move {
                        id: key.clone(),
                        from,
                        to,
                    });
                }
            }
            None => {
                work.insert(target, key.clone());
                batch.push(Patch::Insert {
                    id: key.clone(),
                    index: target,
                    item: new[i].clone(),
                });
            }
        }
    }

    debug_assert_eq!(work, new_keys);
    Ok(batch)
}

/// Survivors that keep their place: a longest run whose old positions
/// increase when walked in new order.
fn stable_keys<K: Hash + Eq + Clone>(survivors: &[K], new_keys: &[K]) -> AHashSet<K> {
    let old_pos: AHashMap<&K, usize> = survivors.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let in_new_order: Vec<(usize, &K)> = new_keys
        .iter()
        .filter_map(|k| old_pos.get(k).map(|&pos| (pos, k)))
        .collect();
    let positions: Vec<usize> = in_new_order.iter().map(|(pos, _)| *pos).collect();
    longest_increasing_subsequence(&positions)
        .into_iter()
        .map(|i| in_new_order[i].1.clone())
        .collect()
}

/// Indices into `seq` of one longest strictly increasing subsequence.
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    // tails[l] = index of the smallest tail of an increasing run of length l+1.
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&t| seq[t] < value);
        if slot > 0 {
            prev[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

fn position<K: PartialEq>(work: &[K], key: &K) -> usize {
    work.iter()
        .position(|k| k == key)
        .unwrap_or(work.len().saturating_sub(1))
}

/// Stateful differ remembering the last successfully diffed key sequence.
pub struct ListDiffer<T, K> {
    id: Box<dyn Fn(&T) -> K>,
    previous: Vec<K>,
}

impl<T, K: Debug> Debug for ListDiffer<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListDiffer")
            .field("previous", &self.previous)
            .finish()
    }
}

impl<T, K> ListDiffer<T, K>
where
    T: Clone,
    K: Hash + Eq + Clone + Debug,
{
    pub fn new(id: impl Fn(&T) -> K + 'static) -> Self {
        Self {
            id: Box::new(id),
            previous: Vec::new(),
        }
    }

    /// Diff `items` against the last accepted version. On error the previous
    /// version is kept, so the next valid list diffs against the last good one.
    pub fn next(&mut self, items: &[T]) -> Result<Vec<Patch<T, K>>> {
        let batch = diff_keyed(&self.previous, items, &self.id)?;
        self.previous = items.iter().map(&self.id).collect();
        Ok(batch)
    }

    /// Key sequence of the last accepted version.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        &self.previous
    }

    /// The id of a single item.
    pub fn key_of(&self, item: &T) -> K {
        (self.id)(item)
    }

    /// Forget the previous version; the next diff is a pure insert batch.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}
