use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use proptest::{
    collection::{hash_set, vec},
    prelude::*,
    sample::SizeRange,
};

use crate::{error::StoreError, prelude::*, store::Store, tree::Navigator};

/// Distinct keys of `key_size` bytes, in random insertion order.
pub fn distinct_keys(
    key_size: usize,
    size: impl Into<SizeRange>,
) -> impl Strategy<Value = Vec<Vec<u8>>> {
    hash_set(vec(any::<u8>(), key_size), size)
        .prop_map(|keys| keys.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// A value of `value_size` bytes derived from `key`, so tests can check
/// lookups without carrying a map around.
pub fn value_for(key: &[u8], value_size: usize) -> Vec<u8> {
    let seed = Hash::sha256(key);
    seed.as_ref().iter().copied().cycle().take(value_size).collect()
}

/// Wraps a store and starts failing writes once a budget runs out.
///
/// Reads always pass through.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    budget: AtomicUsize,
}

impl<S: Store> FaultyStore<S> {
    pub fn new(inner: S, budget: usize) -> Self {
        Self {
            inner,
            budget: AtomicUsize::new(budget),
        }
    }

    /// Allows `budget` more successful writes.
    pub fn set_budget(&self, budget: usize) {
        self.budget.store(budget, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for FaultyStore<S> {
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        let granted = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        if !granted {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write budget exhausted",
            )));
        }

        self.inner.put(key, value).await
    }
}

/// Shape of a tree as seen by [`check_invariants`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels, counting the root.
    pub height: usize,
    pub leaves: usize,
    pub entries: usize,
}

/// Walks every node reachable from `root` and checks the structural
/// invariants: capacity, `keys + 1` pointers per internal node, keys sorted
/// and inside the range their parent separators allow, and every leaf at the
/// same depth.
pub async fn check_invariants<S: Store + ?Sized>(
    store: &S,
    config: &Config,
    root: &Node,
) -> Result<TreeStats> {
    let navigator = Navigator::new(store, config.layout());
    let mut stats = TreeStats::default();
    let mut leaf_depth = None;

    // (node, depth, inclusive lower bound, exclusive upper bound)
    let mut pending: Vec<(Node, usize, Option<Vec<u8>>, Option<Vec<u8>>)> =
        vec![(root.clone(), 1, None, None)];

    while let Some((node, depth, lower, upper)) = pending.pop() {
        let keys = node.keys();

        if keys.len() > config.max_keys() {
            return Err(violation(format!(
                "node holds {} keys, more than {}",
                keys.len(),
                config.max_keys()
            )));
        }
        if !keys.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(violation("keys out of order".into()));
        }
        if let (Some(lower), Some(first)) = (&lower, keys.first()) {
            if first < lower {
                return Err(violation("key below its subtree's lower bound".into()));
            }
        }
        if let (Some(upper), Some(last)) = (&upper, keys.last()) {
            if last >= upper {
                return Err(violation("key at or above its subtree's upper bound".into()));
            }
        }

        match &node {
            Node::Leaf { values, .. } => {
                if values.len() != keys.len() {
                    return Err(violation("leaf keys and values differ in count".into()));
                }
                if *leaf_depth.get_or_insert(depth) != depth {
                    return Err(violation("leaves at different depths".into()));
                }
                stats.leaves += 1;
                stats.entries += keys.len();
            }
            Node::Internal { pointers, .. } => {
                if pointers.len() != keys.len() + 1 {
                    return Err(violation(format!(
                        "internal node with {} keys has {} pointers",
                        keys.len(),
                        pointers.len()
                    )));
                }

                for (slot, pointer) in pointers.iter().enumerate() {
                    let child = navigator.fetch(pointer).await?;
                    let child_lower = match slot {
                        0 => lower.clone(),
                        _ => Some(keys[slot - 1].clone()),
                    };
                    let child_upper = keys.get(slot).cloned().or_else(|| upper.clone());
                    pending.push((child, depth + 1, child_lower, child_upper));
                }
            }
        }
    }

    stats.height = leaf_depth.unwrap_or(1);
    Ok(stats)
}

fn violation(message: String) -> Error {
    Error::Linkage(message)
}
