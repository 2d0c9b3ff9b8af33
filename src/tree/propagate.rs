//! Upward half of an insert.
//!
//! Starting from the updated leaf, every node on the recorded path is rebuilt
//! bottom up. An overflowing node is split and its parent receives the median
//! and both halves; a node within capacity is persisted and its parent is
//! relinked to the new pointer. The walk ends at a node with no ancestor,
//! whose pointer becomes the new root. Nothing here touches the tree's root,
//! so a failure anywhere leaves it where it was.

use tracing::{debug, trace};

use super::navigator::{Ancestor, Descent};
use crate::{prelude::*, store::Store};

pub struct Propagator<'a, S: ?Sized> {
    store: &'a S,
    config: Config,
}

impl<'a, S: Store + ?Sized> Propagator<'a, S> {
    pub fn new(store: &'a S, config: Config) -> Self {
        Self { store, config }
    }

    /// Encodes `node` and writes it under its content hash.
    pub async fn persist(&self, node: &Node) -> Result<Pointer> {
        let bytes = node.encode();
        let pointer = Hash::sha256(&bytes);
        trace!(%pointer, len = bytes.len(), leaf = node.is_leaf(), "persisting node");

        self.store.put(pointer.as_ref(), bytes).await?;
        Ok(pointer)
    }

    /// Inserts an entry into the leaf of `descent` and rebuilds the path above
    /// it, returning the new root pointer and node.
    pub async fn insert(
        &self,
        descent: Descent,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(Pointer, Node)> {
        let Descent {
            leaf: mut node,
            pointer: mut old_pointer,
            mut ancestors,
        } = descent;

        node.insert(key, value)?;

        loop {
            if node.size() > self.config.max_keys() {
                let Split {
                    left,
                    right,
                    median,
                } = node.split(self.config.branching_factor)?;

                let (left_pointer, right_pointer) =
                    futures::try_join!(self.persist(&left), self.persist(&right))?;

                debug!(
                    %old_pointer,
                    %left_pointer,
                    %right_pointer,
                    median = %hex::encode(&median),
                    leaf = left.is_leaf(),
                    "split node"
                );

                match ancestors.pop() {
                    None => {
                        let root = Node::Internal {
                            keys: vec![median],
                            pointers: vec![left_pointer, right_pointer],
                        };
                        let pointer = self.persist(&root).await?;
                        debug!(%pointer, "grew a new root");
                        return Ok((pointer, root));
                    }
                    Some(Ancestor {
                        node: mut parent,
                        pointer,
                        slot,
                    }) => {
                        parent.promote(slot, &old_pointer, median, left_pointer, right_pointer)?;
                        node = parent;
                        old_pointer = pointer;
                    }
                }
            } else {
                let new_pointer = self.persist(&node).await?;

                match ancestors.pop() {
                    None => return Ok((new_pointer, node)),
                    Some(Ancestor {
                        node: mut parent,
                        pointer,
                        slot,
                    }) => {
                        parent.relink_pointer(slot, &old_pointer, new_pointer)?;
                        node = parent;
                        old_pointer = pointer;
                    }
                }
            }
        }
    }
}
