use tracing::{trace, warn};

use crate::{node::Layout, prelude::*, store::Store};

/// An internal node passed on the way down, kept so the ascent can rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub node: Node,
    /// The ancestor's own pointer before this operation.
    pub pointer: Pointer,
    /// Slot of the child the descent continued into.
    pub slot: usize,
}

/// Result of walking from a root down to the leaf owning a key.
///
/// `ancestors` runs root first, so the immediate parent of `leaf` is last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descent {
    pub leaf: Node,
    pub pointer: Pointer,
    pub ancestors: Vec<Ancestor>,
}

impl Descent {
    pub fn height(&self) -> usize {
        self.ancestors.len() + 1
    }
}

/// Fetches and decodes nodes on behalf of a single operation.
pub struct Navigator<'a, S: ?Sized> {
    store: &'a S,
    layout: Layout,
}

impl<'a, S: Store + ?Sized> Navigator<'a, S> {
    pub fn new(store: &'a S, layout: Layout) -> Self {
        Self { store, layout }
    }

    /// Loads the node stored under `pointer`, rejecting bytes whose hash does
    /// not match the pointer they were stored under.
    pub async fn fetch(&self, pointer: &Pointer) -> Result<Node> {
        let bytes = self.store.get(pointer.as_ref()).await?;
        trace!(%pointer, len = bytes.len(), "fetched node");

        let actual = Hash::sha256(&bytes);
        if actual != *pointer {
            warn!(%pointer, %actual, "node content does not match its pointer");
            return Err(Error::CorruptRecord(format!(
                "record {} hashes to {}",
                pointer, actual
            )));
        }

        self.layout.decode(&bytes)
    }

    /// Loads a root node. The empty leaf is never written to the store, so its
    /// pointer resolves to [`Node::empty`] without a fetch.
    pub async fn fetch_root(&self, pointer: &Pointer) -> Result<Node> {
        let empty = Node::empty();
        if *pointer == empty.hash() {
            return Ok(empty);
        }

        self.fetch(pointer).await
    }

    /// Walks from `start` to the leaf owning `key`, recording every internal
    /// node passed along the way.
    pub async fn find_leaf(&self, start: Node, pointer: Pointer, key: &[u8]) -> Result<Descent> {
        let mut ancestors = Vec::new();
        let mut node = start;
        let mut pointer = pointer;

        while !node.is_leaf() {
            let (slot, child) = node.locate_pointer(key)?;
            let next = self.fetch(&child).await?;

            ancestors.push(Ancestor {
                node,
                pointer,
                slot,
            });
            node = next;
            pointer = child;
        }

        Ok(Descent {
            leaf: node,
            pointer,
            ancestors,
        })
    }

    /// Looks up the value for `key` below `root` without keeping the path.
    pub async fn lookup(&self, root: &Node, key: &[u8]) -> Result<Vec<u8>> {
        if root.is_leaf() {
            return root.get(key).map(<[u8]>::to_vec);
        }

        let (_, mut pointer) = root.locate_pointer(key)?;
        loop {
            let node = self.fetch(&pointer).await?;
            if node.is_leaf() {
                return node.get(key).map(<[u8]>::to_vec);
            }
            (_, pointer) = node.locate_pointer(key)?;
        }
    }
}
