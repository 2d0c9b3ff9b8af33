//! Tree nodes and everything that operates on a single node in isolation.
//!
//! A [`Node`] is a plain value: it carries no parent link and no idea of its
//! own pointer. Once encoded and persisted its pointer is [`Node::hash`], and
//! any later change produces a different node with a different pointer.

mod codec;
mod search;
mod split;

pub use {
    codec::{Layout, LEAF_TAG, INTERNAL_TAG},
    search::{lower_bound, Search},
    split::Split,
};

use proptest::{collection::vec, prelude::*};

use crate::prelude::*;

/// A node's identity in the store: the sha256 of its encoded bytes.
pub type Pointer = Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Sorted entries. `keys` and `values` always have the same length.
    Leaf {
        keys: Vec<Vec<u8>>,
        values: Vec<Vec<u8>>,
    },
    /// Sorted separators. `pointers[i]` leads to keys strictly below
    /// `keys[i]`; the last pointer leads to keys at or above the last
    /// separator, so there is always one more pointer than keys.
    Internal {
        keys: Vec<Vec<u8>>,
        pointers: Vec<Pointer>,
    },
}

impl Default for Node {
    fn default() -> Self {
        Self::empty()
    }
}

impl Node {
    /// The root of a tree that holds nothing yet.
    pub fn empty() -> Self {
        Node::Leaf {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn leaf(keys: Vec<Vec<u8>>, values: Vec<Vec<u8>>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(Error::Validation(format!(
                "leaf needs one value per key, got {} keys and {} values",
                keys.len(),
                values.len()
            )));
        }

        Ok(Node::Leaf { keys, values })
    }

    pub fn internal(keys: Vec<Vec<u8>>, pointers: Vec<Pointer>) -> Result<Self> {
        if pointers.len() != keys.len() + 1 {
            return Err(Error::Validation(format!(
                "internal node needs {} pointers for {} keys, got {}",
                keys.len() + 1,
                keys.len(),
                pointers.len()
            )));
        }

        Ok(Node::Internal { keys, pointers })
    }

    pub fn keys(&self) -> &[Vec<u8>] {
        match self {
            Node::Leaf { keys, .. } | Node::Internal { keys, .. } => keys,
        }
    }

    /// Values of a leaf; empty for an internal node.
    pub fn values(&self) -> &[Vec<u8>] {
        match self {
            Node::Leaf { values, .. } => values,
            Node::Internal { .. } => &[],
        }
    }

    /// Children of an internal node; empty for a leaf.
    pub fn pointers(&self) -> &[Pointer] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Internal { pointers, .. } => pointers,
        }
    }

    /// True iff the node has no child pointers.
    pub fn is_leaf(&self) -> bool {
        self.pointers().is_empty()
    }

    /// Number of keys.
    pub fn size(&self) -> usize {
        self.keys().len()
    }

    pub fn first_key(&self) -> Option<&[u8]> {
        self.keys().first().map(Vec::as_slice)
    }

    /// Finds the exact entry for `key` in a leaf.
    pub fn get(&self, key: &[u8]) -> Result<&[u8]> {
        match self {
            Node::Leaf { keys, values } => match lower_bound(keys, key) {
                Search {
                    found: true,
                    index,
                } => Ok(values[index].as_slice()),
                _ => Err(Error::KeyNotFound(hex::encode(key))),
            },
            Node::Internal { .. } => Err(Error::Linkage(
                "entry lookup reached an internal node".into(),
            )),
        }
    }

    /// Inserts an entry into a leaf at its sorted position and returns that
    /// position.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<usize> {
        match self {
            Node::Leaf { keys, values } => {
                let Search { found, index } = lower_bound(keys, &key);

                if found {
                    return Err(Error::DuplicateKey(hex::encode(&key)));
                }

                keys.insert(index, key);
                values.insert(index, value);
                Ok(index)
            }
            Node::Internal { .. } => Err(Error::Linkage(
                "entry insert reached an internal node".into(),
            )),
        }
    }
}

impl ToBytes for Node {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        self.encode()
    }
}

/// Parameters for [`Node`]'s `Arbitrary` implementation.
#[derive(Debug, Clone, Copy)]
pub struct NodeParams {
    pub layout: Layout,
    pub max_keys: usize,
}

impl Default for NodeParams {
    fn default() -> Self {
        Self {
            layout: Layout::new(4, 4),
            max_keys: 16,
        }
    }
}

impl Arbitrary for Node {
    type Parameters = NodeParams;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(params: Self::Parameters) -> Self::Strategy {
        let NodeParams { layout, max_keys } = params;

        let keys = move || {
            proptest::collection::btree_set(vec(any::<u8>(), layout.key_size), 0..=max_keys)
                .prop_map(|keys| keys.into_iter().collect::<Vec<_>>())
        };

        let leaf = keys()
            .prop_flat_map(move |keys| {
                let len = keys.len();
                (Just(keys), vec(vec(any::<u8>(), layout.value_size), len))
            })
            .prop_map(|(keys, values)| Node::Leaf { keys, values });

        let internal = keys()
            .prop_flat_map(|keys| {
                let len = keys.len();
                (Just(keys), vec(any::<Pointer>(), len + 1))
            })
            .prop_map(|(keys, pointers)| Node::Internal { keys, pointers });

        prop_oneof![leaf, internal].boxed()
    }
}
