//! Canonical byte encoding of a [`Node`].
//!
//! ```text
//! leaf:     0x01 | key_0 value_0 | key_1 value_1 | ...
//! internal: 0x00 | key_0 ptr_0   | key_1 ptr_1   | ... | ptr_n
//! ```
//!
//! Each separator travels with the pointer to its left, and the rightmost
//! child pointer trails the body, so `n` keys always decode with `n + 1`
//! pointers. There is no padding and no length prefix: the record length
//! alone determines the entry count.

use super::{lower_bound, Node, Pointer};
use crate::{config::POINTER_SIZE, prelude::*};

pub const INTERNAL_TAG: u8 = 0x00;
pub const LEAF_TAG: u8 = 0x01;

/// Fixed field widths needed to decode a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub key_size: usize,
    pub value_size: usize,
}

impl Layout {
    pub fn new(key_size: usize, value_size: usize) -> Self {
        Self {
            key_size,
            value_size,
        }
    }

    pub fn leaf_stride(&self) -> usize {
        self.key_size + self.value_size
    }

    pub fn internal_stride(&self) -> usize {
        self.key_size + POINTER_SIZE
    }

    /// Checks that `node` can be encoded under this layout and decoded back
    /// unchanged: field widths, strictly increasing keys, and `keys + 1`
    /// pointers for an internal node.
    pub fn check(&self, node: &Node) -> Result<()> {
        self.check_widths()?;

        if let Some(key) = node.keys().iter().find(|key| key.len() != self.key_size) {
            return Err(Error::Validation(format!(
                "key must be {} bytes, got {}",
                self.key_size,
                key.len()
            )));
        }

        if !node.keys().windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Error::Validation("keys are not strictly increasing".into()));
        }

        match node {
            Node::Leaf { keys, values } => {
                if values.len() != keys.len() {
                    return Err(Error::Validation(format!(
                        "leaf has {} keys but {} values",
                        keys.len(),
                        values.len()
                    )));
                }
                if let Some(value) = values.iter().find(|value| value.len() != self.value_size) {
                    return Err(Error::Validation(format!(
                        "value must be {} bytes, got {}",
                        self.value_size,
                        value.len()
                    )));
                }
            }
            Node::Internal { keys, pointers } => {
                if pointers.len() != keys.len() + 1 {
                    return Err(Error::Validation(format!(
                        "internal node with {} keys has {} pointers",
                        keys.len(),
                        pointers.len()
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Node> {
        self.check_widths()?;

        let (tag, body) = bytes
            .split_first()
            .ok_or_else(|| Error::CorruptRecord("empty record".into()))?;

        let node = match *tag {
            LEAF_TAG => self.decode_leaf(body)?,
            INTERNAL_TAG => self.decode_internal(body)?,
            other => {
                return Err(Error::CorruptRecord(format!(
                    "unknown node type tag {:#04x}",
                    other
                )))
            }
        };

        if !node.keys().windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Error::CorruptRecord(
                "keys are not strictly increasing".into(),
            ));
        }

        Ok(node)
    }

    fn check_widths(&self) -> Result<()> {
        if self.key_size == 0 || self.value_size == 0 {
            return Err(Error::Validation(format!(
                "layout needs non-zero key and value sizes, got {} and {}",
                self.key_size, self.value_size
            )));
        }

        Ok(())
    }

    fn decode_leaf(&self, body: &[u8]) -> Result<Node> {
        let stride = self.leaf_stride();

        if body.len() % stride != 0 {
            return Err(Error::CorruptRecord(format!(
                "leaf body of {} bytes is not a multiple of {}",
                body.len(),
                stride
            )));
        }

        let (keys, values) = body
            .chunks_exact(stride)
            .map(|entry| {
                let (key, value) = entry.split_at(self.key_size);
                (key.to_vec(), value.to_vec())
            })
            .unzip();

        Ok(Node::Leaf { keys, values })
    }

    fn decode_internal(&self, body: &[u8]) -> Result<Node> {
        let stride = self.internal_stride();

        if body.len() < POINTER_SIZE || (body.len() - POINTER_SIZE) % stride != 0 {
            return Err(Error::CorruptRecord(format!(
                "internal body of {} bytes is not {} plus a multiple of {}",
                body.len(),
                POINTER_SIZE,
                stride
            )));
        }

        let (entries, last) = body.split_at(body.len() - POINTER_SIZE);
        let count = entries.len() / stride;

        let mut keys = Vec::with_capacity(count);
        let mut pointers = Vec::with_capacity(count + 1);

        for entry in entries.chunks_exact(stride) {
            let (key, pointer) = entry.split_at(self.key_size);
            keys.push(key.to_vec());
            pointers.push(Pointer::from_slice(pointer)?);
        }
        pointers.push(Pointer::from_slice(last)?);

        Ok(Node::Internal { keys, pointers })
    }
}

impl Node {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Leaf { keys, values } => {
                let body: usize = keys.iter().chain(values).map(Vec::len).sum();
                let mut bytes = Vec::with_capacity(1 + body);

                bytes.push(LEAF_TAG);
                for (key, value) in keys.iter().zip(values) {
                    bytes.extend_from_slice(key);
                    bytes.extend_from_slice(value);
                }
                bytes
            }
            Node::Internal { keys, pointers } => {
                let body: usize = keys.iter().map(Vec::len).sum::<usize>()
                    + pointers.len() * POINTER_SIZE;
                let mut bytes = Vec::with_capacity(1 + body);

                bytes.push(INTERNAL_TAG);
                for (key, pointer) in keys.iter().zip(pointers) {
                    bytes.extend_from_slice(key);
                    bytes.extend_from_slice(pointer.as_ref());
                }
                if let Some(last) = pointers.last() {
                    bytes.extend_from_slice(last.as_ref());
                }
                bytes
            }
        }
    }

    /// The pointer this node gets once persisted.
    pub fn hash(&self) -> Pointer {
        Hash::sha256(&self.encode())
    }

    /// Locates the child subtree that owns `key`, returning the child's slot
    /// together with its pointer.
    pub fn locate_pointer(&self, key: &[u8]) -> Result<(usize, Pointer)> {
        match self {
            Node::Internal { keys, pointers } => {
                let search = lower_bound(keys, key);
                let slot = if search.found {
                    search.index + 1
                } else {
                    search.index
                };

                pointers.get(slot).map(|pointer| (slot, *pointer)).ok_or_else(|| {
                    Error::Linkage(format!(
                        "child slot {} is missing from a node with {} pointers",
                        slot,
                        pointers.len()
                    ))
                })
            }
            Node::Leaf { .. } => Err(Error::Linkage(
                "cannot locate a child pointer in a leaf".into(),
            )),
        }
    }
}
