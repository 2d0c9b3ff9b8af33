pub use crate::{
    config::*,
    error::*,
    hash::*,
    node::{Layout, Node, Pointer, Split},
    store::{MemoryStore, Store},
    tree::{Snapshot, Tree},
};

pub trait ToBytes {
    type Output: AsRef<[u8]>;

    /// Converts the value to a representation in bytes.
    fn to_bytes(&self) -> Self::Output;

    /// Converts the value to a representation in bytes, as a vector.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn to_bytes_vec(&self) -> Vec<u8> {
        self.to_bytes().as_ref().to_vec()
    }

    /// Hashes the value using sha256.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn hash_bytes(&self) -> Hash {
        Hash::sha256(self.to_bytes().as_ref())
    }
}

pub trait FromHex
where
    Self: Sized,
{
    fn from_hex(hex: &str) -> Result<Self>;
}

pub trait ToHex {
    fn to_hex(&self) -> String;
}
