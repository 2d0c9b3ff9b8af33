use std::fmt::{Display, Formatter};

use digest::Digest;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

/// Width in bytes of every [`Hash`], and therefore of every node pointer.
pub const HASH_SIZE: usize = 32;

/// A 32-byte content digest.
///
/// Node pointers are `Hash` values: the sha256 of a node's encoded bytes, used
/// verbatim as the node's key in the backing store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Hash([u8; HASH_SIZE]);

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Arbitrary for Hash {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<[u8; HASH_SIZE]>().prop_map(Hash::new).boxed()
    }
}

impl Hash {
    /// Creates a new Hash from any type that can be converted into [u8; 32].
    pub fn new<T: Into<[u8; HASH_SIZE]>>(data: T) -> Self {
        Hash(data.into())
    }

    /// Copies a 32-byte slice into a Hash, failing on any other length.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let inner: [u8; HASH_SIZE] = slice.try_into().map_err(|_| {
            Error::FailedDeserialization(format!(
                "expected {} bytes for a hash, got {}",
                HASH_SIZE,
                slice.len()
            ))
        })?;

        Ok(Hash(inner))
    }

    /// Returns a zero hash (all bytes set to 0).
    pub fn zero() -> Self {
        Self([0u8; HASH_SIZE])
    }

    pub fn digest<D: Digest>(data: &[u8]) -> Self {
        let mut hasher = D::new();
        hasher.update(data);

        let mut inner = [0u8; HASH_SIZE];
        let output = hasher.finalize();
        let len = output.len().min(HASH_SIZE);
        inner[..len].copy_from_slice(&output[..len]);
        Hash(inner)
    }

    pub fn sha256(data: &[u8]) -> Self {
        Self::digest::<sha2::Sha256>(data)
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::zero()
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(array: [u8; HASH_SIZE]) -> Self {
        Hash(array)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Hash> for [u8; HASH_SIZE] {
    fn from(val: Hash) -> Self {
        val.0
    }
}

impl ToBytes for Hash {
    type Output = [u8; HASH_SIZE];

    fn to_bytes(&self) -> Self::Output {
        self.0
    }
}

impl FromHex for Hash {
    fn from_hex(input: &str) -> Result<Self> {
        let bytes = hex::decode(input)?;

        if bytes.len() != HASH_SIZE {
            return Err(hex::FromHexError::InvalidStringLength.into());
        }

        Self::from_slice(&bytes)
    }
}

impl ToHex for Hash {
    fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
