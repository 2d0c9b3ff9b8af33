use crate::{
    error::{Error, Result},
    hash::HASH_SIZE,
    node::Layout,
};

pub const DEFAULT_BRANCHING_FACTOR: usize = 1000;
pub const DEFAULT_KEY_SIZE: usize = 8;
pub const DEFAULT_VALUE_SIZE: usize = 32;
pub const MIN_BRANCHING_FACTOR: usize = 3;
pub const POINTER_SIZE: usize = HASH_SIZE;

/// Construction-time shape of a tree.
///
/// Every node of a tree is encoded with the same key and value widths, so two
/// trees only share nodes when their configurations are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of children of an internal node. Leaves hold at most
    /// `branching_factor - 1` entries.
    pub branching_factor: usize,
    pub key_size: usize,
    pub value_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            key_size: DEFAULT_KEY_SIZE,
            value_size: DEFAULT_VALUE_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    pub fn with_key_size(mut self, key_size: usize) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn with_value_size(mut self, value_size: usize) -> Self {
        self.value_size = value_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.branching_factor < MIN_BRANCHING_FACTOR {
            return Err(Error::InvalidConfig(format!(
                "branching factor must be at least {}, got {}",
                MIN_BRANCHING_FACTOR, self.branching_factor
            )));
        }

        if self.key_size == 0 {
            return Err(Error::InvalidConfig("key size must be non-zero".into()));
        }

        if self.value_size == 0 {
            return Err(Error::InvalidConfig("value size must be non-zero".into()));
        }

        Ok(())
    }

    /// Largest number of keys any node may hold once persisted.
    pub fn max_keys(&self) -> usize {
        self.branching_factor - 1
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.key_size, self.value_size)
    }
}
