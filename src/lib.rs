//! A B+ tree whose nodes live in an arbitrary key/value store, addressed by
//! the sha256 of their bytes.
//!
//! Nodes are immutable once written. An insert builds new nodes along the
//! path from the affected leaf to the root and leaves every older node in
//! place, so each root hash is both a fingerprint of the whole dataset and a
//! read handle on that exact version of it.
//!
//! ```
//! # futures::executor::block_on(async {
//! use std::sync::Arc;
//!
//! use merkle_bptree::prelude::*;
//!
//! let config = Config::new().with_branching_factor(4).with_key_size(2).with_value_size(1);
//! let mut tree = Tree::new(Arc::new(MemoryStore::new()), config)?;
//!
//! let before = tree.snapshot();
//! let root = tree.insert(&[0, 1], &[42]).await?;
//!
//! assert_eq!(root, tree.root_node().hash());
//! assert_eq!(tree.get(&[0, 1]).await?, vec![42]);
//! assert!(before.get(&[0, 1]).await.is_err());
//! # Ok::<(), Error>(())
//! # }).unwrap();
//! ```

mod error;

pub mod config;
pub mod hash;
pub mod node;
pub mod prelude;
pub mod store;
pub mod testing;
pub mod tree;

#[doc(hidden)]
/// This is a hidden module to make the macros defined on this crate available for the users.
pub mod __dependencies {
    pub use paste;
    pub use proptest;
    pub use test_strategy;
    pub use thiserror::Error;
}

#[macro_export]
macro_rules! test_to_hex {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_to_hex_$type:snake>] {
                use $crate::__dependencies::{
                    proptest::prelude::*,
                    test_strategy,
                };

                use $crate::prelude::*;
                use super::$type;

                #[test_strategy::proptest(fork = false)]
                fn test_roundtrip(a: $type) {
                    prop_assert_eq!(a.clone(), <$type>::from_hex(&a.to_hex())?);
                }

                #[test_strategy::proptest(fork = false)]
                fn test_output_consistency(a: $type) {
                    prop_assert_eq!(a.to_hex(), <$type>::from_hex(&a.to_hex())?.to_hex());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_different_on_different_objects(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.to_hex() == b.to_hex());
                }
            }
        }
    };
}

#[macro_export]
macro_rules! prop_assert_changes {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        prop_assert_eq!($value, old_value);

        $action;

        prop_assert_ne!($value, old_value);
    };
}

#[macro_export]
macro_rules! prop_assert_does_not_change {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        $action;

        prop_assert_eq!($value, old_value);
    };
}
