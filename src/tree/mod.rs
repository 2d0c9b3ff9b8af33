//! The tree orchestrator.
//!
//! A [`Tree`] owns a store handle, its [`Config`] and the current root. Each
//! insert is a two-phase walk: [`navigator`] descends from the root to the
//! target leaf collecting ancestors, then [`propagate`] climbs back up
//! persisting new nodes until it produces a new root. The tree adopts that
//! root only once the whole path is in the store.
//!
//! Writers must be serialized by the caller (`insert` takes `&mut self`).
//! Readers that need to run alongside a writer take a [`Snapshot`].

mod navigator;
mod propagate;
mod snapshot;

use std::sync::Arc;

use tracing::debug;

pub use {
    navigator::{Ancestor, Descent, Navigator},
    propagate::Propagator,
    snapshot::Snapshot,
};

use crate::{prelude::*, store::Store};

/// A content-addressed B+ tree of fixed-size keys and values.
pub struct Tree<S: ?Sized> {
    store: Arc<S>,
    config: Config,
    root: Pointer,
    root_node: Arc<Node>,
}

impl<S: ?Sized> std::fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("config", &self.config)
            .field("root", &self.root)
            .finish()
    }
}

impl<S: Store + ?Sized> Tree<S> {
    /// Creates an empty tree.
    ///
    /// Nothing is written until the first insert; until then [`Tree::root`]
    /// is the hash of an empty leaf.
    pub fn new(store: Arc<S>, config: Config) -> Result<Self> {
        Self::with_root(store, config, Node::empty())
    }

    /// Creates a tree around an already materialized root node.
    ///
    /// The node must already fit `config`, since it is persisted as is by the
    /// next insert.
    pub fn with_root(store: Arc<S>, config: Config, root: Node) -> Result<Self> {
        config.validate()?;
        config.layout().check(&root)?;

        if root.size() > config.max_keys() {
            return Err(Error::Validation(format!(
                "root holds {} keys but at most {} are allowed",
                root.size(),
                config.max_keys()
            )));
        }

        Ok(Self {
            store,
            config,
            root: root.hash(),
            root_node: Arc::new(root),
        })
    }

    /// Resumes a tree from a root previously persisted to `store`.
    pub async fn open(store: Arc<S>, config: Config, root: Pointer) -> Result<Self> {
        config.validate()?;

        let root_node = Navigator::new(&*store, config.layout()).fetch_root(&root).await?;
        debug!(%root, "opened tree");

        Ok(Self {
            store,
            config,
            root,
            root_node: Arc::new(root_node),
        })
    }

    /// The current root pointer. For an empty tree this is the hash of the
    /// empty leaf, which [`Tree::open`] and [`Snapshot::open`] resolve without
    /// it ever being written.
    pub fn root(&self) -> Pointer {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.root_node
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Captures the current root for reads that must not observe later inserts.
    pub fn snapshot(&self) -> Snapshot<S> {
        Snapshot::new(
            self.store.clone(),
            self.config.layout(),
            self.root,
            self.root_node.clone(),
        )
    }

    /// Inserts a new entry and returns the resulting root pointer.
    ///
    /// Fails with [`Error::DuplicateKey`] if `key` is already present. On any
    /// failure the root is left untouched; nodes already written by the failed
    /// attempt stay in the store unreferenced.
    pub async fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<Pointer> {
        self.check_entry(key, value)?;

        let descent = Navigator::new(&*self.store, self.config.layout())
            .find_leaf((*self.root_node).clone(), self.root, key)
            .await?;
        let height = descent.height();

        let (root, root_node) = Propagator::new(&*self.store, self.config)
            .insert(descent, key.to_vec(), value.to_vec())
            .await?;

        debug!(previous = %self.root, %root, height, "adopted new root");
        self.root = root;
        self.root_node = Arc::new(root_node);

        Ok(root)
    }

    /// Returns the value stored for `key`.
    pub async fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.len() != self.config.key_size {
            return Err(Error::KeyNotFound(hex::encode(key)));
        }

        Navigator::new(&*self.store, self.config.layout())
            .lookup(&self.root_node, key)
            .await
    }

    fn check_entry(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.len() != self.config.key_size {
            return Err(Error::Validation(format!(
                "key must be {} bytes, got {}",
                self.config.key_size,
                key.len()
            )));
        }

        if value.len() != self.config.value_size {
            return Err(Error::Validation(format!(
                "value must be {} bytes, got {}",
                self.config.value_size,
                value.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        error::StoreError,
        testing::{check_invariants, distinct_keys, value_for, FaultyStore},
    };

    fn key(n: u64) -> Vec<u8> {
        n.to_be_bytes().to_vec()
    }

    fn small(branching_factor: usize) -> Config {
        Config::new()
            .with_branching_factor(branching_factor)
            .with_key_size(8)
            .with_value_size(4)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            Tree::new(store, Config::new().with_branching_factor(2)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_initial_root() {
        let store = Arc::new(MemoryStore::new());
        let keys = vec![vec![1u8; 8], vec![2; 8], vec![3; 8]];
        let values = vec![vec![0u8; 4]; 3];
        let root = Node::leaf(keys, values).unwrap();

        assert!(matches!(
            Tree::with_root(store, small(3), root),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_initial_root() {
        let config = Config::new()
            .with_branching_factor(4)
            .with_key_size(2)
            .with_value_size(2);

        let wide_key = Node::leaf(vec![vec![0, 0, 9]], vec![vec![1, 1]]).unwrap();
        let unlinked = Node::Internal {
            keys: vec![vec![0, 1]],
            pointers: vec![],
        };

        for root in [wide_key, unlinked] {
            assert!(matches!(
                Tree::with_root(Arc::new(MemoryStore::new()), config, root),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn test_initial_root_persists_decodable_records() {
        block_on(async {
            let config = Config::new()
                .with_branching_factor(4)
                .with_key_size(2)
                .with_value_size(2);
            let store = Arc::new(MemoryStore::new());
            let root = Node::leaf(vec![vec![0, 1], vec![0, 3]], vec![vec![1, 1], vec![3, 3]]).unwrap();

            let mut tree = Tree::with_root(store.clone(), config, root).unwrap();
            let pointer = tree.insert(&[0, 5], &[2, 2]).await.unwrap();

            let reopened = Tree::open(store, config, pointer).await.unwrap();
            assert_eq!(reopened.get(&[0, 3]).await.unwrap(), vec![3, 3]);
            assert_eq!(reopened.get(&[0, 5]).await.unwrap(), vec![2, 2]);
        });
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new(Arc::new(MemoryStore::new()), small(4)).unwrap();

        assert_eq!(tree.root(), Node::empty().hash());
        assert!(matches!(block_on(tree.get(&key(1))), Err(Error::KeyNotFound(_))));
    }

    #[test]
    fn test_open_empty_root() {
        block_on(async {
            let store = Arc::new(MemoryStore::new());
            let tree = Tree::new(store.clone(), small(4)).unwrap();

            let mut reopened = Tree::open(store.clone(), small(4), tree.root()).await.unwrap();
            assert_eq!(reopened.root_node(), &Node::empty());

            let snapshot = Snapshot::open(store.clone(), small(4), tree.root()).await.unwrap();
            assert!(matches!(snapshot.get(&key(1)).await, Err(Error::KeyNotFound(_))));

            reopened.insert(&key(1), &[1; 4]).await.unwrap();
            assert_eq!(reopened.get(&key(1)).await.unwrap(), vec![1; 4]);
            assert!(store.contains(reopened.root().as_ref()));
        });
    }

    #[test]
    fn test_validation() {
        block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut tree = Tree::new(store.clone(), small(4)).unwrap();
            let root = tree.root();

            assert!(matches!(
                tree.insert(&[1, 2, 3], &[0; 4]).await,
                Err(Error::Validation(_))
            ));
            assert!(matches!(
                tree.insert(&key(1), &[0; 5]).await,
                Err(Error::Validation(_))
            ));
            assert_eq!(tree.root(), root);
            assert!(store.is_empty());

            assert!(matches!(tree.get(&[1]).await, Err(Error::KeyNotFound(_))));
        });
    }

    #[test]
    fn test_duplicate_keeps_root() {
        block_on(async {
            let mut tree = Tree::new(Arc::new(MemoryStore::new()), small(4)).unwrap();
            for n in 0..10 {
                tree.insert(&key(n), &[n as u8; 4]).await.unwrap();
            }
            let root = tree.root();

            assert!(matches!(
                tree.insert(&key(3), &[9; 4]).await,
                Err(Error::DuplicateKey(_))
            ));
            assert_eq!(tree.root(), root);
            assert_eq!(tree.get(&key(3)).await.unwrap(), vec![3; 4]);
        });
    }

    #[test]
    fn test_open_resumes_from_root() {
        block_on(async {
            let store = Arc::new(MemoryStore::new());
            let mut tree = Tree::new(store.clone(), small(4)).unwrap();
            for n in 0..20 {
                tree.insert(&key(n), &[n as u8; 4]).await.unwrap();
            }

            let mut reopened = Tree::open(store, small(4), tree.root()).await.unwrap();
            assert_eq!(reopened.root_node(), tree.root_node());
            assert_eq!(reopened.get(&key(13)).await.unwrap(), vec![13; 4]);

            reopened.insert(&key(20), &[20; 4]).await.unwrap();
            tree.insert(&key(20), &[20; 4]).await.unwrap();
            assert_eq!(reopened.root(), tree.root());
        });
    }

    #[test]
    fn test_open_unknown_root() {
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            block_on(Tree::open(store, small(4), Hash::zero())),
            Err(Error::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn test_failed_insert_leaves_root_untouched() {
        block_on(async {
            let store = Arc::new(FaultyStore::new(MemoryStore::new(), usize::MAX));
            let mut tree = Tree::new(store.clone(), small(4)).unwrap();
            for n in 0..12 {
                tree.insert(&key(n * 2), &[n as u8; 4]).await.unwrap();
            }
            let root = tree.root();
            let snapshot = tree.snapshot();

            // one more write succeeds, the rest of the path fails
            store.set_budget(1);
            assert!(matches!(
                tree.insert(&key(7), &[7; 4]).await,
                Err(Error::Store(StoreError::Io(_)))
            ));
            assert_eq!(tree.root(), root);
            assert!(matches!(tree.get(&key(7)).await, Err(Error::KeyNotFound(_))));

            store.set_budget(usize::MAX);
            for n in 0..12 {
                assert_eq!(tree.get(&key(n * 2)).await.unwrap(), vec![n as u8; 4]);
            }
            check_invariants(&*store, tree.config(), tree.root_node()).await.unwrap();

            tree.insert(&key(7), &[7; 4]).await.unwrap();
            assert_eq!(tree.get(&key(7)).await.unwrap(), vec![7; 4]);
            assert!(matches!(snapshot.get(&key(7)).await, Err(Error::KeyNotFound(_))));
        });
    }

    macro_rules! generate_tree_tests {
        ($branching_factor:literal) => {
            paste::paste! {
                mod [<branching_factor_ $branching_factor>] {
                    use super::*;

                    fn config() -> Config {
                        Config::new()
                            .with_branching_factor($branching_factor)
                            .with_key_size(4)
                            .with_value_size(8)
                    }

                    fn build(keys: &[Vec<u8>]) -> Result<Tree<MemoryStore>> {
                        block_on(async {
                            let mut tree = Tree::new(Arc::new(MemoryStore::new()), config())?;
                            for key in keys {
                                tree.insert(key, &value_for(key, 8)).await?;
                            }
                            Ok(tree)
                        })
                    }

                    #[test_strategy::proptest(cases = 64)]
                    fn test_inserted_keys_are_retrievable(
                        #[strategy(distinct_keys(4, 1..200))] keys: Vec<Vec<u8>>,
                    ) {
                        let tree = build(&keys)?;
                        for key in &keys {
                            prop_assert_eq!(block_on(tree.get(key))?, value_for(key, 8));
                        }
                    }

                    #[test_strategy::proptest(cases = 64)]
                    fn test_missing_keys_are_not_found(
                        #[strategy(distinct_keys(4, 2..100))] keys: Vec<Vec<u8>>,
                    ) {
                        let (absent, present) = keys.split_at(keys.len() / 2);
                        let tree = build(present)?;
                        for key in absent {
                            prop_assert!(matches!(
                                block_on(tree.get(key)),
                                Err(Error::KeyNotFound(_))
                            ));
                        }
                    }

                    #[test_strategy::proptest(cases = 64)]
                    fn test_invariants_hold(
                        #[strategy(distinct_keys(4, 0..300))] keys: Vec<Vec<u8>>,
                    ) {
                        let tree = build(&keys)?;
                        let stats = block_on(check_invariants(&**tree.store(), tree.config(), tree.root_node()))?;
                        prop_assert_eq!(stats.entries, keys.len());
                    }

                    #[test_strategy::proptest(cases = 32)]
                    fn test_same_inserts_same_root(
                        #[strategy(distinct_keys(4, 0..150))] keys: Vec<Vec<u8>>,
                    ) {
                        prop_assert_eq!(build(&keys)?.root(), build(&keys)?.root());
                    }

                    #[test_strategy::proptest(cases = 32)]
                    fn test_every_insert_moves_root(
                        #[strategy(distinct_keys(4, 1..100))] keys: Vec<Vec<u8>>,
                    ) {
                        let mut tree = build(&[])?;
                        for key in &keys {
                            crate::prop_assert_changes!(
                                block_on(tree.insert(key, &value_for(key, 8)))?,
                                tree.root()
                            );
                            prop_assert_eq!(tree.root(), tree.root_node().hash());
                        }
                    }

                    #[test_strategy::proptest(cases = 32)]
                    fn test_duplicates_do_not_move_root(
                        #[strategy(distinct_keys(4, 1..100))] keys: Vec<Vec<u8>>,
                        #[strategy(0..#keys.len())] pick: usize,
                    ) {
                        let mut tree = build(&keys)?;
                        crate::prop_assert_does_not_change!(
                            prop_assert!(matches!(
                                block_on(tree.insert(&keys[pick], &[0; 8])),
                                Err(Error::DuplicateKey(_))
                            )),
                            tree.root()
                        );
                    }

                    #[test_strategy::proptest(cases = 32)]
                    fn test_snapshots_are_isolated(
                        #[strategy(distinct_keys(4, 2..120))] keys: Vec<Vec<u8>>,
                        #[strategy(1..#keys.len())] cut: usize,
                    ) {
                        let (before, after) = keys.split_at(cut);
                        let mut tree = build(before)?;
                        let snapshot = tree.snapshot();

                        for key in after {
                            block_on(tree.insert(key, &value_for(key, 8)))?;
                        }

                        for key in before {
                            prop_assert_eq!(block_on(snapshot.get(key))?, value_for(key, 8));
                        }
                        for key in after {
                            prop_assert!(block_on(snapshot.get(key)).is_err());
                            prop_assert_eq!(block_on(tree.get(key))?, value_for(key, 8));
                        }
                    }
                }
            }
        };
    }

    generate_tree_tests!(3);
    generate_tree_tests!(4);
    generate_tree_tests!(5);
    generate_tree_tests!(16);
}
