use std::sync::Arc;

use super::navigator::Navigator;
use crate::{node::Layout, prelude::*, store::Store};

/// A read-only view of a tree at one root.
///
/// Persisted nodes are never rewritten, so a snapshot stays valid and
/// unchanged no matter how many inserts the tree it came from performs later.
/// Snapshots are cheap to clone and can be read from any number of tasks.
pub struct Snapshot<S: ?Sized> {
    store: Arc<S>,
    layout: Layout,
    root: Pointer,
    root_node: Arc<Node>,
}

impl<S: ?Sized> Clone for Snapshot<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            layout: self.layout,
            root: self.root,
            root_node: self.root_node.clone(),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for Snapshot<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("root", &self.root)
            .field("layout", &self.layout)
            .finish()
    }
}

impl<S: Store + ?Sized> Snapshot<S> {
    pub(crate) fn new(store: Arc<S>, layout: Layout, root: Pointer, root_node: Arc<Node>) -> Self {
        Self {
            store,
            layout,
            root,
            root_node,
        }
    }

    /// Opens a read view on any root that was ever persisted to `store`.
    pub async fn open(store: Arc<S>, config: Config, root: Pointer) -> Result<Self> {
        config.validate()?;

        let layout = config.layout();
        let root_node = Navigator::new(&*store, layout).fetch_root(&root).await?;

        Ok(Self::new(store, layout, root, Arc::new(root_node)))
    }

    pub fn root(&self) -> Pointer {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.root_node
    }

    pub async fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.len() != self.layout.key_size {
            return Err(Error::KeyNotFound(hex::encode(key)));
        }

        Navigator::new(&*self.store, self.layout)
            .lookup(&self.root_node, key)
            .await
    }
}
