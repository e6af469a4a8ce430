//! Persisting and reconstructing Merkle trees
//!
//! Tree rows are flat: each row names its parent directory by id. A tree is
//! rebuilt by walking from the root row down through `tree_id` links, and
//! saved by inserting only the rows not already present, so a subtree shared
//! by several commits is stored once.

use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::object::{ObjectId, TreeEntry};
use crate::path::ROOT;
use crate::store::Store;
use crate::tree::Tree;

pub struct TreeStore<'a> {
    store: &'a dyn Store,
}

impl<'a> TreeStore<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Materialize the tree rooted at `root_tree_id`
    ///
    /// Returns an empty tree (no root) when there is no id or no matching
    /// root row.
    pub fn build_commit_tree(&self, root_tree_id: Option<&ObjectId>) -> Result<Tree> {
        let Some(root_id) = root_tree_id else {
            return Ok(Tree::empty());
        };
        let Some(root) = self.store.find_root_tree_entry(root_id)? else {
            debug!(tree_id = %root_id, "no root tree entry");
            return Ok(Tree::empty());
        };

        let mut tree = Tree::from_root(root);
        let mut stack = vec![(ROOT.to_string(), root_id.clone())];
        while let Some((path, tree_id)) = stack.pop() {
            for child in self.store.tree_children(&tree_id)? {
                let subtree = if child.is_tree() {
                    child.entry_object_id.clone()
                } else {
                    None
                };
                let child_path = tree.attach(&path, child);
                if let Some(id) = subtree {
                    stack.push((child_path, id));
                }
            }
        }
        Ok(tree)
    }

    /// Insert the root and the changed rows that are not stored yet
    pub fn save_commit_tree(&self, root: &TreeEntry, changed: &[TreeEntry]) -> Result<TreeEntry> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        let mut skipped = 0usize;
        for entry in std::iter::once(root).chain(changed) {
            let key = (
                entry.tree_id.clone(),
                entry.entry_type,
                entry.entry_object_id.clone(),
                entry.entry_name.clone(),
            );
            if !seen.insert(key) || self.store.has_tree_entry(entry)? {
                skipped += 1;
                continue;
            }
            pending.push(entry.clone());
        }
        self.store.insert_tree_entries(&pending)?;
        debug!(inserted = pending.len(), skipped, "saved tree entries");
        Ok(root.clone())
    }
}
