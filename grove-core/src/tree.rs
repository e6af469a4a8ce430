//! In-memory Merkle tree of a commit snapshot
//!
//! The tree is an arena keyed by normalized path (`.`, `./a`, `./a/b.txt`).
//! Parent and child links are path lookups into that arena, never
//! references, so nodes can be added, replaced and pruned freely.
//!
//! Directory hashes are computed lazily: every mutation clears the
//! `entry_object_id` of the directories on its path, and
//! [`Tree::build_object_ids`] rehashes exactly those directories bottom-up.
//! A directory hash covers its direct children only, serialized as sorted
//! `mode:type:object_id:name` lines, so identical subtrees always converge
//! to the same id.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::hash::ContentHasher;
use crate::object::{EntryKind, IndexEntry, ObjectId, TreeEntry};
use crate::path::{ROOT, ancestors, file_name, join, normalize_path, parent, segments};

#[derive(Debug, Clone)]
struct TreeNode {
    entry: TreeEntry,
    /// Names of direct children, sorted
    children: BTreeSet<String>,
}

impl TreeNode {
    fn new(entry: TreeEntry) -> Self {
        Self {
            entry,
            children: BTreeSet::new(),
        }
    }
}

/// Path-indexed Merkle tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Create a tree holding only an unhashed root directory
    pub fn new() -> Self {
        Self::from_root(TreeEntry::directory(ROOT))
    }

    /// Create a tree with no root (nothing committed yet)
    pub fn empty() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Create a tree anchored at an existing root entry
    pub fn from_root(root: TreeEntry) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT.to_string(), TreeNode::new(root));
        Self { nodes }
    }

    pub fn root_entry(&self) -> Option<&TreeEntry> {
        self.nodes.get(ROOT).map(|node| &node.entry)
    }

    pub fn get_entry(&self, path: &str) -> Option<&TreeEntry> {
        self.nodes.get(&normalize_path(path)).map(|node| &node.entry)
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.nodes.contains_key(&normalize_path(path))
    }

    /// Direct children of a directory, sorted by name
    pub fn children(&self, path: &str) -> Vec<&TreeEntry> {
        let path = normalize_path(path);
        match self.nodes.get(&path) {
            Some(node) => node
                .children
                .iter()
                .filter_map(|name| self.nodes.get(&join(&path, name)))
                .map(|child| &child.entry)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of indexed entries, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All indexed paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Insert a file, creating any missing ancestor directories
    pub fn add(&mut self, entry: &IndexEntry) {
        let target = normalize_path(&entry.path);
        let names: Vec<String> = segments(&target).into_iter().map(str::to_string).collect();
        if names.is_empty() {
            return;
        }
        if !self.nodes.contains_key(ROOT) {
            self.nodes
                .insert(ROOT.to_string(), TreeNode::new(TreeEntry::directory(ROOT)));
        }
        self.invalidate(ROOT);

        let mut parent_path = ROOT.to_string();
        for (i, name) in names.iter().enumerate() {
            let path = join(&parent_path, name);
            let is_last = i + 1 == names.len();
            let existing = self.nodes.get(&path).map(|node| node.entry.entry_type);
            match (existing, is_last) {
                (Some(EntryKind::Tree), false) => self.invalidate(&path),
                (Some(EntryKind::Blob), true) => self.set_blob(&path, entry),
                (Some(_), _) => {
                    // a file became a directory or the other way round
                    self.detach(&path);
                    self.insert_child(&parent_path, new_entry(name, entry, is_last));
                }
                (None, _) => {
                    self.insert_child(&parent_path, new_entry(name, entry, is_last));
                }
            }
            parent_path = path;
        }
    }

    /// Overwrite an existing file's id and mode, invalidating its ancestors
    ///
    /// Falls back to [`Tree::add`] when the path is not a file in the tree.
    pub fn update(&mut self, entry: &IndexEntry) {
        let target = normalize_path(&entry.path);
        let is_blob = matches!(
            self.nodes.get(&target).map(|node| node.entry.entry_type),
            Some(EntryKind::Blob)
        );
        if !is_blob {
            self.add(entry);
            return;
        }
        self.set_blob(&target, entry);
        let chain = ancestors(&target);
        for path in &chain[..chain.len() - 1] {
            self.invalidate(path);
        }
    }

    /// Remove a file and prune directories left empty
    ///
    /// Returns false when no file sits at the path. Directories are only
    /// ever removed by pruning, and the root is never pruned.
    pub fn remove(&mut self, entry: &IndexEntry) -> bool {
        let target = normalize_path(&entry.path);
        let is_blob = matches!(
            self.nodes.get(&target).map(|node| node.entry.entry_type),
            Some(EntryKind::Blob)
        );
        if !is_blob {
            return false;
        }
        self.detach(&target);

        let mut current = parent(&target).map(str::to_string);
        while let Some(path) = current {
            let is_empty = self
                .nodes
                .get(&path)
                .map(|node| node.children.is_empty())
                .unwrap_or(false);
            if is_empty && path != ROOT {
                self.detach(&path);
            } else {
                self.invalidate(&path);
            }
            current = parent(&path).map(str::to_string);
        }
        true
    }

    /// Rehash every directory whose id was invalidated
    ///
    /// Returns the changeset to persist: each rehashed directory plus every
    /// direct child re-stamped with the directory's new id. Returns nothing
    /// when the root is already hashed.
    pub fn build_object_ids(&mut self, hasher: &dyn ContentHasher) -> Vec<TreeEntry> {
        match self.nodes.get(ROOT) {
            Some(root) if root.entry.entry_object_id.is_none() => {}
            _ => return Vec::new(),
        }

        let mut rehashed = Vec::new();
        self.hash_directory(ROOT, hasher, &mut rehashed);

        let mut seen = HashSet::new();
        let mut changed = Vec::new();
        for dir in &rehashed {
            let Some(node) = self.nodes.get(dir) else {
                continue;
            };
            if seen.insert(dir.clone()) {
                changed.push(node.entry.clone());
            }
            for name in &node.children {
                let child_path = join(dir, name);
                if let Some(child) = self.nodes.get(&child_path) {
                    if seen.insert(child_path) {
                        changed.push(child.entry.clone());
                    }
                }
            }
        }
        changed
    }

    /// Flatten the files of the tree into index entries, sorted by path
    pub fn list_index_entries(&self) -> Vec<IndexEntry> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.entry.entry_type == EntryKind::Blob)
            .filter_map(|(path, node)| {
                node.entry
                    .entry_object_id
                    .clone()
                    .map(|oid| IndexEntry::new(path.clone(), oid, node.entry.entry_mode.clone()))
            })
            .collect()
    }

    /// Link a persisted entry under `parent_path`, returning its path
    ///
    /// An entry already present at that path is kept.
    pub(crate) fn attach(&mut self, parent_path: &str, entry: TreeEntry) -> String {
        let path = join(parent_path, &entry.entry_name);
        if !self.nodes.contains_key(&path) {
            if let Some(parent) = self.nodes.get_mut(parent_path) {
                parent.children.insert(entry.entry_name.clone());
            }
            self.nodes.insert(path.clone(), TreeNode::new(entry));
        }
        path
    }

    fn hash_directory(
        &mut self,
        path: &str,
        hasher: &dyn ContentHasher,
        rehashed: &mut Vec<String>,
    ) -> ObjectId {
        let child_paths: Vec<String> = self
            .nodes
            .get(path)
            .map(|node| node.children.iter().map(|name| join(path, name)).collect())
            .unwrap_or_default();

        for child_path in &child_paths {
            let stale = self
                .nodes
                .get(child_path)
                .map(|child| child.entry.is_tree() && child.entry.entry_object_id.is_none())
                .unwrap_or(false);
            if stale {
                self.hash_directory(child_path, hasher, rehashed);
            }
        }

        let content = child_paths
            .iter()
            .filter_map(|child_path| self.nodes.get(child_path))
            .map(|child| child.entry.hashable_line())
            .collect::<Vec<_>>()
            .join("\n");
        let object_id = hasher.hash_bytes(content.as_bytes());

        if let Some(node) = self.nodes.get_mut(path) {
            node.entry.entry_object_id = Some(object_id.clone());
        }
        for child_path in &child_paths {
            if let Some(child) = self.nodes.get_mut(child_path) {
                child.entry.tree_id = Some(object_id.clone());
            }
        }
        rehashed.push(path.to_string());
        object_id
    }

    fn insert_child(&mut self, parent_path: &str, entry: TreeEntry) {
        let path = join(parent_path, &entry.entry_name);
        if let Some(parent) = self.nodes.get_mut(parent_path) {
            parent.children.insert(entry.entry_name.clone());
        }
        self.nodes.insert(path, TreeNode::new(entry));
    }

    fn set_blob(&mut self, path: &str, entry: &IndexEntry) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.entry.entry_object_id = Some(entry.object_id.clone());
            node.entry.entry_mode = entry.mode.clone();
        }
    }

    fn invalidate(&mut self, path: &str) {
        if let Some(node) = self.nodes.get_mut(path) {
            if node.entry.is_tree() {
                node.entry.entry_object_id = None;
            }
        }
    }

    /// Remove a node with its whole subtree and unlink it from its parent
    fn detach(&mut self, path: &str) {
        if let Some(node) = self.nodes.remove(path) {
            for name in &node.children {
                self.detach(&join(path, name));
            }
        }
        if let Some(parent_path) = parent(path) {
            if let Some(parent) = self.nodes.get_mut(parent_path) {
                parent.children.remove(file_name(path));
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

fn new_entry(name: &str, entry: &IndexEntry, is_file: bool) -> TreeEntry {
    if is_file {
        TreeEntry::file(name, entry.object_id.clone(), entry.mode.clone())
    } else {
        TreeEntry::directory(name)
    }
}
