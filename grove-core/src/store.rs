//! Persistence port
//!
//! Per-entity CRUD over the repository tables. Implementations hold no
//! domain logic: the tree builder, commit graph and repository compose
//! these calls in memory.

use crate::error::Result;
use crate::object::{Blob, Commit, CommitParent, IndexEntry, ObjectId, Ref, ReflogEntry, TreeEntry};

pub trait Store {
    /// Create the schema if it does not exist yet
    fn initialize(&self) -> Result<()>;

    /// True once [`Store::initialize`] has run
    fn is_initialized(&self) -> Result<bool>;

    fn begin(&self) -> Result<()>;
    fn commit_transaction(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;

    // ==================== Blobs ====================

    /// Insert a blob; returns false if a blob with that id already exists
    fn insert_blob(&self, blob: &Blob) -> Result<bool>;
    fn get_blob(&self, object_id: &ObjectId) -> Result<Option<Blob>>;
    fn has_blob(&self, object_id: &ObjectId) -> Result<bool>;

    // ==================== Index ====================

    /// All staged entries sorted by path
    fn list_index(&self) -> Result<Vec<IndexEntry>>;

    /// Staged entries equal to `prefix` or below it; `.` matches everything
    fn index_by_prefix(&self, prefix: &str) -> Result<Vec<IndexEntry>>;

    fn insert_index_entries(&self, entries: &[IndexEntry]) -> Result<()>;
    fn delete_index_entries(&self, entries: &[IndexEntry]) -> Result<()>;

    // ==================== Trees ====================

    /// Root tree row for a root tree id
    fn find_root_tree_entry(&self, object_id: &ObjectId) -> Result<Option<TreeEntry>>;

    /// Rows whose parent directory is `tree_id`
    fn tree_children(&self, tree_id: &ObjectId) -> Result<Vec<TreeEntry>>;

    /// True if a row with the same `(tree_id, entry_type, entry_object_id, entry_name)` exists
    fn has_tree_entry(&self, entry: &TreeEntry) -> Result<bool>;

    fn insert_tree_entries(&self, entries: &[TreeEntry]) -> Result<()>;

    // ==================== Commits ====================

    fn insert_commit(&self, commit: &Commit) -> Result<()>;
    fn get_commit(&self, object_id: &ObjectId) -> Result<Option<Commit>>;
    fn insert_commit_parent(&self, edge: &CommitParent) -> Result<()>;

    /// Parent edges of a commit ordered by `parent_order`
    fn commit_parents(&self, commit_id: &ObjectId) -> Result<Vec<CommitParent>>;

    /// Edges naming `parent_id` as a parent
    fn commit_children(&self, parent_id: &ObjectId) -> Result<Vec<CommitParent>>;

    // ==================== Refs ====================

    fn get_ref(&self, ref_name: &str) -> Result<Option<Ref>>;

    /// The ref of `ref_type` flagged as head
    fn head_ref(&self, ref_type: &str) -> Result<Option<Ref>>;

    /// Refs of `ref_type` sorted by name
    fn list_refs(&self, ref_type: &str) -> Result<Vec<Ref>>;

    fn insert_ref(&self, r: &Ref) -> Result<()>;

    /// Overwrite the row keyed by `r.ref_name`
    fn update_ref(&self, r: &Ref) -> Result<()>;

    /// Rename a ref and carry its reflog along
    fn rename_ref(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Returns false if no such ref existed
    fn delete_ref(&self, ref_name: &str) -> Result<bool>;

    // ==================== Reflog ====================

    /// Append an entry, assigning the next sequence number for its ref
    fn append_reflog(&self, entry: &ReflogEntry) -> Result<u64>;

    /// Entries of a ref, newest first
    fn list_reflog(&self, ref_name: &str) -> Result<Vec<ReflogEntry>>;
}
