//! Core object model for Grove
//!
//! Content-addressed Blob, TreeEntry and Commit records plus the mutable
//! staging (IndexEntry) and ref rows. Everything except index entries and
//! refs is write-once and keyed by its content hash.

use serde::{Deserialize, Serialize};

/// Mode of a regular file
pub const MODE_FILE: &str = "100644";
/// Mode of an executable file
pub const MODE_EXECUTABLE: &str = "100755";
/// Mode of a directory (tree) entry
pub const MODE_DIRECTORY: &str = "040000";

/// Ref type used for branches
pub const REF_TYPE_BRANCH: &str = "branch";
/// Prefix of every branch ref name
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Hex-encoded content hash identifying a stored object
///
/// The length depends on the configured hash algorithm (40 for SHA-1,
/// 64 for SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap an already hex-encoded digest
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Encode raw digest bytes
    pub fn from_digest(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse from a hexadecimal string
    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex_str)?;
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in human-readable output
    pub fn short(&self) -> &str {
        let end = self.0.len().min(7);
        &self.0[..end]
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tree entry type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(EntryKind::Blob),
            "tree" => Some(EntryKind::Tree),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Normalized repository path (`./dir/file`), unique key
    pub path: String,
    /// Hash of the staged content
    pub object_id: ObjectId,
    /// File mode string (`100644`, `100755`)
    pub mode: String,
    /// Size in bytes, when known
    pub size: Option<u64>,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, object_id: ObjectId, mode: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            object_id,
            mode: mode.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Stored file payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Hash of the raw content
    pub object_id: ObjectId,
    /// Compressed content
    pub data: Vec<u8>,
    /// Uncompressed size in bytes
    pub size: u64,
    pub created_at: String,
}

/// Node of a persisted Merkle tree
///
/// `tree_id` is the object id of the directory containing this entry; it
/// is `None` only for the root anchor row. `entry_object_id` stays `None`
/// on directories until the tree is hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub tree_id: Option<ObjectId>,
    pub entry_name: String,
    pub entry_mode: String,
    pub entry_object_id: Option<ObjectId>,
    pub entry_type: EntryKind,
}

impl TreeEntry {
    /// Create a directory entry with no hash yet
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            tree_id: None,
            entry_name: name.into(),
            entry_mode: MODE_DIRECTORY.to_string(),
            entry_object_id: None,
            entry_type: EntryKind::Tree,
        }
    }

    /// Create a file entry
    pub fn file(name: impl Into<String>, object_id: ObjectId, mode: impl Into<String>) -> Self {
        Self {
            tree_id: None,
            entry_name: name.into(),
            entry_mode: mode.into(),
            entry_object_id: Some(object_id),
            entry_type: EntryKind::Blob,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.entry_type == EntryKind::Tree
    }

    /// The `mode:type:object_id:name` line hashed into the parent directory
    pub fn hashable_line(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.entry_mode,
            self.entry_type,
            self.entry_object_id.as_ref().map(ObjectId::as_str).unwrap_or(""),
            self.entry_name
        )
    }
}

/// Commit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub object_id: ObjectId,
    /// Root tree object id
    pub tree_id: ObjectId,
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: String,
    pub message: String,
    /// Depth in the commit graph; 0 for a root commit
    pub generation_number: u64,
    pub created_at: String,
}

/// Parent edge of the commit graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitParent {
    pub commit_id: ObjectId,
    pub parent_id: ObjectId,
    pub parent_order: u32,
}

/// Named pointer to a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    /// Full ref name, e.g. `refs/heads/main`
    pub ref_name: String,
    pub ref_type: String,
    /// Whether this branch is checked out
    pub head: bool,
    /// Commit the ref points at; `None` before the first commit
    pub target_object_id: Option<ObjectId>,
    pub updated_at: String,
}

impl Ref {
    /// Create a branch ref
    pub fn branch(name: &str, target: Option<ObjectId>, head: bool, updated_at: String) -> Self {
        Self {
            ref_name: branch_ref_name(name),
            ref_type: REF_TYPE_BRANCH.to_string(),
            head,
            target_object_id: target,
            updated_at,
        }
    }

    /// Short branch name (`main` for `refs/heads/main`)
    pub fn branch_name(&self) -> &str {
        self.ref_name
            .strip_prefix(BRANCH_REF_PREFIX)
            .unwrap_or(&self.ref_name)
    }
}

/// Full ref name of a branch
pub fn branch_ref_name(name: &str) -> String {
    format!("{}{}", BRANCH_REF_PREFIX, name)
}

/// One movement of a ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflogEntry {
    pub ref_name: String,
    pub timestamp: String,
    pub old_object_id: Option<ObjectId>,
    pub new_object_id: Option<ObjectId>,
    pub committer_name: String,
    pub committer_email: String,
    pub message: String,
    /// Monotonic per-ref sequence number
    pub sequence: u64,
}

/// Current local time in the format stored in every timestamp column
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_from_hex() {
        let id = ObjectId::from_hex("ABCDEF0123").unwrap();
        assert_eq!(id.as_str(), "abcdef0123");
        assert_eq!(id.short(), "abcdef0");
        assert!(ObjectId::from_hex("not-hex").is_err());
    }

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!(EntryKind::parse("blob"), Some(EntryKind::Blob));
        assert_eq!(EntryKind::parse("tree"), Some(EntryKind::Tree));
        assert_eq!(EntryKind::parse("commit"), None);
    }

    #[test]
    fn test_hashable_line() {
        let entry = TreeEntry::file("c.txt", ObjectId::new("abc"), MODE_FILE);
        assert_eq!(entry.hashable_line(), "100644:blob:abc:c.txt");

        let dir = TreeEntry::directory("a");
        assert_eq!(dir.hashable_line(), "040000:tree::a");
    }

    #[test]
    fn test_ref_branch_name() {
        let r = Ref::branch("feature", None, false, timestamp_now());
        assert_eq!(r.ref_name, "refs/heads/feature");
        assert_eq!(r.branch_name(), "feature");
        assert_eq!(r.ref_type, REF_TYPE_BRANCH);
    }
}
