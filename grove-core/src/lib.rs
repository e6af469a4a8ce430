//! Grove Core Library
//!
//! A small content-addressed version-control engine:
//! - Object model (Blob, TreeEntry, Commit, Ref)
//! - Entry diff between staged-entry sets
//! - In-memory Merkle tree with incremental rehashing
//! - Tree and commit persistence over a pluggable store (SQLite, WAL mode)
//! - Repository operations: add, commit, status, checkout, branches, log

pub mod commit_store;
pub mod compress;
pub mod config;
pub mod content;
pub mod entry_diff;
pub mod error;
pub mod hash;
pub mod object;
pub mod path;
pub mod repository;
pub mod sqlite_store;
pub mod store;
pub mod tree;
pub mod tree_store;
pub mod worktree;

pub use commit_store::CommitStore;
pub use compress::{Codec, ZstdCodec};
pub use config::RepoConfig;
pub use content::{ContentReader, ReadStrategy, SizePolicy};
pub use entry_diff::{DiffResult, EntryDiff};
pub use error::{GroveError, Result};
pub use hash::{ContentHasher, HashAlgorithm, Sha1Hasher, Sha256Hasher};
pub use object::{Blob, Commit, CommitParent, EntryKind, IndexEntry, ObjectId, Ref, ReflogEntry, TreeEntry};
pub use repository::{AddSummary, CheckoutSummary, CreatedBranch, Repository, Status};
pub use sqlite_store::SqliteStore;
pub use store::Store;
pub use tree::Tree;
pub use tree_store::TreeStore;
pub use worktree::{FileStat, FsWorktree, Worktree};
