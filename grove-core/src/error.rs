//! Error types for Grove
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing is
//! retried internally; errors surface to the caller as-is.

use std::path::PathBuf;

use crate::object::ObjectId;

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, GroveError>;

/// Errors that can occur during repository operations
#[derive(Debug, thiserror::Error)]
pub enum GroveError {
    #[error("not a grove repository: {0:?}")]
    NotARepository(PathBuf),

    #[error("pathspec '{0}' did not match any files")]
    PathNotMatched(String),

    #[error("branch already exists: {0}")]
    BranchAlreadyExists(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch {0} is the head branch")]
    BranchIsHead(String),

    #[error("invalid branch name: '{0}'")]
    InvalidBranchName(String),

    #[error("uncommitted changes would be overwritten by checkout: {}", .paths.join(", "))]
    UncommittedChangesBlockCheckout { paths: Vec<String> },

    #[error("file too large: {path:?} is {size} bytes (limit {limit})")]
    UnsupportedFileSize { path: PathBuf, size: u64, limit: u64 },

    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("blob not found: {0}")]
    BlobNotFound(ObjectId),

    #[error("corrupted data: {0}")]
    Corrupted(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("worktree scan error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl GroveError {
    /// Check if this error indicates a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GroveError::PathNotMatched(_)
                | GroveError::BranchNotFound(_)
                | GroveError::CommitNotFound(_)
                | GroveError::BlobNotFound(_)
        )
    }

    /// Check if this error is a guard rejecting the requested mutation
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            GroveError::BranchAlreadyExists(_)
                | GroveError::BranchIsHead(_)
                | GroveError::UncommittedChangesBlockCheckout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = GroveError::BranchNotFound("refs/heads/dev".into());
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = GroveError::BranchIsHead("refs/heads/main".into());
        assert!(!conflict.is_not_found());
        assert!(conflict.is_conflict());
    }

    #[test]
    fn test_checkout_error_lists_paths() {
        let err = GroveError::UncommittedChangesBlockCheckout {
            paths: vec!["./a.txt".into(), "./b.txt".into()],
        };
        assert_eq!(
            err.to_string(),
            "uncommitted changes would be overwritten by checkout: ./a.txt, ./b.txt"
        );
    }
}
