//! Repository orchestration
//!
//! Sequences the worktree, the staging index and the committed trees into
//! the user-facing operations: init, add, commit, status, checkout, log and
//! branch management. Every mutating operation runs inside one store
//! transaction.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::commit_store::CommitStore;
use crate::compress::Codec;
use crate::config::{CONFIG_FILE, RepoConfig};
use crate::content::ContentReader;
use crate::entry_diff::{DiffResult, EntryDiff};
use crate::error::{GroveError, Result};
use crate::hash::ContentHasher;
use crate::object::{
    Blob, Commit, IndexEntry, ObjectId, REF_TYPE_BRANCH, Ref, ReflogEntry, branch_ref_name,
    timestamp_now,
};
use crate::path::{ROOT, to_repo_path};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;
use crate::tree::Tree;
use crate::tree_store::TreeStore;
use crate::worktree::{FsWorktree, REPO_DIR, Worktree};

/// Database file inside the repository directory
pub const DATABASE_FILE: &str = "grove.db";
/// Branch created by `init`
pub const DEFAULT_BRANCH: &str = "main";

/// Outcome of staging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    /// Blobs actually written; unchanged content is never stored twice
    pub blobs_created: usize,
}

/// Working state relative to the index and the head commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub branch_name: String,
    /// Index against the head commit's tree
    pub staged: DiffResult,
    /// Worktree against the index; `added` holds the untracked files
    pub unstaged: DiffResult,
}

impl Status {
    pub fn untracked(&self) -> &[IndexEntry] {
        &self.unstaged.added
    }

    /// No staged changes and no unstaged changes to tracked files
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.modified.is_empty() && self.unstaged.deleted.is_empty()
    }

    /// Paths a checkout would clobber
    fn dirty_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .staged
            .paths()
            .into_iter()
            .chain(self.unstaged.modified.iter().map(|e| e.path.as_str()))
            .chain(self.unstaged.deleted.iter().map(|e| e.path.as_str()))
            .map(str::to_string)
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Outcome of switching branches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub from: String,
    pub to: String,
    pub written: usize,
    pub deleted: usize,
}

/// Outcome of `create_branch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBranch {
    pub branch: Ref,
    /// True when the empty head branch was renamed instead of a new ref
    pub renamed: bool,
}

pub struct Repository {
    root: PathBuf,
    repo_dir: PathBuf,
    store: Option<Box<dyn Store>>,
    worktree: Box<dyn Worktree>,
    hasher: Box<dyn ContentHasher>,
    codec: Box<dyn Codec>,
    config: RepoConfig,
}

impl Repository {
    /// Open the repository whose worktree is `root`
    ///
    /// Opening never creates anything; operations other than `init` fail
    /// with [`GroveError::NotARepository`] until the repository exists.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let repo_dir = root.join(REPO_DIR);
        let config = RepoConfig::load(&repo_dir)?;
        let db_path = repo_dir.join(DATABASE_FILE);
        let store: Option<Box<dyn Store>> = if db_path.exists() {
            Some(Box::new(SqliteStore::open(&db_path)?))
        } else {
            None
        };
        let worktree = Box::new(FsWorktree::new(root.clone()));
        Ok(Self::assemble(root, store, worktree, config))
    }

    /// Build a repository from explicit collaborators
    pub fn from_parts(
        root: impl Into<PathBuf>,
        store: Box<dyn Store>,
        worktree: Box<dyn Worktree>,
        config: RepoConfig,
    ) -> Self {
        Self::assemble(root.into(), Some(store), worktree, config)
    }

    fn assemble(
        root: PathBuf,
        store: Option<Box<dyn Store>>,
        worktree: Box<dyn Worktree>,
        config: RepoConfig,
    ) -> Self {
        Self {
            repo_dir: root.join(REPO_DIR),
            root,
            store,
            worktree,
            hasher: config.hash_algorithm.hasher(),
            codec: config.codec(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> Result<bool> {
        match &self.store {
            Some(store) if store.is_initialized()? => {
                Ok(store.head_ref(REF_TYPE_BRANCH)?.is_some())
            }
            _ => Ok(false),
        }
    }

    /// Create the schema and the `main` head branch
    ///
    /// Returns false when the repository already existed.
    pub fn init(&mut self) -> Result<bool> {
        if self.is_initialized()? {
            return Ok(false);
        }
        if self.store.is_none() {
            fs::create_dir_all(&self.repo_dir)?;
            let store = SqliteStore::open(&self.repo_dir.join(DATABASE_FILE))?;
            self.store = Some(Box::new(store));
        }
        if !self.repo_dir.join(CONFIG_FILE).exists() {
            self.config.save(&self.repo_dir)?;
        }
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| GroveError::NotARepository(self.root.clone()))?;
        store.initialize()?;
        store.insert_ref(&Ref::branch(DEFAULT_BRANCH, None, true, timestamp_now()))?;
        info!(root = ?self.root, "initialized repository");
        Ok(true)
    }

    // ==================== Branches ====================

    pub fn list_branches(&self) -> Result<Vec<Ref>> {
        self.store()?.list_refs(REF_TYPE_BRANCH)
    }

    pub fn head_branch(&self) -> Result<Ref> {
        head_ref(self.store()?)
    }

    /// Create a branch at the head commit
    ///
    /// While the head branch has no commit it is renamed instead, so no
    /// branch ever points nowhere alongside another.
    pub fn create_branch(&self, name: &str) -> Result<CreatedBranch> {
        validate_branch_name(name)?;
        self.transaction(|store| {
            let ref_name = branch_ref_name(name);
            if store.get_ref(&ref_name)?.is_some() {
                return Err(GroveError::BranchAlreadyExists(ref_name));
            }
            let head = head_ref(store)?;
            let Some(target) = head.target_object_id.clone() else {
                store.rename_ref(&head.ref_name, &ref_name)?;
                info!(from = %head.ref_name, to = %ref_name, "renamed empty head branch");
                let branch = store
                    .get_ref(&ref_name)?
                    .ok_or_else(|| GroveError::BranchNotFound(ref_name.clone()))?;
                return Ok(CreatedBranch {
                    branch,
                    renamed: true,
                });
            };

            let branch = Ref::branch(name, Some(target.clone()), false, timestamp_now());
            store.insert_ref(&branch)?;
            self.append_reflog(
                store,
                &branch.ref_name,
                None,
                Some(target),
                format!("branch: created from {}", head.branch_name()),
            )?;
            info!(branch = %branch.ref_name, "created branch");
            Ok(CreatedBranch {
                branch,
                renamed: false,
            })
        })
    }

    /// Rename the head branch in place
    pub fn rename_head_branch(&self, new_name: &str) -> Result<Ref> {
        validate_branch_name(new_name)?;
        self.transaction(|store| {
            let ref_name = branch_ref_name(new_name);
            if store.get_ref(&ref_name)?.is_some() {
                return Err(GroveError::BranchAlreadyExists(ref_name));
            }
            let head = head_ref(store)?;
            store.rename_ref(&head.ref_name, &ref_name)?;
            self.append_reflog(
                store,
                &ref_name,
                head.target_object_id.clone(),
                head.target_object_id.clone(),
                format!("branch: renamed {} to {}", head.ref_name, ref_name),
            )?;
            info!(from = %head.ref_name, to = %ref_name, "renamed head branch");
            store
                .get_ref(&ref_name)?
                .ok_or(GroveError::BranchNotFound(ref_name))
        })
    }

    /// Move the head flag to another branch without touching the worktree
    pub fn update_head_branch(&self, name: &str) -> Result<Ref> {
        self.transaction(|store| {
            let target = find_branch(store, name)?;
            if target.head {
                return Ok(target);
            }
            let head = head_ref(store)?;
            self.switch_head(store, &head, &target)
        })
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.transaction(|store| {
            let branch = find_branch(store, name)?;
            if branch.head {
                return Err(GroveError::BranchIsHead(branch.ref_name));
            }
            store.delete_ref(&branch.ref_name)?;
            info!(branch = %branch.ref_name, "deleted branch");
            Ok(())
        })
    }

    // ==================== Staging ====================

    /// Stage the files matched by `pathspecs`
    ///
    /// Files gone from the worktree are unstaged. Every pathspec must match
    /// a staged entry or a worktree file.
    pub fn add_index<S: AsRef<str>>(&self, pathspecs: &[S]) -> Result<AddSummary> {
        let store = self.store()?;
        for spec in pathspecs {
            let spec = spec.as_ref();
            let Some(prefix) = to_repo_path(&self.root, Path::new(spec)) else {
                return Err(GroveError::PathNotMatched(spec.to_string()));
            };
            if store.index_by_prefix(&prefix)?.is_empty() && self.worktree.matches(spec)?.is_empty() {
                return Err(GroveError::PathNotMatched(spec.to_string()));
            }
        }

        let diff = self.compare_worktree_to_index(store, pathspecs)?;
        if diff.is_empty() {
            debug!("nothing to stage");
            return Ok(AddSummary::default());
        }

        self.transaction(|store| {
            store.insert_index_entries(&diff.added)?;
            store.delete_index_entries(&diff.modified)?;
            store.insert_index_entries(&diff.modified)?;
            store.delete_index_entries(&diff.deleted)?;

            let reader = self.reader();
            let mut blobs_created = 0;
            for entry in diff.added.iter().chain(&diff.modified) {
                if store.has_blob(&entry.object_id)? {
                    debug!(blob = %entry.object_id, "blob already stored");
                    continue;
                }
                let (data, size) = reader.compress_file(&self.worktree.absolute_path(&entry.path))?;
                let blob = Blob {
                    object_id: entry.object_id.clone(),
                    data,
                    size,
                    created_at: timestamp_now(),
                };
                if store.insert_blob(&blob)? {
                    blobs_created += 1;
                }
            }

            let summary = AddSummary {
                added: diff.added.len(),
                modified: diff.modified.len(),
                deleted: diff.deleted.len(),
                blobs_created,
            };
            info!(
                added = summary.added,
                modified = summary.modified,
                deleted = summary.deleted,
                blobs = blobs_created,
                "staged changes"
            );
            Ok(summary)
        })
    }

    // ==================== Commits ====================

    /// Commit the index on the head branch
    ///
    /// Returns `None` when the index matches the head commit.
    pub fn commit(&self, message: &str) -> Result<Option<Commit>> {
        self.transaction(|store| {
            let head = head_ref(store)?;
            let commits = self.commit_store(store);
            let trees = TreeStore::new(store);

            let head_commit = match &head.target_object_id {
                Some(id) => Some(commits.get_commit(id)?),
                None => None,
            };
            let mut tree = trees.build_commit_tree(head_commit.as_ref().map(|c| &c.tree_id))?;

            let diff = EntryDiff::compare(&tree.list_index_entries(), &store.list_index()?);
            if diff.is_empty() {
                debug!("nothing to commit");
                return Ok(None);
            }
            // deletions first so a path that changed type is free for its add
            for entry in &diff.deleted {
                tree.remove(entry);
            }
            for entry in &diff.added {
                tree.add(entry);
            }
            for entry in &diff.modified {
                tree.update(entry);
            }

            let changed = tree.build_object_ids(self.hasher.as_ref());
            let root = tree
                .root_entry()
                .ok_or_else(|| GroveError::Corrupted("commit tree has no root".into()))?;
            let root = trees.save_commit_tree(root, &changed)?;
            let tree_id = root
                .entry_object_id
                .ok_or_else(|| GroveError::Corrupted("root tree was not hashed".into()))?;

            let commit = commits.save_commit(&tree_id, message, head_commit.as_ref())?;
            let updated = Ref {
                target_object_id: Some(commit.object_id.clone()),
                updated_at: timestamp_now(),
                ..head.clone()
            };
            store.update_ref(&updated)?;
            self.append_reflog(
                store,
                &head.ref_name,
                head.target_object_id.clone(),
                Some(commit.object_id.clone()),
                format!("commit: {}", first_line(message)),
            )?;
            info!(
                commit = %commit.object_id,
                tree = %tree_id,
                generation = commit.generation_number,
                branch = %head.ref_name,
                "created commit"
            );
            Ok(Some(commit))
        })
    }

    /// First-parent history of the head branch, newest first
    pub fn log(&self) -> Result<Vec<Commit>> {
        let store = self.store()?;
        let head = head_ref(store)?;
        match &head.target_object_id {
            Some(id) => self.commit_store(store).list_commit_logs(id),
            None => Ok(Vec::new()),
        }
    }

    /// Movements of a branch (the head branch by default), newest first
    pub fn reflog(&self, branch: Option<&str>) -> Result<Vec<ReflogEntry>> {
        let store = self.store()?;
        let r = match branch {
            Some(name) => find_branch(store, name)?,
            None => head_ref(store)?,
        };
        store.list_reflog(&r.ref_name)
    }

    // ==================== Status / checkout ====================

    pub fn status(&self) -> Result<Status> {
        let store = self.store()?;
        let head = head_ref(store)?;
        let unstaged = self.compare_worktree_to_index(store, &[ROOT])?;
        let tree = self.branch_tree(store, &head)?;
        let staged = EntryDiff::compare(&tree.list_index_entries(), &store.list_index()?);
        Ok(Status {
            branch_name: head.branch_name().to_string(),
            staged,
            unstaged,
        })
    }

    /// Switch the worktree, the index and the head flag to `name`
    ///
    /// Refuses to run while any tracked change is uncommitted, or when an
    /// untracked file sits where the target branch has a file. Blobs are
    /// read before the worktree changes; an I/O failure while deleting or
    /// writing files rolls back the index and head but not the worktree.
    pub fn checkout(&self, name: &str) -> Result<CheckoutSummary> {
        let store = self.store()?;
        let target = find_branch(store, name)?;
        let head = head_ref(store)?;
        if target.head {
            debug!(branch = %target.ref_name, "already on branch");
            return Ok(CheckoutSummary {
                from: head.branch_name().to_string(),
                to: target.branch_name().to_string(),
                ..CheckoutSummary::default()
            });
        }

        let status = self.status()?;
        if !status.is_clean() {
            return Err(GroveError::UncommittedChangesBlockCheckout {
                paths: status.dirty_paths(),
            });
        }

        let target_tree = self.branch_tree(store, &target)?;
        let diff = EntryDiff::compare(&store.list_index()?, &target_tree.list_index_entries());

        let untracked: HashSet<&str> = status.untracked().iter().map(|e| e.path.as_str()).collect();
        let collisions: Vec<String> = diff
            .added
            .iter()
            .filter(|e| untracked.contains(e.path.as_str()))
            .map(|e| e.path.clone())
            .collect();
        if !collisions.is_empty() {
            return Err(GroveError::UncommittedChangesBlockCheckout { paths: collisions });
        }

        self.transaction(|store| {
            // every blob is loaded before the worktree is touched
            let mut pending = Vec::with_capacity(diff.added.len() + diff.modified.len());
            for (entry, is_new) in diff
                .added
                .iter()
                .map(|e| (e, true))
                .chain(diff.modified.iter().map(|e| (e, false)))
            {
                let blob = store
                    .get_blob(&entry.object_id)?
                    .ok_or_else(|| GroveError::BlobNotFound(entry.object_id.clone()))?;
                let data = self.codec.decompress(&blob.data)?;
                pending.push((entry.clone().with_size(blob.size), data, is_new));
            }

            // deletes run first so a path that changes between file and
            // directory is vacant when it is written
            for entry in &diff.deleted {
                self.worktree.delete(entry)?;
            }
            let mut staged_added = Vec::with_capacity(diff.added.len());
            let mut staged_modified = Vec::with_capacity(diff.modified.len());
            for (staged, data, is_new) in pending {
                self.worktree.write(&staged, &data)?;
                if is_new {
                    staged_added.push(staged);
                } else {
                    staged_modified.push(staged);
                }
            }

            store.delete_index_entries(&diff.deleted)?;
            store.insert_index_entries(&staged_added)?;
            store.delete_index_entries(&staged_modified)?;
            store.insert_index_entries(&staged_modified)?;

            self.switch_head(store, &head, &target)?;
            let summary = CheckoutSummary {
                from: head.branch_name().to_string(),
                to: target.branch_name().to_string(),
                written: staged_added.len() + staged_modified.len(),
                deleted: diff.deleted.len(),
            };
            info!(
                from = %summary.from,
                to = %summary.to,
                written = summary.written,
                deleted = summary.deleted,
                "checked out branch"
            );
            Ok(summary)
        })
    }

    // ==================== Internals ====================

    fn store(&self) -> Result<&dyn Store> {
        match self.store.as_deref() {
            Some(store) if store.is_initialized()? => Ok(store),
            _ => Err(GroveError::NotARepository(self.root.clone())),
        }
    }

    fn transaction<T>(&self, f: impl FnOnce(&dyn Store) -> Result<T>) -> Result<T> {
        let store = self.store()?;
        store.begin()?;
        match f(store) {
            Ok(value) => {
                store.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = store.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn reader(&self) -> ContentReader<'_> {
        ContentReader::new(self.hasher.as_ref(), self.codec.as_ref(), self.config.size_policy())
    }

    fn commit_store<'a>(&'a self, store: &'a dyn Store) -> CommitStore<'a> {
        CommitStore::new(store, self.hasher.as_ref(), &self.config)
    }

    /// Committed tree a branch points at; empty for a branch with no commit
    fn branch_tree(&self, store: &dyn Store, branch: &Ref) -> Result<Tree> {
        let Some(id) = &branch.target_object_id else {
            return Ok(Tree::empty());
        };
        let commit = self.commit_store(store).get_commit(id)?;
        TreeStore::new(store).build_commit_tree(Some(&commit.tree_id))
    }

    /// Diff the staged entries under `pathspecs` (base) against the files
    /// the worktree holds there now (target)
    fn compare_worktree_to_index<S: AsRef<str>>(
        &self,
        store: &dyn Store,
        pathspecs: &[S],
    ) -> Result<DiffResult> {
        let mut staged = Vec::new();
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for spec in pathspecs {
            let spec = spec.as_ref();
            if let Some(prefix) = to_repo_path(&self.root, Path::new(spec)) {
                for entry in store.index_by_prefix(&prefix)? {
                    if seen.insert(entry.path.clone()) {
                        staged.push(entry);
                    }
                }
            }
            files.extend(self.worktree.matches(spec)?);
        }
        files.sort();
        files.dedup();

        let reader = self.reader();
        let mut current = Vec::with_capacity(files.len());
        for path in files {
            let object_id = reader.hash_file(&self.worktree.absolute_path(&path))?;
            let stat = self.worktree.stat(&path)?;
            current.push(IndexEntry::new(path, object_id, stat.mode).with_size(stat.size));
        }
        Ok(EntryDiff::compare(&staged, &current))
    }

    fn switch_head(&self, store: &dyn Store, from: &Ref, to: &Ref) -> Result<Ref> {
        let now = timestamp_now();
        store.update_ref(&Ref {
            head: false,
            updated_at: now.clone(),
            ..from.clone()
        })?;
        let new_head = Ref {
            head: true,
            updated_at: now,
            ..to.clone()
        };
        store.update_ref(&new_head)?;
        self.append_reflog(
            store,
            &to.ref_name,
            from.target_object_id.clone(),
            to.target_object_id.clone(),
            format!("checkout: moving from {} to {}", from.branch_name(), to.branch_name()),
        )?;
        Ok(new_head)
    }

    fn append_reflog(
        &self,
        store: &dyn Store,
        ref_name: &str,
        old_object_id: Option<ObjectId>,
        new_object_id: Option<ObjectId>,
        message: String,
    ) -> Result<u64> {
        store.append_reflog(&ReflogEntry {
            ref_name: ref_name.to_string(),
            timestamp: timestamp_now(),
            old_object_id,
            new_object_id,
            committer_name: self.config.author_name.clone(),
            committer_email: self.config.author_email.clone(),
            message,
            sequence: 0,
        })
    }
}

fn head_ref(store: &dyn Store) -> Result<Ref> {
    store
        .head_ref(REF_TYPE_BRANCH)?
        .ok_or_else(|| GroveError::Corrupted("no head branch".into()))
}

fn find_branch(store: &dyn Store, name: &str) -> Result<Ref> {
    let ref_name = branch_ref_name(name);
    store
        .get_ref(&ref_name)?
        .ok_or(GroveError::BranchNotFound(ref_name))
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

/// Reject names that cannot be used as a branch ref
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "@"
        || name.starts_with(['-', '.', '/'])
        || name.ends_with(['/', '.'])
        || name.ends_with(".lock")
        || name.contains("..")
        || name.contains("//")
        || name.contains("@{")
        || name
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || "~^:?*[\\".contains(c));
    if invalid {
        return Err(GroveError::InvalidBranchName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Repository) {
        let tmp = TempDir::new().unwrap();
        let mut repo = Repository::open(tmp.path()).unwrap();
        assert!(repo.init().unwrap());
        (tmp, repo)
    }

    #[test]
    fn test_operations_before_init_fail() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::open(tmp.path()).unwrap();
        assert!(!repo.is_initialized().unwrap());
        assert!(matches!(repo.status(), Err(GroveError::NotARepository(_))));
        assert!(matches!(repo.commit("x"), Err(GroveError::NotARepository(_))));
        assert!(!tmp.path().join(REPO_DIR).exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        let (tmp, mut repo) = repo();
        assert!(!repo.init().unwrap());
        assert!(tmp.path().join(REPO_DIR).join(CONFIG_FILE).exists());
        let branches = repo.list_branches().unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].ref_name, "refs/heads/main");
        assert!(branches[0].head);
        assert!(branches[0].target_object_id.is_none());

        let reopened = Repository::open(tmp.path()).unwrap();
        assert!(reopened.is_initialized().unwrap());
    }

    #[test]
    fn test_create_branch_renames_empty_head() {
        let (_tmp, repo) = repo();
        let created = repo.create_branch("trunk").unwrap();
        assert!(created.renamed);
        assert!(created.branch.head);
        assert_eq!(repo.head_branch().unwrap().branch_name(), "trunk");
        assert_eq!(repo.list_branches().unwrap().len(), 1);
    }

    #[test]
    fn test_branch_name_validation() {
        for bad in ["", "-x", ".hidden", "a..b", "a b", "end/", "x.lock", "a:b", "q?"] {
            assert!(
                matches!(validate_branch_name(bad), Err(GroveError::InvalidBranchName(_))),
                "{bad:?}"
            );
        }
        for good in ["main", "feature/login", "v1.2", "fix-123"] {
            assert!(validate_branch_name(good).is_ok(), "{good:?}");
        }
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("subject\n\nbody"), "subject");
        assert_eq!(first_line(""), "");
    }
}
