//! Commit creation and history traversal

use tracing::debug;

use crate::config::RepoConfig;
use crate::error::{GroveError, Result};
use crate::hash::ContentHasher;
use crate::object::{Commit, CommitParent, ObjectId, timestamp_now};
use crate::store::Store;

pub struct CommitStore<'a> {
    store: &'a dyn Store,
    hasher: &'a dyn ContentHasher,
    config: &'a RepoConfig,
}

impl<'a> CommitStore<'a> {
    pub fn new(store: &'a dyn Store, hasher: &'a dyn ContentHasher, config: &'a RepoConfig) -> Self {
        Self {
            store,
            hasher,
            config,
        }
    }

    /// Record a commit of `tree_id` on top of `parent`
    pub fn save_commit(
        &self,
        tree_id: &ObjectId,
        message: &str,
        parent: Option<&Commit>,
    ) -> Result<Commit> {
        self.save_commit_at(tree_id, message, parent, timestamp_now())
    }

    /// Like [`CommitStore::save_commit`] with an explicit timestamp
    pub fn save_commit_at(
        &self,
        tree_id: &ObjectId,
        message: &str,
        parent: Option<&Commit>,
        timestamp: String,
    ) -> Result<Commit> {
        let generation_number = parent.map(|p| p.generation_number + 1).unwrap_or(0);
        let parent_id = parent.map(|p| p.object_id.as_str()).unwrap_or("");
        let generation = generation_number.to_string();

        let fields: [&str; 10] = [
            tree_id.as_str(),
            parent_id,
            &self.config.author_name,
            &self.config.author_email,
            &timestamp,
            &self.config.author_name,
            &self.config.author_email,
            &timestamp,
            message,
            &generation,
        ];
        let object_id = self.hasher.hash_bytes(fields.join("\n").as_bytes());

        let commit = Commit {
            object_id,
            tree_id: tree_id.clone(),
            author_name: self.config.author_name.clone(),
            author_email: self.config.author_email.clone(),
            author_date: timestamp.clone(),
            committer_name: self.config.author_name.clone(),
            committer_email: self.config.author_email.clone(),
            committer_date: timestamp.clone(),
            message: message.to_string(),
            generation_number,
            created_at: timestamp,
        };
        self.store.insert_commit(&commit)?;
        if let Some(parent) = parent {
            self.store.insert_commit_parent(&CommitParent {
                commit_id: commit.object_id.clone(),
                parent_id: parent.object_id.clone(),
                parent_order: 0,
            })?;
        }
        debug!(commit = %commit.object_id, generation = generation_number, "saved commit");
        Ok(commit)
    }

    pub fn get_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        self.store
            .get_commit(object_id)?
            .ok_or_else(|| GroveError::CommitNotFound(object_id.clone()))
    }

    /// First-parent history starting at (and including) `start`
    pub fn list_commit_logs(&self, start: &ObjectId) -> Result<Vec<Commit>> {
        let mut logs = Vec::new();
        let mut current = Some(start.clone());
        while let Some(id) = current {
            logs.push(self.get_commit(&id)?);
            current = self
                .store
                .commit_parents(&id)?
                .into_iter()
                .next()
                .map(|edge| edge.parent_id);
        }
        Ok(logs)
    }

    /// Commits that name `commit_id` as a parent
    pub fn children(&self, commit_id: &ObjectId) -> Result<Vec<Commit>> {
        self.store
            .commit_children(commit_id)?
            .into_iter()
            .map(|edge| self.get_commit(&edge.commit_id))
            .collect()
    }
}
