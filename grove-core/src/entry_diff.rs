//! Path-keyed comparison of two staged-entry sets
//!
//! `EntryDiff::compare(base, target)` reports what must change to turn
//! `base` into `target`:
//! - added: in `target`, not in `base` (the target's entry)
//! - deleted: in `base`, not in `target` (the base's entry)
//! - modified: in both with a different `(mode, object_id)` (the target's entry)

use std::collections::BTreeMap;

use crate::object::IndexEntry;

/// Result of comparing two entry sets, each list sorted by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub added: Vec<IndexEntry>,
    pub modified: Vec<IndexEntry>,
    pub deleted: Vec<IndexEntry>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Paths touched by this diff, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .added
            .iter()
            .chain(&self.modified)
            .chain(&self.deleted)
            .map(|e| e.path.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }
}

pub struct EntryDiff;

impl EntryDiff {
    pub fn compare(base: &[IndexEntry], target: &[IndexEntry]) -> DiffResult {
        let base: BTreeMap<&str, &IndexEntry> =
            base.iter().map(|e| (e.path.as_str(), e)).collect();
        let target: BTreeMap<&str, &IndexEntry> =
            target.iter().map(|e| (e.path.as_str(), e)).collect();

        let mut result = DiffResult::default();
        for (path, entry) in &target {
            match base.get(path) {
                None => result.added.push((*entry).clone()),
                Some(old) if old.mode != entry.mode || old.object_id != entry.object_id => {
                    result.modified.push((*entry).clone())
                }
                Some(_) => {}
            }
        }
        for (path, entry) in &base {
            if !target.contains_key(path) {
                result.deleted.push((*entry).clone());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{MODE_EXECUTABLE, MODE_FILE, ObjectId};
    use proptest::prelude::*;

    fn entry(path: &str, oid: &str, mode: &str) -> IndexEntry {
        IndexEntry::new(path, ObjectId::new(oid), mode)
    }

    #[test]
    fn test_polarity() {
        let base = vec![entry("./kept", "1", MODE_FILE), entry("./gone", "2", MODE_FILE)];
        let target = vec![entry("./kept", "1", MODE_FILE), entry("./new", "3", MODE_FILE)];

        let diff = EntryDiff::compare(&base, &target);
        assert_eq!(diff.added, vec![entry("./new", "3", MODE_FILE)]);
        assert_eq!(diff.deleted, vec![entry("./gone", "2", MODE_FILE)]);
        assert!(diff.modified.is_empty());

        let reversed = EntryDiff::compare(&target, &base);
        assert_eq!(reversed.added, diff.deleted);
        assert_eq!(reversed.deleted, diff.added);
    }

    #[test]
    fn test_modified_reports_target_entry() {
        let base = vec![entry("./a", "old", MODE_FILE), entry("./b", "same", MODE_FILE)];
        let target = vec![entry("./a", "new", MODE_FILE), entry("./b", "same", MODE_EXECUTABLE)];

        let diff = EntryDiff::compare(&base, &target);
        assert_eq!(
            diff.modified,
            vec![entry("./a", "new", MODE_FILE), entry("./b", "same", MODE_EXECUTABLE)]
        );
        assert!(diff.added.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn test_size_is_not_compared() {
        let base = vec![entry("./a", "1", MODE_FILE).with_size(10)];
        let target = vec![entry("./a", "1", MODE_FILE)];
        assert!(EntryDiff::compare(&base, &target).is_empty());
    }

    #[test]
    fn test_empty_sides() {
        let set = vec![entry("./a", "1", MODE_FILE)];
        let diff = EntryDiff::compare(&[], &set);
        assert_eq!(diff.added.len(), 1);
        let diff = EntryDiff::compare(&set, &[]);
        assert_eq!(diff.deleted.len(), 1);
        assert!(EntryDiff::compare(&[], &[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_diff_with_itself_is_empty(
            files in proptest::collection::btree_map("[a-z]{1,6}(/[a-z]{1,6}){0,2}", "[0-9a-f]{8}", 0..20)
        ) {
            let entries: Vec<IndexEntry> = files
                .iter()
                .map(|(p, oid)| entry(&format!("./{}", p), oid, MODE_FILE))
                .collect();
            prop_assert!(EntryDiff::compare(&entries, &entries).is_empty());
        }
    }
}
