//! SQLite-backed persistence
//!
//! Every entity lives in its own table of a single database file
//! (`.grove/grove.db`). The connection runs in WAL mode; the repository
//! wraps each mutating operation in one transaction.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

use crate::error::Result;
use crate::object::{
    Blob, Commit, CommitParent, EntryKind, IndexEntry, ObjectId, Ref, ReflogEntry, TreeEntry,
};
use crate::path::ROOT;
use crate::store::Store;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS blob (
        object_id TEXT PRIMARY KEY,
        data BLOB NOT NULL,
        size INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS index_entry (
        path TEXT PRIMARY KEY,
        object_id TEXT NOT NULL,
        mode TEXT NOT NULL,
        size INTEGER
    );
    CREATE TABLE IF NOT EXISTS tree_entry (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tree_id TEXT,
        entry_name TEXT NOT NULL,
        entry_mode TEXT NOT NULL,
        entry_object_id TEXT,
        entry_type TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tree_entry_tree_id ON tree_entry (tree_id);
    CREATE INDEX IF NOT EXISTS idx_tree_entry_object_id ON tree_entry (entry_object_id);
    CREATE TABLE IF NOT EXISTS commits (
        object_id TEXT PRIMARY KEY,
        tree_id TEXT NOT NULL,
        author_name TEXT NOT NULL,
        author_email TEXT NOT NULL,
        author_date TEXT NOT NULL,
        committer_name TEXT NOT NULL,
        committer_email TEXT NOT NULL,
        committer_date TEXT NOT NULL,
        message TEXT NOT NULL,
        generation_number INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS commit_parent (
        commit_id TEXT NOT NULL,
        parent_id TEXT NOT NULL,
        parent_order INTEGER NOT NULL,
        PRIMARY KEY (commit_id, parent_order)
    );
    CREATE INDEX IF NOT EXISTS idx_commit_parent_parent ON commit_parent (parent_id);
    CREATE TABLE IF NOT EXISTS refs (
        ref_name TEXT PRIMARY KEY,
        ref_type TEXT NOT NULL,
        head INTEGER NOT NULL DEFAULT 0,
        target_object_id TEXT,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS reflog (
        ref_name TEXT NOT NULL,
        sequence INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        old_object_id TEXT,
        new_object_id TEXT,
        committer_name TEXT NOT NULL,
        committer_email TEXT NOT NULL,
        message TEXT NOT NULL,
        PRIMARY KEY (ref_name, sequence)
    );
";

impl ToSql for ObjectId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ObjectId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(ObjectId::new)
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| EntryKind::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

fn row_to_blob(row: &Row<'_>) -> rusqlite::Result<Blob> {
    Ok(Blob {
        object_id: row.get(0)?,
        data: row.get(1)?,
        size: row.get::<_, i64>(2)? as u64,
        created_at: row.get(3)?,
    })
}

fn row_to_index_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
    Ok(IndexEntry {
        path: row.get(0)?,
        object_id: row.get(1)?,
        mode: row.get(2)?,
        size: row.get::<_, Option<i64>>(3)?.map(|s| s as u64),
    })
}

fn row_to_tree_entry(row: &Row<'_>) -> rusqlite::Result<TreeEntry> {
    Ok(TreeEntry {
        tree_id: row.get(0)?,
        entry_name: row.get(1)?,
        entry_mode: row.get(2)?,
        entry_object_id: row.get(3)?,
        entry_type: row.get(4)?,
    })
}

fn row_to_commit(row: &Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        object_id: row.get(0)?,
        tree_id: row.get(1)?,
        author_name: row.get(2)?,
        author_email: row.get(3)?,
        author_date: row.get(4)?,
        committer_name: row.get(5)?,
        committer_email: row.get(6)?,
        committer_date: row.get(7)?,
        message: row.get(8)?,
        generation_number: row.get::<_, i64>(9)? as u64,
        created_at: row.get(10)?,
    })
}

fn row_to_commit_parent(row: &Row<'_>) -> rusqlite::Result<CommitParent> {
    Ok(CommitParent {
        commit_id: row.get(0)?,
        parent_id: row.get(1)?,
        parent_order: row.get(2)?,
    })
}

fn row_to_ref(row: &Row<'_>) -> rusqlite::Result<Ref> {
    Ok(Ref {
        ref_name: row.get(0)?,
        ref_type: row.get(1)?,
        head: row.get(2)?,
        target_object_id: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_reflog(row: &Row<'_>) -> rusqlite::Result<ReflogEntry> {
    Ok(ReflogEntry {
        ref_name: row.get(0)?,
        sequence: row.get::<_, i64>(1)? as u64,
        timestamp: row.get(2)?,
        old_object_id: row.get(3)?,
        new_object_id: row.get(4)?,
        committer_name: row.get(5)?,
        committer_email: row.get(6)?,
        message: row.get(7)?,
    })
}

const TREE_COLUMNS: &str = "tree_id, entry_name, entry_mode, entry_object_id, entry_type";
const COMMIT_COLUMNS: &str = "object_id, tree_id, author_name, author_email, author_date, \
     committer_name, committer_email, committer_date, message, generation_number, created_at";
const REF_COLUMNS: &str = "ref_name, ref_type, head, target_object_id, updated_at";

/// [`Store`] over a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::configure(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'refs'",
            [],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ==================== Blobs ====================

    fn insert_blob(&self, blob: &Blob) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO blob (object_id, data, size, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![blob.object_id, blob.data, blob.size as i64, blob.created_at],
        )?;
        Ok(inserted > 0)
    }

    fn get_blob(&self, object_id: &ObjectId) -> Result<Option<Blob>> {
        let blob = self
            .conn
            .query_row(
                "SELECT object_id, data, size, created_at FROM blob WHERE object_id = ?1",
                params![object_id],
                row_to_blob,
            )
            .optional()?;
        Ok(blob)
    }

    fn has_blob(&self, object_id: &ObjectId) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM blob WHERE object_id = ?1",
                params![object_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ==================== Index ====================

    fn list_index(&self) -> Result<Vec<IndexEntry>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT path, object_id, mode, size FROM index_entry ORDER BY path")?;
        let entries = stmt
            .query_map([], row_to_index_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn index_by_prefix(&self, prefix: &str) -> Result<Vec<IndexEntry>> {
        if prefix == ROOT {
            return self.list_index();
        }
        let mut stmt = self.conn.prepare_cached(
            "SELECT path, object_id, mode, size FROM index_entry \
             WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/' \
             ORDER BY path",
        )?;
        let entries = stmt
            .query_map(params![prefix], row_to_index_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn insert_index_entries(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR REPLACE INTO index_entry (path, object_id, mode, size) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for entry in entries {
            stmt.execute(params![
                entry.path,
                entry.object_id,
                entry.mode,
                entry.size.map(|s| s as i64)
            ])?;
        }
        Ok(())
    }

    fn delete_index_entries(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM index_entry WHERE path = ?1")?;
        for entry in entries {
            stmt.execute(params![entry.path])?;
        }
        Ok(())
    }

    // ==================== Trees ====================

    fn find_root_tree_entry(&self, object_id: &ObjectId) -> Result<Option<TreeEntry>> {
        let sql = format!(
            "SELECT {} FROM tree_entry \
             WHERE entry_object_id = ?1 AND entry_type = ?2 AND tree_id IS NULL AND entry_name = ?3 \
             ORDER BY id LIMIT 1",
            TREE_COLUMNS
        );
        let entry = self
            .conn
            .query_row(&sql, params![object_id, EntryKind::Tree, ROOT], row_to_tree_entry)
            .optional()?;
        Ok(entry)
    }

    fn tree_children(&self, tree_id: &ObjectId) -> Result<Vec<TreeEntry>> {
        let sql = format!(
            "SELECT {} FROM tree_entry WHERE tree_id = ?1 ORDER BY entry_name",
            TREE_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let entries = stmt
            .query_map(params![tree_id], row_to_tree_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn has_tree_entry(&self, entry: &TreeEntry) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM tree_entry \
                 WHERE tree_id IS ?1 AND entry_type = ?2 AND entry_object_id IS ?3 AND entry_name = ?4 \
                 LIMIT 1",
                params![
                    entry.tree_id,
                    entry.entry_type,
                    entry.entry_object_id,
                    entry.entry_name
                ],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_tree_entries(&self, entries: &[TreeEntry]) -> Result<()> {
        let sql = format!(
            "INSERT INTO tree_entry ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
            TREE_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        for entry in entries {
            stmt.execute(params![
                entry.tree_id,
                entry.entry_name,
                entry.entry_mode,
                entry.entry_object_id,
                entry.entry_type
            ])?;
        }
        Ok(())
    }

    // ==================== Commits ====================

    fn insert_commit(&self, commit: &Commit) -> Result<()> {
        let sql = format!(
            "INSERT OR IGNORE INTO commits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            COMMIT_COLUMNS
        );
        self.conn.execute(
            &sql,
            params![
                commit.object_id,
                commit.tree_id,
                commit.author_name,
                commit.author_email,
                commit.author_date,
                commit.committer_name,
                commit.committer_email,
                commit.committer_date,
                commit.message,
                commit.generation_number as i64,
                commit.created_at
            ],
        )?;
        Ok(())
    }

    fn get_commit(&self, object_id: &ObjectId) -> Result<Option<Commit>> {
        let sql = format!("SELECT {} FROM commits WHERE object_id = ?1", COMMIT_COLUMNS);
        let commit = self
            .conn
            .query_row(&sql, params![object_id], row_to_commit)
            .optional()?;
        Ok(commit)
    }

    fn insert_commit_parent(&self, edge: &CommitParent) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO commit_parent (commit_id, parent_id, parent_order) VALUES (?1, ?2, ?3)",
            params![edge.commit_id, edge.parent_id, edge.parent_order],
        )?;
        Ok(())
    }

    fn commit_parents(&self, commit_id: &ObjectId) -> Result<Vec<CommitParent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT commit_id, parent_id, parent_order FROM commit_parent \
             WHERE commit_id = ?1 ORDER BY parent_order",
        )?;
        let edges = stmt
            .query_map(params![commit_id], row_to_commit_parent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn commit_children(&self, parent_id: &ObjectId) -> Result<Vec<CommitParent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT commit_id, parent_id, parent_order FROM commit_parent \
             WHERE parent_id = ?1 ORDER BY commit_id",
        )?;
        let edges = stmt
            .query_map(params![parent_id], row_to_commit_parent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    // ==================== Refs ====================

    fn get_ref(&self, ref_name: &str) -> Result<Option<Ref>> {
        let sql = format!("SELECT {} FROM refs WHERE ref_name = ?1", REF_COLUMNS);
        let r = self
            .conn
            .query_row(&sql, params![ref_name], row_to_ref)
            .optional()?;
        Ok(r)
    }

    fn head_ref(&self, ref_type: &str) -> Result<Option<Ref>> {
        let sql = format!(
            "SELECT {} FROM refs WHERE ref_type = ?1 AND head = 1 LIMIT 1",
            REF_COLUMNS
        );
        let r = self
            .conn
            .query_row(&sql, params![ref_type], row_to_ref)
            .optional()?;
        Ok(r)
    }

    fn list_refs(&self, ref_type: &str) -> Result<Vec<Ref>> {
        let sql = format!(
            "SELECT {} FROM refs WHERE ref_type = ?1 ORDER BY ref_name",
            REF_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let refs = stmt
            .query_map(params![ref_type], row_to_ref)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    fn insert_ref(&self, r: &Ref) -> Result<()> {
        let sql = format!("INSERT INTO refs ({}) VALUES (?1, ?2, ?3, ?4, ?5)", REF_COLUMNS);
        self.conn.execute(
            &sql,
            params![r.ref_name, r.ref_type, r.head, r.target_object_id, r.updated_at],
        )?;
        Ok(())
    }

    fn update_ref(&self, r: &Ref) -> Result<()> {
        self.conn.execute(
            "UPDATE refs SET ref_type = ?2, head = ?3, target_object_id = ?4, updated_at = ?5 \
             WHERE ref_name = ?1",
            params![r.ref_name, r.ref_type, r.head, r.target_object_id, r.updated_at],
        )?;
        Ok(())
    }

    fn rename_ref(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE refs SET ref_name = ?2 WHERE ref_name = ?1",
            params![old_name, new_name],
        )?;
        self.conn.execute(
            "UPDATE reflog SET ref_name = ?2 WHERE ref_name = ?1",
            params![old_name, new_name],
        )?;
        Ok(())
    }

    fn delete_ref(&self, ref_name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM refs WHERE ref_name = ?1", params![ref_name])?;
        self.conn
            .execute("DELETE FROM reflog WHERE ref_name = ?1", params![ref_name])?;
        Ok(deleted > 0)
    }

    // ==================== Reflog ====================

    fn append_reflog(&self, entry: &ReflogEntry) -> Result<u64> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM reflog WHERE ref_name = ?1",
            params![entry.ref_name],
            |r| r.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO reflog (ref_name, sequence, timestamp, old_object_id, new_object_id, \
             committer_name, committer_email, message) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.ref_name,
                next,
                entry.timestamp,
                entry.old_object_id,
                entry.new_object_id,
                entry.committer_name,
                entry.committer_email,
                entry.message
            ],
        )?;
        Ok(next as u64)
    }

    fn list_reflog(&self, ref_name: &str) -> Result<Vec<ReflogEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT ref_name, sequence, timestamp, old_object_id, new_object_id, \
             committer_name, committer_email, message FROM reflog \
             WHERE ref_name = ?1 ORDER BY sequence DESC",
        )?;
        let entries = stmt
            .query_map(params![ref_name], row_to_reflog)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{MODE_FILE, timestamp_now};
    use tempfile::TempDir;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn index(path: &str, oid: &str) -> IndexEntry {
        IndexEntry::new(path, ObjectId::new(oid), MODE_FILE)
    }

    fn reflog(ref_name: &str, message: &str) -> ReflogEntry {
        ReflogEntry {
            ref_name: ref_name.into(),
            timestamp: timestamp_now(),
            old_object_id: None,
            new_object_id: Some(ObjectId::new("c1")),
            committer_name: String::new(),
            committer_email: String::new(),
            message: message.into(),
            sequence: 0,
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.is_initialized().unwrap());
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_blob_insert_dedup() {
        let store = store();
        let blob = Blob {
            object_id: ObjectId::new("b1"),
            data: vec![1, 2, 3],
            size: 3,
            created_at: timestamp_now(),
        };
        assert!(store.insert_blob(&blob).unwrap());
        assert!(!store.insert_blob(&blob).unwrap());
        assert!(store.has_blob(&blob.object_id).unwrap());
        assert_eq!(store.get_blob(&blob.object_id).unwrap(), Some(blob));
        assert!(store.get_blob(&ObjectId::new("missing")).unwrap().is_none());
    }

    #[test]
    fn test_index_prefix_query() {
        let store = store();
        store
            .insert_index_entries(&[
                index("./src/a.rs", "1"),
                index("./src/b/c.rs", "2"),
                index("./srcx.rs", "3"),
                index("./README", "4").with_size(12),
            ])
            .unwrap();

        let paths: Vec<String> = store
            .index_by_prefix("./src")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["./src/a.rs", "./src/b/c.rs"]);
        assert_eq!(store.index_by_prefix("./README").unwrap()[0].size, Some(12));
        assert_eq!(store.index_by_prefix(".").unwrap().len(), 4);

        store.delete_index_entries(&[index("./srcx.rs", "3")]).unwrap();
        assert_eq!(store.list_index().unwrap().len(), 3);
    }

    #[test]
    fn test_tree_entry_null_parent_lookup() {
        let store = store();
        let mut root = TreeEntry::directory(ROOT);
        root.entry_object_id = Some(ObjectId::new("root"));
        let mut child = TreeEntry::file("a.txt", ObjectId::new("blob"), MODE_FILE);
        child.tree_id = Some(ObjectId::new("root"));
        store.insert_tree_entries(&[root.clone(), child.clone()]).unwrap();

        assert!(store.has_tree_entry(&root).unwrap());
        assert!(store.has_tree_entry(&child).unwrap());
        let mut renamed = child.clone();
        renamed.entry_name = "b.txt".into();
        assert!(!store.has_tree_entry(&renamed).unwrap());

        assert_eq!(
            store.find_root_tree_entry(&ObjectId::new("root")).unwrap(),
            Some(root)
        );
        assert_eq!(
            store.tree_children(&ObjectId::new("root")).unwrap(),
            vec![child]
        );
    }

    #[test]
    fn test_root_lookup_skips_subdirectory_rows() {
        let store = store();
        let mut sub = TreeEntry::directory("lib");
        sub.entry_object_id = Some(ObjectId::new("same"));
        sub.tree_id = Some(ObjectId::new("parent"));
        store.insert_tree_entries(&[sub]).unwrap();
        assert_eq!(store.find_root_tree_entry(&ObjectId::new("same")).unwrap(), None);

        let mut root = TreeEntry::directory(ROOT);
        root.entry_object_id = Some(ObjectId::new("same"));
        store.insert_tree_entries(&[root.clone()]).unwrap();
        assert_eq!(
            store.find_root_tree_entry(&ObjectId::new("same")).unwrap(),
            Some(root)
        );
    }

    #[test]
    fn test_commit_parent_edges() {
        let store = store();
        let edge = CommitParent {
            commit_id: ObjectId::new("c2"),
            parent_id: ObjectId::new("c1"),
            parent_order: 0,
        };
        store.insert_commit_parent(&edge).unwrap();
        store.insert_commit_parent(&edge).unwrap();
        assert_eq!(store.commit_parents(&ObjectId::new("c2")).unwrap(), vec![edge.clone()]);
        assert_eq!(store.commit_children(&ObjectId::new("c1")).unwrap(), vec![edge]);
        assert!(store.commit_parents(&ObjectId::new("c1")).unwrap().is_empty());
    }

    #[test]
    fn test_refs_and_reflog() {
        let store = store();
        let main = Ref::branch("main", None, true, timestamp_now());
        store.insert_ref(&main).unwrap();
        store.insert_ref(&Ref::branch("dev", None, false, timestamp_now())).unwrap();

        assert_eq!(store.head_ref("branch").unwrap().unwrap().ref_name, "refs/heads/main");
        let names: Vec<String> = store
            .list_refs("branch")
            .unwrap()
            .into_iter()
            .map(|r| r.ref_name)
            .collect();
        assert_eq!(names, vec!["refs/heads/dev", "refs/heads/main"]);

        assert_eq!(store.append_reflog(&reflog("refs/heads/main", "one")).unwrap(), 1);
        assert_eq!(store.append_reflog(&reflog("refs/heads/main", "two")).unwrap(), 2);
        assert_eq!(store.append_reflog(&reflog("refs/heads/dev", "other")).unwrap(), 1);

        store.rename_ref("refs/heads/main", "refs/heads/trunk").unwrap();
        assert!(store.get_ref("refs/heads/main").unwrap().is_none());
        let log = store.list_reflog("refs/heads/trunk").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "two");
        assert_eq!(log[0].sequence, 2);

        assert!(store.delete_ref("refs/heads/dev").unwrap());
        assert!(!store.delete_ref("refs/heads/dev").unwrap());
        assert!(store.list_reflog("refs/heads/dev").unwrap().is_empty());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let store = store();
        store.begin().unwrap();
        store.insert_index_entries(&[index("./a", "1")]).unwrap();
        store.rollback().unwrap();
        assert!(store.list_index().unwrap().is_empty());

        store.begin().unwrap();
        store.insert_index_entries(&[index("./a", "1")]).unwrap();
        store.commit_transaction().unwrap();
        assert_eq!(store.list_index().unwrap().len(), 1);
    }

    #[test]
    fn test_persistence_across_open() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("grove.db");
        {
            let store = SqliteStore::open(&db).unwrap();
            store.initialize().unwrap();
            store.insert_index_entries(&[index("./kept", "1")]).unwrap();
        }
        let store = SqliteStore::open(&db).unwrap();
        assert!(store.is_initialized().unwrap());
        assert_eq!(store.list_index().unwrap(), vec![index("./kept", "1")]);
    }
}
