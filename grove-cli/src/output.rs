//! Human-readable rendering of repository results

use grove_core::path::relative;
use grove_core::{AddSummary, Commit, DiffResult, IndexEntry, Ref, ReflogEntry, Status};
use std::fmt::Write;

pub fn format_branches(branches: &[Ref]) -> String {
    let mut out = String::new();
    for branch in branches {
        let marker = if branch.head { '*' } else { ' ' };
        let _ = writeln!(out, "{} {}", marker, branch.branch_name());
    }
    out
}

pub fn format_add_summary(summary: &AddSummary) -> Option<String> {
    if summary == &AddSummary::default() {
        return None;
    }
    Some(format!(
        "staged {} new, {} modified, {} removed ({} new blobs)",
        summary.added, summary.modified, summary.deleted, summary.blobs_created
    ))
}

fn push_section(out: &mut String, title: &str, rows: &[(&str, &IndexEntry)]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}:", title);
    for (label, entry) in rows {
        if label.is_empty() {
            let _ = writeln!(out, "\t{}", relative(&entry.path));
        } else {
            let _ = writeln!(out, "\t{:<12}{}", format!("{}:", label), relative(&entry.path));
        }
    }
}

fn labelled<'a>(diff: &'a DiffResult, added_label: &'a str) -> Vec<(&'a str, &'a IndexEntry)> {
    let mut rows: Vec<(&str, &IndexEntry)> = diff
        .added
        .iter()
        .map(|e| (added_label, e))
        .chain(diff.modified.iter().map(|e| ("modified", e)))
        .chain(diff.deleted.iter().map(|e| ("deleted", e)))
        .collect();
    rows.sort_by(|a, b| a.1.path.cmp(&b.1.path));
    rows
}

pub fn format_status(status: &Status) -> String {
    let mut out = format!("On branch {}\n", status.branch_name);

    push_section(&mut out, "Changes to be committed", &labelled(&status.staged, "new file"));

    let tracked = DiffResult {
        added: Vec::new(),
        modified: status.unstaged.modified.clone(),
        deleted: status.unstaged.deleted.clone(),
    };
    push_section(&mut out, "Changes not staged for commit", &labelled(&tracked, ""));

    let untracked: Vec<(&str, &IndexEntry)> = status.untracked().iter().map(|e| ("", e)).collect();
    push_section(&mut out, "Untracked files", &untracked);

    if status.is_clean() && status.untracked().is_empty() {
        out.push_str("nothing to commit, working tree clean\n");
    }
    out
}

pub fn format_commit_created(branch: &str, commit: &Commit) -> String {
    let subject = commit.message.lines().next().unwrap_or("");
    format!("[{} {}] {}", branch, commit.object_id.short(), subject)
}

pub fn format_log(commits: &[Commit]) -> String {
    let mut out = String::new();
    for (i, commit) in commits.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "commit {}", commit.object_id);
        if !commit.author_name.is_empty() {
            let _ = writeln!(out, "Author: {} <{}>", commit.author_name, commit.author_email);
        }
        let _ = writeln!(out, "Date:   {}", commit.committer_date);
        out.push('\n');
        for line in commit.message.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}

pub fn format_reflog(branch: &str, entries: &[ReflogEntry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let id = entry
            .new_object_id
            .as_ref()
            .map(|id| id.short().to_string())
            .unwrap_or_else(|| "0000000".to_string());
        let _ = writeln!(out, "{} {}@{{{}}}: {}", id, branch, i, entry.message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::ObjectId;
    use grove_core::object::MODE_FILE;

    fn entry(path: &str) -> IndexEntry {
        IndexEntry::new(path, ObjectId::new("abc"), MODE_FILE)
    }

    #[test]
    fn test_format_branches() {
        let branches = vec![
            Ref::branch("dev", None, false, String::new()),
            Ref::branch("main", None, true, String::new()),
        ];
        assert_eq!(format_branches(&branches), "  dev\n* main\n");
    }

    #[test]
    fn test_format_status_sections() {
        let status = Status {
            branch_name: "main".into(),
            staged: DiffResult {
                added: vec![entry("./new.txt")],
                modified: vec![],
                deleted: vec![entry("./old.txt")],
            },
            unstaged: DiffResult {
                added: vec![entry("./scratch")],
                modified: vec![entry("./dir/edit.rs")],
                deleted: vec![],
            },
        };
        let text = format_status(&status);
        assert_eq!(
            text,
            "On branch main\n\
             Changes to be committed:\n\
             \tnew file:   new.txt\n\
             \tdeleted:    old.txt\n\
             Changes not staged for commit:\n\
             \tmodified:   dir/edit.rs\n\
             Untracked files:\n\
             \tscratch\n"
        );
    }

    #[test]
    fn test_format_clean_status() {
        let status = Status {
            branch_name: "main".into(),
            staged: DiffResult::default(),
            unstaged: DiffResult::default(),
        };
        assert_eq!(
            format_status(&status),
            "On branch main\nnothing to commit, working tree clean\n"
        );
    }

    #[test]
    fn test_format_add_summary() {
        assert_eq!(format_add_summary(&AddSummary::default()), None);
        let summary = AddSummary {
            added: 2,
            modified: 1,
            deleted: 0,
            blobs_created: 2,
        };
        assert_eq!(
            format_add_summary(&summary).unwrap(),
            "staged 2 new, 1 modified, 0 removed (2 new blobs)"
        );
    }

    #[test]
    fn test_format_reflog() {
        let entries = vec![ReflogEntry {
            ref_name: "refs/heads/main".into(),
            timestamp: String::new(),
            old_object_id: None,
            new_object_id: Some(ObjectId::new("0123456789abcdef")),
            committer_name: String::new(),
            committer_email: String::new(),
            message: "commit: first".into(),
            sequence: 1,
        }];
        assert_eq!(
            format_reflog("main", &entries),
            "0123456 main@{0}: commit: first\n"
        );
    }
}
