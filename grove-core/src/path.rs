//! Repository path handling
//!
//! Staged entries and tree nodes are keyed by a normalized, `/`-separated
//! path rooted at `.` (`./src/main.rs`). The root directory itself is `.`.

use std::path::{Component, Path};

/// Path of the repository root
pub const ROOT: &str = ".";

/// Normalize a `/`-separated path to `./a/b` form
///
/// Empty and `.` components are dropped and `..` is resolved lexically;
/// a `..` that would escape the root is ignored.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    from_segments(&parts)
}

fn from_segments<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::from(ROOT);
    for part in parts {
        out.push('/');
        out.push_str(part.as_ref());
    }
    out
}

/// Segments below the root (`./a/b` -> `["a", "b"]`)
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// The chain of paths from the root down to `path`, both included
pub fn ancestors(path: &str) -> Vec<String> {
    let mut chain = vec![ROOT.to_string()];
    let mut current = String::from(ROOT);
    for segment in segments(path) {
        current = join(&current, segment);
        chain.push(current.clone());
    }
    chain
}

pub fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

/// Parent path, `None` for the root
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    path.rsplit_once('/').map(|(head, _)| head)
}

/// Final path segment
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, tail)| tail).unwrap_or(path)
}

/// Path relative to the root without the `./` prefix
pub fn relative(path: &str) -> &str {
    if path == ROOT {
        return "";
    }
    path.strip_prefix("./").unwrap_or(path)
}

/// True if `path` equals `prefix` or lies below it
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix == ROOT {
        return true;
    }
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// Resolve a user-supplied pathspec against the worktree root
///
/// Absolute pathspecs must lie under `root`; relative ones are taken
/// relative to `root`. Returns `None` when the pathspec escapes the root.
pub fn to_repo_path(root: &Path, pathspec: &Path) -> Option<String> {
    let relative = if pathspec.is_absolute() {
        pathspec.strip_prefix(root).ok()?
    } else {
        pathspec
    };

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(from_segments(&parts))
}
