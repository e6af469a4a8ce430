//! Worktree port and its filesystem implementation

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::object::{IndexEntry, MODE_EXECUTABLE, MODE_FILE};
use crate::path::{relative, to_repo_path};

/// Name of the repository metadata directory at the worktree root
pub const REPO_DIR: &str = ".grove";

/// Mode and size of a worktree file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub mode: String,
    pub size: u64,
}

/// Access to the tracked directory
pub trait Worktree {
    fn root(&self) -> &Path;

    /// Files matched by a pathspec, as sorted repository paths
    ///
    /// A directory matches every file below it. The metadata directory is
    /// never matched. A pathspec outside the root matches nothing.
    fn matches(&self, pathspec: &str) -> Result<Vec<String>>;

    /// On-disk location of a repository path
    fn absolute_path(&self, path: &str) -> PathBuf;

    fn stat(&self, path: &str) -> Result<FileStat>;

    /// Write `data` to the entry's path, creating parent directories
    fn write(&self, entry: &IndexEntry, data: &[u8]) -> Result<PathBuf>;

    /// Delete the entry's file and prune parent directories left empty
    fn delete(&self, entry: &IndexEntry) -> Result<()>;
}

/// [`Worktree`] over a real directory
pub struct FsWorktree {
    root: PathBuf,
}

impl FsWorktree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn repo_path_of(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        to_repo_path(&self.root, rel)
    }
}

fn is_repo_dir(path: &str) -> bool {
    let rel = relative(path);
    rel == REPO_DIR || rel.starts_with(&format!("{}/", REPO_DIR))
}

impl Worktree for FsWorktree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn matches(&self, pathspec: &str) -> Result<Vec<String>> {
        let Some(target) = to_repo_path(&self.root, Path::new(pathspec)) else {
            return Ok(Vec::new());
        };
        if is_repo_dir(&target) {
            return Ok(Vec::new());
        }
        let absolute = self.absolute_path(&target);
        if absolute.is_file() {
            return Ok(vec![target]);
        }
        if !absolute.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let walker = WalkDir::new(&absolute)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != REPO_DIR);
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(path) = self.repo_path_of(entry.path()) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    fn absolute_path(&self, path: &str) -> PathBuf {
        let rel = relative(path);
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    fn stat(&self, path: &str) -> Result<FileStat> {
        let metadata = fs::metadata(self.absolute_path(path))?;
        Ok(FileStat {
            mode: file_mode(&metadata).to_string(),
            size: metadata.len(),
        })
    }

    fn write(&self, entry: &IndexEntry, data: &[u8]) -> Result<PathBuf> {
        let path = self.absolute_path(&entry.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_path = path.clone().into_os_string();
        tmp_path.push(".grove-tmp");
        let tmp_path = PathBuf::from(tmp_path);
        fs::write(&tmp_path, data)?;
        set_mode(&tmp_path, &entry.mode)?;
        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    fn delete(&self, entry: &IndexEntry) -> Result<()> {
        let path = self.absolute_path(&entry.path);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut parent = path.parent();
        while let Some(dir) = parent {
            if dir == self.root || fs::remove_dir(dir).is_err() {
                break;
            }
            parent = dir.parent();
        }
        Ok(())
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> &'static str {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        MODE_EXECUTABLE
    } else {
        MODE_FILE
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> &'static str {
    MODE_FILE
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: &str) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(bits) = u32::from_str_radix(mode, 8) {
        fs::set_permissions(path, fs::Permissions::from_mode(bits & 0o777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: &str) -> io::Result<()> {
    Ok(())
}
