//! Filesystem capability consumed by the resolver.
//!
//! The resolver only ever reads: it stats candidates, follows symlinks and
//! loads description files. Embedders with virtual or overlay filesystems
//! implement [`FileSystem`]; everyone else uses [`StdFileSystem`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Result of a `metadata` probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStat {
    /// The entry is a regular file (after following symlinks).
    pub is_file: bool,
    /// The entry is a directory (after following symlinks).
    pub is_dir: bool,
    /// The entry itself is a symbolic link.
    pub is_symlink: bool,
}

/// Error surfaced by a filesystem probe.
///
/// Cloneable so that the cached wrapper can negative-cache failures the
/// same way it caches successes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("not a symbolic link")]
    NotALink,

    #[error("invalid JSON: {0}")]
    Json(Arc<str>),

    #[error("{0}")]
    Other(Arc<str>),
}

impl FsError {
    /// Whether this error means "the candidate does not exist" as opposed
    /// to a genuine I/O problem.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::NotALink)
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::InvalidInput => Self::NotALink,
            _ => Self::Other(err.to_string().into()),
        }
    }
}

/// Read-only filesystem capability.
///
/// All operations are synchronous; the pipeline's suspension points are
/// exactly these calls. Implementations must be safe to share across
/// concurrently running resolve calls.
pub trait FileSystem: Send + Sync {
    /// Stat an entry. `is_file`/`is_dir` follow symlinks, `is_symlink`
    /// reports on the entry itself.
    fn metadata(&self, path: &Path) -> Result<FileStat, FsError>;

    /// List the names inside a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// Read the target of a symbolic link. Must fail with
    /// [`FsError::NotALink`] when the entry is not a link.
    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Read a file's bytes. Only used for description files.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;
}

/// `std::fs`-backed filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn metadata(&self, path: &Path) -> Result<FileStat, FsError> {
        let symlink_meta = std::fs::symlink_metadata(path)?;
        let is_symlink = symlink_meta.file_type().is_symlink();
        // A dangling link stats fine via lstat but has no target.
        let (is_file, is_dir) = if is_symlink {
            match std::fs::metadata(path) {
                Ok(meta) => (meta.is_file(), meta.is_dir()),
                Err(_) => (false, false),
            }
        } else {
            (symlink_meta.is_file(), symlink_meta.is_dir())
        };
        Ok(FileStat {
            is_file,
            is_dir,
            is_symlink,
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort_unstable();
        Ok(names)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        std::fs::read_link(path).map_err(Into::into)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn stat_file_and_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let fs_impl = StdFileSystem;
        let stat = fs_impl.metadata(&file).unwrap();
        assert!(stat.is_file);
        assert!(!stat.is_dir);
        assert!(!stat.is_symlink);

        let stat = fs_impl.metadata(dir.path()).unwrap();
        assert!(stat.is_dir);
    }

    #[test]
    fn stat_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = StdFileSystem
            .metadata(&dir.path().join("nope"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn read_link_on_regular_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let err = StdFileSystem.read_link(&file).unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn stat_reports_symlink() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "x").unwrap();
        let link = dir.path().join("b.js");
        std::os::unix::fs::symlink(&file, &link).unwrap();

        let stat = StdFileSystem.metadata(&link).unwrap();
        assert!(stat.is_symlink);
        assert!(stat.is_file);
        assert_eq!(StdFileSystem.read_link(&link).unwrap(), file);
    }

    #[test]
    fn read_dir_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b"), "").unwrap();
        fs::write(dir.path().join("a"), "").unwrap();
        let names = StdFileSystem.read_dir(dir.path()).unwrap();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
