//! Lexical path helpers.
//!
//! The pipeline joins and rewrites candidate paths constantly; everything
//! here is purely lexical and never touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically: collapse `.` and resolve `..` against the
/// preceding component. Does not consult the filesystem, so a `..` behind
/// a symlink is resolved the same way Node does it (lexically).
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Join a request suffix onto a base directory and normalize. An absolute
/// suffix replaces the base, matching `Path::join`.
#[must_use]
pub fn join_normalized(base: &Path, request: &str) -> PathBuf {
    let trimmed = request.trim_end_matches('/');
    if trimmed.is_empty() {
        return normalize(base);
    }
    normalize(&base.join(trimmed))
}

/// Append an extension to a path's file name.
///
/// `Path::with_extension` replaces an existing extension; resolution must
/// append instead (`a.b` + `.js` → `a.b.js`).
#[must_use]
pub fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    name.push_str(extension);
    path.with_file_name(name)
}

/// Whether a specifier is an absolute filesystem path: `/…`, a Windows
/// drive (`C:\`, `D:/`) or a UNC path (`\\server\share`).
#[must_use]
pub fn is_absolute_specifier(spec: &str) -> bool {
    if spec.starts_with('/') {
        return true;
    }
    let bytes = spec.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return true;
    }
    spec.starts_with("\\\\")
}

/// Whether `path` is `root` or lexically inside it.
#[must_use]
pub fn is_inside(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn join_handles_relative_and_absolute() {
        assert_eq!(
            join_normalized(Path::new("/proj/src"), "./foo"),
            PathBuf::from("/proj/src/foo")
        );
        assert_eq!(
            join_normalized(Path::new("/proj/src"), "../lib/a"),
            PathBuf::from("/proj/lib/a")
        );
        assert_eq!(
            join_normalized(Path::new("/proj"), "/abs/x"),
            PathBuf::from("/abs/x")
        );
        assert_eq!(
            join_normalized(Path::new("/proj"), "dir/"),
            PathBuf::from("/proj/dir")
        );
    }

    #[test]
    fn append_extension_does_not_replace() {
        assert_eq!(
            append_extension(Path::new("/x/a.b"), ".js"),
            PathBuf::from("/x/a.b.js")
        );
        assert_eq!(
            append_extension(Path::new("/x/a"), ".json"),
            PathBuf::from("/x/a.json")
        );
    }

    #[test]
    fn absolute_specifiers() {
        assert!(is_absolute_specifier("/abs"));
        assert!(is_absolute_specifier("C:\\x"));
        assert!(is_absolute_specifier("c:/x"));
        assert!(is_absolute_specifier("\\\\server\\share"));
        assert!(!is_absolute_specifier("./rel"));
        assert!(!is_absolute_specifier("pkg"));
    }

    #[test]
    fn inside_check_is_lexical() {
        assert!(is_inside(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_inside(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_inside(Path::new("/a/bc"), Path::new("/a/b")));
    }
}
