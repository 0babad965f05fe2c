//! Description-file location and access.
//!
//! Walks parent directories for the nearest descriptor (`package.json` by
//! default), going through the cached filesystem so repeated walks over
//! the same tree are free.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::cached_fs::CachedFileSystem;
use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::fs::FsError;

/// A located description file.
#[derive(Debug, Clone)]
pub struct DescriptionFile {
    pub path: PathBuf,
    pub root: PathBuf,
    pub data: Arc<Value>,
}

/// Find the nearest description file at or above `start`.
///
/// Per directory, the first name in `names` that exists wins; the walk
/// then stops. Probes are recorded into the dependency sets. An
/// unparseable descriptor is a hard [`ResolveError::InvalidDescriptor`].
pub fn find_description_file(
    fs: &CachedFileSystem,
    start: &Path,
    names: &[String],
    ctx: &mut ResolveContext,
) -> Result<Option<DescriptionFile>, ResolveError> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in names {
            let candidate = current.join(name);
            match fs.stat(&candidate) {
                Ok(stat) if stat.is_file => {
                    ctx.add_file_dependency(&candidate);
                    let data = match fs.read_json(&candidate) {
                        Ok(data) => data,
                        Err(FsError::Json(reason)) => {
                            return Err(ResolveError::InvalidDescriptor {
                                path: candidate,
                                reason: reason.to_string(),
                            });
                        }
                        Err(source) => {
                            return Err(ResolveError::Filesystem {
                                path: candidate,
                                source,
                            });
                        }
                    };
                    if !data.is_object() {
                        return Err(ResolveError::InvalidDescriptor {
                            path: candidate,
                            reason: "root value is not an object".to_string(),
                        });
                    }
                    return Ok(Some(DescriptionFile {
                        path: candidate,
                        root: current.to_path_buf(),
                        data,
                    }));
                }
                Ok(_) => ctx.add_missing_dependency(&candidate),
                Err(_) => ctx.add_missing_dependency(&candidate),
            }
        }
        dir = current.parent();
    }
    Ok(None)
}

/// The relative path from a descriptor root to a candidate, normalized
/// with a leading `./` (`.` when they are equal).
#[must_use]
pub fn relative_to_root(root: &Path, candidate: &Path) -> String {
    match candidate.strip_prefix(root) {
        Ok(rest) if rest.as_os_str().is_empty() => ".".to_string(),
        Ok(rest) => format!("./{}", rest.to_string_lossy().replace('\\', "/")),
        Err(_) => ".".to_string(),
    }
}

/// Dotted-name field lookup: `"a.b.c"` descends nested objects.
#[must_use]
pub fn get_field<'a>(data: &'a Value, dotted_name: &str) -> Option<&'a Value> {
    let mut current = data;
    for part in dotted_name.split('.') {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn cached() -> CachedFileSystem {
        CachedFileSystem::new(
            Arc::new(crate::fs::StdFileSystem),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn walks_up_to_nearest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"outer"}"#).unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let fs_cache = cached();
        let mut ctx = ResolveContext::with_dependencies();
        let found = find_description_file(
            &fs_cache,
            &nested,
            &["package.json".to_string()],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.root, dir.path());
        assert_eq!(found.data["name"], "outer");
        // the misses on the way up were recorded
        assert!(ctx
            .missing_dependencies
            .as_ref()
            .unwrap()
            .contains(&nested.join("package.json")));
    }

    #[test]
    fn first_name_wins_per_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("alt.json"), r#"{"name":"alt"}"#).unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"pkg"}"#).unwrap();

        let fs_cache = cached();
        let mut ctx = ResolveContext::new();
        let found = find_description_file(
            &fs_cache,
            dir.path(),
            &["alt.json".to_string(), "package.json".to_string()],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.data["name"], "alt");
    }

    #[test]
    fn unparseable_descriptor_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ nope").unwrap();

        let fs_cache = cached();
        let mut ctx = ResolveContext::new();
        let err = find_description_file(
            &fs_cache,
            dir.path(),
            &["package.json".to_string()],
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidDescriptor { .. }));
    }

    #[test]
    fn relative_paths() {
        assert_eq!(relative_to_root(Path::new("/p"), Path::new("/p")), ".");
        assert_eq!(
            relative_to_root(Path::new("/p"), Path::new("/p/a/b")),
            "./a/b"
        );
    }

    #[test]
    fn dotted_lookup() {
        let v = json!({"a": {"b": {"c": 1}}, "main": "x.js"});
        assert_eq!(get_field(&v, "a.b.c"), Some(&json!(1)));
        assert_eq!(get_field(&v, "main"), Some(&json!("x.js")));
        assert_eq!(get_field(&v, "a.missing"), None);
    }
}
