use std::path::PathBuf;

use thiserror::Error;

use crate::context::Attempt;
use crate::fs::FsError;

/// Resolution error.
///
/// `NotFound` is the ordinary outcome for an unresolvable request and
/// carries the attempt log; the remaining kinds abort the pipeline.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("cannot resolve '{request}' from '{}'", path.display())]
    NotFound {
        request: String,
        path: PathBuf,
        attempts: Vec<Attempt>,
    },

    #[error("package subpath '{subpath}' is not exported from package at '{}'", package.display())]
    ExportsBlocked { package: PathBuf, subpath: String },

    #[error("invalid description file at '{}': {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("invalid exports target '{target}' in description file at '{}'", path.display())]
    InvalidExportsTarget { path: PathBuf, target: String },

    #[error("resolved path '{}' is rejected by a restriction", path.display())]
    RestrictionViolation { path: PathBuf },

    #[error("unknown hook '{0}'")]
    UnknownHook(String),

    #[error("filesystem error at '{}': {source}", path.display())]
    Filesystem { path: PathBuf, source: FsError },

    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },
}

impl ResolveError {
    /// Error produced by a user plugin.
    #[must_use]
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}
