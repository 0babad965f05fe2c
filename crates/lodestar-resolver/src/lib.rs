//! Pluggable Node-style module resolution for build tools.
//!
//! Given a starting directory and a request string (`"./a"`, `"pkg/sub"`,
//! `"/abs"`), the resolver determines the absolute path of the target
//! file, following a configurable superset of the Node.js algorithm:
//! aliases, extensions, main fields, conditional exports/imports,
//! self-references, roots and symlink canonicalization.
//!
//! ```no_run
//! use lodestar_resolver::{ResolveContext, ResolveOptions, Resolver};
//!
//! let resolver = Resolver::new(ResolveOptions::default())?;
//! let mut ctx = ResolveContext::with_dependencies();
//! let resolution = resolver.resolve(
//!     Default::default(),
//!     std::path::Path::new("/proj/src"),
//!     "./foo",
//!     &mut ctx,
//! )?;
//! # Ok::<(), lodestar_resolver::ResolveError>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

pub mod cached_fs;
pub mod context;
pub mod description;
pub mod error;
pub mod exports;
pub mod fs;
pub mod hooks;
pub mod options;
pub mod paths;
pub mod plugins;
pub mod request;
pub mod resolver;

pub use cached_fs::{CachedFileSystem, DEFAULT_CACHE_TTL};
pub use context::{Attempt, ResolveContext};
pub use error::ResolveError;
pub use fs::{FileStat, FileSystem, FsError, StdFileSystem};
pub use hooks::{HookId, PipelineState, Plugin};
pub use options::{
    AliasEntry, AliasValue, ExtensionAlias, PluginRegistration, ResolveOptions, Restriction,
};
pub use request::{RequestContext, ResolveRequest};
pub use resolver::{Resolution, ResolvedPath, Resolver};

use std::path::Path;

/// One-shot convenience resolve with default options.
///
/// Builds a throwaway resolver per call; anything beyond a quick lookup
/// should construct a [`Resolver`] once and reuse it so the probe caches
/// pay off.
pub fn resolve(lookup_path: &Path, request: &str) -> Result<Resolution, ResolveError> {
    let resolver = Resolver::new(ResolveOptions::default())?;
    let mut ctx = ResolveContext::new();
    resolver.resolve(RequestContext::default(), lookup_path, request, &mut ctx)
}
