//! Per-call sidecar state.
//!
//! A [`ResolveContext`] travels by `&mut` through one resolve call and all
//! of its sub-resolves. It collects the dependency sets build tools feed
//! into their watchers, the attempt log that explains failures, and the
//! recursion-guard stack.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Serialize;

/// One recorded pipeline hop, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    /// Hook the request was forwarded to.
    pub hook: String,
    /// The request state at that point.
    pub request: String,
    /// Human-readable reason, e.g. `"using description file: …"`.
    pub message: String,
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.message, self.hook, self.request)
    }
}

/// Mutable state owned by a single resolve call.
#[derive(Debug, Default)]
pub struct ResolveContext {
    /// Files whose content or existence the resolution depended on.
    pub file_dependencies: Option<FxHashSet<PathBuf>>,
    /// Directories whose listing the resolution depended on.
    pub context_dependencies: Option<FxHashSet<PathBuf>>,
    /// Paths that were probed and did not exist. A change to any of them
    /// can change the result.
    pub missing_dependencies: Option<FxHashSet<PathBuf>>,
    /// Optional human-readable trace of every step taken.
    pub log: Option<Vec<String>>,
    /// Every forwarded hop, for the `NotFound` report.
    pub(crate) attempts: Vec<Attempt>,
    /// Active `"hook|request"` entries, the recursion guard.
    pub(crate) stack: FxHashSet<String>,
    /// Absolute pipeline depth, capped independently of the stack guard.
    pub(crate) depth: u32,
    /// The lookup path of the top-level call; the restart base for
    /// requests whose `path` went indeterminate.
    pub(crate) lookup_path: PathBuf,
    /// Last terminal path rejected by a restriction, if any.
    pub(crate) restricted: Option<PathBuf>,
}

impl ResolveContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that collects all three dependency sets.
    #[must_use]
    pub fn with_dependencies() -> Self {
        Self {
            file_dependencies: Some(FxHashSet::default()),
            context_dependencies: Some(FxHashSet::default()),
            missing_dependencies: Some(FxHashSet::default()),
            ..Self::default()
        }
    }

    /// Context that additionally records a trace log.
    #[must_use]
    pub fn with_trace() -> Self {
        Self {
            log: Some(Vec::new()),
            ..Self::with_dependencies()
        }
    }

    /// The attempt log accumulated so far.
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn add_file_dependency(&mut self, path: &Path) {
        if let Some(set) = &mut self.file_dependencies {
            set.insert(path.to_path_buf());
        }
    }

    pub fn add_context_dependency(&mut self, path: &Path) {
        if let Some(set) = &mut self.context_dependencies {
            set.insert(path.to_path_buf());
        }
    }

    pub fn add_missing_dependency(&mut self, path: &Path) {
        if let Some(set) = &mut self.missing_dependencies {
            set.insert(path.to_path_buf());
        }
    }

    /// Append a trace line. The closure only runs when tracing is on.
    pub fn trace(&mut self, line: impl FnOnce() -> String) {
        if let Some(log) = &mut self.log {
            log.push(line());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_sets_are_opt_in() {
        let mut ctx = ResolveContext::new();
        ctx.add_file_dependency(Path::new("/a"));
        assert!(ctx.file_dependencies.is_none());

        let mut ctx = ResolveContext::with_dependencies();
        ctx.add_file_dependency(Path::new("/a"));
        ctx.add_missing_dependency(Path::new("/b"));
        assert!(ctx.file_dependencies.unwrap().contains(Path::new("/a")));
        assert!(ctx.missing_dependencies.unwrap().contains(Path::new("/b")));
    }

    #[test]
    fn trace_closure_is_lazy() {
        let mut ctx = ResolveContext::new();
        ctx.trace(|| unreachable!("trace disabled"));

        let mut ctx = ResolveContext::with_trace();
        ctx.trace(|| "hello".to_string());
        assert_eq!(ctx.log.as_deref().unwrap(), ["hello".to_string()]);
    }
}
