//! Hook registry.
//!
//! A hook is a named extension point holding an ordered handler list. The
//! built-in pipeline is wired into a statically-known sequence per hook at
//! construction; user plugins attach to any hook by name, and the
//! `before-`/`after-` prefixes control where they land relative to the
//! built-ins there.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::request::ResolveRequest;
use crate::resolver::{Resolution, Resolver};

/// Canonical hook names, in pipeline order. Sub-hooks between stages use
/// the `before-`/`after-` prefix convention and are created on demand.
pub mod names {
    pub const RESOLVE: &str = "resolve";
    pub const PARSED_RESOLVE: &str = "parsed-resolve";
    pub const DESCRIBED_RESOLVE: &str = "described-resolve";
    pub const RAW_RESOLVE: &str = "raw-resolve";
    pub const NORMAL_RESOLVE: &str = "normal-resolve";
    pub const INTERNAL: &str = "internal";
    pub const RAW_MODULE: &str = "raw-module";
    pub const MODULE: &str = "module";
    pub const RESOLVE_AS_MODULE: &str = "resolve-as-module";
    pub const RESOLVE_IN_PACKAGE: &str = "resolve-in-package";
    pub const RELATIVE: &str = "relative";
    pub const DESCRIBED_RELATIVE: &str = "described-relative";
    pub const DIRECTORY: &str = "directory";
    pub const EXISTING_DIRECTORY: &str = "existing-directory";
    pub const RESOLVE_IN_EXISTING_DIRECTORY: &str = "resolve-in-existing-directory";
    pub const UNDESCRIBED_RAW_FILE: &str = "undescribed-raw-file";
    pub const RAW_FILE: &str = "raw-file";
    pub const FILE: &str = "file";
    pub const FINAL_FILE: &str = "final-file";
    pub const EXISTING_FILE: &str = "existing-file";
    pub const RESOLVED: &str = "resolved";

    /// The canonical pipeline, in order.
    pub const CANONICAL: &[&str] = &[
        RESOLVE,
        PARSED_RESOLVE,
        DESCRIBED_RESOLVE,
        RAW_RESOLVE,
        NORMAL_RESOLVE,
        INTERNAL,
        RAW_MODULE,
        MODULE,
        RESOLVE_AS_MODULE,
        RESOLVE_IN_PACKAGE,
        RELATIVE,
        DESCRIBED_RELATIVE,
        DIRECTORY,
        EXISTING_DIRECTORY,
        RESOLVE_IN_EXISTING_DIRECTORY,
        UNDESCRIBED_RAW_FILE,
        RAW_FILE,
        FILE,
        FINAL_FILE,
        EXISTING_FILE,
        RESOLVED,
    ];
}

/// Interned hook handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) usize);

/// Outcome of a plugin (or of a whole hook).
#[derive(Debug)]
pub enum PipelineState {
    /// The handler declined; alternatives may be tried.
    Skipped,
    /// Explicit not-found: stop this hook, do not try its remaining
    /// handlers.
    Halted,
    /// Terminal result.
    Done(Resolution),
}

/// One resolution step.
///
/// A plugin listens on a source hook and usually forwards a rewritten
/// request to a target hook via [`Resolver::do_resolve`]. Returning an
/// error aborts the entire pipeline.
pub trait Plugin: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError>;
}

/// The two prefixed flavors of a hook name: `before-X` handlers run ahead
/// of plain `X` handlers, `after-X` handlers run behind them. Within a
/// stage, iteration order is registration order. Fall-through bridges
/// between canonical stages register on the `after-` flavor, which is how
/// user plugins on the plain name get a chance before the pipeline moves
/// on.
fn split_stage(name: &str) -> (&str, i32) {
    if let Some(base) = name.strip_prefix("before-") {
        (base, -10)
    } else if let Some(base) = name.strip_prefix("after-") {
        (base, 10)
    } else {
        (name, 0)
    }
}

/// Named hooks and their ordered handler lists.
#[derive(Default)]
pub struct HookRegistry {
    hook_names: Vec<String>,
    by_name: FxHashMap<String, HookId>,
    handlers: Vec<Vec<(i32, Arc<dyn Plugin>)>>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hook_names)
            .finish_non_exhaustive()
    }
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a hook by name. Idempotent.
    pub fn ensure_hook(&mut self, name: &str) -> HookId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = HookId(self.hook_names.len());
        self.hook_names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        self.handlers.push(Vec::new());
        id
    }

    /// Look up an existing hook by name.
    pub fn get_hook(&self, name: &str) -> Result<HookId, ResolveError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ResolveError::UnknownHook(name.to_string()))
    }

    #[must_use]
    pub fn name(&self, id: HookId) -> &str {
        &self.hook_names[id.0]
    }

    /// Attach a handler by source name, honoring the `before-`/`after-`
    /// prefix convention. Fails with `UnknownHook` when the base hook
    /// does not exist.
    pub fn add_plugin(
        &mut self,
        source: &str,
        plugin: Arc<dyn Plugin>,
    ) -> Result<(), ResolveError> {
        let (base, stage) = split_stage(source);
        let id = self.get_hook(base)?;
        let list = &mut self.handlers[id.0];
        let position = list.partition_point(|(s, _)| *s <= stage);
        list.insert(position, (stage, plugin));
        Ok(())
    }

    pub fn handlers(&self, id: HookId) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.handlers[id.0].iter().map(|(_, plugin)| plugin)
    }
}
