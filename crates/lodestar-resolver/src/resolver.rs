//! Resolver construction and the pipeline driver.
//!
//! Construction wires the built-in plugin set into a statically-known
//! sequence per hook, then appends user plugins to their declared source
//! hooks. Driving a resolve call is recursive descent over
//! [`Resolver::do_resolve`]: each hop appends a `hook|request` entry to
//! the recursion-guard stack, records the forwarding message for
//! diagnostics, and runs the target hook's handlers in order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::cached_fs::CachedFileSystem;
use crate::context::{Attempt, ResolveContext};
use crate::error::ResolveError;
use crate::hooks::{names, HookId, HookRegistry, PipelineState};
use crate::options::ResolveOptions;
use crate::paths;
use crate::plugins::{
    AliasFieldPlugin, AliasPlugin, AppendExtensionsPlugin, DescriptionFilePlugin,
    DirectoryExistsPlugin, ExportsFieldPlugin, ExtensionAliasPlugin, FileExistsPlugin,
    FileKindPlugin, ImportsFieldPlugin, InternalKindPlugin, JoinRequestPlugin, MainFieldPlugin,
    ModuleKindPlugin, ModulesInHierarchicalDirectoriesPlugin, ModulesInRootPlugin, NextPlugin,
    ParsePlugin, PreferRelativePlugin, ResolveAsModulePlugin, RestrictionsPlugin, ResultPlugin,
    RootsPlugin, SelfReferencePlugin, SymlinkPlugin, TryNextPlugin, UseFilePlugin,
};
use crate::request::{RequestContext, ResolveRequest};

/// Absolute pipeline depth cap, on top of the `(hook, request)` dedup
/// guard.
const MAX_PIPELINE_DEPTH: u32 = 256;

/// A successfully resolved terminal path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// Absolute path, symlink-free when canonicalization is enabled.
    pub path: PathBuf,
    /// Preserved `?...` suffix, or empty.
    pub query: String,
    /// Preserved `#...` suffix, or empty.
    pub fragment: String,
    /// The request context the call was made with, handed back to the
    /// caller (plugins may have replaced it along the way).
    #[serde(skip)]
    pub context: Arc<RequestContext>,
}

impl ResolvedPath {
    /// Path with query and fragment re-attached.
    #[must_use]
    pub fn full(&self) -> String {
        format!("{}{}{}", self.path.display(), self.query, self.fragment)
    }
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedPath),
    /// The request maps to the "deliberately absent" sentinel.
    Ignored,
}

impl Resolution {
    /// The resolved path, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found(found) => Some(&found.path),
            Self::Ignored => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultCacheKey {
    path: PathBuf,
    request: String,
    context: Option<String>,
}

/// A configured resolver. Construction happens once per configuration;
/// the instance may serve concurrent resolve calls.
pub struct Resolver {
    options: ResolveOptions,
    fs: CachedFileSystem,
    hooks: HookRegistry,
    entry: HookId,
    condition_set: FxHashSet<String>,
    result_cache: RwLock<FxHashMap<ResultCacheKey, Resolution>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.options)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Build a resolver, wiring the built-in pipeline for `options` and
    /// attaching user plugins. Fails with [`ResolveError::UnknownHook`]
    /// when a user plugin names a hook that does not exist.
    pub fn new(options: ResolveOptions) -> Result<Self, ResolveError> {
        let mut hooks = HookRegistry::new();
        for name in names::CANONICAL {
            hooks.ensure_hook(name);
        }

        let resolve = hooks.get_hook(names::RESOLVE)?;
        let parsed_resolve = hooks.get_hook(names::PARSED_RESOLVE)?;
        let described_resolve = hooks.get_hook(names::DESCRIBED_RESOLVE)?;
        let raw_resolve = hooks.get_hook(names::RAW_RESOLVE)?;
        let normal_resolve = hooks.get_hook(names::NORMAL_RESOLVE)?;
        let internal = hooks.get_hook(names::INTERNAL)?;
        let raw_module = hooks.get_hook(names::RAW_MODULE)?;
        let module = hooks.get_hook(names::MODULE)?;
        let resolve_as_module = hooks.get_hook(names::RESOLVE_AS_MODULE)?;
        let resolve_in_package = hooks.get_hook(names::RESOLVE_IN_PACKAGE)?;
        let relative = hooks.get_hook(names::RELATIVE)?;
        let described_relative = hooks.get_hook(names::DESCRIBED_RELATIVE)?;
        let directory = hooks.get_hook(names::DIRECTORY)?;
        let existing_directory = hooks.get_hook(names::EXISTING_DIRECTORY)?;
        let resolve_in_existing_directory =
            hooks.get_hook(names::RESOLVE_IN_EXISTING_DIRECTORY)?;
        let undescribed_raw_file = hooks.get_hook(names::UNDESCRIBED_RAW_FILE)?;
        let raw_file = hooks.get_hook(names::RAW_FILE)?;
        let file = hooks.get_hook(names::FILE)?;
        let final_file = hooks.get_hook(names::FINAL_FILE)?;
        let existing_file = hooks.get_hook(names::EXISTING_FILE)?;
        let resolved = hooks.get_hook(names::RESOLVED)?;

        // Entry and descriptor location.
        hooks.add_plugin("resolve", Arc::new(ParsePlugin::new(parsed_resolve)))?;
        hooks.add_plugin(
            "parsed-resolve",
            Arc::new(DescriptionFilePlugin::new(described_resolve)),
        )?;

        // `#`-imports route ahead of everything else; the bridge to the
        // next stage sits on the `after-` flavor so user plugins on
        // `described-resolve` run first.
        hooks.add_plugin(
            "described-resolve",
            Arc::new(InternalKindPlugin::new(internal)),
        )?;
        hooks.add_plugin(
            "after-described-resolve",
            Arc::new(NextPlugin::new(raw_resolve)),
        )?;
        hooks.add_plugin(
            "internal",
            Arc::new(ImportsFieldPlugin::new(relative, resolve)),
        )?;

        // Alias-like rewrites restart at the entry hook so the rewritten
        // string is re-parsed and re-described.
        if !options.alias.is_empty() {
            hooks.add_plugin(
                "raw-resolve",
                Arc::new(AliasPlugin::new(options.alias.clone(), resolve)),
            )?;
        }
        for field in &options.alias_fields {
            hooks.add_plugin(
                "raw-resolve",
                Arc::new(AliasFieldPlugin::new(field.clone(), resolve)),
            )?;
        }
        hooks.add_plugin("after-raw-resolve", Arc::new(NextPlugin::new(normal_resolve)))?;

        // Candidate expansion: roots, prefer-relative, module walk, join.
        if !options.prefer_absolute && !options.roots.is_empty() {
            hooks.add_plugin(
                "normal-resolve",
                Arc::new(RootsPlugin::new(options.roots.clone(), relative)),
            )?;
        }
        if options.prefer_relative {
            hooks.add_plugin(
                "normal-resolve",
                Arc::new(PreferRelativePlugin::new(normal_resolve)),
            )?;
        }
        hooks.add_plugin("normal-resolve", Arc::new(ModuleKindPlugin::new(raw_module)))?;
        hooks.add_plugin(
            "after-normal-resolve",
            Arc::new(JoinRequestPlugin::new(relative)),
        )?;
        if options.prefer_absolute && !options.roots.is_empty() {
            hooks.add_plugin(
                "after-normal-resolve",
                Arc::new(RootsPlugin::new(options.roots.clone(), relative)),
            )?;
        }

        // Bare modules: self-reference first, then the directory walks.
        hooks.add_plugin(
            "raw-module",
            Arc::new(SelfReferencePlugin::new(resolve_in_package)),
        )?;
        let mut hierarchical = Vec::new();
        for entry in &options.modules {
            if paths::is_absolute_specifier(entry) {
                hooks.add_plugin(
                    "raw-module",
                    Arc::new(ModulesInRootPlugin::new(PathBuf::from(entry), module)),
                )?;
            } else {
                hierarchical.push(entry.clone());
            }
        }
        if !hierarchical.is_empty() {
            hooks.add_plugin(
                "raw-module",
                Arc::new(ModulesInHierarchicalDirectoriesPlugin::new(
                    hierarchical,
                    module,
                )),
            )?;
        }
        hooks.add_plugin("module", Arc::new(ResolveAsModulePlugin::new(resolve_as_module)))?;
        hooks.add_plugin(
            "resolve-as-module",
            Arc::new(DescriptionFilePlugin::new(resolve_in_package)),
        )?;
        hooks.add_plugin(
            "resolve-in-package",
            Arc::new(ExportsFieldPlugin::new(relative)),
        )?;
        hooks.add_plugin(
            "after-resolve-in-package",
            Arc::new(JoinRequestPlugin::new(relative)),
        )?;

        // Relative candidates: describe, then file before directory.
        hooks.add_plugin(
            "relative",
            Arc::new(DescriptionFilePlugin::new(described_relative)),
        )?;
        if !options.resolve_to_context {
            hooks.add_plugin(
                "described-relative",
                Arc::new(FileKindPlugin::new(raw_file)),
            )?;
        }
        hooks.add_plugin(
            "after-described-relative",
            Arc::new(TryNextPlugin::new("as directory", directory)),
        )?;

        // Directories.
        hooks.add_plugin(
            "directory",
            Arc::new(DirectoryExistsPlugin::new(existing_directory)),
        )?;
        if options.resolve_to_context {
            hooks.add_plugin("existing-directory", Arc::new(NextPlugin::new(resolved)))?;
        } else {
            if !options.main_fields.is_empty() {
                hooks.add_plugin(
                    "existing-directory",
                    Arc::new(MainFieldPlugin::new(
                        options.main_fields.clone(),
                        resolve_in_existing_directory,
                    )),
                )?;
            }
            for main_file in &options.main_files {
                hooks.add_plugin(
                    "existing-directory",
                    Arc::new(UseFilePlugin::new(main_file.clone(), undescribed_raw_file)),
                )?;
            }
            hooks.add_plugin(
                "resolve-in-existing-directory",
                Arc::new(JoinRequestPlugin::new(relative)),
            )?;
        }

        // Files: extension alias, extension appending, existence.
        hooks.add_plugin(
            "undescribed-raw-file",
            Arc::new(DescriptionFilePlugin::new(raw_file)),
        )?;
        for alias in &options.extension_alias {
            hooks.add_plugin(
                "raw-file",
                Arc::new(ExtensionAliasPlugin::new(alias.clone(), final_file)),
            )?;
        }
        hooks.add_plugin("after-raw-file", Arc::new(NextPlugin::new(file)))?;
        hooks.add_plugin(
            "file",
            Arc::new(AppendExtensionsPlugin::new(
                options.extensions.clone(),
                options.enforce_extension,
                final_file,
            )),
        )?;
        hooks.add_plugin("final-file", Arc::new(FileExistsPlugin::new(existing_file)))?;

        // Terminal: symlinks, restrictions, result.
        if options.symlinks {
            hooks.add_plugin("existing-file", Arc::new(SymlinkPlugin::new(resolved)))?;
        } else {
            hooks.add_plugin("existing-file", Arc::new(NextPlugin::new(resolved)))?;
        }
        if !options.restrictions.is_empty() {
            hooks.add_plugin(
                "resolved",
                Arc::new(RestrictionsPlugin::new(options.restrictions.clone())),
            )?;
        }
        hooks.add_plugin("after-resolved", Arc::new(ResultPlugin))?;

        // User plugins attach to their declared source hook; the
        // `before-`/`after-` prefixes let them run ahead of or behind the
        // built-ins there.
        for registration in &options.plugins {
            hooks.add_plugin(&registration.source, Arc::clone(&registration.plugin))?;
        }

        let condition_set = options.condition_names.iter().cloned().collect();
        let fs = CachedFileSystem::new(Arc::clone(&options.file_system), options.cache_ttl);

        Ok(Self {
            options,
            fs,
            hooks,
            entry: resolve,
            condition_set,
            result_cache: RwLock::new(FxHashMap::default()),
        })
    }

    #[must_use]
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// The shared probe cache; exposed so embedders can `purge` it.
    #[must_use]
    pub fn fs(&self) -> &CachedFileSystem {
        &self.fs
    }

    #[must_use]
    pub fn condition_set(&self) -> &FxHashSet<String> {
        &self.condition_set
    }

    /// Look up a hook by name, for user plugins forwarding requests.
    pub fn hook(&self, name: &str) -> Result<HookId, ResolveError> {
        self.hooks.get_hook(name)
    }

    /// Drop all memoized resolve results (the `unsafe_cache` store).
    pub fn clear_result_cache(&self) {
        self.result_cache
            .write()
            .expect("result cache lock poisoned")
            .clear();
    }

    /// Resolve `request` from the directory `lookup_path`.
    ///
    /// `request_context` is an opaque map carried through to plugins;
    /// `ctx` collects dependency sets, the attempt log and an optional
    /// trace.
    pub fn resolve(
        &self,
        request_context: RequestContext,
        lookup_path: &Path,
        request: &str,
        ctx: &mut ResolveContext,
    ) -> Result<Resolution, ResolveError> {
        ctx.lookup_path = lookup_path.to_path_buf();

        let cache_key = self.options.unsafe_cache.then(|| ResultCacheKey {
            path: lookup_path.to_path_buf(),
            request: request.to_string(),
            context: self
                .options
                .cache_with_context
                .then(|| render_context(&request_context)),
        });
        if let Some(key) = &cache_key {
            let cache = self.result_cache.read().expect("result cache lock poisoned");
            if let Some(hit) = cache.get(key) {
                debug!(request, "resolve served from result cache");
                return Ok(hit.clone());
            }
        }

        trace!(request, lookup_path = %lookup_path.display(), "begin resolve");
        let initial = ResolveRequest::new(lookup_path, request, Arc::new(request_context));
        let message = format!("resolve '{request}' in '{}'", lookup_path.display());
        let state = self.do_resolve(self.entry, initial, Some(message), ctx)?;

        match state {
            PipelineState::Done(resolution) => {
                if let Some(key) = cache_key {
                    if self.admit(&resolution) {
                        self.result_cache
                            .write()
                            .expect("result cache lock poisoned")
                            .insert(key, resolution.clone());
                    }
                }
                Ok(resolution)
            }
            PipelineState::Skipped | PipelineState::Halted => {
                if let Some(path) = ctx.restricted.take() {
                    return Err(ResolveError::RestrictionViolation { path });
                }
                Err(ResolveError::NotFound {
                    request: request.to_string(),
                    path: lookup_path.to_path_buf(),
                    attempts: ctx.attempts.clone(),
                })
            }
        }
    }

    /// Forward a request to a hook.
    ///
    /// The `hook|request` pair is pushed onto the recursion-guard stack
    /// for the duration of the sub-call; a pair already on the stack is
    /// skipped. `message`, when given, is recorded in the attempt log.
    pub fn do_resolve(
        &self,
        hook: HookId,
        request: ResolveRequest,
        message: Option<String>,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let hook_name = self.hooks.name(hook);
        let stack_entry = format!("{hook_name}|{}", request.stack_key());
        if !ctx.stack.insert(stack_entry.clone()) {
            ctx.trace(|| format!("recursion detected: {stack_entry}"));
            return Ok(PipelineState::Skipped);
        }
        if ctx.depth >= MAX_PIPELINE_DEPTH {
            ctx.stack.remove(&stack_entry);
            ctx.trace(|| format!("pipeline depth limit reached at {hook_name}"));
            return Ok(PipelineState::Halted);
        }
        ctx.depth += 1;

        if let Some(message) = &message {
            trace!(hook = hook_name, request = %request.display(), message = %message, "pipeline hop");
            ctx.attempts.push(Attempt {
                hook: hook_name.to_string(),
                request: request.display(),
                message: message.clone(),
            });
            ctx.trace(|| format!("{message} ({hook_name})"));
        }

        let result = self.run_hook(hook, &request, ctx);

        ctx.depth -= 1;
        ctx.stack.remove(&stack_entry);
        result
    }

    fn run_hook(
        &self,
        hook: HookId,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        for plugin in self.hooks.handlers(hook) {
            match plugin.run(self, request, ctx)? {
                PipelineState::Skipped => {}
                state @ (PipelineState::Halted | PipelineState::Done(_)) => {
                    return Ok(state);
                }
            }
        }
        Ok(PipelineState::Skipped)
    }

    fn admit(&self, resolution: &Resolution) -> bool {
        match resolution {
            Resolution::Found(found) => self
                .options
                .cache_predicate
                .as_ref()
                .map_or(true, |predicate| predicate(found)),
            Resolution::Ignored => true,
        }
    }
}

/// Stable rendering of the request context for the result-cache key.
fn render_context(context: &RequestContext) -> String {
    let mut entries: Vec<_> = context
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    entries.sort_unstable();
    entries.join("\u{0}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PluginRegistration;
    use crate::hooks::Plugin;

    #[test]
    fn default_options_construct() {
        let resolver = Resolver::new(ResolveOptions::default()).unwrap();
        assert!(resolver.hook("described-resolve").is_ok());
        assert!(resolver.hook("nope").is_err());
    }

    #[test]
    fn unknown_user_plugin_hook_fails_construction() {
        #[derive(Debug)]
        struct Noop;
        impl Plugin for Noop {
            fn name(&self) -> &'static str {
                "Noop"
            }
            fn run(
                &self,
                _resolver: &Resolver,
                _request: &ResolveRequest,
                _ctx: &mut ResolveContext,
            ) -> Result<PipelineState, ResolveError> {
                Ok(PipelineState::Skipped)
            }
        }

        let options = ResolveOptions {
            plugins: vec![PluginRegistration::new("no-such-hook", Arc::new(Noop))],
            ..ResolveOptions::default()
        };
        assert!(matches!(
            Resolver::new(options),
            Err(ResolveError::UnknownHook(_))
        ));
    }

    #[test]
    fn resolver_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Resolver>();
    }

    #[test]
    fn context_rendering_is_order_independent() {
        let mut a = RequestContext::default();
        a.insert("x".into(), "1".into());
        a.insert("y".into(), "2".into());
        let mut b = RequestContext::default();
        b.insert("y".into(), "2".into());
        b.insert("x".into(), "1".into());
        assert_eq!(render_context(&a), render_context(&b));
    }
}
