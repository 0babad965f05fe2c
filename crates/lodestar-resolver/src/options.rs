//! Resolver configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::cached_fs::DEFAULT_CACHE_TTL;
use crate::fs::{FileSystem, StdFileSystem};
use crate::hooks::Plugin;
use crate::resolver::ResolvedPath;

/// Where an alias entry points.
#[derive(Debug, Clone)]
pub enum AliasValue {
    /// The module is deliberately absent; resolution yields `Ignored`.
    Ignore,
    Target(String),
    /// Fallback list, tried in order.
    Targets(Vec<String>),
}

impl AliasValue {
    pub(crate) fn targets(&self) -> &[String] {
        match self {
            Self::Ignore => &[],
            Self::Target(one) => std::slice::from_ref(one),
            Self::Targets(many) => many,
        }
    }
}

/// One alias table entry.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    /// Request (or request prefix) to match.
    pub name: String,
    /// When set, only the exact request matches, never `name/…`.
    pub only_module: bool,
    pub alias: AliasValue,
}

impl AliasEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            only_module: false,
            alias: AliasValue::Target(target.into()),
        }
    }

    /// Entry mapping a request to the `Ignored` sentinel.
    #[must_use]
    pub fn ignored(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            only_module: false,
            alias: AliasValue::Ignore,
        }
    }

    #[must_use]
    pub fn exact(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            only_module: true,
            ..Self::new(name, target)
        }
    }
}

/// Maps one extension to a priority-ordered replacement list, e.g.
/// `.js → [.ts, .js]`.
#[derive(Debug, Clone)]
pub struct ExtensionAlias {
    pub extension: String,
    pub aliases: Vec<String>,
}

/// Post-resolution filter. An entry that *matches* the terminal path
/// rejects it.
#[derive(Clone)]
pub enum Restriction {
    /// Rejects results lexically inside this path.
    Path(PathBuf),
    /// Rejects results whose path matches this pattern.
    Regex(Regex),
    /// Rejects results for which the predicate returns true.
    Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl std::fmt::Debug for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Admission filter for the unsafe result cache.
pub type CachePredicate = Arc<dyn Fn(&ResolvedPath) -> bool + Send + Sync>;

/// A user plugin and the hook it attaches to.
#[derive(Clone)]
pub struct PluginRegistration {
    /// Source hook name, e.g. `"described-resolve"`.
    pub source: String,
    pub plugin: Arc<dyn Plugin>,
}

impl PluginRegistration {
    #[must_use]
    pub fn new(source: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        Self {
            source: source.into(),
            plugin,
        }
    }
}

impl std::fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("source", &self.source)
            .field("plugin", &self.plugin.name())
            .finish()
    }
}

/// Resolver configuration. Construct with [`ResolveOptions::default`] and
/// the `with_*` builders.
#[derive(Clone)]
pub struct ResolveOptions {
    /// Alias table, applied before candidate expansion.
    pub alias: Vec<AliasEntry>,
    /// Descriptor fields holding alias maps (e.g. `"browser"`).
    pub alias_fields: Vec<String>,
    /// Active condition names for exports/imports evaluation.
    pub condition_names: Vec<String>,
    /// Descriptor file names, in priority order.
    pub description_files: Vec<String>,
    /// When set, a bare path without one of `extensions` is never a valid
    /// terminal.
    pub enforce_extension: bool,
    /// Extensions appended to file candidates, in order.
    pub extensions: Vec<String>,
    /// Extension replacement table, consulted before extension appending.
    pub extension_alias: Vec<ExtensionAlias>,
    /// Descriptor fields holding the exports tree, in priority order.
    pub exports_fields: Vec<String>,
    /// Descriptor fields holding the imports tree, in priority order.
    pub imports_fields: Vec<String>,
    /// Descriptor fields consulted for a directory's entry point.
    pub main_fields: Vec<String>,
    /// Directory index names.
    pub main_files: Vec<String>,
    /// Module directories: relative names are searched hierarchically,
    /// absolute paths are fixed roots.
    pub modules: Vec<String>,
    /// Canonicalize symlinks in the terminal path.
    pub symlinks: bool,
    /// Resolve to a directory instead of a file.
    pub resolve_to_context: bool,
    /// Try `/`-prefixed requests against these roots.
    pub roots: Vec<PathBuf>,
    /// Try bare requests as relative before module lookup.
    pub prefer_relative: bool,
    /// Try `/`-prefixed requests as absolute paths before `roots`.
    pub prefer_absolute: bool,
    /// Post-resolution filters.
    pub restrictions: Vec<Restriction>,
    /// Memoize entire resolve results keyed by (path, request[, context]).
    pub unsafe_cache: bool,
    /// Include the request context in the unsafe-cache key.
    pub cache_with_context: bool,
    /// Admission filter for the unsafe cache.
    pub cache_predicate: Option<CachePredicate>,
    /// User plugins, attached after the built-ins.
    pub plugins: Vec<PluginRegistration>,
    /// Filesystem capability.
    pub file_system: Arc<dyn FileSystem>,
    /// Probe cache expiry.
    pub cache_ttl: Duration,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            alias: Vec::new(),
            alias_fields: Vec::new(),
            condition_names: Vec::new(),
            description_files: vec!["package.json".to_string()],
            enforce_extension: false,
            extensions: vec![".js".to_string(), ".json".to_string(), ".node".to_string()],
            extension_alias: Vec::new(),
            exports_fields: vec!["exports".to_string()],
            imports_fields: vec!["imports".to_string()],
            main_fields: vec!["main".to_string()],
            main_files: vec!["index".to_string()],
            modules: vec!["node_modules".to_string()],
            symlinks: true,
            resolve_to_context: false,
            roots: Vec::new(),
            prefer_relative: false,
            prefer_absolute: false,
            restrictions: Vec::new(),
            unsafe_cache: false,
            cache_with_context: true,
            cache_predicate: None,
            plugins: Vec::new(),
            file_system: Arc::new(StdFileSystem),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl std::fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("alias", &self.alias)
            .field("alias_fields", &self.alias_fields)
            .field("condition_names", &self.condition_names)
            .field("description_files", &self.description_files)
            .field("enforce_extension", &self.enforce_extension)
            .field("extensions", &self.extensions)
            .field("extension_alias", &self.extension_alias)
            .field("exports_fields", &self.exports_fields)
            .field("imports_fields", &self.imports_fields)
            .field("main_fields", &self.main_fields)
            .field("main_files", &self.main_files)
            .field("modules", &self.modules)
            .field("symlinks", &self.symlinks)
            .field("resolve_to_context", &self.resolve_to_context)
            .field("roots", &self.roots)
            .field("prefer_relative", &self.prefer_relative)
            .field("prefer_absolute", &self.prefer_absolute)
            .field("restrictions", &self.restrictions)
            .field("unsafe_cache", &self.unsafe_cache)
            .field("cache_with_context", &self.cache_with_context)
            .field("plugins", &self.plugins)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl ResolveOptions {
    #[must_use]
    pub fn with_extensions<S: Into<String>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: Vec<AliasEntry>) -> Self {
        self.alias = alias;
        self
    }

    #[must_use]
    pub fn with_condition_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.condition_names = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_main_fields<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.main_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_symlinks(mut self, symlinks: bool) -> Self {
        self.symlinks = symlinks;
        self
    }

    #[must_use]
    pub fn with_file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }

    #[must_use]
    pub fn with_unsafe_cache(mut self, unsafe_cache: bool) -> Self {
        self.unsafe_cache = unsafe_cache;
        self
    }
}
