//! The partial-resolution record threaded through the pipeline.
//!
//! A [`ResolveRequest`] is a value: plugins never mutate one in place, they
//! build a modified copy and forward it. The hop record kept for
//! diagnostics can therefore borrow both sides cheaply.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::paths;

/// Opaque key/value map carried from the caller through the pipeline
/// (e.g. the issuer path). Some plugins consult it; the resolver itself
/// never interprets it.
pub type RequestContext = FxHashMap<String, String>;

/// Immutable in-progress resolution state.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Current lookup base. `None` means the path is indeterminate — an
    /// alias rewrote the request into a bare module name and lookup must
    /// restart from the original directory.
    pub path: Option<PathBuf>,
    /// Remaining unresolved suffix. Empty once `path` points directly at a
    /// candidate.
    pub request: String,
    /// `?...` suffix preserved verbatim, or empty.
    pub query: String,
    /// `#...` suffix preserved verbatim, or empty.
    pub fragment: String,
    /// The request explicitly denotes a directory (trailing slash).
    pub directory: bool,
    /// Still a bare module request (no leading `./`, `../`, `/`).
    pub module: bool,
    /// Path of the enclosing description file, once located.
    pub description_file_path: Option<PathBuf>,
    /// Directory containing the description file.
    pub description_file_root: Option<PathBuf>,
    /// Parsed description file content.
    pub description_file_data: Option<Arc<Value>>,
    /// Relative path from `description_file_root` to the current
    /// candidate, normalized with a leading `./`.
    pub relative_path: Option<String>,
    /// Caller-supplied context map.
    pub context: Arc<RequestContext>,
}

impl ResolveRequest {
    /// Initial request for a resolve call. The raw string is split and
    /// classified by the parse plugin as the first pipeline step.
    #[must_use]
    pub fn new(lookup_path: &Path, request: &str, context: Arc<RequestContext>) -> Self {
        Self {
            path: Some(lookup_path.to_path_buf()),
            request: request.to_string(),
            query: String::new(),
            fragment: String::new(),
            directory: false,
            module: false,
            description_file_path: None,
            description_file_root: None,
            description_file_data: None,
            relative_path: None,
            context,
        }
    }

    /// Copy with a new lookup base; the descriptor fields are kept (they
    /// are only cleared when the request leaves the described subtree, see
    /// [`Self::undescribed`]) and `relative_path` tracks the new
    /// candidate.
    #[must_use]
    pub fn with_path(&self, path: PathBuf) -> Self {
        let relative_path = self
            .description_file_root
            .as_deref()
            .map(|root| crate::description::relative_to_root(root, &path));
        Self {
            path: Some(path),
            relative_path,
            ..self.clone()
        }
    }

    /// Copy with a new request suffix, reclassifying `module` and
    /// `directory` from it.
    #[must_use]
    pub fn with_request(&self, request: impl Into<String>) -> Self {
        let request = request.into();
        let directory = is_directory_request(&request);
        let module = is_module_request(&request);
        Self {
            request,
            directory,
            module,
            ..self.clone()
        }
    }

    /// Copy with the descriptor fields cleared, for candidates that must
    /// be re-described.
    #[must_use]
    pub fn undescribed(&self) -> Self {
        Self {
            description_file_path: None,
            description_file_root: None,
            description_file_data: None,
            relative_path: None,
            ..self.clone()
        }
    }

    /// Copy with all three descriptor fields and the relative path set
    /// together (the model invariant: never partially populated).
    #[must_use]
    pub fn described(
        &self,
        file: PathBuf,
        root: PathBuf,
        data: Arc<Value>,
        relative_path: String,
    ) -> Self {
        Self {
            description_file_path: Some(file),
            description_file_root: Some(root),
            description_file_data: Some(data),
            relative_path: Some(relative_path),
            ..self.clone()
        }
    }

    /// Render for messages and the recursion-guard stack. Two requests
    /// with the same rendering are the same pipeline state.
    #[must_use]
    pub fn stack_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}{}",
            self.path
                .as_deref()
                .map_or_else(String::new, |p| p.display().to_string()),
            self.request,
            self.query,
            self.fragment,
            u8::from(self.directory),
            u8::from(self.module),
        )
    }

    /// Human-readable form for attempt messages.
    #[must_use]
    pub fn display(&self) -> String {
        let path = self
            .path
            .as_deref()
            .map_or_else(|| "<indeterminate>".to_string(), |p| p.display().to_string());
        if self.request.is_empty() {
            path
        } else {
            format!("{path} :: {}", self.request)
        }
    }
}

/// Split a specifier into `(request, query, fragment)`.
///
/// The first unescaped `?` starts the query, the first unescaped `#`
/// starts the fragment; a backslash escapes either and is dropped from the
/// output. A `#` in the first position belongs to the request — that is
/// how imports-field specifiers (`#dep`) are spelled.
#[must_use]
pub fn parse_identifier(spec: &str) -> (String, String, String) {
    let mut request = String::with_capacity(spec.len());
    let mut query = String::new();
    let mut fragment = String::new();

    #[derive(PartialEq)]
    enum Part {
        Request,
        Query,
        Fragment,
    }
    let mut part = Part::Request;
    let mut chars = spec.chars();
    let mut first = true;

    while let Some(c) = chars.next() {
        let leading = std::mem::replace(&mut first, false);
        match c {
            '\\' if part != Part::Fragment => {
                if let Some(escaped) = chars.next() {
                    match part {
                        Part::Request => request.push(escaped),
                        Part::Query => query.push(escaped),
                        Part::Fragment => unreachable!(),
                    }
                } else {
                    match part {
                        Part::Request => request.push('\\'),
                        Part::Query => query.push('\\'),
                        Part::Fragment => unreachable!(),
                    }
                }
            }
            '?' if part == Part::Request => {
                part = Part::Query;
                query.push('?');
            }
            '#' if part == Part::Request && !leading => {
                part = Part::Fragment;
                fragment.push('#');
            }
            '#' if part == Part::Query => {
                part = Part::Fragment;
                fragment.push('#');
            }
            _ => match part {
                Part::Request => request.push(c),
                Part::Query => query.push(c),
                Part::Fragment => fragment.push(c),
            },
        }
    }

    (request, query, fragment)
}

/// A bare module request: not relative, not absolute, not an
/// imports-field specifier.
#[must_use]
pub fn is_module_request(request: &str) -> bool {
    if request.is_empty()
        || request.starts_with('.')
        || request.starts_with('#')
        || paths::is_absolute_specifier(request)
    {
        return false;
    }
    true
}

/// A request with a trailing slash explicitly denotes a directory.
#[must_use]
pub fn is_directory_request(request: &str) -> bool {
    request.ends_with('/')
}

/// Split a bare specifier into the package name and the remaining
/// subpath, honoring `@scope/name` packages.
#[must_use]
pub fn split_package_specifier(spec: &str) -> (&str, Option<&str>) {
    if let Some(rest) = spec.strip_prefix('@') {
        if let Some(scope_slash) = rest.find('/') {
            let after_scope = &rest[scope_slash + 1..];
            if let Some(name_slash) = after_scope.find('/') {
                let split_at = 1 + scope_slash + 1 + name_slash;
                return (&spec[..split_at], Some(&spec[split_at + 1..]));
            }
        }
        return (spec, None);
    }
    match spec.find('/') {
        Some(pos) => (&spec[..pos], Some(&spec[pos + 1..])),
        None => (spec, None),
    }
}
