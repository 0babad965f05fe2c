//! Conditional exports/imports interpreter.
//!
//! Evaluates the `exports`/`imports` sub-language of package descriptors:
//! sub-path keys with `*` patterns, condition objects matched in declared
//! key order, array fallbacks, and `null` blocking. The interpreter is
//! purely lexical — it produces candidate targets, and the calling plugin
//! decides which of them terminally resolves.
//!
//! Key order matters: condition objects select the first declared key that
//! is active, which is why descriptors are parsed with insertion order
//! preserved.

use rustc_hash::FxHashSet;
use serde_json::Value;

/// Evaluation failure local to one exports/imports field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A `null` target explicitly blocks the sub-path.
    Blocked { subpath: String },
    /// The matched target is not a relative path inside the package.
    InvalidTarget { target: String },
}

/// One target produced by an `imports` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportsTarget {
    /// `./…` path inside the declaring package.
    Relative(String),
    /// Bare or absolute request that re-enters normal resolution.
    External(String),
}

/// Evaluate an `exports` subtree for `subpath` (`"."` or `"./…"`).
///
/// Returns the matched targets in fallback order, each validated to be a
/// `./`-relative path that stays inside the package. An empty vector
/// means the field does not cover the sub-path.
pub fn resolve_exports_field(
    field: &Value,
    subpath: &str,
    conditions: &FxHashSet<String>,
) -> Result<Vec<String>, FieldError> {
    let mut acc = Accumulator::default();
    match field {
        Value::Object(map) if has_subpath_keys(map, ".") => {
            match_subpath_map(map, subpath, ".", conditions, &mut acc);
        }
        // String, array, or root condition object: covers "." only.
        _ => {
            if subpath == "." {
                expand_target(field, conditions, None, &mut acc);
            }
        }
    }
    acc.finish(subpath, |raw| {
        if valid_relative_target(raw) {
            Some(raw.to_string())
        } else {
            None
        }
    })
}

/// Evaluate an `imports` subtree for a `#`-prefixed request.
pub fn resolve_imports_field(
    field: &Value,
    request: &str,
    conditions: &FxHashSet<String>,
) -> Result<Vec<ImportsTarget>, FieldError> {
    let mut acc = Accumulator::default();
    if let Value::Object(map) = field {
        match_subpath_map(map, request, "#", conditions, &mut acc);
    }
    acc.finish(request, |raw| {
        if valid_relative_target(raw) {
            Some(ImportsTarget::Relative(raw.to_string()))
        } else if raw.starts_with('#') || raw.starts_with("../") || raw.starts_with('.') {
            None
        } else {
            Some(ImportsTarget::External(raw.to_string()))
        }
    })
}

/// Raw expansion results plus what went wrong when nothing matched.
#[derive(Debug, Default)]
struct Accumulator {
    raw: Vec<String>,
    blocked: bool,
}

impl Accumulator {
    fn matched(&self) -> bool {
        self.blocked || !self.raw.is_empty()
    }

    /// Validate raw targets; decide the overall outcome.
    fn finish<T>(
        self,
        subpath: &str,
        classify: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<T>, FieldError> {
        if self.blocked && self.raw.is_empty() {
            return Err(FieldError::Blocked {
                subpath: subpath.to_string(),
            });
        }
        let mut out = Vec::with_capacity(self.raw.len());
        for raw in &self.raw {
            if let Some(target) = classify(raw) {
                out.push(target);
            }
        }
        if out.is_empty() {
            if let Some(first) = self.raw.into_iter().next() {
                return Err(FieldError::InvalidTarget { target: first });
            }
        }
        Ok(out)
    }
}

/// Whether the map is keyed by sub-paths (every descriptor uses either
/// sub-path keys or condition keys at a given level, never both).
fn has_subpath_keys(map: &serde_json::Map<String, Value>, prefix: &str) -> bool {
    map.keys().any(|k| k.starts_with(prefix))
}

/// Look up `subpath` in a sub-path-keyed map: exact match first, then the
/// most specific `*` pattern.
fn match_subpath_map(
    map: &serde_json::Map<String, Value>,
    subpath: &str,
    prefix: &str,
    conditions: &FxHashSet<String>,
    acc: &mut Accumulator,
) {
    if let Some(exact) = map.get(subpath) {
        expand_target(exact, conditions, None, acc);
        if acc.matched() {
            return;
        }
    }

    // Collect matching patterns with their capture, most specific first:
    // longest prefix before `*`, ties broken by longest suffix after it.
    let mut matches: Vec<(&str, &Value, String)> = Vec::new();
    for (key, value) in map {
        if !key.starts_with(prefix) {
            continue;
        }
        if key.chars().filter(|&c| c == '*').count() != 1 {
            continue;
        }
        if let Some(capture) = match_pattern(key, subpath) {
            matches.push((key.as_str(), value, capture));
        }
    }
    matches.sort_by(|a, b| {
        let (ap, asuf) = split_pattern(a.0);
        let (bp, bsuf) = split_pattern(b.0);
        bp.len()
            .cmp(&ap.len())
            .then(bsuf.len().cmp(&asuf.len()))
            .then(a.0.cmp(b.0))
    });

    for (_, value, capture) in &matches {
        expand_target(value, conditions, Some(capture), acc);
        if acc.matched() {
            return;
        }
    }
}

fn split_pattern(pattern: &str) -> (&str, &str) {
    match pattern.find('*') {
        Some(pos) => (&pattern[..pos], &pattern[pos + 1..]),
        None => (pattern, ""),
    }
}

/// Match a single-`*` pattern against a sub-path, returning the capture.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = split_pattern(pattern);
    let rest = subpath.strip_prefix(prefix)?;
    let capture = rest.strip_suffix(suffix)?;
    if capture.is_empty() {
        return None;
    }
    Some(capture.to_string())
}

/// Recursive descent over a target value.
///
/// Strings land in the accumulator (with the pattern capture substituted
/// for every `*`), arrays are fallback lists, objects are condition maps
/// evaluated in declared key order, and `null` marks the branch blocked.
fn expand_target(
    target: &Value,
    conditions: &FxHashSet<String>,
    capture: Option<&str>,
    acc: &mut Accumulator,
) {
    match target {
        Value::Null => acc.blocked = true,
        Value::String(s) => {
            let expanded = match capture {
                Some(capture) => s.replace('*', capture),
                None => s.clone(),
            };
            acc.raw.push(expanded);
        }
        Value::Array(items) => {
            for item in items {
                expand_target(item, conditions, capture, acc);
                if acc.blocked {
                    return;
                }
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                if key.starts_with('.') || key.starts_with('#') {
                    continue;
                }
                if key == "default" || conditions.contains(key) {
                    expand_target(value, conditions, capture, acc);
                    if acc.matched() {
                        return;
                    }
                }
            }
        }
        _ => {}
    }
}

/// A valid exports target: `./`-relative and lexically inside the package
/// root even after `*` substitution.
fn valid_relative_target(target: &str) -> bool {
    if !target.starts_with("./") {
        return false;
    }
    !target.split('/').any(|segment| segment == "..")
}
