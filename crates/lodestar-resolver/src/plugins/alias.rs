//! Alias rewrites: the configured alias table and descriptor alias fields
//! (e.g. `browser`).

use crate::context::ResolveContext;
use crate::description::get_field;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::options::{AliasEntry, AliasValue};
use crate::request::ResolveRequest;
use crate::resolver::{Resolution, Resolver};

/// Matches the request against the alias table and restarts resolution
/// with the rewritten request.
///
/// An entry matches exactly, or as a prefix when the remainder starts
/// with `/` (unless `only_module`). Once an alias matched, the original
/// request is not tried any further — a failing alias target is a
/// definitive miss.
#[derive(Debug)]
pub struct AliasPlugin {
    entries: Vec<AliasEntry>,
    target: HookId,
}

impl AliasPlugin {
    #[must_use]
    pub fn new(entries: Vec<AliasEntry>, target: HookId) -> Self {
        Self { entries, target }
    }
}

/// How `request` matches an alias name: the remainder after the name.
fn match_alias<'r>(request: &'r str, name: &str, only_module: bool) -> Option<&'r str> {
    let rest = request.strip_prefix(name)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if !only_module && rest.starts_with('/') {
        return Some(rest);
    }
    None
}

/// Rewrite the request towards `value`, restarting lookup. A bare target
/// leaves the lookup base indeterminate so module lookup restarts from
/// the original directory.
fn rewritten(request: &ResolveRequest, new_request: String) -> ResolveRequest {
    let mut next = request.with_request(new_request).undescribed();
    if next.module {
        next.path = None;
    }
    next
}

impl Plugin for AliasPlugin {
    fn name(&self) -> &'static str {
        "AliasPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let inner = request.request.clone();
        for entry in &self.entries {
            let Some(remainder) = match_alias(&inner, &entry.name, entry.only_module) else {
                continue;
            };

            if matches!(entry.alias, AliasValue::Ignore) {
                ctx.trace(|| format!("'{inner}' is ignored by alias '{}'", entry.name));
                return Ok(PipelineState::Done(Resolution::Ignored));
            }

            let mut matched = false;
            for value in entry.alias.targets() {
                // Re-entry guard: a request already rewritten by this
                // entry is not rewritten again.
                if inner == *value || inner.starts_with(&format!("{value}/")) {
                    continue;
                }
                matched = true;
                let new_request = format!("{value}{remainder}");
                let message = format!(
                    "aliased with mapping '{}': '{value}' to '{new_request}'",
                    entry.name
                );
                match resolver.do_resolve(
                    self.target,
                    rewritten(request, new_request),
                    Some(message),
                    ctx,
                )? {
                    PipelineState::Done(resolution) => {
                        return Ok(PipelineState::Done(resolution));
                    }
                    PipelineState::Skipped | PipelineState::Halted => {}
                }
            }
            if matched {
                return Ok(PipelineState::Halted);
            }
        }
        Ok(PipelineState::Skipped)
    }
}

/// Applies an alias map found in a descriptor field (`alias_fields`),
/// keyed by either the raw request or the descriptor-relative path.
#[derive(Debug)]
pub struct AliasFieldPlugin {
    field: String,
    target: HookId,
}

impl AliasFieldPlugin {
    #[must_use]
    pub fn new(field: String, target: HookId) -> Self {
        Self { field, target }
    }
}

impl Plugin for AliasFieldPlugin {
    fn name(&self) -> &'static str {
        "AliasFieldPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(data) = &request.description_file_data else {
            return Ok(PipelineState::Skipped);
        };
        let Some(map) = get_field(data, &self.field).and_then(|v| v.as_object()) else {
            return Ok(PipelineState::Skipped);
        };

        let inner = if request.request.is_empty() {
            request.relative_path.clone().unwrap_or_default()
        } else {
            request.request.clone()
        };
        let Some(value) = map.get(&inner) else {
            return Ok(PipelineState::Skipped);
        };

        match value {
            serde_json::Value::Bool(false) => {
                ctx.trace(|| format!("'{inner}' is ignored by {} field", self.field));
                Ok(PipelineState::Done(Resolution::Ignored))
            }
            serde_json::Value::String(alias) if *alias != inner => {
                let message = format!(
                    "aliased from description file {} with mapping '{inner}' to '{alias}'",
                    self.field
                );
                match resolver.do_resolve(
                    self.target,
                    rewritten(request, alias.clone()),
                    Some(message),
                    ctx,
                )? {
                    PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
                    PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Halted),
                }
            }
            _ => Ok(PipelineState::Skipped),
        }
    }
}
