//! Exports-field evaluation and package self-references.

use crate::context::ResolveContext;
use crate::description::get_field;
use crate::error::ResolveError;
use crate::exports::{resolve_exports_field, FieldError};
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Evaluates a package's exports field for the requested sub-path.
///
/// Only applies when the located descriptor belongs to the package
/// directory itself; a descriptor inherited from an ancestor never
/// redirects a foreign package. When the field exists but does not cover
/// the sub-path, the package is sealed — resolution of this candidate
/// halts instead of falling back to the filesystem.
#[derive(Debug)]
pub struct ExportsFieldPlugin {
    target: HookId,
}

impl ExportsFieldPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for ExportsFieldPlugin {
    fn name(&self) -> &'static str {
        "ExportsFieldPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let (Some(path), Some(root), Some(data)) = (
            request.path.clone(),
            request.description_file_root.clone(),
            request.description_file_data.clone(),
        ) else {
            return Ok(PipelineState::Skipped);
        };
        if path != root {
            return Ok(PipelineState::Skipped);
        }
        let Some(field) = resolver
            .options()
            .exports_fields
            .iter()
            .find_map(|name| get_field(&data, name))
        else {
            return Ok(PipelineState::Skipped);
        };

        let subpath = if request.request.is_empty() {
            "."
        } else {
            request.request.as_str()
        };

        let targets = match resolve_exports_field(field, subpath, resolver.condition_set()) {
            Ok(targets) => targets,
            Err(FieldError::Blocked { subpath }) => {
                return Err(ResolveError::ExportsBlocked {
                    package: root,
                    subpath,
                });
            }
            Err(FieldError::InvalidTarget { target }) => {
                return Err(ResolveError::InvalidExportsTarget {
                    path: request
                        .description_file_path
                        .clone()
                        .unwrap_or_else(|| root.clone()),
                    target,
                });
            }
        };
        if targets.is_empty() {
            ctx.trace(|| format!("exports field of {} does not cover '{subpath}'", root.display()));
            return Ok(PipelineState::Halted);
        }

        for target in targets {
            let joined = paths::join_normalized(&root, &target);
            let mut next = request.undescribed();
            next.path = Some(joined);
            next.request = String::new();
            next.module = false;
            next.directory = target.ends_with('/');
            let message = format!("using exports field: {target}");
            match resolver.do_resolve(self.target, next, Some(message), ctx)? {
                PipelineState::Done(resolution) => return Ok(PipelineState::Done(resolution)),
                PipelineState::Skipped | PipelineState::Halted => {}
            }
        }
        Ok(PipelineState::Halted)
    }
}

/// Resolves a bare request that names the enclosing package itself
/// through that package's exports field.
#[derive(Debug)]
pub struct SelfReferencePlugin {
    target: HookId,
}

impl SelfReferencePlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for SelfReferencePlugin {
    fn name(&self) -> &'static str {
        "SelfReferencePlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let (Some(root), Some(data)) = (
            request.description_file_root.clone(),
            request.description_file_data.clone(),
        ) else {
            return Ok(PipelineState::Skipped);
        };
        let Some(name) = data.get("name").and_then(|v| v.as_str()) else {
            return Ok(PipelineState::Skipped);
        };
        // Self-references only exist for packages with an exports field.
        if !resolver
            .options()
            .exports_fields
            .iter()
            .any(|field| get_field(&data, field).is_some())
        {
            return Ok(PipelineState::Skipped);
        }

        let subpath = if request.request == name {
            ".".to_string()
        } else if let Some(rest) = request
            .request
            .strip_prefix(name)
            .and_then(|r| r.strip_prefix('/'))
        {
            format!("./{rest}")
        } else {
            return Ok(PipelineState::Skipped);
        };

        let mut next = request.with_path(root);
        next.request = subpath;
        next.module = false;
        let message = format!("self reference to package '{name}'");
        match resolver.do_resolve(self.target, next, Some(message), ctx)? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Halted),
        }
    }
}
