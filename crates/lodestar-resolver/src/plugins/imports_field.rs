//! `#`-prefixed imports-field resolution.

use crate::context::ResolveContext;
use crate::description::get_field;
use crate::error::ResolveError;
use crate::exports::{resolve_imports_field, FieldError, ImportsTarget};
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Routes `#`-prefixed requests into the `internal` hook. Such a request
/// is only ever satisfiable through an imports field, so a miss there is
/// definitive.
#[derive(Debug)]
pub struct InternalKindPlugin {
    target: HookId,
}

impl InternalKindPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for InternalKindPlugin {
    fn name(&self) -> &'static str {
        "InternalKindPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        if !request.request.starts_with('#') {
            return Ok(PipelineState::Skipped);
        }
        match resolver.do_resolve(
            self.target,
            request.clone(),
            Some("resolve as internal import".to_string()),
            ctx,
        )? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Halted),
        }
    }
}

/// Evaluates the enclosing package's imports field. Relative targets stay
/// inside the declaring package; external targets re-enter normal
/// resolution from the package root.
#[derive(Debug)]
pub struct ImportsFieldPlugin {
    target_relative: HookId,
    target_restart: HookId,
}

impl ImportsFieldPlugin {
    #[must_use]
    pub fn new(target_relative: HookId, target_restart: HookId) -> Self {
        Self {
            target_relative,
            target_restart,
        }
    }
}

impl Plugin for ImportsFieldPlugin {
    fn name(&self) -> &'static str {
        "ImportsFieldPlugin"
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

        let Some(field) = resolver
            .options()
            .imports_fields
            .iter()
            .find_map(|name| get_field(&data, name))
        else {
            return Ok(PipelineState::Skipped);
        };

        let targets =
            match resolve_imports_field(field, &request.request, resolver.condition_set()) {
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
            return Ok(PipelineState::Skipped);
        }

        for target in targets {
            let state = match target {
                ImportsTarget::Relative(relative) => {
                    let joined = paths::join_normalized(&root, &relative);
                    let mut next = request.undescribed();
                    next.path = Some(joined);
                    next.request = String::new();
                    next.module = false;
                    next.directory = relative.ends_with('/');
                    resolver.do_resolve(
                        self.target_relative,
                        next,
                        Some(format!("using imports field: {relative}")),
                        ctx,
                    )?
                }
                ImportsTarget::External(external) => {
                    let mut next = request.with_request(external.clone()).undescribed();
                    next.path = Some(root.clone());
                    resolver.do_resolve(
                        self.target_restart,
                        next,
                        Some(format!("using imports field: {external}")),
                        ctx,
                    )?
                }
            };
            if let PipelineState::Done(resolution) = state {
                return Ok(PipelineState::Done(resolution));
            }
        }
        Ok(PipelineState::Halted)
    }
}
