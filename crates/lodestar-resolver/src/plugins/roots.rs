//! Root-relative and prefer-relative request handling.

use std::path::PathBuf;

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Tries a `/`-prefixed request against each configured root before (or
/// after, under `prefer_absolute`) the raw absolute interpretation.
#[derive(Debug)]
pub struct RootsPlugin {
    roots: Vec<PathBuf>,
    target: HookId,
}

impl RootsPlugin {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, target: HookId) -> Self {
        Self { roots, target }
    }
}

impl Plugin for RootsPlugin {
    fn name(&self) -> &'static str {
        "RootsPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        if !request.request.starts_with('/') {
            return Ok(PipelineState::Skipped);
        }
        for root in &self.roots {
            let joined = paths::join_normalized(root, request.request.trim_start_matches('/'));
            let mut next = request.with_path(joined).undescribed();
            next.request = String::new();
            next.module = false;
            let message = format!("root path {}", root.display());
            match resolver.do_resolve(self.target, next, Some(message), ctx)? {
                PipelineState::Done(resolution) => return Ok(PipelineState::Done(resolution)),
                PipelineState::Skipped | PipelineState::Halted => {}
            }
        }
        Ok(PipelineState::Skipped)
    }
}

/// Under `prefer_relative`, a bare request is first tried as if it were
/// written `./request`; module lookup only runs when that fails.
#[derive(Debug)]
pub struct PreferRelativePlugin {
    target: HookId,
}

impl PreferRelativePlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for PreferRelativePlugin {
    fn name(&self) -> &'static str {
        "PreferRelativePlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        if !request.module {
            return Ok(PipelineState::Skipped);
        }
        let next = request.with_request(format!("./{}", request.request));
        match resolver.do_resolve(
            self.target,
            next,
            Some("prefer relative".to_string()),
            ctx,
        )? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Skipped),
        }
    }
}
