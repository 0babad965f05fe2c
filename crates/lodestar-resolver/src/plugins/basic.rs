//! Routing plugins: bridges between stages and the terminal handler.

use std::sync::Arc;

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::{Resolution, ResolvedPath, Resolver};

/// Unconditionally forwards to the target hook.
#[derive(Debug)]
pub struct NextPlugin {
    target: HookId,
}

impl NextPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for NextPlugin {
    fn name(&self) -> &'static str {
        "NextPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        resolver.do_resolve(self.target, request.clone(), None, ctx)
    }
}

/// Forwards to the target hook with a recorded attempt message.
#[derive(Debug)]
pub struct TryNextPlugin {
    message: &'static str,
    target: HookId,
}

impl TryNextPlugin {
    #[must_use]
    pub fn new(message: &'static str, target: HookId) -> Self {
        Self { message, target }
    }
}

impl Plugin for TryNextPlugin {
    fn name(&self) -> &'static str {
        "TryNextPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        resolver.do_resolve(
            self.target,
            request.clone(),
            Some(self.message.to_string()),
            ctx,
        )
    }
}

/// Joins the remaining request suffix onto the lookup base, producing a
/// concrete candidate path.
#[derive(Debug)]
pub struct JoinRequestPlugin {
    target: HookId,
}

impl JoinRequestPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for JoinRequestPlugin {
    fn name(&self) -> &'static str {
        "JoinRequestPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(path) = &request.path else {
            return Ok(PipelineState::Skipped);
        };
        let joined = paths::join_normalized(path, &request.request);
        let mut next = request.with_path(joined);
        next.request = String::new();
        next.module = false;
        resolver.do_resolve(self.target, next, None, ctx)
    }
}

/// Terminal handler: turns the surviving request into the result.
#[derive(Debug)]
pub struct ResultPlugin;

impl Plugin for ResultPlugin {
    fn name(&self) -> &'static str {
        "ResultPlugin"
    }

    fn run(
        &self,
        _resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(path) = &request.path else {
            return Ok(PipelineState::Skipped);
        };
        ctx.trace(|| format!("reporting result {}", path.display()));
        Ok(PipelineState::Done(Resolution::Found(ResolvedPath {
            path: path.clone(),
            query: request.query.clone(),
            fragment: request.fragment.clone(),
            context: Arc::clone(&request.context),
        })))
    }
}
