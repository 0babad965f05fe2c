//! Request parsing and classification.

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::request::{self, ResolveRequest};
use crate::resolver::Resolver;

/// Splits `query`/`fragment` off the request string and classifies the
/// `module`/`directory` flags. Runs at pipeline entry and again when an
/// alias or imports mapping restarts resolution with a fresh string.
#[derive(Debug)]
pub struct ParsePlugin {
    target: HookId,
}

impl ParsePlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for ParsePlugin {
    fn name(&self) -> &'static str {
        "ParsePlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let (parsed, query, fragment) = request::parse_identifier(&request.request);
        let mut next = request.with_request(parsed);
        if !query.is_empty() {
            next.query = query;
        }
        if !fragment.is_empty() {
            next.fragment = fragment;
        }
        resolver.do_resolve(self.target, next, None, ctx)
    }
}
