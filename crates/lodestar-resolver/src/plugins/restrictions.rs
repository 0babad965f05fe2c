//! Post-resolution restriction filtering.

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{PipelineState, Plugin};
use crate::options::Restriction;
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Rejects terminal paths matched by a configured restriction. Other
/// pending candidates (e.g. further extensions) are still tried; if none
/// survives, the overall result is a `RestrictionViolation`.
#[derive(Debug)]
pub struct RestrictionsPlugin {
    restrictions: Vec<Restriction>,
}

impl RestrictionsPlugin {
    #[must_use]
    pub fn new(restrictions: Vec<Restriction>) -> Self {
        Self { restrictions }
    }
}

impl Plugin for RestrictionsPlugin {
    fn name(&self) -> &'static str {
        "RestrictionsPlugin"
    }

    fn run(
        &self,
        _resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(path) = request.path.clone() else {
            return Ok(PipelineState::Skipped);
        };
        for restriction in &self.restrictions {
            let matched = match restriction {
                Restriction::Path(prefix) => paths::is_inside(&path, prefix),
                Restriction::Regex(pattern) => pattern.is_match(&path.to_string_lossy()),
                Restriction::Predicate(predicate) => predicate(&path),
            };
            if matched {
                ctx.trace(|| format!("{} is rejected by a restriction", path.display()));
                ctx.restricted = Some(path);
                return Ok(PipelineState::Halted);
            }
        }
        Ok(PipelineState::Skipped)
    }
}
