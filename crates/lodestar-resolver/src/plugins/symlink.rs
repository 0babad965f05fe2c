//! Symlink canonicalization of the terminal path.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::cached_fs::CachedFileSystem;
use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Link-hop budget, matching the usual kernel ELOOP bound.
const MAX_LINK_HOPS: usize = 40;

/// Resolves every path segment that is a symbolic link, left to right,
/// through the cached filesystem. On a hop-budget blowout the path is
/// returned as far as it got.
fn canonicalize_segments(
    fs: &CachedFileSystem,
    path: &Path,
    ctx: &mut ResolveContext,
) -> PathBuf {
    let mut resolved = PathBuf::new();
    let mut queue: VecDeque<OsString> = VecDeque::new();
    for component in path.components() {
        match component {
            Component::Normal(seg) => queue.push_back(seg.to_os_string()),
            other => resolved.push(other),
        }
    }

    let mut hops = 0;
    while let Some(segment) = queue.pop_front() {
        resolved.push(&segment);
        if hops >= MAX_LINK_HOPS {
            continue;
        }
        if let Ok(target) = fs.read_link(&resolved) {
            hops += 1;
            ctx.add_file_dependency(&resolved);
            let base = resolved
                .parent()
                .map_or_else(PathBuf::new, Path::to_path_buf);
            let substituted = if target.is_absolute() {
                paths::normalize(&target)
            } else {
                paths::normalize(&base.join(target))
            };
            // The link target may itself contain links: restart the scan
            // with the substituted prefix plus the unconsumed remainder.
            let mut requeue: VecDeque<OsString> = VecDeque::new();
            let mut prefix = PathBuf::new();
            for component in substituted.components() {
                match component {
                    Component::Normal(seg) => requeue.push_back(seg.to_os_string()),
                    other => prefix.push(other),
                }
            }
            requeue.extend(queue.drain(..));
            queue = requeue;
            resolved = prefix;
        }
    }
    resolved
}

/// Rewrites the confirmed file path to its symlink-free form before the
/// terminal hook.
#[derive(Debug)]
pub struct SymlinkPlugin {
    target: HookId,
}

impl SymlinkPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for SymlinkPlugin {
    fn name(&self) -> &'static str {
        "SymlinkPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(path) = request.path.clone() else {
            return Ok(PipelineState::Skipped);
        };
        let canonical = canonicalize_segments(resolver.fs(), &path, ctx);
        if canonical == path {
            return resolver.do_resolve(self.target, request.clone(), None, ctx);
        }
        let next = request.with_path(canonical.clone());
        let message = format!("resolved symlink to {}", canonical.display());
        resolver.do_resolve(self.target, next, Some(message), ctx)
    }
}
