//! Filesystem probes: file/directory existence and candidate kind.

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Routes non-directory candidates into the file pipeline. Requests with
/// a trailing slash skip it and fall through to directory handling.
#[derive(Debug)]
pub struct FileKindPlugin {
    target: HookId,
}

impl FileKindPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for FileKindPlugin {
    fn name(&self) -> &'static str {
        "FileKindPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        if request.directory {
            return Ok(PipelineState::Skipped);
        }
        resolver.do_resolve(self.target, request.clone(), None, ctx)
    }
}

/// Confirms the candidate path is a real file.
#[derive(Debug)]
pub struct FileExistsPlugin {
    target: HookId,
}

impl FileExistsPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for FileExistsPlugin {
    fn name(&self) -> &'static str {
        "FileExistsPlugin"
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
        match resolver.fs().stat(&path) {
            Ok(stat) if stat.is_file => {
                ctx.add_file_dependency(&path);
                let message = format!("existing file: {}", path.display());
                resolver.do_resolve(self.target, request.clone(), Some(message), ctx)
            }
            Ok(_) => {
                ctx.add_file_dependency(&path);
                ctx.trace(|| format!("{} is not a file", path.display()));
                Ok(PipelineState::Skipped)
            }
            Err(err) => {
                ctx.add_missing_dependency(&path);
                if !err.is_not_found() {
                    // Non-existence-class errors decline by policy, but
                    // the reason is kept visible in the trace.
                    ctx.trace(|| format!("probe of {} failed: {err}", path.display()));
                }
                Ok(PipelineState::Skipped)
            }
        }
    }
}

/// Confirms the candidate path is a real directory.
#[derive(Debug)]
pub struct DirectoryExistsPlugin {
    target: HookId,
}

impl DirectoryExistsPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for DirectoryExistsPlugin {
    fn name(&self) -> &'static str {
        "DirectoryExistsPlugin"
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
        match resolver.fs().stat(&path) {
            Ok(stat) if stat.is_dir => {
                ctx.add_file_dependency(&path);
                ctx.add_context_dependency(&path);
                let message = format!("existing directory {}", path.display());
                resolver.do_resolve(self.target, request.clone(), Some(message), ctx)
            }
            Ok(_) => {
                ctx.add_file_dependency(&path);
                ctx.trace(|| format!("{} is not a directory", path.display()));
                Ok(PipelineState::Skipped)
            }
            Err(_) => {
                ctx.add_missing_dependency(&path);
                Ok(PipelineState::Skipped)
            }
        }
    }
}
