//! Bare-module candidate expansion: the module-directory walk.

use std::path::PathBuf;

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::request::{split_package_specifier, ResolveRequest};
use crate::resolver::Resolver;

/// Routes bare module requests into the module pipeline. A bare request
/// is never a relative path, so module lookup failing is definitive —
/// remaining handlers on the source hook are not tried.
#[derive(Debug)]
pub struct ModuleKindPlugin {
    target: HookId,
}

impl ModuleKindPlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for ModuleKindPlugin {
    fn name(&self) -> &'static str {
        "ModuleKindPlugin"
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
        match resolver.do_resolve(
            self.target,
            request.clone(),
            Some("resolve as module".to_string()),
            ctx,
        )? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Halted),
        }
    }
}

/// Tries each configured module directory name in every ancestor of the
/// lookup base, nearest first.
#[derive(Debug)]
pub struct ModulesInHierarchicalDirectoriesPlugin {
    directories: Vec<String>,
    target: HookId,
}

impl ModulesInHierarchicalDirectoriesPlugin {
    #[must_use]
    pub fn new(directories: Vec<String>, target: HookId) -> Self {
        Self { directories, target }
    }
}

impl Plugin for ModulesInHierarchicalDirectoriesPlugin {
    fn name(&self) -> &'static str {
        "ModulesInHierarchicalDirectoriesPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let base = request
            .path
            .clone()
            .unwrap_or_else(|| ctx.lookup_path.clone());

        let mut dir = Some(base.as_path());
        while let Some(current) = dir {
            for name in &self.directories {
                // Do not look for node_modules/node_modules.
                if current.file_name().and_then(|n| n.to_str()) == Some(name.as_str()) {
                    continue;
                }
                let module_dir = current.join(name);
                match resolver.fs().stat(&module_dir) {
                    Ok(stat) if stat.is_dir => {
                        ctx.add_file_dependency(&module_dir);
                        ctx.add_context_dependency(&module_dir);
                        let mut next = request.with_path(module_dir.clone()).undescribed();
                        next.module = true;
                        let message =
                            format!("looking for modules in {}", module_dir.display());
                        match resolver.do_resolve(self.target, next, Some(message), ctx)? {
                            PipelineState::Done(resolution) => {
                                return Ok(PipelineState::Done(resolution));
                            }
                            PipelineState::Skipped | PipelineState::Halted => {}
                        }
                    }
                    Ok(_) => ctx.add_missing_dependency(&module_dir),
                    Err(_) => ctx.add_missing_dependency(&module_dir),
                }
            }
            dir = current.parent();
        }
        Ok(PipelineState::Skipped)
    }
}

/// Tries a fixed absolute module root (an absolute entry in `modules`).
#[derive(Debug)]
pub struct ModulesInRootPlugin {
    root: PathBuf,
    target: HookId,
}

impl ModulesInRootPlugin {
    #[must_use]
    pub fn new(root: PathBuf, target: HookId) -> Self {
        Self { root, target }
    }
}

impl Plugin for ModulesInRootPlugin {
    fn name(&self) -> &'static str {
        "ModulesInRootPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let mut next = request.with_path(self.root.clone()).undescribed();
        next.module = true;
        let message = format!("looking for modules in {}", self.root.display());
        match resolver.do_resolve(self.target, next, Some(message), ctx)? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Skipped),
        }
    }
}

/// Splits the bare specifier into package name and sub-path and enters
/// the package directory when it exists.
#[derive(Debug)]
pub struct ResolveAsModulePlugin {
    target: HookId,
}

impl ResolveAsModulePlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for ResolveAsModulePlugin {
    fn name(&self) -> &'static str {
        "ResolveAsModulePlugin"
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
        let (package, subpath) = split_package_specifier(&request.request);
        let package_dir = path.join(package);

        match resolver.fs().stat(&package_dir) {
            Ok(stat) if stat.is_dir => {
                ctx.add_file_dependency(&package_dir);
                let mut next = request.with_path(package_dir.clone()).undescribed();
                next.request = match subpath {
                    Some(sub) => format!("./{sub}"),
                    None => ".".to_string(),
                };
                next.module = false;
                let message = format!("existing package directory {}", package_dir.display());
                resolver.do_resolve(self.target, next, Some(message), ctx)
            }
            Ok(_) => {
                ctx.add_missing_dependency(&package_dir);
                Ok(PipelineState::Skipped)
            }
            Err(_) => {
                ctx.add_missing_dependency(&package_dir);
                Ok(PipelineState::Skipped)
            }
        }
    }
}
