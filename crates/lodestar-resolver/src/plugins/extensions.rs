//! Extension handling: appending configured extensions and the
//! extension-alias rewrite.

use crate::context::ResolveContext;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::options::ExtensionAlias;
use crate::paths;
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Tries the bare candidate (unless `enforce_extension`), then the
/// candidate with each configured extension appended, in order.
#[derive(Debug)]
pub struct AppendExtensionsPlugin {
    extensions: Vec<String>,
    enforce_extension: bool,
    target: HookId,
}

impl AppendExtensionsPlugin {
    #[must_use]
    pub fn new(extensions: Vec<String>, enforce_extension: bool, target: HookId) -> Self {
        Self {
            extensions,
            enforce_extension,
            target,
        }
    }
}

impl Plugin for AppendExtensionsPlugin {
    fn name(&self) -> &'static str {
        "AppendExtensionsPlugin"
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

        if !self.enforce_extension {
            match resolver.do_resolve(
                self.target,
                request.clone(),
                Some("no extension".to_string()),
                ctx,
            )? {
                PipelineState::Done(resolution) => {
                    return Ok(PipelineState::Done(resolution));
                }
                PipelineState::Skipped | PipelineState::Halted => {}
            }
        }

        for extension in &self.extensions {
            let candidate = paths::append_extension(&path, extension);
            let next = request.with_path(candidate);
            let message = format!("add extension {extension}");
            match resolver.do_resolve(self.target, next, Some(message), ctx)? {
                PipelineState::Done(resolution) => {
                    return Ok(PipelineState::Done(resolution));
                }
                PipelineState::Skipped | PipelineState::Halted => {}
            }
        }
        Ok(PipelineState::Skipped)
    }
}

/// Rewrites a candidate carrying a mapped extension into its replacement
/// extensions, in priority order. Once the mapping applies, the original
/// extension is never tried.
#[derive(Debug)]
pub struct ExtensionAliasPlugin {
    alias: ExtensionAlias,
    target: HookId,
}

impl ExtensionAliasPlugin {
    #[must_use]
    pub fn new(alias: ExtensionAlias, target: HookId) -> Self {
        Self { alias, target }
    }
}

impl Plugin for ExtensionAliasPlugin {
    fn name(&self) -> &'static str {
        "ExtensionAliasPlugin"
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
        let path_str = path.to_string_lossy().into_owned();
        let Some(stem) = path_str.strip_suffix(self.alias.extension.as_str()) else {
            return Ok(PipelineState::Skipped);
        };

        for replacement in &self.alias.aliases {
            let candidate = std::path::PathBuf::from(format!("{stem}{replacement}"));
            let next = request.with_path(candidate);
            let message = format!(
                "aliased extension {} to {replacement}",
                self.alias.extension
            );
            match resolver.do_resolve(self.target, next, Some(message), ctx)? {
                PipelineState::Done(resolution) => {
                    return Ok(PipelineState::Done(resolution));
                }
                PipelineState::Skipped | PipelineState::Halted => {}
            }
        }
        Ok(PipelineState::Halted)
    }
}
