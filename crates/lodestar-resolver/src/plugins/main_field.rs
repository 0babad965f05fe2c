//! Directory entry points: main fields and index files.

use crate::context::ResolveContext;
use crate::description::get_field;
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Consults the descriptor's main-field list for an existing directory.
/// The first defined non-empty field wins; if its target does not
/// resolve, the directory falls back to index files.
#[derive(Debug)]
pub struct MainFieldPlugin {
    fields: Vec<String>,
    target: HookId,
}

impl MainFieldPlugin {
    #[must_use]
    pub fn new(fields: Vec<String>, target: HookId) -> Self {
        Self { fields, target }
    }
}

impl Plugin for MainFieldPlugin {
    fn name(&self) -> &'static str {
        "MainFieldPlugin"
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
        // Main fields only come from the directory's own descriptor.
        if path != root {
            return Ok(PipelineState::Skipped);
        }

        let Some((field, main)) = self.fields.iter().find_map(|field| {
            get_field(&data, field)
                .and_then(|v| v.as_str())
                .filter(|main| !main.is_empty())
                .map(|main| (field, main))
        }) else {
            return Ok(PipelineState::Skipped);
        };

        let main_request = if main.starts_with("./") || main.starts_with("../") {
            main.to_string()
        } else {
            format!("./{main}")
        };
        let mut next = request.clone();
        next.request = main_request.clone();
        next.module = false;
        next.directory = main_request.ends_with('/');
        let message = format!(
            "use {main} from {field} in {}",
            request
                .description_file_path
                .as_deref()
                .unwrap_or(&root)
                .display()
        );
        match resolver.do_resolve(self.target, next, Some(message), ctx)? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Skipped),
        }
    }
}

/// Tries one configured index name inside an existing directory.
#[derive(Debug)]
pub struct UseFilePlugin {
    filename: String,
    target: HookId,
}

impl UseFilePlugin {
    #[must_use]
    pub fn new(filename: String, target: HookId) -> Self {
        Self { filename, target }
    }
}

impl Plugin for UseFilePlugin {
    fn name(&self) -> &'static str {
        "UseFilePlugin"
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
        let candidate = path.join(&self.filename);
        let mut next = request.with_path(candidate.clone()).undescribed();
        next.request = String::new();
        next.directory = false;
        let message = format!("using path: {}", candidate.display());
        match resolver.do_resolve(self.target, next, Some(message), ctx)? {
            PipelineState::Done(resolution) => Ok(PipelineState::Done(resolution)),
            PipelineState::Skipped | PipelineState::Halted => Ok(PipelineState::Skipped),
        }
    }
}
