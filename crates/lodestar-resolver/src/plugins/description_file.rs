//! Descriptor location step.

use crate::context::ResolveContext;
use crate::description::{find_description_file, relative_to_root};
use crate::error::ResolveError;
use crate::hooks::{HookId, PipelineState, Plugin};
use crate::request::ResolveRequest;
use crate::resolver::Resolver;

/// Walks upward from the current lookup base and attaches the nearest
/// description file to the request. Forwards either way: plugins that
/// need descriptor data decline on their own when none was found.
///
/// Used at several points of the pipeline — the initial lookup directory,
/// each relative candidate, package directories and index-file candidates
/// all need (re-)describing.
#[derive(Debug)]
pub struct DescriptionFilePlugin {
    target: HookId,
}

impl DescriptionFilePlugin {
    #[must_use]
    pub fn new(target: HookId) -> Self {
        Self { target }
    }
}

impl Plugin for DescriptionFilePlugin {
    fn name(&self) -> &'static str {
        "DescriptionFilePlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let Some(path) = request.path.clone() else {
            // Indeterminate base: nothing to walk from.
            return resolver.do_resolve(self.target, request.clone(), None, ctx);
        };

        let names = &resolver.options().description_files;
        match find_description_file(resolver.fs(), &path, names, ctx)? {
            Some(description) => {
                let relative = relative_to_root(&description.root, &path);
                let message = format!(
                    "using description file: {} (relative path: {relative})",
                    description.path.display()
                );
                let next = request.described(
                    description.path,
                    description.root,
                    description.data,
                    relative,
                );
                resolver.do_resolve(self.target, next, Some(message), ctx)
            }
            None => resolver.do_resolve(self.target, request.undescribed(), None, ctx),
        }
    }
}
