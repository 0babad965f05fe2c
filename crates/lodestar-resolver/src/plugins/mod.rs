//! Built-in resolution steps.
//!
//! Every plugin listens on one source hook, performs a single transform or
//! probe, and forwards a new request to a target hook. The wiring order
//! lives in [`crate::resolver::Resolver::new`].

mod alias;
mod basic;
mod description_file;
mod extensions;
mod files;
mod imports_field;
mod main_field;
mod modules;
mod package_exports;
mod parse;
mod restrictions;
mod roots;
mod symlink;

pub use alias::{AliasFieldPlugin, AliasPlugin};
pub use basic::{JoinRequestPlugin, NextPlugin, ResultPlugin, TryNextPlugin};
pub use description_file::DescriptionFilePlugin;
pub use extensions::{AppendExtensionsPlugin, ExtensionAliasPlugin};
pub use files::{DirectoryExistsPlugin, FileExistsPlugin, FileKindPlugin};
pub use imports_field::{ImportsFieldPlugin, InternalKindPlugin};
pub use main_field::{MainFieldPlugin, UseFilePlugin};
pub use modules::{
    ModuleKindPlugin, ModulesInHierarchicalDirectoriesPlugin, ModulesInRootPlugin,
    ResolveAsModulePlugin,
};
pub use package_exports::{ExportsFieldPlugin, SelfReferencePlugin};
pub use parse::ParsePlugin;
pub use restrictions::RestrictionsPlugin;
pub use roots::{PreferRelativePlugin, RootsPlugin};
pub use symlink::SymlinkPlugin;
