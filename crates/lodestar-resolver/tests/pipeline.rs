//! Configuration surface and extensibility: option knobs, user plugins,
//! restrictions and the result cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lodestar_resolver::{
    AliasEntry, ExtensionAlias, PipelineState, Plugin, PluginRegistration, RequestContext,
    ResolveContext, ResolveError, ResolveOptions, ResolveRequest, Resolution, Resolver,
    Restriction,
};
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn resolve_in(r: &Resolver, dir: &Path, request: &str) -> Result<Resolution, ResolveError> {
    let mut ctx = ResolveContext::with_dependencies();
    r.resolve(RequestContext::default(), dir, request, &mut ctx)
}

fn found(result: Result<Resolution, ResolveError>) -> PathBuf {
    match result.unwrap() {
        Resolution::Found(found) => found.path,
        Resolution::Ignored => panic!("expected a path, got Ignored"),
    }
}

#[test]
fn extension_order_is_configuration_order() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.ts"), "");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.extensions = vec![".ts".to_string(), ".js".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./a")), src.join("a.ts"));

    let mut options = ResolveOptions::default();
    options.extensions = vec![".js".to_string(), ".ts".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./a")), src.join("a.js"));
}

#[test]
fn enforce_extension_skips_bare_path() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a"), "");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.enforce_extension = true;
    let r = Resolver::new(options).unwrap();
    let resolved = found(resolve_in(&r, &src, "./a"));
    assert_eq!(resolved, src.join("a.js"));

    // without enforcement the extension-less file wins
    let r = Resolver::new(ResolveOptions::default()).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./a")), src.join("a"));
}

#[test]
fn extension_alias_prefers_replacements() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.ts"), "");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.extension_alias = vec![ExtensionAlias {
        extension: ".js".to_string(),
        aliases: vec![".ts".to_string(), ".js".to_string()],
    }];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./a.js")), src.join("a.ts"));
}

#[test]
fn extension_alias_never_falls_back_to_original() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.extension_alias = vec![ExtensionAlias {
        extension: ".js".to_string(),
        aliases: vec![".ts".to_string()],
    }];
    let r = Resolver::new(options).unwrap();
    // a.js exists, but the mapping only allows a.ts
    assert!(resolve_in(&r, &src, "./a.js").is_err());
}

#[test]
fn main_fields_first_defined_wins() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    write(
        &pkg.join("package.json"),
        r#"{"module":"./esm.js","main":"./cjs.js"}"#,
    );
    write(&pkg.join("esm.js"), "");
    write(&pkg.join("cjs.js"), "");
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();

    let mut options = ResolveOptions::default();
    options.main_fields = vec!["module".to_string(), "main".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "../pkg")), pkg.join("esm.js"));
}

#[test]
fn main_field_missing_target_falls_back_to_index() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    write(&pkg.join("package.json"), r#"{"main":"./gone.js"}"#);
    write(&pkg.join("index.js"), "");
    let r = Resolver::new(ResolveOptions::default()).unwrap();
    assert_eq!(found(resolve_in(&r, dir.path(), "./pkg")), pkg.join("index.js"));
}

#[test]
fn custom_main_files() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("dir/entry.js"), "");

    let mut options = ResolveOptions::default();
    options.main_files = vec!["entry".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./dir")), src.join("dir/entry.js"));
}

#[test]
fn description_files_priority() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    write(&pkg.join("alt.json"), r#"{"main":"./from-alt.js"}"#);
    write(&pkg.join("package.json"), r#"{"main":"./from-pkg.js"}"#);
    write(&pkg.join("from-alt.js"), "");
    write(&pkg.join("from-pkg.js"), "");

    let mut options = ResolveOptions::default();
    options.description_files = vec!["alt.json".to_string(), "package.json".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(
        found(resolve_in(&r, dir.path(), "./pkg")),
        pkg.join("from-alt.js")
    );
}

#[test]
fn alias_field_rewrites_and_ignores() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    write(
        &pkg.join("package.json"),
        r#"{"browser":{"./a.js":"./b.js","net":false}}"#,
    );
    write(&pkg.join("a.js"), "");
    write(&pkg.join("b.js"), "");

    let mut options = ResolveOptions::default();
    options.alias_fields = vec!["browser".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &pkg, "./a.js")), pkg.join("b.js"));
    assert_eq!(resolve_in(&r, &pkg, "net").unwrap(), Resolution::Ignored);
}

#[test]
fn roots_resolve_slash_requests() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    write(&proj.join("static/logo.svg"), "");

    let mut options = ResolveOptions::default();
    options.roots = vec![proj.clone()];
    options.extensions = vec![".js".to_string(), ".svg".to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(
        found(resolve_in(&r, &proj, "/static/logo.svg")),
        proj.join("static/logo.svg")
    );
}

#[test]
fn prefer_relative_tries_relative_first() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("proj/src");
    write(&src.join("utils.js"), "");
    write(
        &dir.path().join("proj/node_modules/utils/index.js"),
        "",
    );

    let mut options = ResolveOptions::default();
    options.prefer_relative = true;
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "utils")), src.join("utils.js"));

    // default precedence goes to the module directory
    let r = Resolver::new(ResolveOptions::default()).unwrap();
    assert_eq!(
        found(resolve_in(&r, &src, "utils")),
        dir.path().join("proj/node_modules/utils/index.js")
    );
}

#[test]
fn modules_absolute_entry_is_fixed_root() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("proj/src");
    fs::create_dir_all(&src).unwrap();
    let vendor = dir.path().join("vendor");
    write(&vendor.join("lib/index.js"), "");

    let mut options = ResolveOptions::default();
    options.modules = vec![vendor.display().to_string()];
    let r = Resolver::new(options).unwrap();
    assert_eq!(
        found(resolve_in(&r, &src, "lib")),
        vendor.join("lib/index.js")
    );
}

#[test]
fn resolve_to_context_returns_directory() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("dir/index.js"), "");

    let mut options = ResolveOptions::default();
    options.resolve_to_context = true;
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./dir")), src.join("dir"));
}

#[test]
fn restriction_path_rejects_matches() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("sealed/a.js"), "");

    let mut options = ResolveOptions::default();
    options.restrictions = vec![Restriction::Path(src.join("sealed"))];
    let r = Resolver::new(options).unwrap();
    assert!(matches!(
        resolve_in(&r, &src, "./sealed/a"),
        Err(ResolveError::RestrictionViolation { .. })
    ));
}

#[test]
fn restriction_regex_rejects_matches() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.test.js"), "");
    write(&src.join("data.js"), "");
    write(&src.join("data.json"), "");

    let mut options = ResolveOptions::default();
    options.restrictions = vec![Restriction::Regex(
        regex::Regex::new(r"\.(test\.js|js)$").unwrap(),
    )];
    let r = Resolver::new(options).unwrap();
    assert!(matches!(
        resolve_in(&r, &src, "./a.test.js"),
        Err(ResolveError::RestrictionViolation { .. })
    ));
    // the .js candidate is rejected, the .json alternative survives
    assert_eq!(found(resolve_in(&r, &src, "./data")), src.join("data.json"));
}

#[test]
fn restriction_predicate_lets_alternatives_resolve() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("data.js"), "");
    write(&src.join("data.json"), "");

    // reject .js results: the .json candidate must win instead
    let mut options = ResolveOptions::default();
    options.restrictions = vec![Restriction::Predicate(Arc::new(|path: &Path| {
        path.extension().is_some_and(|e| e == "js")
    }))];
    let r = Resolver::new(options).unwrap();
    assert_eq!(found(resolve_in(&r, &src, "./data")), src.join("data.json"));
}

#[test]
fn unsafe_cache_memoizes_results() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.unsafe_cache = true;
    let r = Resolver::new(options).unwrap();
    let first = found(resolve_in(&r, &src, "./a"));

    // the cached result survives the file disappearing; that looseness is
    // the documented contract of the unsafe cache
    fs::remove_file(src.join("a.js")).unwrap();
    r.fs().purge_all();
    assert_eq!(found(resolve_in(&r, &src, "./a")), first);

    r.clear_result_cache();
    assert!(resolve_in(&r, &src, "./a").is_err());
}

#[test]
fn cache_predicate_filters_admission() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.js"), "");

    let mut options = ResolveOptions::default();
    options.unsafe_cache = true;
    options.cache_predicate = Some(Arc::new(|_| false));
    let r = Resolver::new(options).unwrap();
    let first = found(resolve_in(&r, &src, "./a"));

    fs::remove_file(src.join("a.js")).unwrap();
    r.fs().purge_all();
    // nothing was admitted, so the removal is observed
    assert!(resolve_in(&r, &src, "./a").is_err());
    assert_ne!(first, PathBuf::new());
}

/// Rewrites a virtual specifier to a real file, exercising the user
/// extension contract.
#[derive(Debug)]
struct VirtualEntryPlugin;

impl Plugin for VirtualEntryPlugin {
    fn name(&self) -> &'static str {
        "VirtualEntryPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        if request.request != "virtual-entry" {
            return Ok(PipelineState::Skipped);
        }
        let target = resolver.hook("normal-resolve")?;
        let next = request.with_request("./real.js");
        resolver.do_resolve(
            target,
            next,
            Some("virtual entry rewritten".to_string()),
            ctx,
        )
    }
}

#[test]
fn user_plugin_rewrites_requests() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("real.js"), "");

    let mut options = ResolveOptions::default();
    options.plugins = vec![PluginRegistration::new(
        "described-resolve",
        Arc::new(VirtualEntryPlugin),
    )];
    let r = Resolver::new(options).unwrap();
    assert_eq!(
        found(resolve_in(&r, &src, "virtual-entry")),
        src.join("real.js")
    );
}

/// Forwards every request back to its own hook; the recursion guard must
/// absorb it.
#[derive(Debug)]
struct LoopingPlugin;

impl Plugin for LoopingPlugin {
    fn name(&self) -> &'static str {
        "LoopingPlugin"
    }

    fn run(
        &self,
        resolver: &Resolver,
        request: &ResolveRequest,
        ctx: &mut ResolveContext,
    ) -> Result<PipelineState, ResolveError> {
        let target = resolver.hook("described-resolve")?;
        resolver.do_resolve(target, request.clone(), Some("loop".to_string()), ctx)
    }
}

#[test]
fn recursion_guard_stops_looping_plugins() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();

    let mut options = ResolveOptions::default();
    options.plugins = vec![PluginRegistration::new(
        "described-resolve",
        Arc::new(LoopingPlugin),
    )];
    let r = Resolver::new(options).unwrap();
    // must terminate with NotFound rather than hang or overflow
    assert!(matches!(
        resolve_in(&r, &src, "./nothing"),
        Err(ResolveError::NotFound { .. })
    ));
}

#[test]
fn alias_cycle_terminates() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();

    let mut options = ResolveOptions::default();
    options.alias = vec![
        AliasEntry::new("a-pkg", "b-pkg"),
        AliasEntry::new("b-pkg", "a-pkg"),
    ];
    let r = Resolver::new(options).unwrap();
    assert!(resolve_in(&r, &src, "a-pkg").is_err());
}

#[test]
fn trace_log_records_steps() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("a.js"), "");

    let r = Resolver::new(ResolveOptions::default()).unwrap();
    let mut ctx = ResolveContext::with_trace();
    r.resolve(RequestContext::default(), &src, "./a", &mut ctx)
        .unwrap();
    let log = ctx.log.unwrap();
    assert!(log.iter().any(|line| line.contains("existing file")));
}

#[test]
fn attempts_mention_description_file() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    write(&pkg.join("package.json"), r#"{"main":"./gone.js"}"#);

    let r = Resolver::new(ResolveOptions::default()).unwrap();
    let mut ctx = ResolveContext::new();
    let err = r
        .resolve(RequestContext::default(), &pkg, "./missing", &mut ctx)
        .unwrap_err();
    match err {
        ResolveError::NotFound { attempts, .. } => {
            assert!(attempts
                .iter()
                .any(|a| a.message.contains("using description file")));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}
