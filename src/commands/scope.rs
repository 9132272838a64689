use std::fs;
use std::path::Path;

use anyhow::Context as _;
use tracing::info;

use crate::cli::ScopeQuery;
use crate::context::Context;
use crate::error::XvmError;
use crate::scope::{MARKER_DIR, Scope, ScopeKind};
use crate::versions::{self, VersionMap};

pub(super) fn run_init(context: &Context) -> anyhow::Result<i32> {
    let cwd = working_dir(context)?;
    let marker = cwd.join(MARKER_DIR);
    if marker.exists() {
        return Err(XvmError::ScopeExists(marker).into());
    }

    fs::create_dir_all(&marker)
        .with_context(|| format!("failed to create scope directory {}", marker.display()))?;
    let scope = Scope {
        kind: ScopeKind::Local,
        path: marker,
        parent: cwd.to_path_buf(),
    };
    versions::write(&scope, &VersionMap::new())?;

    info!(scope = %scope.path.display(), "initialized scope");
    println!("Initialized scope at {}", scope.path.display());
    Ok(0)
}

pub(super) fn run_which(context: &Context, query: ScopeQuery) -> anyhow::Result<i32> {
    let Some(plugin) = query.plugin else {
        println!("{}", context.scope(query.scope).path.display());
        return Ok(0);
    };

    let setters = [
        (ScopeKind::Local, &context.local, &context.snapshot.local),
        (ScopeKind::Global, &context.global, &context.snapshot.global),
    ];
    let setter = setters
        .into_iter()
        .filter(|(kind, _, _)| query.scope.is_none_or(|wanted| wanted == *kind))
        .find(|(_, _, versions)| versions.contains_key(&plugin));

    match setter {
        Some((_, scope, _)) => {
            println!("{}", scope.path.display());
            Ok(0)
        }
        None => Err(XvmError::NoVersionSet(plugin).into()),
    }
}

pub(super) fn run_status(context: &Context, query: ScopeQuery) -> anyhow::Result<i32> {
    let versions = context.snapshot.versions(query.scope);

    if let Some(plugin) = query.plugin {
        let version = versions
            .get(&plugin)
            .ok_or(XvmError::NoVersionSet(plugin))?;
        println!("{version}");
        return Ok(0);
    }

    for (plugin, version) in versions {
        println!("{plugin} {version}");
    }
    Ok(0)
}

pub(super) fn run_remove(context: &Context) -> anyhow::Result<i32> {
    if context.local.is_global() {
        return Err(XvmError::RemoveGlobalScope.into());
    }

    let cwd = working_dir(context)?;
    if context.local.parent != cwd {
        return Err(XvmError::ScopeMissing(cwd.to_path_buf()).into());
    }

    fs::remove_dir_all(&context.local.path).with_context(|| {
        format!(
            "failed to remove scope directory {}",
            context.local.path.display()
        )
    })?;

    info!(scope = %context.local.path.display(), "removed scope");
    println!("Removed scope at {}", context.local.path.display());
    Ok(0)
}

fn working_dir(context: &Context) -> anyhow::Result<&Path> {
    context
        .cwd
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("failed to get current working directory"))
}
