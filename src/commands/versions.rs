use tracing::info;

use crate::context::Context;
use crate::error::XvmError;
use crate::plugin::Target;
use crate::scope::{Scope, ScopeKind};
use crate::versions;

pub(super) fn run_set(
    context: &Context,
    plugin: &str,
    requested: &str,
    kind: Option<ScopeKind>,
) -> anyhow::Result<i32> {
    let target = Target::Plugin(plugin.to_string());
    let version = context.snapshot.resolve_alias(&target, requested);

    let installed = context
        .snapshot
        .entry(&target)
        .is_some_and(|entry| entry.is_installed(&version));
    if !installed {
        return Err(XvmError::NotInstalled {
            target: target.to_string(),
            version,
        }
        .into());
    }

    let scope = writable_scope(context, kind)?;
    let mut assignments = versions::load_for_update(scope)?;
    assignments.insert(plugin.to_string(), version.clone());
    versions::write(scope, &assignments)?;

    info!(plugin = plugin, version = %version, scope = %scope.path.display(), "version set");
    Ok(0)
}

pub(super) fn run_unset(
    context: &Context,
    plugin: &str,
    kind: Option<ScopeKind>,
) -> anyhow::Result<i32> {
    let scope = writable_scope(context, kind)?;
    let mut assignments = versions::load_for_update(scope)?;
    if assignments.remove(plugin).is_none() {
        return Err(XvmError::NoVersionSet(plugin.to_string()).into());
    }
    versions::write(scope, &assignments)?;

    info!(plugin = plugin, scope = %scope.path.display(), "version unset");
    Ok(0)
}

/// An explicit `local` needs a local scope to exist; without a scope
/// argument the nearest scope is written, which may be the global one.
fn writable_scope(context: &Context, kind: Option<ScopeKind>) -> anyhow::Result<&Scope> {
    let scope = context.scope(kind);
    if kind == Some(ScopeKind::Local) && scope.is_global() {
        let cwd = context.cwd.clone().unwrap_or_default();
        return Err(XvmError::ScopeMissing(cwd).into());
    }
    Ok(scope)
}
