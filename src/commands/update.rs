use std::path::PathBuf;

use tracing::info;

use crate::context::Context;
use crate::dist;
use crate::error::XvmError;
use crate::plugin::Target;

const BUNDLE_FILE: &str = "dist.zip";

pub(super) fn run_plugin_update(context: &Context, requested: &str) -> anyhow::Result<i32> {
    let name = context.snapshot.resolve_alias(&Target::Tool, requested);
    let source = context
        .snapshot
        .entry(&Target::Tool)
        .and_then(|tool| tool.available.get(&name))
        .ok_or_else(|| XvmError::NotAvailable {
            target: Target::Tool.to_string(),
            version: name.clone(),
        })?;

    let dest = Target::Plugin(name.clone()).paths(context.global_root()).root;
    println!("Plugin update: fetching {name} from {source}");
    let archive = dist::fetch(source)?;

    let report = dist::unpack(&archive, &dest)?;
    info!(
        plugin = %name,
        written = report.written,
        skipped = report.skipped,
        "plugin distribution unpacked"
    );
    println!(
        "Plugin update completed: written={} skipped={}",
        report.written, report.skipped
    );
    Ok(0)
}

pub(super) fn run_plugin_bundle(
    context: &Context,
    requested: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<i32> {
    let name = context.snapshot.resolve_alias(&Target::Tool, requested);
    let installed = context
        .snapshot
        .entry(&Target::Tool)
        .is_some_and(|tool| tool.is_installed(&name));
    if !installed {
        return Err(XvmError::NotInstalled {
            target: Target::Tool.to_string(),
            version: name,
        }
        .into());
    }

    let root = Target::Plugin(name.clone()).paths(context.global_root()).root;
    let archive = output.unwrap_or_else(|| root.join(BUNDLE_FILE));
    let entries = dist::bundle(&root, &archive)?;

    println!("Bundled {name} ({entries} entries) into {}", archive.display());
    Ok(0)
}
