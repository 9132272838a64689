mod docs;
mod scope;
mod target;
mod update;
mod versions;

use crate::cli::{Command, PluginCommand, ScopeQuery};
use crate::context::Context;
use crate::plugin::Target;

/// Runs `command` and returns the process exit code.
pub fn execute(context: &Context, command: Option<Command>) -> anyhow::Result<i32> {
    let Some(command) = command else {
        docs::print_usage(context)?;
        return Ok(2);
    };

    match command {
        Command::Init => scope::run_init(context),
        Command::Which { args } => scope::run_which(context, ScopeQuery::parse(&args)?),
        Command::Status { args } => scope::run_status(context, ScopeQuery::parse(&args)?),
        Command::Remove => scope::run_remove(context),
        Command::Installed { plugin } => target::run_installed(context, &Target::Plugin(plugin)),
        Command::Available { plugin } => target::run_available(context, &Target::Plugin(plugin)),
        Command::Stable { plugin } => target::run_alias(context, &Target::Plugin(plugin), "stable"),
        Command::Latest { plugin } => target::run_alias(context, &Target::Plugin(plugin), "latest"),
        Command::Set {
            plugin,
            version,
            scope,
        } => versions::run_set(context, &plugin, &version, scope.map(Into::into)),
        Command::Unset { plugin, scope } => {
            versions::run_unset(context, &plugin, scope.map(Into::into))
        }
        Command::Pull { plugin, version } => {
            target::run_pull(context, &Target::Plugin(plugin), &version)
        }
        Command::Drop { plugin, version } => {
            target::run_drop(context, &Target::Plugin(plugin), &version)
        }
        Command::Edit { plugin, version } => {
            target::run_edit(context, &Target::Plugin(plugin), &version)
        }
        Command::Plugin { command } => match command {
            PluginCommand::Installed => target::run_installed(context, &Target::Tool),
            PluginCommand::Available => target::run_available(context, &Target::Tool),
            PluginCommand::Pull { name } => target::run_pull(context, &Target::Tool, &name),
            PluginCommand::Drop { name } => target::run_drop(context, &Target::Tool, &name),
            PluginCommand::Update { name } => update::run_plugin_update(context, &name),
            PluginCommand::Bundle { name, output } => {
                update::run_plugin_bundle(context, &name, output)
            }
        },
        Command::Version => docs::run_version(context),
        Command::Usage => docs::print_usage(context).map(|()| 0),
        Command::Help => docs::run_help(context),
    }
}
