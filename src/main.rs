mod cli;
mod commands;
mod config;
mod context;
mod dist;
mod error;
mod keyval;
mod logging;
mod plugin;
mod process;
mod scope;
mod shim;
mod snapshot;
mod versions;

use std::ffi::OsString;

use anyhow::Context as _;
use clap::Parser;
use tracing::{debug, info};

use crate::cli::{Cli, Command, PluginCommand};
use crate::context::Context;
use crate::error::XvmError;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            debug!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            err.downcast_ref::<XvmError>()
                .map(XvmError::exit_code)
                .unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let mut args = std::env::args_os();
    let argv0 = args.next().unwrap_or_default();

    if let Some(binary) = shim::shim_name(&argv0) {
        logging::init(false)?;
        let forwarded: Vec<OsString> = args.collect();
        let context = load_context()?;
        return shim::dispatch(context.global_root(), &context.snapshot, &binary, &forwarded);
    }

    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let context = load_context()?;
    log_command_start(&context, cli.command.as_ref());

    commands::execute(&context, cli.command)
}

fn load_context() -> anyhow::Result<Context> {
    let config = config::load().context("failed to load configuration")?;
    Context::load(config)
}

fn log_command_start(context: &Context, command: Option<&Command>) {
    info!(
        command = command.map(command_name).unwrap_or("<none>"),
        cwd = %context
            .cwd
            .as_deref()
            .map(|cwd| cwd.display().to_string())
            .unwrap_or_else(|| "<unavailable>".to_string()),
        global_scope = %context.global.path.display(),
        local_scope = %context.local.path.display(),
        "starting command"
    );
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init => "init",
        Command::Which { .. } => "which",
        Command::Status { .. } => "status",
        Command::Remove => "remove",
        Command::Installed { .. } => "installed",
        Command::Available { .. } => "available",
        Command::Stable { .. } => "stable",
        Command::Latest { .. } => "latest",
        Command::Set { .. } => "set",
        Command::Unset { .. } => "unset",
        Command::Pull { .. } => "pull",
        Command::Drop { .. } => "drop",
        Command::Edit { .. } => "edit",
        Command::Plugin { command } => match command {
            PluginCommand::Installed => "plugin_installed",
            PluginCommand::Available => "plugin_available",
            PluginCommand::Pull { .. } => "plugin_pull",
            PluginCommand::Drop { .. } => "plugin_drop",
            PluginCommand::Update { .. } => "plugin_update",
            PluginCommand::Bundle { .. } => "plugin_bundle",
        },
        Command::Version => "version",
        Command::Usage => "usage",
        Command::Help => "help",
    }
}
