use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::scope::ScopeKind;

#[derive(Debug, Parser)]
#[command(
    name = "xvm",
    version,
    about = "Multi-version manager for pluggable runtime tools",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a local scope in the current directory.
    Init,

    /// Print the scope in use, or the scope that sets a plugin's version.
    Which {
        /// Optional `local` or `global`, and an optional plugin name.
        #[arg(num_args = 0..=2, value_name = "SCOPE|PLUGIN")]
        args: Vec<String>,
    },

    /// Print current versions, merged from both scopes unless one is named.
    #[command(visible_alias = "current")]
    Status {
        /// Optional `local` or `global`, and an optional plugin name.
        #[arg(num_args = 0..=2, value_name = "SCOPE|PLUGIN")]
        args: Vec<String>,
    },

    /// Remove the local scope of the current directory.
    Remove,

    /// List installed versions of a plugin.
    Installed { plugin: String },

    /// List versions of a plugin that can be pulled.
    Available { plugin: String },

    /// Print the version a plugin marks as stable.
    Stable { plugin: String },

    /// Print the version a plugin marks as latest.
    Latest { plugin: String },

    /// Assign an installed version (or alias) to a plugin.
    Set {
        plugin: String,
        version: String,
        /// Scope to write; defaults to the nearest scope.
        #[arg(value_enum)]
        scope: Option<ScopeArg>,
    },

    /// Remove a plugin's version assignment.
    Unset {
        plugin: String,
        /// Scope to write; defaults to the nearest scope.
        #[arg(value_enum)]
        scope: Option<ScopeArg>,
    },

    /// Install a version of a plugin through the plugin's pull helper.
    Pull { plugin: String, version: String },

    /// Delete an installed version of a plugin.
    Drop { plugin: String, version: String },

    /// Open an installed version in $EDITOR.
    Edit { plugin: String, version: String },

    /// Manage the plugins themselves.
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },

    /// Print the xvm version.
    Version,

    /// Print usage.
    Usage,

    /// Print the manual.
    Help,
}

#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// List installed plugins.
    Installed,

    /// List plugins that can be pulled.
    Available,

    /// Install a plugin through the global pull helper.
    Pull { name: String },

    /// Delete an installed plugin and all of its versions.
    Drop { name: String },

    /// Refresh a plugin's distribution files from its published archive.
    Update { name: String },

    /// Package a plugin's distribution files into a zip archive.
    Bundle {
        name: String,
        /// Archive to write; defaults to `dist.zip` in the plugin directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Local,
    Global,
}

impl From<ScopeArg> for ScopeKind {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Self::Local,
            ScopeArg::Global => Self::Global,
        }
    }
}

/// `[local|global] [plugin]` in either order, as taken by `which` and
/// `status`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeQuery {
    pub scope: Option<ScopeKind>,
    pub plugin: Option<String>,
}

impl ScopeQuery {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut query = Self::default();
        for arg in args {
            match ScopeArg::from_str(arg, false) {
                Ok(scope) if query.scope.is_none() => query.scope = Some(scope.into()),
                Ok(_) => anyhow::bail!("scope given twice: {arg}"),
                Err(_) if query.plugin.is_none() => query.plugin = Some(arg.clone()),
                Err(_) => anyhow::bail!("expected at most one plugin, got another: {arg}"),
            }
        }
        Ok(query)
    }
}
