use std::io::ErrorKind;

use anyhow::Context as _;
use clap::CommandFactory;

use crate::cli::Cli;
use crate::context::Context;

const VERSION_DOC: &str = "version";
const USAGE_DOC: &str = "usage";
const README_DOC: &str = "readme";

pub(super) fn run_version(context: &Context) -> anyhow::Result<i32> {
    if !print_doc(context, VERSION_DOC)? {
        println!("xvm {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(0)
}

pub(super) fn print_usage(context: &Context) -> anyhow::Result<()> {
    if !print_doc(context, USAGE_DOC)? {
        print!("{}", Cli::command().render_help());
    }
    Ok(())
}

pub(super) fn run_help(context: &Context) -> anyhow::Result<i32> {
    if !print_doc(context, README_DOC)? {
        print!("{}", Cli::command().render_long_help());
    }
    Ok(0)
}

/// Prints `<global>/<name>` when the installation ships it.
fn print_doc(context: &Context, name: &str) -> anyhow::Result<bool> {
    let path = context.global_root().join(name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            print!("{contents}");
            Ok(true)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}
