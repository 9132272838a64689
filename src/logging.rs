use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, writing to stderr so command output on
/// stdout stays parseable.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("invalid log filter level: {default_level}"))?;

    // Command output owns stdout; diagnostics go to stderr.
    let formatter = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let installed = if verbose {
        formatter.try_init()
    } else {
        formatter.without_time().try_init()
    };
    installed.map_err(|err| anyhow::anyhow!("failed to install log subscriber: {err}"))
}
