use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

/// Picks the filter directive: an explicit level wins, then `RUST_LOG`, then
/// the configured default.
pub fn filter_directive(explicit: Option<&str>, env: Option<&str>, configured: &str) -> String {
    explicit
        .or(env.filter(|v| !v.trim().is_empty()))
        .unwrap_or(configured)
        .to_string()
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free
/// for operator messages.
pub fn init(directive: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| eyre!("invalid log filter {directive:?}: {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.with_ansi(false).json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}
