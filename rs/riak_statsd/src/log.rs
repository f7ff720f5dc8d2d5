use anyhow::{anyhow, Error};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogFormat};

/// Installs the global subscriber. Verbosity comes from `RUST_LOG`, `info` otherwise.
pub fn setup_logging(cli: &Cli) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match cli.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(
            builder.json().flatten_event(true).finish(),
        ),
    }
    .map_err(|err| anyhow!("failed to set global subscriber: {err}"))
}
