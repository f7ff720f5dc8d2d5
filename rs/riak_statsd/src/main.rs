use anyhow::Error;
use tracing::error;

use riak_statsd::{cli::Cli, core, log};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse_args();

    log::setup_logging(&cli)?;
    core::main(cli)
        .await
        .inspect_err(|err| error!(error = format!("{err:#}").as_str(), "fatal"))
}
