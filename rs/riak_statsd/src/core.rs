use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Error};
use tokio::net::{lookup_host, UdpSocket};
use tracing::info;

use crate::{
    cli::Cli,
    metrics::{Encoder, Whitelist},
    relay::Relay,
    upstream::{RiakClient, Upstream},
};

pub const SERVICE_NAME: &str = "riak-statsd";
pub const AUTHOR_NAME: &str = "The riak-statsd Developers";

pub const MINUTE: Duration = Duration::from_secs(60);

/// Time between two cycles.
pub const CYCLE_PERIOD: Duration = MINUTE;

pub async fn main(cli: Cli) -> Result<(), Error> {
    info!(
        msg = format!("starting {SERVICE_NAME}").as_str(),
        config = serde_json::to_string(&cli)?.as_str(),
    );

    let relay = init(&cli, CYCLE_PERIOD).await?;

    info!(
        riak = cli.upstream_addr().as_str(),
        statsd = cli.statsd_addr().as_str(),
        "relaying stats every {}s",
        CYCLE_PERIOD.as_secs()
    );

    relay.run().await;

    Ok(())
}

/// Everything that must succeed before the first tick.
pub async fn init(cli: &Cli, period: Duration) -> Result<Relay<RiakClient, UdpSocket>, Error> {
    let statsd_addr = cli.statsd_addr();
    let socket = connect_statsd(&statsd_addr)
        .await
        .with_context(|| format!("couldn't connect to statsd at {statsd_addr}"))?;

    let http_client = reqwest::Client::builder()
        .build()
        .context("failed to build http client")?;
    let upstream = RiakClient::new(http_client, &cli.riak_host, cli.riak_http_port);

    upstream
        .check_liveness()
        .await
        .with_context(|| format!("riak at {} failed liveness check", cli.upstream_addr()))?;
    info!(riak = cli.upstream_addr().as_str(), "riak is up");

    Ok(Relay::new(
        Arc::new(upstream),
        Arc::new(socket),
        Encoder::new(Arc::new(Whitelist::riak())),
        &cli.nodename,
        period,
    ))
}

/// Resolves `addr` and returns a UDP socket connected to its first address.
pub async fn connect_statsd(addr: &str) -> Result<UdpSocket, Error> {
    let target = lookup_host(addr)
        .await
        .context("couldn't resolve UDP addr")?
        .next()
        .ok_or_else(|| anyhow!("no address found for {addr}"))?;

    let local = if target.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(local)
        .await
        .context("failed to bind local socket")?;
    socket
        .connect(target)
        .await
        .context("failed to connect socket")?;

    Ok(socket)
}
