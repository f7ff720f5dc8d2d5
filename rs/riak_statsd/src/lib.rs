//! Relays a Riak node's operational stats to statsd.
//!
//! Every minute the `/stats` document of the node is fetched, a fixed set of
//! stats is encoded as statsd lines and the lines are sent to the collector
//! as a single UDP datagram.

pub mod cli;
pub mod core;
pub mod log;
pub mod metrics;
pub mod relay;
pub mod upstream;

pub use cli::Cli;
pub use metrics::{Encoder, MetricType, Whitelist};
pub use relay::{CycleOutcome, Emit, Relay};
pub use upstream::{RiakClient, StatusDocument, Upstream, UpstreamError};
