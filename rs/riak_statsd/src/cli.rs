use std::ffi::OsString;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::core::{AUTHOR_NAME, SERVICE_NAME};

#[derive(Parser, Clone, Debug, Serialize)]
#[clap(name = SERVICE_NAME)]
#[clap(author = AUTHOR_NAME)]
#[clap(about = "Sends Riak stats to statsd every 60s")]
pub struct Cli {
    /// Riak node name, prefixed to every metric
    #[clap(long = "nodename", default_value = "riak")]
    pub nodename: String,

    /// Riak host
    #[clap(long = "riak_host", default_value = "127.0.0.1")]
    pub riak_host: String,

    /// Riak HTTP port
    #[clap(long = "riak_http_port", default_value = "8098")]
    pub riak_http_port: u16,

    /// Statsd host
    #[clap(long = "statsd_host", default_value = "127.0.0.1")]
    pub statsd_host: String,

    /// Statsd port
    #[clap(long = "statsd_port", default_value = "8125")]
    pub statsd_port: u16,

    /// Log line encoding
    #[clap(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Flags that are also accepted with a single dash, e.g. `-nodename=riak1`.
const SINGLE_DASH_FLAGS: &[&str] = &[
    "nodename",
    "riak_host",
    "riak_http_port",
    "statsd_host",
    "statsd_port",
];

/// Rewrites `-<flag>` to `--<flag>` for the flags in `SINGLE_DASH_FLAGS`.
/// Everything else is passed through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(flag) = arg.to_str().and_then(|s| s.strip_prefix('-')) else {
                return arg;
            };
            let name = flag.split('=').next().unwrap_or(flag);

            if SINGLE_DASH_FLAGS.contains(&name) {
                format!("--{flag}").into()
            } else {
                arg
            }
        })
        .collect()
}

impl Cli {
    /// Parses the process arguments, accepting single-dash flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.riak_host, self.riak_http_port)
    }

    pub fn statsd_addr(&self) -> String {
        format!("{}:{}", self.statsd_host, self.statsd_port)
    }
}
