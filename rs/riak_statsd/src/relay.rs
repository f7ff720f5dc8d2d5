use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::{
    net::UdpSocket,
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{metrics::Encoder, upstream::Upstream};

/// Writes one complete datagram to the collector.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Emit: Send + Sync {
    async fn emit(&self, payload: &[u8]) -> Result<usize, io::Error>;
}

#[async_trait]
impl Emit for UdpSocket {
    async fn emit(&self, payload: &[u8]) -> Result<usize, io::Error> {
        self.send(payload).await
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent { bytes: usize },
    FetchFailed,
    SendFailed,
}

/// Timer tick handed from the ticker to the dispatcher.
#[derive(Debug)]
pub struct Tick(pub Instant);

pub struct Relay<U, E> {
    upstream: Arc<U>,
    emitter: Arc<E>,
    encoder: Encoder,
    node: Arc<str>,
    period: Duration,
}

impl<U: Upstream + 'static, E: Emit + 'static> Relay<U, E> {
    pub fn new(
        upstream: Arc<U>,
        emitter: Arc<E>,
        encoder: Encoder,
        node: &str,
        period: Duration,
    ) -> Self {
        Self {
            upstream,
            emitter,
            encoder,
            node: Arc::from(node),
            period,
        }
    }

    /// One fetch, encode and send. Errors end the cycle and are only logged.
    pub async fn cycle(&self) -> CycleOutcome {
        let doc = match self.upstream.fetch_stats().await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "failed to fetch stats, skipping cycle");
                return CycleOutcome::FetchFailed;
            }
        };

        let payload = self.encoder.encode_payload(&self.node, &doc);

        match self.emitter.emit(payload.as_bytes()).await {
            Ok(bytes) => {
                debug!(bytes, "sent metrics");
                CycleOutcome::Sent { bytes }
            }
            Err(err) => {
                warn!(error = %err, "error sending metrics");
                CycleOutcome::SendFailed
            }
        }
    }

    /// Emits a tick every period, starting one period from now.
    pub fn spawn_ticker(&self, tx: mpsc::UnboundedSender<Tick>) -> JoinHandle<()> {
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let at = interval.tick().await;
                if tx.send(Tick(at)).is_err() {
                    return;
                }
            }
        })
    }

    /// Runs every tick's cycle on its own task. Cycles are not tracked, so a
    /// hung upstream can leave several of them in flight at once.
    pub async fn dispatch(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Tick>) {
        while let Some(Tick(at)) = rx.recv().await {
            debug!(elapsed = ?at.elapsed(), "tick");

            let relay = self.clone();
            tokio::spawn(async move {
                relay.cycle().await;
            });
        }
    }

    /// Runs until the process is killed.
    pub async fn run(self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = Arc::new(self);

        let _ticker = relay.spawn_ticker(tx);
        relay.dispatch(rx).await;
    }
}
