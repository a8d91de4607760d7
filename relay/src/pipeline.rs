//! Wires the tail source, producer, mailbox, broadcaster and channel together

use crate::broadcaster::{BroadcastStats, Broadcaster};
use crate::channel::{Connector, ResilientChannel};
use crate::config::RelayConfig;
use crate::engine::{JsonLinesEngine, TickEngine};
use crate::error::RelayError;
use crate::mailbox::Mailbox;
use crate::producer::{ProducerStats, SnapshotProducer};
use crate::tail::TailSource;
use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

/// Outcome of a run that ended because the replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub producer: ProducerStats,
    pub broadcast: BroadcastStats,
}

/// One replay source relayed to one consumer.
pub struct Relay<C> {
    config: RelayConfig,
    connector: C,
}

impl<C> Relay<C>
where
    C: Connector + 'static,
    C::Link: 'static,
{
    /// Creates a relay. Nothing connects or opens files until a run starts.
    pub fn new(config: RelayConfig, connector: C) -> Self {
        Self { config, connector }
    }

    /// Configuration this relay was built with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Tails the tick feed at `path` and relays it until the feed stops.
    pub async fn run_file(self, path: impl AsRef<Path>) -> Result<RunSummary, RelayError> {
        let path = path.as_ref();
        let source = TailSource::open_with_policy(path, self.config.tail_poll)
            .await
            .map_err(|source| RelayError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Tailing {}", path.display());
        let engine = JsonLinesEngine::new(BufReader::new(source));
        self.run(path.display().to_string(), engine).await
    }

    /// Runs the producer on the current task and the broadcaster on a spawned one.
    ///
    /// Returns once the producer has stopped and the broadcaster has seen the
    /// done signal. A producer failure is returned as is.
    pub async fn run<E: TickEngine>(
        self,
        source_id: String,
        engine: E,
    ) -> Result<RunSummary, RelayError> {
        let mailbox = Arc::new(Mailbox::new());
        let done = CancellationToken::new();

        info!(
            "Relaying {} to {} every {:?}",
            source_id,
            self.connector.endpoint(),
            self.config.broadcast_period
        );

        let channel = ResilientChannel::new(self.connector, self.config.channel, done.clone());
        let broadcaster = Broadcaster::new(
            Arc::clone(&mailbox),
            channel,
            self.config.broadcast_period,
            done.clone(),
        );
        let broadcast_handle = tokio::spawn(broadcaster.run());

        let produced = SnapshotProducer::new(source_id, engine, mailbox, done)
            .run()
            .await;

        let broadcast = match broadcast_handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Broadcaster task failed: {}", e);
                BroadcastStats::default()
            }
        };

        produced.map(|producer| RunSummary {
            producer,
            broadcast,
        })
    }
}
