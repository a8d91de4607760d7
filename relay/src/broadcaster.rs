//! Fixed-cadence delivery of the latest snapshot

use crate::channel::{Connector, ResilientChannel};
use crate::mailbox::Mailbox;
use log::{info, warn};
use shared::{encode_frame, Snapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Delivery totals for one broadcaster run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastStats {
    pub delivered: u64,
    pub send_failures: u64,
    pub reconnects: u64,
    pub empty_periods: u64,
    pub encode_failures: u64,
    pub last_tick: Option<i64>,
}

/// Samples the mailbox once per period and pushes whatever it holds.
///
/// Frames carry full state, so sending the same snapshot in several periods
/// (the producer fell behind the cadence) is harmless for the consumer.
pub struct Broadcaster<C: Connector> {
    mailbox: Arc<Mailbox<Snapshot>>,
    channel: ResilientChannel<C>,
    period: Duration,
    done: CancellationToken,
}

/// Shortest accepted period. A zero period would make the ticker panic.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

impl<C: Connector> Broadcaster<C> {
    /// `period` below [`MIN_PERIOD`] is raised to it.
    pub fn new(
        mailbox: Arc<Mailbox<Snapshot>>,
        channel: ResilientChannel<C>,
        period: Duration,
        done: CancellationToken,
    ) -> Self {
        Self {
            mailbox,
            channel,
            period: period.max(MIN_PERIOD),
            done,
        }
    }

    /// Connects, then delivers on every period until the done token fires.
    pub async fn run(mut self) -> BroadcastStats {
        let mut stats = BroadcastStats::default();

        if self.channel.connect().await.is_ok() {
            self.deliver_periodically(&mut stats).await;
        }

        stats.reconnects = self.channel.reconnects();
        self.channel.disconnect().await;

        info!(
            "Broadcaster stopped: {} frames delivered, {} send failures, {} reconnects",
            stats.delivered, stats.send_failures, stats.reconnects
        );
        stats
    }

    /// The sampling loop. Returns when `done` fires.
    async fn deliver_periodically(&mut self, stats: &mut BroadcastStats) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.done.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let Some(snapshot) = self.mailbox.read() else {
                stats.empty_periods += 1;
                continue;
            };

            let payload = match encode_frame(&snapshot) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to encode frame for tick {}: {}", snapshot.tick, e);
                    stats.encode_failures += 1;
                    continue;
                }
            };

            if !self.deliver(&payload, stats).await {
                return;
            }
            stats.delivered += 1;
            stats.last_tick = Some(snapshot.tick);
        }
    }

    /// Sends `payload`, reconnecting after each failure, until it goes through.
    /// Returns false only if the done token interrupted a reconnect.
    async fn deliver(&mut self, payload: &str, stats: &mut BroadcastStats) -> bool {
        loop {
            match self.channel.send(payload).await {
                Ok(()) => return true,
                Err(e) => {
                    stats.send_failures += 1;
                    warn!("Failed to send frame: {}. Reconnecting...", e);
                    if self.channel.connect().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}
