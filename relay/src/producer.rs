//! Drives the tick engine and publishes one snapshot per decoded tick

use crate::engine::{team_code, Participant, TickEngine};
use crate::error::{EngineError, RelayError};
use crate::mailbox::Mailbox;
use log::{error, info, warn};
use shared::{PlayerState, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Totals reported when the producer stops cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProducerStats {
    pub snapshots: u64,
    pub last_tick: Option<i64>,
}

pub struct SnapshotProducer<E> {
    source_id: String,
    engine: E,
    mailbox: Arc<Mailbox<Snapshot>>,
    done: CancellationToken,
}

impl<E: TickEngine> SnapshotProducer<E> {
    /// `done` is cancelled when [`run`](Self::run) returns.
    pub fn new(
        source_id: impl Into<String>,
        engine: E,
        mailbox: Arc<Mailbox<Snapshot>>,
        done: CancellationToken,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            engine,
            mailbox,
            done,
        }
    }

    /// Advances the engine until the replay ends or fails.
    ///
    /// There is no timeout: while the replay is still being recorded this
    /// waits for new bytes for as long as it takes. The done token is
    /// cancelled exactly once when this returns, whatever the outcome.
    pub async fn run(mut self) -> Result<ProducerStats, RelayError> {
        let _done = self.done.clone().drop_guard();

        info!("Streaming ticks from {}", self.source_id);

        let mut stats = ProducerStats::default();
        let mut rate = RateCounter::new(Duration::from_secs(1));

        loop {
            let more = match self.engine.advance().await {
                Ok(more) => more,
                Err(EngineError::Io(source)) => {
                    error!("Read error on {}: {}", self.source_id, source);
                    return Err(RelayError::Read {
                        path: PathBuf::from(&self.source_id),
                        source,
                    });
                }
                Err(source) => {
                    error!("Decode error on {}: {}", self.source_id, source);
                    return Err(RelayError::Decode {
                        source_id: self.source_id.clone(),
                        source,
                    });
                }
            };

            if !more {
                info!(
                    "Replay {} ended after {} snapshots",
                    self.source_id, stats.snapshots
                );
                return Ok(stats);
            }

            let snapshot = build_snapshot(&self.source_id, &self.engine);
            let tick = snapshot.tick;

            if let Some(last) = stats.last_tick {
                if tick < last {
                    warn!("Engine tick went backwards from {} to {}", last, tick);
                }
            }

            self.mailbox.write(snapshot);
            stats.snapshots += 1;
            stats.last_tick = Some(tick);

            if let Some(count) = rate.record() {
                info!(
                    "Produced {} snapshots in the last second (tick {})",
                    count, tick
                );
            }
        }
    }
}

/// Builds the snapshot for the engine's current tick, skipping unresolved participants.
pub fn build_snapshot<E: TickEngine>(source_id: &str, engine: &E) -> Snapshot {
    let players = engine
        .participants()
        .iter()
        .flatten()
        .map(player_state)
        .collect();

    Snapshot::new(source_id, engine.current_tick(), players)
}

/// Copies the engine's view of a participant. Fields the engine has no
/// signal for keep the defaults from [`PlayerState::new`].
pub fn player_state(participant: &Participant) -> PlayerState {
    let mut state = PlayerState::new(
        participant.name.clone(),
        participant.steam_id,
        team_code(participant.team),
    );
    state.is_alive = participant.alive;
    state.health = participant.health;
    state.armor = participant.armor;
    state.has_helmet = participant.helmet;
    state.has_defuser = participant.defuse_kit;
    state.position = participant.position;
    state
}

/// Counts events and reports the total once per window.
struct RateCounter {
    window: Duration,
    started: Instant,
    count: u64,
}

impl RateCounter {
    fn new(window: Duration) -> Self {
        Self {
            window,
            started: Instant::now(),
            count: 0,
        }
    }

    fn record(&mut self) -> Option<u64> {
        self.count += 1;
        if self.started.elapsed() < self.window {
            return None;
        }
        let count = self.count;
        self.count = 0;
        self.started = Instant::now();
        Some(count)
    }
}
