//! Boundary to the tick-decoding engine
//!
//! The relay does not understand the replay format itself. It drives an
//! engine one tick at a time and reads back the participants the engine
//! resolved for that tick.

mod jsonl;

pub use jsonl::JsonLinesEngine;

use crate::error::EngineError;
use serde::Deserialize;
use shared::{TeamCode, Vec3};
use std::future::Future;

/// Side a participant is on, as the engine reports it.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(from = "u8")]
pub enum Team {
    Unassigned,
    Spectators,
    Terrorists,
    CounterTerrorists,
    /// A raw value the engine emitted that has no named side.
    Unknown(u8),
}

impl From<u8> for Team {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Team::Unassigned,
            1 => Team::Spectators,
            2 => Team::Terrorists,
            3 => Team::CounterTerrorists,
            other => Team::Unknown(other),
        }
    }
}

/// Maps an engine side onto the wire team code. Only the two playing sides
/// keep a distinct code.
pub fn team_code(team: Team) -> TeamCode {
    match team {
        Team::Terrorists => TeamCode::Terrorist,
        Team::CounterTerrorists => TeamCode::CounterTerrorist,
        Team::Unassigned | Team::Spectators | Team::Unknown(_) => TeamCode::None,
    }
}

/// One player as resolved by the engine at the current tick.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Participant {
    pub name: String,
    #[serde(rename = "steamid")]
    pub steam_id: u64,
    pub team: Team,
    pub alive: bool,
    pub health: i32,
    pub armor: i32,
    pub helmet: bool,
    pub defuse_kit: bool,
    #[serde(with = "position_array")]
    pub position: Vec3,
}

/// A decoder that advances through a replay one tick at a time.
pub trait TickEngine {
    /// Decodes the next tick.
    ///
    /// `Ok(true)` means a new tick is current. `Ok(false)` means the replay has
    /// genuinely ended; an engine reading a still-growing file waits for more
    /// bytes rather than returning `false`.
    fn advance(&mut self) -> impl Future<Output = Result<bool, EngineError>> + Send;

    /// Tick number of the most recent successful `advance`.
    fn current_tick(&self) -> i64;

    /// Participants in the engine's own order. `None` marks an entry the
    /// engine could not resolve.
    fn participants(&self) -> &[Option<Participant>];
}

mod position_array {
    use serde::{Deserialize, Deserializer};
    use shared::Vec3;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y, z] = <[f64; 3]>::deserialize(deserializer)?;
        Ok(Vec3::new(x, y, z))
    }
}
