use serde::{Deserialize, Serialize};

/// Team code for players on neither playing side (unassigned, spectators).
pub const TEAM_NUM_NONE: u8 = 0;
/// Team code for the Terrorist side.
pub const TEAM_NUM_T: u8 = 2;
/// Team code for the Counter-Terrorist side.
pub const TEAM_NUM_CT: u8 = 3;

/// Numeric team code carried on the wire.
///
/// Only three values exist on the wire; anything a decoder can't place on
/// one of the two playing sides collapses to [`TeamCode::None`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(into = "u8", from = "u8")]
pub enum TeamCode {
    #[default]
    None,
    Terrorist,
    CounterTerrorist,
}

impl TeamCode {
    /// Numeric code as it appears on the wire.
    pub fn as_num(self) -> u8 {
        match self {
            TeamCode::None => TEAM_NUM_NONE,
            TeamCode::Terrorist => TEAM_NUM_T,
            TeamCode::CounterTerrorist => TEAM_NUM_CT,
        }
    }
}

impl From<TeamCode> for u8 {
    fn from(code: TeamCode) -> Self {
        code.as_num()
    }
}

impl From<u8> for TeamCode {
    fn from(num: u8) -> Self {
        match num {
            TEAM_NUM_T => TeamCode::Terrorist,
            TEAM_NUM_CT => TeamCode::CounterTerrorist,
            _ => TeamCode::None,
        }
    }
}

/// World position. Serialized as the upper-case `X`/`Y`/`Z` keys the radar expects.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// State of one player at one tick.
///
/// `is_defusing`, `ducked`, `balance`, `player_color` and `last_place_name`
/// have no source in the decoder integration and always hold their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub name: String,
    #[serde(rename = "steamid")]
    pub steam_id: u64,
    #[serde(rename = "team_num")]
    pub team: TeamCode,
    pub is_alive: bool,
    pub health: i32,
    #[serde(rename = "armor_value")]
    pub armor: i32,
    pub has_helmet: bool,
    pub has_defuser: bool,
    pub is_defusing: bool,
    pub ducked: bool,
    pub balance: i32,
    pub player_color: String,
    pub last_place_name: String,
    #[serde(flatten)]
    pub position: Vec3,
}

impl PlayerState {
    /// Creates a player with zeroed vitals and the placeholder fields at their defaults.
    pub fn new(name: impl Into<String>, steam_id: u64, team: TeamCode) -> Self {
        Self {
            name: name.into(),
            steam_id,
            team,
            is_alive: false,
            health: 0,
            armor: 0,
            has_helmet: false,
            has_defuser: false,
            is_defusing: false,
            ducked: false,
            balance: 0,
            player_color: String::new(),
            last_place_name: String::new(),
            position: Vec3::default(),
        }
    }

    /// True when every field without an engine signal still holds its default.
    pub fn has_placeholder_defaults(&self) -> bool {
        !self.is_defusing
            && !self.ducked
            && self.balance == 0
            && self.player_color.is_empty()
            && self.last_place_name.is_empty()
    }
}

/// Full player state of one source at one tick.
///
/// Snapshots are built once and then only shared behind an `Arc`, so nothing
/// mutates one after it has been published.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    #[serde(rename = "demo")]
    pub source: String,
    pub tick: i64,
    pub players: Vec<PlayerState>,
}

impl Snapshot {
    pub fn new(source: impl Into<String>, tick: i64, players: Vec<PlayerState>) -> Self {
        Self {
            source: source.into(),
            tick,
            players,
        }
    }
}

/// Encodes a snapshot as the text frame sent to the consumer.
pub fn encode_frame(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

/// Decodes a text frame produced by [`encode_frame`].
pub fn decode_frame(text: &str) -> serde_json::Result<Snapshot> {
    serde_json::from_str(text)
}
