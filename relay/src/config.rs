//! Relay configuration

use crate::channel::ChannelTiming;
use crate::retry::FixedDelay;
use crate::tail::DEFAULT_POLL_INTERVAL;
use std::path::PathBuf;
use std::time::Duration;

/// Where and how to look for a new replay file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub dir: PathBuf,
    /// File extension without the leading dot.
    pub extension: String,
    pub poll: FixedDelay,
    /// Pause between finding a file and starting to read it, so the
    /// recorder has written its header.
    pub settle: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            extension: "jsonl".to_string(),
            poll: FixedDelay::new(Duration::from_secs(1)),
            settle: Duration::from_secs(1),
        }
    }
}

/// Everything a relay run needs, passed in explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// WebSocket URL of the frame consumer.
    pub endpoint: String,
    /// Delivery cadence.
    pub broadcast_period: Duration,
    pub channel: ChannelTiming,
    /// Wait between reads that find no new bytes in the replay file.
    pub tail_poll: FixedDelay,
    pub discovery: DiscoveryConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8080".to_string(),
            broadcast_period: Duration::from_millis(50),
            channel: ChannelTiming::default(),
            tail_poll: FixedDelay::new(DEFAULT_POLL_INTERVAL),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Deliveries per second implied by the broadcast period.
    pub fn broadcast_rate(&self) -> f64 {
        1.0 / self.broadcast_period.as_secs_f64()
    }
}
