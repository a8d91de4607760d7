//! # Live Demo Relay Library
//!
//! This library relays live per-tick player state from a replay file that is
//! still being recorded to a remote visualization consumer, such as a radar
//! overlay. Frames go out at a fixed cadence, no matter how fast ticks are
//! decoded.
//!
//! ## Core Responsibilities
//!
//! ### Live Ingestion
//! The replay file grows while the match is played. Reaching its end only
//! means the reader caught up with the recorder, so ingestion waits for more
//! bytes instead of stopping.
//!
//! ### Rate Decoupling
//! Decoding speed depends on how much the recorder has flushed; delivery
//! runs on its own timer. A single-slot mailbox sits between the two and
//! always holds the most recent snapshot. Older snapshots are dropped, never
//! queued.
//!
//! ### Self-Healing Delivery
//! The consumer may restart or be unreachable for a while. Failed sends tear
//! the connection down, the relay reconnects at a fixed delay, and the same
//! frame is sent again once the link is back.
//!
//! ## Architecture Design
//!
//! ### Two Tasks, One Shared Slot
//! The producer decodes ticks and publishes snapshots; the broadcaster
//! samples the mailbox every period. The mailbox is the only state they share,
//! guarded by a lock that is held just long enough to swap an `Arc`.
//!
//! ### One-Way Shutdown
//! When the producer stops, successfully or not, it cancels a shared token.
//! The broadcaster notices on its next period and exits. Nothing ever resets
//! the token.
//!
//! ## Module Organization
//!
//! ### Tail Module (`tail`)
//! Endless `AsyncRead` over a growing file, with a short timed wait at the end.
//!
//! ### Engine Module (`engine`)
//! The boundary to the tick decoder, plus a bundled decoder for a
//! newline-delimited JSON tick feed.
//!
//! ### Producer Module (`producer`)
//! Drives the engine and turns every decoded tick into a snapshot.
//!
//! ### Mailbox Module (`mailbox`)
//! The latest-value slot between producer and broadcaster.
//!
//! ### Broadcaster Module (`broadcaster`)
//! Fixed-period sampling and delivery with reconnect-and-retry.
//!
//! ### Channel Module (`channel`)
//! The WebSocket connection to the consumer behind a reconnecting wrapper.
//!
//! ### Discovery Module (`discovery`)
//! Finds the replay a new match is being recorded to.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use relay::channel::WsConnector;
//! use relay::config::RelayConfig;
//! use relay::pipeline::Relay;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::default();
//!     let connector = WsConnector::new(config.endpoint.clone());
//!
//!     // Runs until the feed ends; waits for new bytes while it is recorded.
//!     let summary = Relay::new(config, connector)
//!         .run_file("match.jsonl")
//!         .await?;
//!
//!     println!("{} frames delivered", summary.broadcast.delivered);
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod channel;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod mailbox;
pub mod pipeline;
pub mod producer;
pub mod retry;
pub mod tail;
