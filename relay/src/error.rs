//! Error types for the relay pipeline

use std::io;
use std::path::PathBuf;

/// Failures that end a relay run.
///
/// Everything transient (no new bytes yet, an unreachable consumer) is retried
/// inside the pipeline and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {source_id}: {source}")]
    Decode {
        source_id: String,
        #[source]
        source: EngineError,
    },
    #[error("cancelled before a demo file appeared in {dir}")]
    DiscoveryCancelled { dir: PathBuf },
}

/// Errors reported by a tick engine while advancing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from a single connect or send attempt on the consumer channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("not connected")]
    NotConnected,
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("{0}")]
    Other(String),
}
