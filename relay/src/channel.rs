//! Self-healing connection to the frame consumer

use crate::error::ChannelError;
use crate::retry::{retry_fixed, Cancelled, FixedDelay};
use futures_util::SinkExt;
use log::{debug, info};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

/// An open connection that carries text frames.
pub trait Link: Send {
    /// Sends one text frame. No deadline is applied here.
    fn send_text(&mut self, payload: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Best-effort close handshake. Errors are swallowed.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens links to one fixed endpoint.
pub trait Connector: Send + Sync {
    type Link: Link;

    /// Endpoint used in log lines.
    fn endpoint(&self) -> &str;

    /// One connection attempt, without retry.
    fn connect(&self) -> impl Future<Output = Result<Self::Link, ChannelError>> + Send;
}

/// WebSocket client for a plain `ws://` URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Creates a connector for `url`. Nothing is dialled until `connect`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Link for WsLink {
    async fn send_text(&mut self, payload: &str) -> Result<(), ChannelError> {
        self.stream.send(Message::Text(payload.to_owned())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Error closing websocket: {}", e);
        }
    }
}

impl Connector for WsConnector {
    type Link = WsLink;

    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<WsLink, ChannelError> {
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        Ok(WsLink { stream })
    }
}

/// Timing for [`ResilientChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTiming {
    pub reconnect: FixedDelay,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
}

impl Default for ChannelTiming {
    fn default() -> Self {
        Self {
            reconnect: FixedDelay::new(Duration::from_secs(5)),
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_millis(100),
        }
    }
}

/// Wraps at most one live link to the consumer.
///
/// The channel never queues: [`send`](Self::send) makes one attempt and a
/// failed attempt drops the link. Callers reconnect with
/// [`connect`](Self::connect) and retry the same payload themselves.
pub struct ResilientChannel<C: Connector> {
    connector: C,
    link: Option<C::Link>,
    timing: ChannelTiming,
    cancel: CancellationToken,
    connections: u64,
}

impl<C: Connector> ResilientChannel<C> {
    /// Starts disconnected. `cancel` aborts any reconnect loop.
    pub fn new(connector: C, timing: ChannelTiming, cancel: CancellationToken) -> Self {
        Self {
            connector,
            link: None,
            timing,
            cancel,
            connections: 0,
        }
    }

    /// Whether a link is currently held.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Successful connections after the first one.
    pub fn reconnects(&self) -> u64 {
        self.connections.saturating_sub(1)
    }

    /// Drops any current link and connects again, retrying at the fixed delay
    /// until it works. Only the cancel token stops it.
    pub async fn connect(&mut self) -> Result<(), Cancelled> {
        self.disconnect().await;

        let connector = &self.connector;
        let connect_timeout = self.timing.connect_timeout;
        let what = format!("Connecting to {}", connector.endpoint());

        let link = retry_fixed(self.timing.reconnect, &self.cancel, &what, |_| async move {
            match timeout(connect_timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(connect_timeout)),
            }
        })
        .await?;

        info!("Connected to {}", self.connector.endpoint());
        self.connections += 1;
        self.link = Some(link);
        Ok(())
    }

    /// One delivery attempt under the send deadline. Any failure drops the link.
    pub async fn send(&mut self, payload: &str) -> Result<(), ChannelError> {
        let Some(link) = self.link.as_mut() else {
            return Err(ChannelError::NotConnected);
        };

        let result = match timeout(self.timing.send_timeout, link.send_text(payload)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(self.timing.send_timeout)),
        };

        if result.is_err() {
            self.disconnect().await;
        }
        result
    }

    /// Closes and drops the current link, if any. Safe to call when disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            // A stalled peer must not hold up the caller.
            let _ = timeout(self.timing.send_timeout, link.close()).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub(crate) struct MockState {
        pub delivered: Vec<String>,
        pub connects: u32,
        pub connect_attempts: u32,
        pub send_attempts: u32,
        pub failing_connects: u32,
        pub failing_sends: u32,
        pub stall_sends: bool,
    }

    /// In-memory consumer with injectable connect and send failures.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MockConnector {
        pub state: Arc<Mutex<MockState>>,
    }

    impl MockConnector {
        pub fn with<F: FnOnce(&mut MockState)>(&self, f: F) {
            f(&mut self.state.lock().unwrap());
        }

        pub fn snapshot<R, F: FnOnce(&MockState) -> R>(&self, f: F) -> R {
            f(&self.state.lock().unwrap())
        }
    }

    pub(crate) struct MockLink {
        state: Arc<Mutex<MockState>>,
    }

    impl Link for MockLink {
        async fn send_text(&mut self, payload: &str) -> Result<(), ChannelError> {
            let stall = {
                let mut state = self.state.lock().unwrap();
                state.send_attempts += 1;
                if state.failing_sends > 0 {
                    state.failing_sends -= 1;
                    return Err(ChannelError::Other("injected send failure".into()));
                }
                if !state.stall_sends {
                    state.delivered.push(payload.to_owned());
                }
                state.stall_sends
            };
            if stall {
                std::future::pending::<()>().await;
            }
            Ok(())
        }

        async fn close(&mut self) {}
    }

    impl Connector for MockConnector {
        type Link = MockLink;

        fn endpoint(&self) -> &str {
            "mock://consumer"
        }

        async fn connect(&self) -> Result<MockLink, ChannelError> {
            let mut state = self.state.lock().unwrap();
            state.connect_attempts += 1;
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(ChannelError::Other("connection refused".into()));
            }
            state.connects += 1;
            Ok(MockLink {
                state: Arc::clone(&self.state),
            })
        }
    }

    pub(crate) fn fast_timing() -> ChannelTiming {
        ChannelTiming {
            reconnect: FixedDelay::new(Duration::from_millis(2)),
            connect_timeout: Duration::from_millis(200),
            send_timeout: Duration::from_millis(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{fast_timing, MockConnector};
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn channel(connector: &MockConnector) -> ResilientChannel<MockConnector> {
        ResilientChannel::new(connector.clone(), fast_timing(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_connected() {
        let connector = MockConnector::default();
        let mut channel = channel(&connector);

        let result = channel.send("{}").await;
        assert!(matches!(result, Err(ChannelError::NotConnected)));
        assert_eq!(connector.snapshot(|s| s.send_attempts), 0);
    }

    #[tokio::test]
    async fn test_connect_retries_until_endpoint_accepts() {
        let connector = MockConnector::default();
        connector.with(|s| s.failing_connects = 3);
        let mut channel = channel(&connector);

        assert_ok!(channel.connect().await);
        assert!(channel.is_connected());
        assert_eq!(connector.snapshot(|s| s.connect_attempts), 4);
        assert_eq!(channel.reconnects(), 0);
    }

    #[tokio::test]
    async fn test_failed_send_drops_link() {
        let connector = MockConnector::default();
        connector.with(|s| s.failing_sends = 1);
        let mut channel = channel(&connector);
        channel.connect().await.unwrap();

        assert_err!(channel.send("frame").await);
        assert!(!channel.is_connected());

        channel.connect().await.unwrap();
        assert_ok!(channel.send("frame").await);
        assert_eq!(channel.reconnects(), 1);
        assert_eq!(connector.snapshot(|s| s.delivered.clone()), vec!["frame"]);
    }

    #[tokio::test]
    async fn test_stalled_send_times_out() {
        let connector = MockConnector::default();
        connector.with(|s| s.stall_sends = true);
        let mut channel = channel(&connector);
        channel.connect().await.unwrap();

        let result = channel.send("frame").await;
        assert!(matches!(result, Err(ChannelError::Timeout(_))));
        assert!(!channel.is_connected());
        assert!(connector.snapshot(|s| s.delivered.is_empty()));
    }

    #[tokio::test]
    async fn test_connect_stops_when_cancelled() {
        let connector = MockConnector::default();
        connector.with(|s| s.failing_connects = u32::MAX);
        let cancel = CancellationToken::new();
        let mut channel = ResilientChannel::new(connector.clone(), fast_timing(), cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        });

        assert_eq!(channel.connect().await, Err(Cancelled));
        assert!(!channel.is_connected());
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_websocket_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(format!("ws://{}", addr));
        assert_eq!(connector.endpoint(), format!("ws://{}", addr));
        assert!(connector.connect().await.is_err());
    }
}
