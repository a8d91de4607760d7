//! Endless reader over a file that another process is still appending to
//!
//! A replay file being recorded hits its physical end constantly: the reader
//! simply caught up with the writer. [`TailSource`] therefore never reports
//! end-of-stream. When a read returns no bytes it arms a short timer and tries
//! again once it fires, so the waiting task yields to the runtime instead of
//! blocking a thread.

use crate::retry::FixedDelay;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

/// Wait between reads that found no new bytes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct TailSource {
    path: PathBuf,
    file: Option<File>,
    policy: FixedDelay,
    backoff: Option<Pin<Box<Sleep>>>,
}

impl TailSource {
    /// Opens `path` positioned at its first byte.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_with_policy(path, FixedDelay::new(DEFAULT_POLL_INTERVAL)).await
    }

    /// Opens `path` and waits `policy.delay` whenever the reader catches up.
    pub async fn open_with_policy(path: impl AsRef<Path>, policy: FixedDelay) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
            policy,
            backoff: None,
        })
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Releases the file. Reads after this fail with [`io::ErrorKind::NotConnected`].
    pub fn close(&mut self) {
        self.file = None;
        self.backoff = None;
    }
}

fn closed_error(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        format!("tail source for {} is closed", path.display()),
    )
}

impl AsyncRead for TailSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if let Some(backoff) = this.backoff.as_mut() {
                ready!(backoff.as_mut().poll(cx));
                this.backoff = None;
            }

            let Some(file) = this.file.as_mut() else {
                return Poll::Ready(Err(closed_error(&this.path)));
            };

            let before = buf.filled().len();
            ready!(Pin::new(file).poll_read(cx, buf))?;
            if buf.filled().len() > before {
                return Poll::Ready(Ok(()));
            }

            // Caught up with the writer. Wait and look again.
            this.backoff = Some(Box::pin(tokio::time::sleep(this.policy.delay)));
        }
    }
}
