//! Cancellable fixed-delay retry loop

use log::info;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry policy that waits the same delay after every failed attempt and never gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl FixedDelay {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

/// The token was cancelled before an attempt succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Calls `attempt` until it yields a value or `cancel` fires, sleeping the
/// policy delay after every `None`.
///
/// The closure receives the 1-based attempt number. Cancellation is observed
/// before each attempt and while waiting; an attempt already in flight runs
/// to completion.
pub async fn poll_until<T, F, Fut>(
    policy: FixedDelay,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, Cancelled>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut number: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        number = number.saturating_add(1);
        if let Some(value) = attempt(number).await {
            return Ok(value);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled),
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}

/// Like [`poll_until`] for fallible attempts. Each failure is logged at info
/// level with `what` as the subject.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: FixedDelay,
    cancel: &CancellationToken,
    what: &str,
    mut attempt: F,
) -> Result<T, Cancelled>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    poll_until(policy, cancel, |number| {
        let pending = attempt(number);
        async move {
            match pending.await {
                Ok(value) => Some(value),
                Err(e) => {
                    info!(
                        "{} failed (attempt {}): {}. Retrying in {:?}",
                        what, number, e, policy.delay
                    );
                    None
                }
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_first_success() {
        let cancel = CancellationToken::new();
        let result = retry_fixed(FixedDelay::new(Duration::from_millis(1)), &cancel, "op", |n| async move {
            Ok::<_, String>(n)
        })
        .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_fixed(FixedDelay::new(Duration::from_millis(1)), &cancel, "op", |n| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if n < 4 {
                    Err(format!("attempt {} refused", n))
                } else {
                    Ok("connected")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("connected"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_stops_retrying() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result: Result<(), Cancelled> =
            retry_fixed(FixedDelay::new(Duration::from_secs(60)), &cancel, "op", |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("unreachable")
                }
            })
            .await;

        assert_eq!(result, Err(Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_until_counts_attempts() {
        let cancel = CancellationToken::new();
        let result = poll_until(FixedDelay::new(Duration::from_millis(1)), &cancel, |n| async move {
            (n == 3).then_some(n * 10)
        })
        .await;
        assert_eq!(result, Ok(30));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut attempted = false;
        let result = retry_fixed(FixedDelay::new(Duration::from_millis(1)), &cancel, "op", |_| {
            attempted = true;
            async { Ok::<_, String>(()) }
        })
        .await;

        assert_eq!(result, Err(Cancelled));
        assert!(!attempted);
    }
}
