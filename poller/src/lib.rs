//! Cooperative upgrade poller.
//!
//! After the user is sent to the hosted payment page, the subscription
//! flip arrives asynchronously through the gateway webhook. This crate
//! watches the quota store on a fixed interval until the status read
//! reports premium or a wall-clock deadline elapses. Cancellation is
//! dropping the returned future.

use std::future::Future;
use std::time::Duration;

use common::error::Res;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Upgraded,
    TimedOut,
}

/// Polls `check` every `interval` until it reports premium or `deadline`
/// elapses, whichever comes first. A failing status read is treated as
/// "not yet premium" and the loop keeps going; the deadline is the only
/// way a persistent failure terminates the poll.
pub async fn poll_until_premium<F, Fut>(
    interval: Duration,
    deadline: Duration,
    mut check: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Res<bool>>,
{
    let poll = async {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match check().await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => {
                    log::debug!("Payment status check failed, treating as not yet: {}", e);
                }
            }
        }
    };

    match tokio::time::timeout(deadline, poll).await {
        Ok(()) => PollOutcome::Upgraded,
        Err(_) => PollOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::error::AppError;
    use std::cell::Cell;

    const INTERVAL: Duration = Duration::from_millis(500);
    const DEADLINE: Duration = Duration::from_secs(120);

    #[tokio::test(start_paused = true)]
    async fn resolves_as_soon_as_status_flips() {
        let calls = Cell::new(0u32);
        let outcome = poll_until_premium(INTERVAL, DEADLINE, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move { Ok(n >= 3) }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Upgraded);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_status_never_flips() {
        let start = tokio::time::Instant::now();
        let outcome = poll_until_premium(INTERVAL, DEADLINE, || async { Ok(false) }).await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(start.elapsed() >= DEADLINE);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_read_failures_are_swallowed() {
        let calls = Cell::new(0u32);
        let outcome = poll_until_premium(INTERVAL, DEADLINE, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move {
                if n < 3 {
                    Err(AppError::Internal("store unavailable".to_string()))
                } else {
                    Ok(true)
                }
            }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Upgraded);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failures_end_at_the_deadline() {
        let outcome = poll_until_premium(INTERVAL, DEADLINE, || async {
            Err::<bool, _>(AppError::Internal("store unavailable".to_string()))
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
    }
}
