//! Cancellation and deadlines for a deployment run.
//!
//! A [`CancelToken`] is checked before every remote query and every mutating
//! call, and it interrupts the sleep between polls. It fires either when the
//! paired [`CancelHandle`] is triggered or when its optional deadline passes.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::CancelReason;

/// Sending side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    /// Flips to `true` once cancelled.
    sender: watch::Sender<bool>,
}

/// Receiving side of a cancellation pair, with an optional deadline.
#[derive(Debug, Clone)]
pub struct CancelToken {
    /// Cancellation flag.
    receiver: watch::Receiver<bool>,
    /// Point in time after which the run is abandoned.
    deadline: Option<Instant>,
}

/// Creates a connected handle and token.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (
        CancelHandle { sender },
        CancelToken {
            receiver,
            deadline: None,
        },
    )
}

impl CancelHandle {
    /// Requests cancellation of every token derived from this handle.
    pub fn cancel(&self) {
        let _ = self.sender.send_replace(true);
    }
}

impl CancelToken {
    /// A token that only fires through its deadline, if one is set.
    #[must_use]
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    ///
    /// A timeout too large to represent leaves the token without a deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Returns the reason the run must stop, if it must.
    ///
    /// # Errors
    ///
    /// Returns the cancellation reason once the signal fired or the deadline passed.
    pub fn check(&self) -> Result<(), CancelReason> {
        if *self.receiver.borrow() {
            return Err(CancelReason::Signal);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CancelReason::DeadlineExceeded);
        }
        Ok(())
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// # Errors
    ///
    /// Returns the cancellation reason if the signal fires or the deadline
    /// falls inside the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CancelReason> {
        self.check()?;

        // An unrepresentable wake-up time means the sleep never ends on its own.
        let wake_at = Instant::now().checked_add(duration);
        let (until, hits_deadline) = match (self.deadline, wake_at) {
            (Some(deadline), Some(wake_at)) if deadline <= wake_at => (Some(deadline), true),
            (Some(deadline), None) => (Some(deadline), true),
            (_, wake_at) => (wake_at, false),
        };

        let timer = async {
            match until {
                Some(until) => tokio::time::sleep_until(until).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = timer => {
                if hits_deadline {
                    Err(CancelReason::DeadlineExceeded)
                } else {
                    Ok(())
                }
            }
            () = Self::signalled(self.receiver.clone()) => Err(CancelReason::Signal),
        }
    }

    /// Resolves once the flag is set; never resolves if the handle is gone.
    async fn signalled(mut receiver: watch::Receiver<bool>) {
        let fired = receiver.wait_for(|cancelled| *cancelled).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_cancellation() {
        let token = CancelToken::never();
        assert_eq!(token.sleep(Duration::from_secs(30)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let (handle, token) = cancel_pair();

        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(3600)).await });
        tokio::task::yield_now().await;
        handle.cancel();

        let result = sleeper.await.expect("sleeper panicked");
        assert_eq!(result, Err(CancelReason::Signal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_sleep_short() {
        let token = CancelToken::never().with_timeout(Duration::from_secs(5));
        let start = Instant::now();

        assert_eq!(
            token.sleep(Duration::from_secs(30)).await,
            Err(CancelReason::DeadlineExceeded)
        );
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(token.check(), Err(CancelReason::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_means_no_deadline() {
        let token = CancelToken::never().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(token.check(), Ok(()));
        assert!(token.deadline.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_sleep_stops_at_deadline() {
        let token = CancelToken::never().with_timeout(Duration::from_secs(5));
        let start = Instant::now();

        assert_eq!(
            token.sleep(Duration::from_secs(u64::MAX)).await,
            Err(CancelReason::DeadlineExceeded)
        );
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_sleep_is_interrupted_by_cancel() {
        let (handle, token) = cancel_pair();

        let sleeper =
            tokio::spawn(async move { token.sleep(Duration::from_secs(u64::MAX)).await });
        tokio::task::yield_now().await;
        handle.cancel();

        let result = sleeper.await.expect("sleeper panicked");
        assert_eq!(result, Err(CancelReason::Signal));
    }

    #[test]
    fn test_check_after_cancel() {
        let (handle, token) = cancel_pair();
        assert_eq!(token.check(), Ok(()));
        handle.cancel();
        assert_eq!(token.check(), Err(CancelReason::Signal));
    }
}
