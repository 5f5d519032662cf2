//! Completion poller for CloudFormation stacks.
//!
//! The poller re-classifies a stack at a fixed interval until it reaches a
//! terminal category. It never mutates the stack.

use std::time::Duration;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{DeployError, Result};

use super::api::StackApi;
use super::classifier::StatusClassifier;
use super::types::Classification;

/// Default interval between status queries in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Poller that waits for a stack to settle.
#[derive(Debug)]
pub struct CompletionPoller<'a, A: StackApi + ?Sized> {
    /// Status classifier.
    classifier: StatusClassifier<'a, A>,
    /// Constant delay between queries.
    interval: Duration,
    /// Cancellation signal and deadline.
    cancel: CancelToken,
}

impl<'a, A: StackApi + ?Sized> CompletionPoller<'a, A> {
    /// Creates a poller with the default interval and no cancellation.
    #[must_use]
    pub fn new(api: &'a A) -> Self {
        Self {
            classifier: StatusClassifier::new(api),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cancel: CancelToken::never(),
        }
    }

    /// Sets the interval between queries.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Polls until the stack reaches a terminal category.
    ///
    /// Returns the terminal classification, including `TerminalFailure`;
    /// deciding what a failure means is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns a query failure other than "stack does not exist", or
    /// `DeployError::Cancelled` if the token fires between queries.
    pub async fn await_terminal(&self, stack_name: &str) -> Result<Classification> {
        let mut last_status: Option<String> = None;
        let mut polls: u32 = 0;

        loop {
            self.cancel
                .check()
                .map_err(|reason| DeployError::cancelled(stack_name, reason, last_status.as_deref()))?;

            let classification = self.classifier.classify(stack_name).await?;
            polls = polls.saturating_add(1);

            if classification.category.is_terminal() {
                debug!(
                    "Stack {stack_name} settled at {} after {polls} poll(s)",
                    classification.status_label()
                );
                return Ok(classification);
            }

            info!(
                "Stack {stack_name} is {}, checking again in {}s",
                classification.status_label(),
                self.interval.as_secs()
            );
            last_status = classification.raw_status;

            self.cancel
                .sleep(self.interval)
                .await
                .map_err(|reason| DeployError::cancelled(stack_name, reason, last_status.as_deref()))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::cloudformation::fake::{Reply, ScriptedStackApi};
    use crate::cloudformation::types::StatusCategory;
    use crate::error::CancelReason;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_constant_interval_until_terminal() {
        let api = ScriptedStackApi::new([
            Reply::Status("CREATE_IN_PROGRESS"),
            Reply::Status("CREATE_IN_PROGRESS"),
            Reply::Status("CREATE_COMPLETE"),
        ]);
        let poller = CompletionPoller::new(&api).with_interval(Duration::from_secs(30));
        let start = Instant::now();

        let classification = poller.await_terminal("web").await.expect("poll failed");

        assert_eq!(classification.category, StatusCategory::TerminalSuccess);
        assert_eq!(api.describes(), 3);
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(start.elapsed() < Duration::from_secs(61));
        assert!(api.operations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_immediately_on_recoverable_failure() {
        let api = ScriptedStackApi::new([Reply::Status("ROLLBACK_COMPLETE")]);
        let classification = CompletionPoller::new(&api)
            .await_terminal("web")
            .await
            .expect("poll failed");

        assert_eq!(classification.category, StatusCategory::RecoverableFailure);
        assert_eq!(api.describes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_state_is_returned_not_polled() {
        let api = ScriptedStackApi::new([
            Reply::Status("UPDATE_ROLLBACK_FAILED"),
            Reply::Status("UPDATE_COMPLETE"),
        ]);
        let classification = CompletionPoller::new(&api)
            .await_terminal("web")
            .await
            .expect("poll failed");

        assert_eq!(classification.category, StatusCategory::TerminalFailure);
        assert_eq!(api.describes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_unbounded_polling() {
        let api = ScriptedStackApi::new([Reply::Status("UPDATE_IN_PROGRESS")]);
        let cancel = CancelToken::never().with_timeout(Duration::from_secs(95));
        let poller = CompletionPoller::new(&api).with_cancel_token(cancel);

        let err = poller
            .await_terminal("web")
            .await
            .expect_err("polling must stop at the deadline");

        match err {
            DeployError::Cancelled {
                reason, last_status, ..
            } => {
                assert_eq!(reason, CancelReason::DeadlineExceeded);
                assert_eq!(last_status.as_deref(), Some("UPDATE_IN_PROGRESS"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(api.describes(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_query() {
        let api = ScriptedStackApi::new([Reply::Status("CREATE_COMPLETE")]);
        let (handle, token) = cancel_pair();
        handle.cancel();

        let err = CompletionPoller::new(&api)
            .with_cancel_token(token)
            .await_terminal("web")
            .await
            .expect_err("cancelled run must not succeed");

        assert!(err.is_cancelled());
        assert_eq!(api.describes(), 0);
    }
}
