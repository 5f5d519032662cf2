//! Stack lifecycle orchestrator.
//!
//! This module chains the poller and the dispatcher into a run:
//! wait for the stack to settle, act on what was found, wait for the action
//! to settle, and, when the action was a recovery delete, act once more with
//! the same request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::cloudformation::{
    ActionDispatcher, Classification, CompletionPoller, DEFAULT_POLL_INTERVAL_SECS,
    DeploymentRequest, OperationHandle, OperationKind, StackApi, StatusCategory,
    UPDATE_ROLLBACK_COMPLETE,
};
use crate::error::{DeployError, Result};

/// Orchestrator for deploying a single stack.
#[derive(Debug)]
pub struct Orchestrator<'a, A: StackApi + ?Sized> {
    /// Stack API backend.
    api: &'a A,
    /// Interval between status queries.
    poll_interval: Duration,
    /// Cancellation signal and deadline for the whole run.
    cancel: CancelToken,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    /// Name of the stack.
    pub stack_name: String,
    /// Status the stack settled at.
    pub final_status: String,
    /// Category of the final status.
    pub category: StatusCategory,
    /// Mutating operations issued, in order.
    pub operations: Vec<OperationHandle>,
}

/// What to do once the first action has settled.
enum Settled {
    /// The run is complete.
    Done,
    /// The stack is gone; create it from the same request.
    Recover,
}

impl<'a, A: StackApi + ?Sized> Orchestrator<'a, A> {
    /// Creates a new orchestrator with the default poll interval.
    #[must_use]
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            cancel: CancelToken::never(),
        }
    }

    /// Sets the interval between status queries.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the cancellation token for the run.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deploys the stack described by `request`.
    ///
    /// # Errors
    ///
    /// Returns `TerminalFailureState` when the stack is or ends up in a
    /// failure state, `MidFlightInconsistency` when an operation settles on
    /// anything but success, `Cancelled` when the token fires, and any
    /// unexpected API error unchanged.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<DeploymentOutcome> {
        let stack_name = request.stack_name.as_str();
        let poller = CompletionPoller::new(self.api)
            .with_interval(self.poll_interval)
            .with_cancel_token(self.cancel.clone());
        let dispatcher = ActionDispatcher::new(self.api);

        info!("Waiting for stack {stack_name} to be ready");
        let initial = poller.await_terminal(stack_name).await?;
        debug!(phase = 1, status = initial.status_label(), "Result of waiting for stack");

        let first = self.act(&dispatcher, 1, &initial, request).await?;
        let settled = poller.await_terminal(stack_name).await?;
        debug!(phase = 2, status = settled.status_label(), "Result of waiting for stack");

        let mut operations = vec![first];

        let last = match Self::settle(stack_name, &settled, &operations[0])? {
            Settled::Done => settled,
            Settled::Recover => {
                info!("Stack {stack_name} no longer exists: recreating ...");
                let second = self.act(&dispatcher, 2, &settled, request).await?;
                let recreated = poller.await_terminal(stack_name).await?;
                debug!(phase = 3, status = recreated.status_label(), "Result of waiting for stack");

                Self::require_success(stack_name, 3, &recreated, &second)?;
                operations.push(second);
                recreated
            }
        };

        info!("Final status of stack {stack_name} is {}", last.status_label());

        Ok(DeploymentOutcome {
            stack_name: stack_name.to_string(),
            final_status: last.status_label().to_string(),
            category: last.category,
            operations,
        })
    }

    /// Dispatches one operation after checking for cancellation.
    async fn act(
        &self,
        dispatcher: &ActionDispatcher<'_, A>,
        phase: u8,
        classification: &Classification,
        request: &DeploymentRequest,
    ) -> Result<OperationHandle> {
        self.cancel.check().map_err(|reason| {
            DeployError::cancelled(&request.stack_name, reason, classification.raw_status.as_deref())
        })?;

        let handle = dispatcher.dispatch(classification, request).await?;
        info!(
            phase,
            operation = %handle.kind,
            no_op = handle.no_op,
            stack_id = handle.stack_id.as_deref().unwrap_or("-"),
            "Operation accepted for stack {}",
            request.stack_name
        );
        Ok(handle)
    }

    /// Decides what follows the phase-two wait.
    fn settle(
        stack_name: &str,
        settled: &Classification,
        operation: &OperationHandle,
    ) -> Result<Settled> {
        if settled.category == StatusCategory::Nonexistent {
            return Ok(Settled::Recover);
        }
        Self::require_success(stack_name, 2, settled, operation)?;
        Ok(Settled::Done)
    }

    /// Accepts only a success-terminal status that the operation did not roll back.
    fn require_success(
        stack_name: &str,
        phase: u8,
        settled: &Classification,
        operation: &OperationHandle,
    ) -> Result<()> {
        let status = settled.status_label();

        match settled.category {
            StatusCategory::TerminalSuccess
                if operation.is_applied_update() && status == UPDATE_ROLLBACK_COMPLETE =>
            {
                Err(DeployError::MidFlightInconsistency {
                    stack_name: stack_name.to_string(),
                    status: status.to_string(),
                    phase,
                })
            }
            StatusCategory::TerminalSuccess => Ok(()),
            StatusCategory::TerminalFailure => Err(DeployError::TerminalFailureState {
                stack_name: stack_name.to_string(),
                status: status.to_string(),
            }),
            StatusCategory::Nonexistent
            | StatusCategory::RecoverableFailure
            | StatusCategory::InProgress => Err(DeployError::MidFlightInconsistency {
                stack_name: stack_name.to_string(),
                status: status.to_string(),
                phase,
            }),
        }
    }
}

impl DeploymentOutcome {
    /// Returns the kinds of the operations issued, in order.
    #[must_use]
    pub fn operation_kinds(&self) -> Vec<OperationKind> {
        self.operations.iter().map(|o| o.kind).collect()
    }

    /// Returns true if the run changed nothing.
    #[must_use]
    pub fn is_no_op(&self) -> bool {
        self.operations.iter().all(|o| o.no_op)
    }

    /// Returns true if the run deleted and recreated the stack.
    #[must_use]
    pub fn recovered(&self) -> bool {
        self.operation_kinds() == [OperationKind::Delete, OperationKind::Create]
    }
}

/// Report of a completed run, as shown to the user.
#[derive(Debug, Serialize)]
pub struct DeploymentReport {
    /// Unique run identifier.
    pub run_id: String,
    /// SHA-256 digest of the deployed template.
    pub template_digest: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Outcome of the run.
    #[serde(flatten)]
    pub outcome: DeploymentOutcome,
}

impl DeploymentReport {
    /// Creates a report for an outcome that finished now.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        template_digest: impl Into<String>,
        started_at: DateTime<Utc>,
        outcome: DeploymentOutcome,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            template_digest: template_digest.into(),
            started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    /// Returns the run duration in whole seconds.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

impl std::fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Deployment of {} finished:", self.outcome.stack_name)?;
        writeln!(f, "  Final status: {}", self.outcome.final_status)?;

        if self.outcome.is_no_op() {
            writeln!(f, "  Operations: none (no changes)")?;
        } else {
            let kinds: Vec<String> = self
                .outcome
                .operations
                .iter()
                .filter(|o| !o.no_op)
                .map(|o| o.kind.to_string())
                .collect();
            writeln!(f, "  Operations: {}", kinds.join(" -> "))?;
        }

        writeln!(f, "  Duration: {}s", self.duration_secs())?;
        write!(f, "  Run: {}", self.run_id)
    }
}
