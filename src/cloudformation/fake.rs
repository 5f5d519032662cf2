//! Scripted in-memory stack API used by unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::cancel::CancelHandle;
use crate::error::{ApiError, DeployError, Result};

use super::api::StackApi;
use super::types::{DeploymentRequest, OperationHandle, OperationKind};

/// One scripted answer to a describe query.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    /// The stack exists with this status.
    Status(&'static str),
    /// The stack does not exist.
    Missing,
    /// The query fails with this message.
    Fail(&'static str),
}

/// Replays describe answers in order and records mutating calls.
///
/// The last reply repeats once the script runs out.
#[derive(Debug)]
pub(crate) struct ScriptedStackApi {
    replies: Mutex<VecDeque<Reply>>,
    operations: Mutex<Vec<OperationKind>>,
    describes: Mutex<usize>,
    no_changes: bool,
    cancel_on_describe: Option<CancelHandle>,
}

impl ScriptedStackApi {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            operations: Mutex::new(Vec::new()),
            describes: Mutex::new(0),
            no_changes: false,
            cancel_on_describe: None,
        }
    }

    /// Fires `handle` from inside every describe call, before it answers.
    pub(crate) fn with_cancel_on_describe(mut self, handle: CancelHandle) -> Self {
        self.cancel_on_describe = Some(handle);
        self
    }

    /// Makes every update fail with "No updates are to be performed."
    pub(crate) fn with_no_changes(mut self) -> Self {
        self.no_changes = true;
        self
    }

    pub(crate) fn operations(&self) -> Vec<OperationKind> {
        self.operations.lock().expect("poisoned").clone()
    }

    pub(crate) fn describes(&self) -> usize {
        *self.describes.lock().expect("poisoned")
    }

    fn record(&self, kind: OperationKind, stack_name: &str) -> OperationHandle {
        self.operations.lock().expect("poisoned").push(kind);
        OperationHandle::new(kind, stack_name).with_stack_id(Some(format!("arn:stack/{stack_name}")))
    }
}

#[async_trait]
impl StackApi for ScriptedStackApi {
    async fn describe_stack_status(&self, stack_name: &str) -> Result<String> {
        *self.describes.lock().expect("poisoned") += 1;
        if let Some(handle) = &self.cancel_on_describe {
            handle.cancel();
        }

        let reply = {
            let mut replies = self.replies.lock().expect("poisoned");
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().copied()
            }
        };

        match reply.unwrap_or(Reply::Missing) {
            Reply::Status(status) => Ok(status.to_string()),
            Reply::Missing => Err(DeployError::Api(ApiError::from_message(
                "DescribeStacks",
                stack_name,
                format!("Stack with id {stack_name} does not exist"),
            ))),
            Reply::Fail(message) => Err(DeployError::Api(ApiError::from_message(
                "DescribeStacks",
                stack_name,
                message,
            ))),
        }
    }

    async fn create_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle> {
        Ok(self.record(OperationKind::Create, &request.stack_name))
    }

    async fn update_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle> {
        if self.no_changes {
            self.operations.lock().expect("poisoned").push(OperationKind::Update);
            return Err(DeployError::Api(ApiError::from_message(
                "UpdateStack",
                &request.stack_name,
                "No updates are to be performed.",
            )));
        }
        Ok(self.record(OperationKind::Update, &request.stack_name))
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<OperationHandle> {
        Ok(self.record(OperationKind::Delete, stack_name))
    }
}
