//! Action dispatcher for CloudFormation stacks.
//!
//! Maps a classification onto exactly one mutating operation. The mapping is
//! an exhaustive match over [`StatusCategory`], so adding a category forces a
//! decision here.

use tracing::info;

use crate::error::{ApiError, DeployError, Result};

use super::api::StackApi;
use super::types::{Classification, DeploymentRequest, OperationHandle, StatusCategory};

/// Dispatcher that starts the operation a classification calls for.
#[derive(Debug)]
pub struct ActionDispatcher<'a, A: StackApi + ?Sized> {
    /// Stack API backend.
    api: &'a A,
}

impl<'a, A: StackApi + ?Sized> ActionDispatcher<'a, A> {
    /// Creates a new dispatcher.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Starts the operation for the given classification.
    ///
    /// | Category | Operation |
    /// |---|---|
    /// | `Nonexistent` | create |
    /// | `RecoverableFailure` | delete |
    /// | `TerminalFailure` | none, fatal |
    /// | anything else | update |
    ///
    /// The operation is started, not awaited.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::TerminalFailureState` for a stack in a failure
    /// state, or the API error of the operation. An update with no changes is
    /// not an error.
    pub async fn dispatch(
        &self,
        classification: &Classification,
        request: &DeploymentRequest,
    ) -> Result<OperationHandle> {
        let stack_name = request.stack_name.as_str();
        let status = classification.status_label();

        match classification.category {
            StatusCategory::Nonexistent => {
                info!("Stack {stack_name} does not exist yet: creating ...");
                self.api.create_stack(request).await
            }
            StatusCategory::RecoverableFailure => {
                info!("Stack {stack_name} is in {status} state: deleting ...");
                self.api.delete_stack(stack_name).await
            }
            StatusCategory::TerminalFailure => Err(DeployError::TerminalFailureState {
                stack_name: stack_name.to_string(),
                status: status.to_string(),
            }),
            StatusCategory::TerminalSuccess | StatusCategory::InProgress => {
                info!("Stack {stack_name} is in {status} state: updating ...");
                self.update(request).await
            }
        }
    }

    /// Starts an update, treating "no updates" as a no-op success.
    async fn update(&self, request: &DeploymentRequest) -> Result<OperationHandle> {
        match self.api.update_stack(request).await {
            Err(DeployError::Api(ApiError::NoUpdates { .. })) => {
                info!("Stack {}: no updates are to be performed", request.stack_name);
                Ok(OperationHandle::no_op_update(&request.stack_name))
            }
            other => other,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockApi;
    use super::*;
    use crate::cloudformation::types::{OperationKind, StackParameter};

    fn request() -> DeploymentRequest {
        DeploymentRequest::new("web", "Resources: {}")
            .with_capabilities(vec![String::from("CAPABILITY_IAM")])
            .with_parameters(vec![StackParameter::new("Env", "prod")])
    }

    #[tokio::test]
    async fn test_nonexistent_creates_once() {
        let mut api = MockApi::new();
        api.expect_create_stack()
            .times(1)
            .withf(|r| r.capabilities == ["CAPABILITY_IAM"] && r.parameters.len() == 1)
            .returning(|r| Ok(OperationHandle::new(OperationKind::Create, &r.stack_name)));
        api.expect_update_stack().never();
        api.expect_delete_stack().never();

        let handle = ActionDispatcher::new(&api)
            .dispatch(&Classification::nonexistent(), &request())
            .await
            .expect("create failed");

        assert_eq!(handle.kind, OperationKind::Create);
    }

    #[tokio::test]
    async fn test_rollback_complete_deletes_once() {
        let mut api = MockApi::new();
        api.expect_delete_stack()
            .times(1)
            .withf(|name| name.to_string() == "web")
            .returning(|name| Ok(OperationHandle::new(OperationKind::Delete, name)));
        api.expect_create_stack().never();
        api.expect_update_stack().never();

        let handle = ActionDispatcher::new(&api)
            .dispatch(&Classification::from_status("ROLLBACK_COMPLETE"), &request())
            .await
            .expect("delete failed");

        assert_eq!(handle.kind, OperationKind::Delete);
    }

    #[tokio::test]
    async fn test_failure_state_invokes_nothing() {
        let mut api = MockApi::new();
        api.expect_create_stack().never();
        api.expect_update_stack().never();
        api.expect_delete_stack().never();

        let err = ActionDispatcher::new(&api)
            .dispatch(&Classification::from_status("UPDATE_ROLLBACK_FAILED"), &request())
            .await
            .expect_err("failure states must be fatal");

        assert!(err.to_string().contains("UPDATE_ROLLBACK_FAILED"));
    }

    #[tokio::test]
    async fn test_no_updates_is_a_no_op() {
        let mut api = MockApi::new();
        api.expect_update_stack().times(1).returning(|r| {
            Err(DeployError::Api(ApiError::NoUpdates {
                stack_name: r.stack_name.clone(),
            }))
        });

        let handle = ActionDispatcher::new(&api)
            .dispatch(&Classification::from_status("UPDATE_COMPLETE"), &request())
            .await
            .expect("no-op update must succeed");

        assert!(handle.no_op);
        assert_eq!(handle.kind, OperationKind::Update);
    }

    #[tokio::test]
    async fn test_other_update_errors_propagate() {
        let mut api = MockApi::new();
        api.expect_update_stack().times(1).returning(|_| {
            Err(DeployError::Api(ApiError::RequestFailed {
                operation: String::from("UpdateStack"),
                message: String::from("Template format error"),
            }))
        });

        let err = ActionDispatcher::new(&api)
            .dispatch(&Classification::from_status("CREATE_COMPLETE"), &request())
            .await
            .expect_err("update errors must propagate");

        assert!(matches!(err, DeployError::Api(ApiError::RequestFailed { .. })));
    }
}
