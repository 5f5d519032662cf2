//! Stack API trait definition.
//!
//! This module defines the control-plane operations the orchestrator relies on.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{DeploymentRequest, OperationHandle};

/// Trait for stack control-plane backends.
///
/// Implementations report a missing stack as `ApiError::StackNotFound` and an
/// update with nothing to change as `ApiError::NoUpdates`; every other
/// failure is returned as-is.
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Returns the raw status of the named stack.
    async fn describe_stack_status(&self, stack_name: &str) -> Result<String>;

    /// Starts creating a stack.
    async fn create_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle>;

    /// Starts updating a stack.
    async fn update_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle>;

    /// Starts deleting a stack.
    async fn delete_stack(&self, stack_name: &str) -> Result<OperationHandle>;
}
