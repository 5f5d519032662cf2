//! Status classifier for CloudFormation stacks.
//!
//! This module turns a describe query into a [`Classification`], absorbing
//! the "stack does not exist" error into the `Nonexistent` category.

use tracing::debug;

use crate::error::{ApiError, DeployError, Result};

use super::api::StackApi;
use super::types::Classification;

/// Classifier for the current state of a stack.
#[derive(Debug)]
pub struct StatusClassifier<'a, A: StackApi + ?Sized> {
    /// Stack API backend.
    api: &'a A,
}

impl<'a, A: StackApi + ?Sized> StatusClassifier<'a, A> {
    /// Creates a new classifier.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Queries the stack once and classifies what comes back.
    ///
    /// # Errors
    ///
    /// Returns any query failure other than "stack does not exist".
    pub async fn classify(&self, stack_name: &str) -> Result<Classification> {
        match self.api.describe_stack_status(stack_name).await {
            Ok(status) => {
                let classification = Classification::from_status(status);
                debug!(
                    stack = stack_name,
                    status = classification.status_label(),
                    category = %classification.category,
                    "Classified stack status"
                );
                Ok(classification)
            }
            Err(DeployError::Api(ApiError::StackNotFound { .. })) => {
                debug!(
                    stack = stack_name,
                    category = "NONEXISTENT",
                    "Stack does not exist"
                );
                Ok(Classification::nonexistent())
            }
            Err(err) => Err(err),
        }
    }
}
