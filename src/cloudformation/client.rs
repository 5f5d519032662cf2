//! CloudFormation API client implementation.
//!
//! This module adapts the AWS SDK CloudFormation client to the [`StackApi`] trait.

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter};
use tracing::{debug, trace};

use crate::error::{ApiError, DeployError, Result};

use super::api::StackApi;
use super::types::{DeploymentRequest, OperationHandle, OperationKind};

/// CloudFormation API client.
#[derive(Debug, Clone)]
pub struct CloudFormationClient {
    /// AWS SDK client.
    client: Client,
}

impl CloudFormationClient {
    /// Creates a client from the ambient AWS configuration.
    pub async fn new(region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self {
            client: Client::new(&config),
        }
    }

    /// Creates a client around an existing SDK client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Converts request capabilities to SDK values.
    fn capabilities(request: &DeploymentRequest) -> Vec<Capability> {
        request
            .capabilities
            .iter()
            .map(|c| Capability::from(c.as_str()))
            .collect()
    }

    /// Converts request parameters to SDK values.
    fn parameters(request: &DeploymentRequest) -> Vec<Parameter> {
        request
            .parameters
            .iter()
            .map(|p| {
                Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(&p.value)
                    .build()
            })
            .collect()
    }
}

/// Maps an SDK error onto the API error taxonomy.
fn map_sdk_error<E, R>(operation: &str, stack_name: &str, err: SdkError<E, R>) -> DeployError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = err.message().map(String::from);
    let message = message.unwrap_or_else(|| DisplayErrorContext(err).to_string());

    debug!("{operation} on {stack_name} failed: {message}");
    DeployError::Api(ApiError::from_message(operation, stack_name, message))
}

#[async_trait]
impl StackApi for CloudFormationClient {
    async fn describe_stack_status(&self, stack_name: &str) -> Result<String> {
        trace!("DescribeStacks {stack_name}");

        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| map_sdk_error("DescribeStacks", stack_name, e))?;

        match output.stacks() {
            [] => Err(DeployError::Api(ApiError::StackNotFound {
                stack_name: stack_name.to_string(),
            })),
            [stack] => stack
                .stack_status()
                .map(|s| s.as_str().to_string())
                .ok_or_else(|| {
                    DeployError::Api(ApiError::InvalidResponse {
                        message: format!("Stack {stack_name} has no status"),
                    })
                }),
            stacks => Err(DeployError::Api(ApiError::InvalidResponse {
                message: format!("Expected one stack named {stack_name}, found {}", stacks.len()),
            })),
        }
    }

    async fn create_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle> {
        let stack_name = request.stack_name.as_str();

        let output = self
            .client
            .create_stack()
            .stack_name(stack_name)
            .template_body(&request.template_body)
            .set_capabilities(Some(Self::capabilities(request)))
            .set_parameters(Some(Self::parameters(request)))
            .send()
            .await
            .map_err(|e| map_sdk_error("CreateStack", stack_name, e))?;

        Ok(OperationHandle::new(OperationKind::Create, stack_name)
            .with_stack_id(output.stack_id().map(String::from)))
    }

    async fn update_stack(&self, request: &DeploymentRequest) -> Result<OperationHandle> {
        let stack_name = request.stack_name.as_str();

        let output = self
            .client
            .update_stack()
            .stack_name(stack_name)
            .template_body(&request.template_body)
            .set_capabilities(Some(Self::capabilities(request)))
            .set_parameters(Some(Self::parameters(request)))
            .send()
            .await
            .map_err(|e| map_sdk_error("UpdateStack", stack_name, e))?;

        Ok(OperationHandle::new(OperationKind::Update, stack_name)
            .with_stack_id(output.stack_id().map(String::from)))
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<OperationHandle> {
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| map_sdk_error("DeleteStack", stack_name, e))?;

        Ok(OperationHandle::new(OperationKind::Delete, stack_name))
    }
}
