//! Configuration specification types for stack deployments.
//!
//! This module defines the structs that map to the `stack-deploy.yaml` file.
//! Every field is optional in the file itself; environment variables and CLI
//! flags can fill in what the file leaves out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cloudformation::{DeploymentRequest, StackParameter};
use crate::error::{ConfigError, Result};

/// Default delay between status polls, in seconds.
const fn default_interval_secs() -> u64 {
    crate::cloudformation::DEFAULT_POLL_INTERVAL_SECS
}

/// The root configuration structure for a stack deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeployConfig {
    /// Stack-level configuration.
    #[serde(default)]
    pub stack: StackConfig,
    /// Polling behaviour.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Stack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StackConfig {
    /// Name of the stack to deploy.
    #[serde(default)]
    pub name: String,
    /// Template reference (file path or `s3://bucket/key`).
    #[serde(default)]
    pub template: String,
    /// Capability acknowledgements passed through to create and update.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Stack parameters.
    #[serde(default)]
    pub parameters: ParametersConfig,
    /// AWS region (uses the AWS default chain if not specified).
    #[serde(default)]
    pub region: Option<String>,
}

/// Stack parameters, written either as a map or as a list of `Key=Value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParametersConfig {
    /// `Key: Value` mapping.
    Map(BTreeMap<String, serde_yaml::Value>),
    /// List of `Key=Value` strings.
    List(Vec<String>),
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    /// Seconds between status polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Overall deadline for the run, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: None,
        }
    }
}

impl ParametersConfig {
    /// Converts the parameters into ordered `StackParameter` values.
    ///
    /// # Errors
    ///
    /// Returns an error if a list entry lacks `=` or a map value is not a scalar.
    pub fn to_stack_parameters(&self) -> Result<Vec<StackParameter>> {
        match self {
            Self::List(tokens) => tokens.iter().map(|token| split_parameter(token)).collect(),
            Self::Map(map) => map
                .iter()
                .map(|(key, value)| -> Result<StackParameter> {
                    let value = match value {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        serde_yaml::Value::Null => String::new(),
                        _ => {
                            return Err(ConfigError::validation(
                                format!("Parameter '{key}' must be a scalar value"),
                                format!("stack.parameters.{key}"),
                            )
                            .into());
                        }
                    };
                    Ok(StackParameter::new(key.clone(), value))
                })
                .collect(),
        }
    }

    /// Returns true if no parameters are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(tokens) => tokens.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }
}

impl DeployConfig {
    /// Builds the deployment request for a loaded template body.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are malformed.
    pub fn to_request(&self, template_body: impl Into<String>) -> Result<DeploymentRequest> {
        Ok(
            DeploymentRequest::new(self.stack.name.clone(), template_body)
                .with_capabilities(self.stack.capabilities.clone())
                .with_parameters(self.stack.parameters.to_stack_parameters()?),
        )
    }
}

/// Splits one `Key=Value` token at the first `=`.
///
/// # Errors
///
/// Returns an error if the token contains no `=`.
pub fn split_parameter(token: &str) -> Result<StackParameter> {
    token
        .split_once('=')
        .map(|(key, value)| StackParameter::new(key, value))
        .ok_or_else(|| {
            ConfigError::InvalidParameter {
                token: token.to_string(),
            }
            .into()
        })
}
