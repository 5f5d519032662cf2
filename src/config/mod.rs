//! Configuration module for stack deployments.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `stack-deploy.yaml`
//! - Layering `.env`, environment, and action-input overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, debug_requested, find_config_file, parse_capabilities, parse_parameters,
};
pub use spec::{DeployConfig, ParametersConfig, PollingConfig, StackConfig, split_parameter};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, is_valid_stack_name};
