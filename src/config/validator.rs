//! Configuration validation for stack deployments.
//!
//! This module checks a fully merged configuration before any remote call
//! is made. The template itself is passed through untouched and is never
//! validated here.

use crate::error::{ConfigError, DeployError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{DeployConfig, StackConfig};

/// Longest stack name CloudFormation accepts.
const MAX_STACK_NAME_LEN: usize = 128;

/// Longest accepted delay between status polls, in seconds.
const MAX_POLL_INTERVAL_SECS: u64 = 3_600;

/// Longest accepted run deadline, in seconds (one week).
const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 3_600;

/// Capability acknowledgements CloudFormation understands.
const KNOWN_CAPABILITIES: &[&str] = &[
    "CAPABILITY_IAM",
    "CAPABILITY_NAMED_IAM",
    "CAPABILITY_AUTO_EXPAND",
];

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator {
    /// Known valid capability tokens.
    known_capabilities: HashSet<String>,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator with the known capability tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            known_capabilities: KNOWN_CAPABILITIES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Validates a deployment configuration, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(DeployError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &DeployConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_stack_name(&config.stack.name, &mut result);
        Self::validate_template(&config.stack.template, &mut result);
        self.validate_capabilities(&config.stack.capabilities, &mut result);
        Self::validate_parameters(&config.stack, &mut result);
        Self::validate_polling(config, &mut result);

        result
    }

    /// Validates the stack name.
    fn validate_stack_name(name: &str, result: &mut ValidationResult) {
        if name.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("stack.name"),
                message: String::from("Stack name cannot be empty"),
            });
        } else if name.len() > MAX_STACK_NAME_LEN {
            result.errors.push(ValidationError {
                field: String::from("stack.name"),
                message: format!(
                    "Stack name is {} characters long; the limit is {MAX_STACK_NAME_LEN}",
                    name.len()
                ),
            });
        } else if !is_valid_stack_name(name) {
            result.errors.push(ValidationError {
                field: String::from("stack.name"),
                message: format!(
                    "Stack name '{name}' is invalid. Must start with a letter and contain only letters, digits and hyphens."
                ),
            });
        }
    }

    /// Validates the template reference.
    fn validate_template(template: &str, result: &mut ValidationResult) {
        if template.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("stack.template"),
                message: String::from("Template reference cannot be empty"),
            });
        }
    }

    /// Validates capability tokens.
    fn validate_capabilities(&self, capabilities: &[String], result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, capability) in capabilities.iter().enumerate() {
            if !self.known_capabilities.contains(capability) {
                result.errors.push(ValidationError {
                    field: format!("stack.capabilities[{i}]"),
                    message: format!("Unknown capability '{capability}'"),
                });
            } else if !seen.insert(capability.as_str()) {
                result
                    .warnings
                    .push(format!("Capability '{capability}' is listed more than once"));
            }
        }
    }

    /// Validates stack parameters.
    fn validate_parameters(stack: &StackConfig, result: &mut ValidationResult) {
        let params = match stack.parameters.to_stack_parameters() {
            Ok(params) => params,
            Err(e) => {
                result.errors.push(ValidationError {
                    field: String::from("stack.parameters"),
                    message: e.to_string(),
                });
                return;
            }
        };

        let mut seen = HashSet::new();
        for param in &params {
            if param.key.is_empty() {
                result.errors.push(ValidationError {
                    field: String::from("stack.parameters"),
                    message: format!("Parameter with value '{}' has an empty key", param.value),
                });
            } else if !seen.insert(param.key.as_str()) {
                result.warnings.push(format!(
                    "Parameter '{}' is set more than once; every value is sent as given",
                    param.key
                ));
            }
        }
    }

    /// Validates polling settings.
    fn validate_polling(config: &DeployConfig, result: &mut ValidationResult) {
        if config.polling.interval_secs == 0 {
            result.errors.push(ValidationError {
                field: String::from("polling.interval_secs"),
                message: String::from("Poll interval must be at least 1 second"),
            });
        } else if config.polling.interval_secs > MAX_POLL_INTERVAL_SECS {
            result.errors.push(ValidationError {
                field: String::from("polling.interval_secs"),
                message: format!("Poll interval must be at most {MAX_POLL_INTERVAL_SECS} seconds"),
            });
        }

        match config.polling.timeout_secs {
            Some(0) => result.errors.push(ValidationError {
                field: String::from("polling.timeout_secs"),
                message: String::from("Timeout must be at least 1 second"),
            }),
            Some(timeout) if timeout > MAX_TIMEOUT_SECS => result.errors.push(ValidationError {
                field: String::from("polling.timeout_secs"),
                message: format!("Timeout must be at most {MAX_TIMEOUT_SECS} seconds"),
            }),
            Some(timeout) if timeout < config.polling.interval_secs => {
                result.warnings.push(format!(
                    "Timeout of {timeout}s is shorter than the {}s poll interval",
                    config.polling.interval_secs
                ));
            }
            Some(_) => {}
            None => result
                .warnings
                .push(String::from("No timeout configured; the run may wait indefinitely")),
        }
    }
}

/// Validates that a name is an acceptable CloudFormation stack name.
/// Names must start with a letter and contain only ASCII letters, digits, and hyphens.
#[must_use]
pub fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    name.len() <= MAX_STACK_NAME_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::ParametersConfig;

    fn valid_config() -> DeployConfig {
        let mut config = DeployConfig::default();
        config.stack.name = String::from("web-prod");
        config.stack.template = String::from("stack.yaml");
        config.polling.timeout_secs = Some(1800);
        config
    }

    #[test]
    fn test_valid_stack_name() {
        assert!(is_valid_stack_name("web"));
        assert!(is_valid_stack_name("Web-Prod-2"));
        assert!(is_valid_stack_name("a"));
    }

    #[test]
    fn test_invalid_stack_name() {
        assert!(!is_valid_stack_name(""));
        assert!(!is_valid_stack_name("2web")); // starts with digit
        assert!(!is_valid_stack_name("web_prod")); // underscore
        assert!(!is_valid_stack_name("web.prod"));
        assert!(!is_valid_stack_name(&"a".repeat(129)));
    }

    #[test]
    fn test_valid_config_passes() {
        let result = ConfigValidator::new()
            .validate(&valid_config())
            .expect("validation failed");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_missing_name_and_template() {
        let result = ConfigValidator::new().check(&DeployConfig::default());

        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["stack.name", "stack.template"]);
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_unknown_capability() {
        let mut config = valid_config();
        config.stack.capabilities = vec![
            String::from("CAPABILITY_IAM"),
            String::from("CAPABILITY_EVERYTHING"),
        ];

        let err = ConfigValidator::new()
            .validate(&config)
            .expect_err("unknown capability must fail");
        assert!(err.to_string().contains("CAPABILITY_EVERYTHING"));
    }

    #[test]
    fn test_parameter_problems() {
        let mut config = valid_config();
        config.stack.parameters = ParametersConfig::List(vec![
            String::from("=orphan"),
            String::from("Env=prod"),
            String::from("Env=dev"),
        ]);

        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "stack.parameters");
    }

    #[test]
    fn test_duplicate_parameter_keys_only_warn() {
        let mut config = valid_config();
        config.stack.parameters =
            ParametersConfig::List(vec![String::from("Env=prod"), String::from("Env=dev")]);

        let result = ConfigValidator::new()
            .validate(&config)
            .expect("duplicate keys must not fail validation");
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].contains("Env"));
    }

    #[test]
    fn test_unrepresentable_polling_values_are_rejected() {
        let mut config = valid_config();
        config.polling.interval_secs = u64::MAX;
        config.polling.timeout_secs = Some(u64::MAX);

        let result = ConfigValidator::new().check(&config);
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["polling.interval_secs", "polling.timeout_secs"]);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config = valid_config();
        config.polling.interval_secs = 0;

        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.errors[0].field, "polling.interval_secs");
    }

    #[test]
    fn test_short_timeout_warns() {
        let mut config = valid_config();
        config.polling.timeout_secs = Some(5);

        let result = ConfigValidator::new().check(&config);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }
}
