//! Error types for the stack deployment system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, template loading, the CloudFormation API, and the
//! orchestrator's own fatal outcomes.

use std::path::PathBuf;
use thiserror::Error;

/// Label used in place of a raw status when the stack does not exist.
pub const NONEXISTENT_STATUS: &str = "NONEXISTENT";

/// The main error type for the stack deployment system.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template loading errors.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// CloudFormation API errors.
    #[error("CloudFormation API error: {0}")]
    Api(#[from] ApiError),

    /// The stack sits in a failure state that needs manual remediation.
    #[error("Stack {stack_name} is in the {status} state. Fix that before trying to deploy again")]
    TerminalFailureState {
        /// Name of the stack.
        stack_name: String,
        /// Raw status reported by CloudFormation.
        status: String,
    },

    /// An operation settled on something other than success or the recovery signal.
    #[error("Stack {stack_name} deployment failed in phase {phase} with status {status}")]
    MidFlightInconsistency {
        /// Name of the stack.
        stack_name: String,
        /// Raw status (or `NONEXISTENT`) observed when the phase settled.
        status: String,
        /// Phase in which the inconsistency was observed.
        phase: u8,
    },

    /// The run was cancelled before it could finish.
    #[error("Deployment of stack {stack_name} cancelled: {reason}")]
    Cancelled {
        /// Name of the stack.
        stack_name: String,
        /// Why the run stopped.
        reason: CancelReason,
        /// Last status observed before cancellation, if any.
        last_status: Option<String>,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// An external cancellation signal fired.
    Signal,
    /// The overall deadline for the run passed.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal => write!(f, "cancellation requested"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required input was not supplied by any configuration layer.
    #[error("Missing required input: {name}")]
    MissingInput {
        /// Name of the missing input.
        name: String,
    },

    /// A stack parameter was not in `Key=Value` form.
    #[error("Invalid stack parameter '{token}': expected Key=Value")]
    InvalidParameter {
        /// The offending token.
        token: String,
    },
}

/// Template loading errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template does not exist at the given location.
    #[error("Template not found: {location}")]
    NotFound {
        /// Where the template was looked up.
        location: String,
    },

    /// The template reference could not be understood.
    #[error("Invalid template reference: {reference}")]
    InvalidReference {
        /// The reference as supplied.
        reference: String,
    },

    /// The template could not be read.
    #[error("Failed to read template {location}: {message}")]
    ReadFailed {
        /// Where the template was read from.
        location: String,
        /// Description of the failure.
        message: String,
    },

    /// S3 backend error.
    #[error("S3 template backend error: {message}")]
    S3Error {
        /// Description of the S3 error.
        message: String,
    },
}

/// CloudFormation API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The stack does not exist.
    #[error("Stack {stack_name} does not exist")]
    StackNotFound {
        /// Name of the stack.
        stack_name: String,
    },

    /// The update would not change anything.
    #[error("No updates are to be performed on stack {stack_name}")]
    NoUpdates {
        /// Name of the stack.
        stack_name: String,
    },

    /// A request failed for any other reason.
    #[error("{operation} failed: {message}")]
    RequestFailed {
        /// API operation that failed.
        operation: String,
        /// Error message from the API or transport.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from CloudFormation: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

/// Message fragment CloudFormation uses when a stack is absent.
const NOT_FOUND_MARKER: &str = "does not exist";

/// Message CloudFormation returns for an update with no changes.
const NO_UPDATES_MARKER: &str = "No updates are to be performed";

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the stack status this error is about, if one was observed.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::TerminalFailureState { status, .. }
            | Self::MidFlightInconsistency { status, .. } => Some(status),
            Self::Cancelled { last_status, .. } => last_status.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the run was cancelled rather than failed.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Builds a cancellation error for a stack.
    #[must_use]
    pub fn cancelled(stack_name: &str, reason: CancelReason, last_status: Option<&str>) -> Self {
        Self::Cancelled {
            stack_name: stack_name.to_string(),
            reason,
            last_status: last_status.map(String::from),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl TemplateError {
    /// Creates an S3 error with the given message.
    #[must_use]
    pub fn s3(message: impl Into<String>) -> Self {
        Self::S3Error {
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Classifies an error message returned by CloudFormation.
    ///
    /// CloudFormation reports both a missing stack and an empty update as a
    /// generic `ValidationError`, so the message text is the only signal.
    #[must_use]
    pub fn from_message(operation: &str, stack_name: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        if message.contains(NOT_FOUND_MARKER) {
            Self::StackNotFound {
                stack_name: stack_name.to_string(),
            }
        } else if message.contains(NO_UPDATES_MARKER) {
            Self::NoUpdates {
                stack_name: stack_name.to_string(),
            }
        } else {
            Self::RequestFailed {
                operation: operation.to_string(),
                message,
            }
        }
    }
}
