//! Types shared by the classifier, poller, dispatcher and orchestrator.

use serde::Serialize;

use crate::error::NONEXISTENT_STATUS;

/// Status of a stack whose first creation failed and rolled back.
pub const ROLLBACK_COMPLETE: &str = "ROLLBACK_COMPLETE";

/// Status of a stack whose last update failed and rolled back.
pub const UPDATE_ROLLBACK_COMPLETE: &str = "UPDATE_ROLLBACK_COMPLETE";

/// Marker contained in every failure-terminal status.
const FAILED_MARKER: &str = "_FAILED";

/// Suffix of every success-terminal status.
const COMPLETE_SUFFIX: &str = "_COMPLETE";

/// Orchestration category derived from a raw stack status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
    /// The stack does not exist.
    Nonexistent,
    /// The stack failed its first creation and must be deleted before retrying.
    RecoverableFailure,
    /// The stack settled successfully.
    TerminalSuccess,
    /// The stack settled in a failure state that needs manual remediation.
    TerminalFailure,
    /// An operation is still running.
    InProgress,
}

impl StatusCategory {
    /// Classifies the raw status of an existing stack.
    ///
    /// Rules are evaluated in a fixed order: failure-terminal, then
    /// success-terminal, then recoverable failure, otherwise in progress.
    /// The success pattern excludes `ROLLBACK_COMPLETE`, so exactly one
    /// category applies to any status.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        if status.contains(FAILED_MARKER) {
            Self::TerminalFailure
        } else if status.ends_with(COMPLETE_SUFFIX) && status != ROLLBACK_COMPLETE {
            Self::TerminalSuccess
        } else if status == ROLLBACK_COMPLETE {
            Self::RecoverableFailure
        } else {
            Self::InProgress
        }
    }

    /// Returns true if polling should stop at this category.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Returns the category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nonexistent => "NONEXISTENT",
            Self::RecoverableFailure => "RECOVERABLE_FAILURE",
            Self::TerminalSuccess => "TERMINAL_SUCCESS",
            Self::TerminalFailure => "TERMINAL_FAILURE",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category together with the raw status it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Derived category.
    pub category: StatusCategory,
    /// Raw status, absent when the stack does not exist.
    pub raw_status: Option<String>,
}

impl Classification {
    /// Classification of a stack that does not exist.
    #[must_use]
    pub const fn nonexistent() -> Self {
        Self {
            category: StatusCategory::Nonexistent,
            raw_status: None,
        }
    }

    /// Classifies a raw status reported for an existing stack.
    #[must_use]
    pub fn from_status(status: impl Into<String>) -> Self {
        let status = status.into();
        Self {
            category: StatusCategory::from_status(&status),
            raw_status: Some(status),
        }
    }

    /// Returns the raw status, or `NONEXISTENT` when there is none.
    #[must_use]
    pub fn status_label(&self) -> &str {
        self.raw_status.as_deref().unwrap_or(NONEXISTENT_STATUS)
    }
}

/// A single stack parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackParameter {
    /// Parameter name.
    pub key: String,
    /// Parameter value.
    pub value: String,
}

impl StackParameter {
    /// Creates a new parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything needed to create or update one stack.
///
/// Built once per run and never modified while the orchestrator holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    /// Name of the target stack.
    pub stack_name: String,
    /// Full template text.
    pub template_body: String,
    /// Acknowledged capabilities, in order.
    pub capabilities: Vec<String>,
    /// Stack parameters, in order. Duplicate keys are passed through.
    pub parameters: Vec<StackParameter>,
}

impl DeploymentRequest {
    /// Creates a request with no capabilities or parameters.
    #[must_use]
    pub fn new(stack_name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_body: template_body.into(),
            capabilities: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Sets the acknowledged capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the stack parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<StackParameter>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Mutating operation issued against a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// `CreateStack`.
    Create,
    /// `UpdateStack`.
    Update,
    /// `DeleteStack`.
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Handle returned once a mutating operation has been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationHandle {
    /// Operation that was issued.
    pub kind: OperationKind,
    /// Name of the stack.
    pub stack_name: String,
    /// Stack ID returned by CloudFormation, if any.
    pub stack_id: Option<String>,
    /// True when an update had nothing to change.
    pub no_op: bool,
}

impl OperationHandle {
    /// Creates a handle for an accepted operation.
    #[must_use]
    pub fn new(kind: OperationKind, stack_name: impl Into<String>) -> Self {
        Self {
            kind,
            stack_name: stack_name.into(),
            stack_id: None,
            no_op: false,
        }
    }

    /// Creates a handle for an update that changed nothing.
    #[must_use]
    pub fn no_op_update(stack_name: impl Into<String>) -> Self {
        Self {
            no_op: true,
            ..Self::new(OperationKind::Update, stack_name)
        }
    }

    /// Sets the stack ID.
    #[must_use]
    pub fn with_stack_id(mut self, stack_id: Option<String>) -> Self {
        self.stack_id = stack_id;
        self
    }

    /// Returns true if this was an update the control plane actually applied.
    #[must_use]
    pub const fn is_applied_update(&self) -> bool {
        matches!(self.kind, OperationKind::Update) && !self.no_op
    }
}
