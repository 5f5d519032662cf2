//! CloudFormation integration module.
//!
//! This module provides everything needed to drive one stack through its
//! lifecycle: the API client, the status classifier, the completion poller,
//! and the action dispatcher.

mod api;
mod classifier;
mod client;
mod dispatcher;
mod poller;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use api::StackApi;
pub use classifier::StatusClassifier;
pub use client::CloudFormationClient;
pub use dispatcher::ActionDispatcher;
pub use poller::{CompletionPoller, DEFAULT_POLL_INTERVAL_SECS};
pub use types::{
    Classification, DeploymentRequest, OperationHandle, OperationKind, ROLLBACK_COMPLETE,
    StackParameter, StatusCategory, UPDATE_ROLLBACK_COMPLETE,
};
