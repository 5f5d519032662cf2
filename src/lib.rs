// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # cfn-stack-deploy
//!
//! An idempotent lifecycle driver for a single CloudFormation stack.
//!
//! ## Overview
//!
//! Given a stack name, a template, capabilities, and parameters, a run:
//!
//! - Waits for any operation already in flight to settle
//! - Creates, updates, or deletes the stack depending on where it landed
//! - Waits again and decides whether the run succeeded
//! - Recovers once from a failed first creation by deleting and recreating
//!
//! Running it twice against an up-to-date stack is a no-op.
//!
//! ## Architecture
//!
//! 1. **Status Classifier**: maps a raw stack status to one of five categories
//! 2. **Completion Poller**: re-classifies on an interval until a terminal category
//! 3. **Action Dispatcher**: issues the one API call a category calls for
//! 4. **Orchestrator**: chains wait, act, wait and applies the success rules
//!
//! ## Modules
//!
//! - [`cloudformation`]: API seam, client, classifier, poller, and dispatcher
//! - [`orchestrator`]: Phase chaining and run reports
//! - [`cancel`]: Cancellation signals and deadlines
//! - [`config`]: Configuration parsing and validation
//! - [`template`]: Template loading (local, S3)
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! stack:
//!   name: web-prod
//!   template: infra/web.yaml
//!   capabilities: [CAPABILITY_IAM]
//!   parameters:
//!     Env: prod
//!
//! polling:
//!   interval_secs: 10
//!   timeout_secs: 3600
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cancel;
pub mod cli;
pub mod cloudformation;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use cli::{Cli, Commands, OutputFormatter};
pub use cloudformation::{
    ActionDispatcher, Classification, CloudFormationClient, CompletionPoller, DeploymentRequest,
    StackApi, StatusCategory, StatusClassifier,
};
pub use config::{ConfigParser, ConfigValidator, DeployConfig};
pub use error::{DeployError, Result};
pub use orchestrator::{DeploymentOutcome, DeploymentReport, Orchestrator};
pub use template::{TemplateHasher, TemplateRef, TemplateSource};
