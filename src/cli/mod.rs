//! CLI module for the stack deployment tool.
//!
//! This module provides the command-line interface, output formatting,
//! and CI step outputs.

mod actions;
mod commands;
mod output;

pub use actions::{ActionOutputs, OUTPUT_FILE_VAR};
pub use commands::{Cli, Commands, LogFormat, OutputFormat, StackArgs};
pub use output::{OutputFormatter, TemplateSummary};
