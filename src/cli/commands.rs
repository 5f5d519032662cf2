//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DeployConfig, parse_capabilities, parse_parameters};
use crate::error::Result;

/// cfn-deploy - Idempotent CloudFormation stack deployments.
#[derive(Parser, Debug)]
#[command(name = "cfn-deploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "STACK_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log line format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, update, or recover the stack until it settles.
    Deploy {
        /// Stack settings.
        #[command(flatten)]
        stack: StackArgs,

        /// Seconds between status polls.
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Abandon the run after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Classify the stack once and print its status.
    Status {
        /// Stack settings.
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Validate the configuration and template without calling AWS.
    Validate {
        /// Stack settings.
        #[command(flatten)]
        stack: StackArgs,

        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Stack settings that override the configuration file.
#[derive(Args, Debug, Default)]
pub struct StackArgs {
    /// Name of the stack.
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Template file path or `s3://bucket/key`.
    #[arg(long)]
    pub template: Option<String>,

    /// Whitespace-separated capability acknowledgements.
    #[arg(long)]
    pub capabilities: Option<String>,

    /// Whitespace-separated `Key=Value` stack parameters.
    #[arg(long)]
    pub parameters: Option<String>,

    /// AWS region.
    #[arg(long)]
    pub region: Option<String>,
}

impl StackArgs {
    /// Applies the flags that were given on top of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter token lacks `=`.
    pub fn apply_to(&self, config: &mut DeployConfig) -> Result<()> {
        if let Some(name) = &self.stack_name {
            config.stack.name = name.trim().to_string();
        }
        if let Some(template) = &self.template {
            config.stack.template = template.trim().to_string();
        }
        if let Some(capabilities) = &self.capabilities {
            config.stack.capabilities = parse_capabilities(capabilities);
        }
        if let Some(parameters) = &self.parameters {
            config.stack.parameters = parse_parameters(parameters)?;
        }
        if let Some(region) = &self.region {
            config.stack.region = Some(region.clone());
        }
        Ok(())
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log line format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per log line.
    Json,
}
