//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cloudformation::{Classification, StatusCategory};
use crate::config::{DeployConfig, ValidationResult};
use crate::error::DeployError;
use crate::orchestrator::DeploymentReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack status row for table display.
#[derive(Tabled)]
struct StackStatusRow {
    #[tabled(rename = "Stack")]
    stack: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Next action")]
    next_action: String,
}

/// Details about a loaded template for the validation summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateSummary {
    /// Where the template was read from.
    pub location: String,
    /// Size of the template body in bytes.
    pub bytes: usize,
    /// SHA-256 digest of the template body.
    pub digest: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the report of a finished deployment.
    #[must_use]
    pub fn format_report(&self, report: &DeploymentReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let headline = if report.outcome.is_no_op() {
                    format!("{} Stack {} is up to date", "✓".green(), report.outcome.stack_name)
                } else if report.outcome.recovered() {
                    format!(
                        "{} Stack {} recreated after a failed create",
                        "✓".green(),
                        report.outcome.stack_name
                    )
                } else {
                    format!("{} Stack {} deployed", "✓".green(), report.outcome.stack_name)
                };

                let mut output = format!("{headline}\n\n");
                for line in report.to_string().lines() {
                    let _ = writeln!(output, "   {line}");
                }
                output
            }
        }
    }

    /// Formats a failed or cancelled run.
    #[must_use]
    pub fn format_failure(&self, error: &DeployError) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "status": if error.is_cancelled() { "cancelled" } else { "failed" },
                    "stack_status": error.status(),
                    "message": error.to_string(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                if error.is_cancelled() {
                    format!("{} {error}\n", "⚠".yellow())
                } else {
                    format!("{} {error}\n", "✗".red())
                }
            }
        }
    }

    /// Formats a single stack classification.
    #[must_use]
    pub fn format_status(&self, stack_name: &str, classification: &Classification) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "stack": stack_name,
                    "status": classification.status_label(),
                    "category": classification.category,
                    "next_action": Self::next_action(classification),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let row = StackStatusRow {
                    stack: stack_name.to_string(),
                    status: classification.status_label().to_string(),
                    category: Self::format_category(classification.category),
                    next_action: Self::next_action(classification).to_string(),
                };

                let mut output = Table::new([row]).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats the outcome of `validate`.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &DeployConfig,
        result: &ValidationResult,
        template: Option<&TemplateSummary>,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                    "stack": config.stack.name,
                    "template": template,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();

                if result.is_valid() {
                    let _ = writeln!(output, "{} Configuration is valid!", "✓".green());
                } else {
                    let _ = writeln!(
                        output,
                        "{} {} validation error(s):",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Stack: {}", config.stack.name);
                let _ = writeln!(output, "   Template: {}", config.stack.template);
                let _ = writeln!(
                    output,
                    "   Region: {}",
                    config.stack.region.as_deref().unwrap_or("(AWS default)")
                );
                let _ = writeln!(
                    output,
                    "   Capabilities: {}",
                    if config.stack.capabilities.is_empty() {
                        String::from("none")
                    } else {
                        config.stack.capabilities.join(" ")
                    }
                );
                let _ = writeln!(output, "   Poll interval: {}s", config.polling.interval_secs);

                if let Some(template) = template {
                    let _ = writeln!(
                        output,
                        "   Template size: {} bytes (sha256 {})",
                        template.bytes,
                        Self::truncate(&template.digest, 12)
                    );
                }

                output
            }
        }
    }

    /// What the orchestrator would do first for this classification.
    const fn next_action(classification: &Classification) -> &'static str {
        match classification.category {
            StatusCategory::Nonexistent => "create",
            StatusCategory::TerminalSuccess => "update",
            StatusCategory::RecoverableFailure => "delete, then create",
            StatusCategory::InProgress => "wait, then decide",
            StatusCategory::TerminalFailure => "none (manual fix required)",
        }
    }

    /// Formats a category with color.
    fn format_category(category: StatusCategory) -> String {
        match category {
            StatusCategory::TerminalSuccess => category.as_str().green().to_string(),
            StatusCategory::InProgress | StatusCategory::RecoverableFailure => {
                category.as_str().yellow().to_string()
            }
            StatusCategory::TerminalFailure => category.as_str().red().to_string(),
            StatusCategory::Nonexistent => category.as_str().dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        s.chars().take(max_len).collect()
    }
}
