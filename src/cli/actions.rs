//! Step outputs for CI action runners.
//!
//! When the `GITHUB_OUTPUT` file is set, the final stack status and the run's
//! message are appended to it so later workflow steps can read them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// Environment variable naming the step output file.
pub const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";

/// Writer for `key=value` step outputs.
#[derive(Debug, Clone)]
pub struct ActionOutputs {
    /// Output file appended to.
    path: PathBuf,
}

impl ActionOutputs {
    /// Creates a writer for the given output file.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a writer from `GITHUB_OUTPUT`, if it is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var_os(OUTPUT_FILE_VAR)
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }

    /// Appends one output.
    ///
    /// Multiline values use the delimited form so they survive intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be opened or written.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if value.contains('\n') {
            let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
            writeln!(file, "{key}<<{delimiter}")?;
            writeln!(file, "{value}")?;
            writeln!(file, "{delimiter}")?;
        } else {
            writeln!(file, "{key}={value}")?;
        }

        debug!("Set step output {key}");
        Ok(())
    }

    /// Appends the `status` and `message` outputs of a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be written.
    pub fn set_outcome(&self, status: &str, message: &str) -> Result<()> {
        self.set("status", status)?;
        self.set("message", message)
    }
}
