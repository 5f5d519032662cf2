//! Local file-based template backend.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, TemplateError};

use super::source::TemplateSource;

/// Template stored on the local filesystem.
#[derive(Debug)]
pub struct LocalTemplateSource {
    /// Path to the template file.
    path: PathBuf,
}

impl LocalTemplateSource {
    /// Creates a new local template source.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TemplateSource for LocalTemplateSource {
    async fn load(&self) -> Result<String> {
        info!("Loading template from: {}", self.path.display());

        if !self.path.exists() {
            return Err(TemplateError::NotFound {
                location: self.location(),
            }
            .into());
        }

        let body = fs::read_to_string(&self.path).await.map_err(|e| {
            TemplateError::ReadFailed {
                location: self.location(),
                message: e.to_string(),
            }
        })?;

        debug!("Read {} bytes of template", body.len());
        Ok(body)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_template() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("stack.yaml");
        std::fs::write(&path, "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n")
            .expect("Failed to write template");

        let body = LocalTemplateSource::new(&path)
            .load()
            .await
            .expect("Failed to load template");

        assert!(body.contains("AWS::S3::Bucket"));
    }

    #[tokio::test]
    async fn test_missing_template() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = LocalTemplateSource::new(temp_dir.path().join("missing.yaml"));

        let err = source.load().await.expect_err("missing template must fail");
        assert!(matches!(err, DeployError::Template(TemplateError::NotFound { .. })));
        assert_eq!(source.backend_type(), "local");
    }

    #[tokio::test]
    async fn test_non_utf8_template() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("binary.yaml");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).expect("Failed to write template");

        let err = LocalTemplateSource::new(&path)
            .load()
            .await
            .expect_err("binary template must fail");
        assert!(matches!(err, DeployError::Template(TemplateError::ReadFailed { .. })));
    }
}
