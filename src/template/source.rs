//! Template source trait definition.
//!
//! This module defines the common interface for template backends and the
//! reference syntax that selects one.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{Result, TemplateError};

use super::local::LocalTemplateSource;
use super::s3::S3TemplateSource;

/// URL scheme for S3-hosted templates.
const S3_SCHEME: &str = "s3://";

/// Trait for template storage backends.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Loads the full template text.
    async fn load(&self) -> Result<String>;

    /// Human-readable location of the template.
    fn location(&self) -> String;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Parsed reference to a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An object in S3.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
}

impl TemplateRef {
    /// Parses a template reference: `s3://bucket/key` or a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is empty or an S3 URL lacks a bucket or key.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(TemplateError::InvalidReference {
                reference: reference.to_string(),
            }
            .into());
        }

        let Some(rest) = reference.strip_prefix(S3_SCHEME) else {
            return Ok(Self::Local(PathBuf::from(reference)));
        };

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(TemplateError::InvalidReference {
                reference: reference.to_string(),
            }
            .into()),
        }
    }

    /// Resolves a relative local path against `base_dir`.
    #[must_use]
    pub fn relative_to(self, base_dir: &Path) -> Self {
        match self {
            Self::Local(path) if path.is_relative() => Self::Local(base_dir.join(path)),
            other => other,
        }
    }

    /// Opens the backend for this reference.
    pub async fn open(&self, region: Option<&str>) -> Box<dyn TemplateSource> {
        match self {
            Self::Local(path) => Box::new(LocalTemplateSource::new(path)),
            Self::S3 { bucket, key } => Box::new(S3TemplateSource::new(bucket, key, region).await),
        }
    }
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::S3 { bucket, key } => write!(f, "{S3_SCHEME}{bucket}/{key}"),
        }
    }
}
