//! S3-based template backend.
//!
//! Reads templates kept in S3 (or a compatible service), so the same
//! template revision can be deployed from any machine.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{Result, TemplateError};

use super::source::TemplateSource;

/// Template stored as an S3 object.
#[derive(Debug)]
pub struct S3TemplateSource {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Object key.
    key: String,
}

impl S3TemplateSource {
    /// Creates a new S3 template source from the ambient AWS configuration.
    pub async fn new(bucket: &str, key: &str, region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self::with_client(Client::new(&config), bucket, key)
    }

    /// Creates a new S3 template source with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, key: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TemplateSource for S3TemplateSource {
    async fn load(&self) -> Result<String> {
        info!("Loading template from {}", self.location());

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_no_such_key() {
                    return Err(TemplateError::NotFound {
                        location: self.location(),
                    }
                    .into());
                }
                return Err(TemplateError::s3(format!("S3 get error: {service_err}")).into());
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| TemplateError::s3(format!("Failed to read S3 object: {e}")))?;

        let body = String::from_utf8(bytes.to_vec()).map_err(|e| TemplateError::ReadFailed {
            location: self.location(),
            message: format!("Invalid UTF-8: {e}"),
        })?;

        debug!("Read {} bytes of template", body.len());
        Ok(body)
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}
