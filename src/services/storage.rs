//! S3 storage service for profile attachments.
//!
//! Handles uploads into the fixed attachment bucket and resolves public
//! URLs for stored objects. Supports both AWS S3 and MinIO for development.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tracing::info;

use crate::config::S3Config;
use crate::error::{AppError, AppResult};
use crate::services::profile::BlobStore;

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    public_base_url: Option<String>,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &S3Config) -> AppResult<Self> {
        let credentials =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "hrms");

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        // Use custom endpoint for MinIO in development
        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            public_base_url: config.public_base_url.clone(),
        };

        // Verify bucket exists or create it
        storage.ensure_bucket_exists().await?;

        info!("S3 storage initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!("S3 bucket '{}' exists", self.bucket);
                Ok(())
            }
            Err(e) => {
                // Check if it's a "not found" error
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    info!("S3 bucket '{}' created", self.bucket);
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Get the content type for a file based on its extension.
    pub fn content_type_for_extension(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "pdf" => "application/pdf",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Get a file from S3.
    ///
    /// # Arguments
    /// * `key` - The S3 object key to retrieve
    ///
    /// # Returns
    /// The file contents as bytes and content type
    pub async fn get(&self, key: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("File not found: {}", key))
                } else {
                    AppError::Storage(format!("Failed to get file from S3: {}", service_error))
                }
            })?;

        let content_type = response.content_type().map(String::from);
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok((data, content_type))
    }

    /// Resolve the public URL for a stored key without contacting S3.
    fn resolve_public_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            return format!("{}/{}", base.trim_end_matches('/'), key);
        }
        if let Some(ref endpoint) = self.endpoint {
            // Path-style addressing for MinIO and custom endpoints
            return format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key);
        }
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[async_trait]
impl BlobStore for Storage {
    /// Upload an object to the attachment bucket. Same-key uploads are
    /// last-write-wins overwrites (default S3 collision behavior).
    async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload file to S3: {}", e)))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.resolve_public_url(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage(
        endpoint: Option<&str>,
        public_base_url: Option<&str>,
    ) -> Storage {
        let credentials = Credentials::new("test", "test", None, None, "test");
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Storage {
            client: Client::from_conf(s3_config),
            bucket: "hrms".to_string(),
            region: "us-east-1".to_string(),
            endpoint: endpoint.map(String::from),
            public_base_url: public_base_url.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_public_url_prefers_configured_base() {
        let storage = test_storage(
            Some("http://localhost:9100"),
            Some("https://cdn.example.com/"),
        )
        .await;
        assert_eq!(
            storage.public_url("profiles/u1/a.png"),
            "https://cdn.example.com/profiles/u1/a.png"
        );
    }

    #[tokio::test]
    async fn test_public_url_uses_path_style_for_custom_endpoint() {
        let storage = test_storage(Some("http://localhost:9100"), None).await;
        assert_eq!(
            storage.public_url("profiles/u1/a.png"),
            "http://localhost:9100/hrms/profiles/u1/a.png"
        );
    }

    #[tokio::test]
    async fn test_public_url_falls_back_to_aws_addressing() {
        let storage = test_storage(None, None).await;
        assert_eq!(
            storage.public_url("profiles/u1/a.png"),
            "https://hrms.s3.us-east-1.amazonaws.com/profiles/u1/a.png"
        );
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(Storage::content_type_for_extension("png"), "image/png");
        assert_eq!(Storage::content_type_for_extension("PNG"), "image/png");
        assert_eq!(Storage::content_type_for_extension("jpeg"), "image/jpeg");
        assert_eq!(
            Storage::content_type_for_extension("pdf"),
            "application/pdf"
        );
        assert_eq!(
            Storage::content_type_for_extension("unknown"),
            "application/octet-stream"
        );
    }
}
