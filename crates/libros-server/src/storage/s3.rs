use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use std::path::Path;
use tracing::{debug, info, instrument};

use super::{config::StorageConfig, BlobError, BlobResult, BlobStore};

/// Blob store backed by S3 (or MinIO with a custom endpoint and path-style addressing).
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    /// Build a client from explicit settings.
    ///
    /// Static keys are used when both are configured; otherwise credentials come from
    /// the standard AWS provider chain (environment, profile, instance metadata).
    pub async fn connect(config: StorageConfig) -> Self {
        debug!(endpoint = ?config.endpoint, region = %config.region, "Initializing S3 client");

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "libros-storage",
                )),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, dest))]
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> BlobResult<u64> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    BlobError::not_found(bucket, key)
                } else {
                    BlobError::Backend(format!(
                        "get s3://{}/{}: {}",
                        bucket,
                        key,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend(format!("read body of s3://{}/{}: {}", bucket, key, e)))?
            .into_bytes();

        tokio::fs::write(dest, &data).await?;

        debug!(bytes = data.len(), dest = %dest.display(), "Downloaded object");

        Ok(data.len() as u64)
    }

    #[instrument(skip(self, source))]
    async fn upload(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        content_type: &str,
    ) -> BlobResult<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| BlobError::Backend(format!("open {}: {}", source.display(), e)))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                BlobError::Backend(format!(
                    "put s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Uploaded s3://{}/{}", bucket, key);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                BlobError::Backend(format!(
                    "delete s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Deleted s3://{}/{}", bucket, key);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn content_type(&self, bucket: &str, key: &str) -> BlobResult<Option<String>> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if missing {
                    BlobError::not_found(bucket, key)
                } else {
                    BlobError::Backend(format!(
                        "head s3://{}/{}: {}",
                        bucket,
                        key,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        Ok(response.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_with_static_keys() {
        let _store = S3BlobStore::connect(StorageConfig::for_minio("http://localhost:9000")).await;
        // Client is built without touching the network
    }
}
