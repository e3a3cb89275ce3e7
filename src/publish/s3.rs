use anyhow::Result as AnyResult;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use tracing::instrument;

use super::{ObjectStore, UploadOptions};
use crate::config::StorageConfig;
use crate::{ProcessorError, Result};

/// Object store for any S3-compatible bucket (AWS S3, Supabase Storage, R2)
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    region: String,
    public_base_url: Option<String>,
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain plus the storage settings
    pub async fn new(config: &StorageConfig) -> AnyResult<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint_url {
            tracing::debug!(endpoint = %endpoint, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            region: config.region.clone(),
            public_base_url: config.public_base_url.clone(),
        })
    }
}

/// Public URL of an object, either under a configured base or the regional S3 host
fn object_url(public_base_url: Option<&str>, region: &str, bucket: &str, path: &str) -> String {
    match public_base_url {
        Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), bucket, path),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, path),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, body, options), fields(size = body.len()))]
    async fn upload(&self, bucket: &str, path: &str, body: Vec<u8>, options: &UploadOptions) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(path)
            .body(body.into())
            .content_type(&options.content_type)
            .cache_control(format!("max-age={}", options.cache_control))
            .send()
            .await
            .map_err(|e| ProcessorError::Storage(format!("{}: {}", path, aws_sdk_s3::error::DisplayErrorContext(e))))?;

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        object_url(self.public_base_url.as_deref(), &self.region, bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_with_public_base() {
        let url = object_url(
            Some("https://abc.supabase.co/storage/v1/object/public/"),
            "us-east-1",
            "youtube_frames",
            "frames/dQw4w9WgXcQ/0.jpg",
        );
        assert_eq!(
            url,
            "https://abc.supabase.co/storage/v1/object/public/youtube_frames/frames/dQw4w9WgXcQ/0.jpg"
        );
    }

    #[test]
    fn test_object_url_defaults_to_s3_host() {
        let url = object_url(None, "eu-west-1", "frames-bucket", "frames/x/1.jpg");
        assert_eq!(url, "https://frames-bucket.s3.eu-west-1.amazonaws.com/frames/x/1.jpg");
    }
}
