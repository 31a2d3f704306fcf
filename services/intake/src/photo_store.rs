use crate::config::StorageConfig;
use crate::pipeline::{BackendError, PhotoStorage};
use crate::ticket::PhotoFile;
use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;
use tracing::{debug, info, instrument, warn};

/// Photo storage backed by an S3-compatible bucket
pub struct S3PhotoStore {
    client: S3Client,
    bucket: String,
    public_url_base: String,
    multipart_threshold: usize,
    part_size: usize,
}

impl S3PhotoStore {
    /// Create a new photo store
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Supabase Storage and MinIO expose their own S3 endpoints
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Photo store initialized"
        );

        Ok(Self::with_client(client, config))
    }

    /// Create a photo store around an already configured client
    pub fn with_client(client: S3Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            public_url_base: config.public_url_base.clone(),
            multipart_threshold: config.multipart_threshold_bytes,
            part_size: config.part_size_bytes.max(1),
        }
    }

    /// Single-part upload for small photos
    async fn simple_upload(&self, path: &str, photo: &PhotoFile, content_type: &str) -> Result<(), BackendError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(photo.data.clone()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(())
    }

    /// Multipart upload for large photos
    async fn multipart_upload(&self, path: &str, photo: &PhotoFile, content_type: &str) -> Result<(), BackendError> {
        let create_response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        let upload_id = create_response
            .upload_id()
            .ok_or_else(|| BackendError::new("No upload ID in multipart upload response"))?;

        let result = self.upload_parts_and_complete(path, photo, upload_id).await;

        if result.is_err() {
            // Parts of an unfinished upload stay in the bucket until aborted
            if let Err(e) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(path)
                .upload_id(upload_id)
                .send()
                .await
            {
                warn!(
                    path = %path,
                    upload_id = %upload_id,
                    error = %DisplayErrorContext(&e),
                    "Failed to abort multipart upload"
                );
            }
        }

        result
    }

    async fn upload_parts_and_complete(
        &self,
        path: &str,
        photo: &PhotoFile,
        upload_id: &str,
    ) -> Result<(), BackendError> {
        let mut completed_parts = Vec::new();

        for (index, chunk) in photo.data.chunks(self.part_size).enumerate() {
            let part_number = index as i32 + 1;

            let upload_part_response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(path)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| backend_error(&e))?;

            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(upload_part_response.e_tag().unwrap_or_default())
                    .build(),
            );
        }

        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(path)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(())
    }
}

#[async_trait]
impl PhotoStorage for S3PhotoStore {
    #[instrument(skip(self, photo), fields(bucket = %self.bucket, size_bytes = photo.data.len()))]
    async fn upload(&self, path: &str, photo: &PhotoFile) -> Result<(), BackendError> {
        let content_type = photo.mime_type();

        if photo.data.len() > self.multipart_threshold {
            self.multipart_upload(path, photo, &content_type).await?;
        } else {
            self.simple_upload(path, photo, &content_type).await?;
        }

        debug!(path = %path, "Photo uploaded");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.public_url_base, &self.bucket, path)
    }
}

/// Public URL of an object: `{base}/{bucket}/{path}`
pub fn public_object_url(base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        bucket.trim_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Flatten an SDK error, including its source chain, into the user-facing message
fn backend_error<E: std::error::Error>(err: &E) -> BackendError {
    BackendError::new(DisplayErrorContext(err).to_string())
}
