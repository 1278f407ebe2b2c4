//! S3-backed object store
//!
//! One client, one bucket, one set of credentials per run. Static credentials
//! come from the config; when they are absent the AWS default provider chain
//! is used (environment, shared profile, instance metadata) and must resolve
//! before any cache entry runs.
//!
//! Archives larger than [`MULTIPART_THRESHOLD`] are uploaded in parts.

use crate::config::S3Config;
use crate::error::{DepCacheError, DepCacheResult};
use crate::store::ObjectStore;
use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Provider name attached to credentials read from the config file
const CONFIG_CREDENTIALS_PROVIDER: &str = "depcache-config";

/// Archives above this size go through a multipart upload
pub const MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Preferred part size (S3 requires at least 5 MiB for all but the last part)
const PART_SIZE: u64 = 16 * 1024 * 1024;

/// S3 limit on parts per multipart upload
const MAX_PARTS: u64 = 10_000;

/// Byte range sent as one part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartRange {
    number: i32,
    offset: u64,
    length: u64,
}

/// Split `size` bytes into contiguous parts, growing the part size when needed
/// to stay within [`MAX_PARTS`]
fn plan_parts(size: u64) -> Vec<PartRange> {
    let part_size = PART_SIZE.max(size.div_ceil(MAX_PARTS));
    (0..size.div_ceil(part_size))
        .map(|index| {
            let offset = index * part_size;
            PartRange {
                number: (index + 1) as i32,
                offset,
                length: part_size.min(size - offset),
            }
        })
        .collect()
}

fn upload_error(key: &str, message: impl std::fmt::Display) -> DepCacheError {
    DepCacheError::store("upload", key, message.to_string())
}

/// S3 object store bound to a single bucket
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from validated settings
    pub async fn connect(config: &S3Config) -> DepCacheResult<Self> {
        config.validate()?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        let ambient = config.uses_ambient_credentials();
        if ambient {
            debug!("S3 credentials not set, using the default provider chain");
        } else {
            loader = loader.credentials_provider(Credentials::new(
                config.key.clone(),
                config.secret.clone(),
                None,
                None,
                CONFIG_CREDENTIALS_PROVIDER,
            ));
        }

        let shared = loader.load().await;
        if ambient {
            check_ambient_credentials(&shared).await?;
        }
        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            debug!("Using custom S3 endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }

    /// Upload `source` in parts, aborting the upload if any part fails
    async fn upload_multipart(&self, key: &str, source: &Path, size: u64) -> DepCacheResult<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| upload_error(key, DisplayErrorContext(&e)))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| upload_error(key, "multipart upload returned no upload id"))?
            .to_string();

        debug!("{}: multipart upload of {} bytes", key, size);
        let result = self.send_parts(key, source, size, &upload_id).await;
        if result.is_err() {
            if let Err(e) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!(
                    "{}: failed to abort multipart upload: {}",
                    key,
                    DisplayErrorContext(&e)
                );
            }
        }
        result
    }

    async fn send_parts(
        &self,
        key: &str,
        source: &Path,
        size: u64,
        upload_id: &str,
    ) -> DepCacheResult<()> {
        let mut completed = Vec::new();
        for part in plan_parts(size) {
            let body = ByteStream::read_from()
                .path(source)
                .offset(part.offset)
                .length(Length::Exact(part.length))
                .build()
                .await
                .map_err(|e| upload_error(key, e))?;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part.number)
                .body(body)
                .send()
                .await
                .map_err(|e| upload_error(key, DisplayErrorContext(&e)))?;

            completed.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .part_number(part.number)
                    .build(),
            );
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| upload_error(key, DisplayErrorContext(&e)))?;

        Ok(())
    }
}

/// Resolve the default provider chain once so missing credentials fail setup
async fn check_ambient_credentials(shared: &aws_config::SdkConfig) -> DepCacheResult<()> {
    let provider = shared.credentials_provider().ok_or_else(|| {
        DepCacheError::CredentialsUnavailable("no credentials provider configured".to_string())
    })?;
    provider
        .provide_credentials()
        .await
        .map_err(|e| DepCacheError::CredentialsUnavailable(DisplayErrorContext(&e).to_string()))?;
    debug!("Resolved S3 credentials from the default provider chain");
    Ok(())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, key: &str) -> DepCacheResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(DepCacheError::store(
                "exists",
                key,
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn upload(&self, key: &str, source: &Path) -> DepCacheResult<()> {
        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| DepCacheError::io(format!("reading {}", source.display()), e))?
            .len();
        if size > MULTIPART_THRESHOLD {
            return self.upload_multipart(key, source, size).await;
        }

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| upload_error(key, e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(key, DisplayErrorContext(&e)))?;

        Ok(())
    }

    async fn download(&self, key: &str, dest: &Path) -> DepCacheResult<()> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                DepCacheError::store("download", key, DisplayErrorContext(&e).to_string())
            })?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DepCacheError::io(format!("creating {}", dest.display()), e))?;
        let mut body = object.body.into_async_read();
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| DepCacheError::store("download", key, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| DepCacheError::io(format!("writing {}", dest.display()), e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> DepCacheResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| DepCacheError::store("delete", key, DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
