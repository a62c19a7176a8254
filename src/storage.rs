use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// Presigned upload URLs stay valid for ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// Bucket an upload is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Public profile pictures.
    Avatars,
    /// Private identity documents reviewed for the verification badge.
    Documents,
}

/// StorageService
///
/// Contract with the object storage. Swapped for [`MockStorageService`] in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured buckets if missing. Only used against local MinIO.
    async fn ensure_buckets_exist(&self);

    /// Signed URL allowing the browser to PUT one object of `content_type` under `key`.
    async fn get_presigned_upload_url(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// AWS SDK client against an S3-compatible gateway: MinIO locally, Supabase Storage
/// in production. Both require path-style addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    avatars_bucket: String,
    documents_bucket: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        avatars_bucket: &str,
        documents_bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            avatars_bucket: avatars_bucket.to_string(),
            documents_bucket: documents_bucket.to_string(),
        }
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Avatars => &self.avatars_bucket,
            Bucket::Documents => &self.documents_bucket,
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_buckets_exist(&self) {
        for bucket in [&self.avatars_bucket, &self.documents_bucket] {
            // CreateBucket on an existing bucket fails harmlessly.
            if let Err(e) = self.client.create_bucket().bucket(bucket).send().await {
                tracing::debug!(bucket = %bucket, error = %e, "create_bucket skipped");
            }
        }
    }

    async fn get_presigned_upload_url(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            // The signature covers Content-Type, so the upload must match it.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so user-supplied names cannot escape a prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Extension of an uploaded file name, lowercased and limited to alphanumerics.
pub fn upload_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// MockStorageService
///
/// Returns deterministic local URLs; `new_failing` simulates an unreachable gateway.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_buckets_exist(&self) {}

    async fn get_presigned_upload_url(
        &self,
        bucket: Bucket,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let bucket_name = match bucket {
            Bucket::Avatars => "mock-avatars",
            Bucket::Documents => "mock-documents",
        };
        Ok(format!(
            "http://localhost:9000/{}/{}?signature=fake",
            bucket_name,
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
