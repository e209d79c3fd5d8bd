//! Object storage adapter
//!
//! Binary assets (avatars, resumes, banners, icons) live in an S3-compatible
//! bucket. A stored object is described by a [`StoredAsset`]: the object key
//! used to delete it later and the public URL used to render it.
//!
//! Every remote call goes through [`RetryPolicy::run`], which bounds each
//! attempt with a timeout and retries transient failures with exponential
//! backoff.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Location of an uploaded asset
///
/// The identifier and the URL are always set together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    /// Key of the object in the bucket
    pub storage_id: String,
    /// Publicly retrievable URL
    pub url: String,
}

/// Remote object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file under `folder`, optionally with a chosen name
    async fn upload(
        &self,
        local_path: &Path,
        folder: &str,
        desired_id: Option<&str>,
    ) -> StorageResult<StoredAsset>;

    /// Delete an object; deleting a missing object succeeds
    async fn delete(&self, storage_id: &str) -> StorageResult<()>;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding every asset
    pub bucket: String,
    /// Base URL the bucket is publicly served from
    pub public_url: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STORAGE_BUCKET`: Bucket name (required)
    /// - `STORAGE_PUBLIC_URL`: Public base URL of the bucket (required)
    /// - `STORAGE_ENDPOINT`: Endpoint of an S3-compatible service (optional)
    /// - `STORAGE_TIMEOUT_SECS`: Per-attempt timeout (default: 30)
    /// - `STORAGE_MAX_RETRIES`: Retries on transient failures (default: 2)
    pub fn from_env() -> StorageResult<Self> {
        let bucket = env::var("STORAGE_BUCKET").map_err(|_| {
            StorageError::Configuration("STORAGE_BUCKET environment variable not set".to_string())
        })?;
        let public_url = env::var("STORAGE_PUBLIC_URL").map_err(|_| {
            StorageError::Configuration(
                "STORAGE_PUBLIC_URL environment variable not set".to_string(),
            )
        })?;
        let endpoint = env::var("STORAGE_ENDPOINT").ok().filter(|s| !s.is_empty());

        let timeout_secs = env::var("STORAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_retries = env::var("STORAGE_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2);

        Ok(Self {
            bucket,
            public_url,
            endpoint,
            timeout_secs,
            max_retries,
        })
    }

    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Timeout and retry rules for remote calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled on every further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Run `call` until it succeeds, fails permanently or runs out of retries
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StorageError::Timeout(self.timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "Storage {} failed (attempt {}/{}): {}",
                        operation,
                        attempt,
                        self.max_retries + 1,
                        e
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delay before retry number `attempt + 1`
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.timeout)
    }
}

/// Build the object key for an upload
///
/// The extension of the local file is kept so the object is served with a
/// sensible type.
pub fn object_key(folder: &str, desired_id: Option<&str>, local_path: &Path) -> String {
    let name = desired_id
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let extension = local_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}/{}{}", folder.trim_matches('/'), name, extension)
}

fn content_type_for(key: &str) -> &'static str {
    let extension = key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// S3-backed object storage
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_url: String,
    retry: RetryPolicy,
}

impl S3Storage {
    /// Create the storage client from configuration and the AWS environment
    pub async fn from_config(config: &StorageConfig) -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        info!("S3 storage initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            retry: config.retry_policy(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        local_path: &Path,
        folder: &str,
        desired_id: Option<&str>,
    ) -> StorageResult<StoredAsset> {
        let key = object_key(folder, desired_id, local_path);
        info!("Uploading asset to S3: {}", key);

        self.retry
            .run("upload", || async {
                let body = ByteStream::from_path(local_path)
                    .await
                    .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

                let output = self
                    .client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key)
                    .body(body)
                    .content_type(content_type_for(&key))
                    .send()
                    .await
                    .map_err(|e| StorageError::Upstream(DisplayErrorContext(e).to_string()))?;

                if output.e_tag().is_none() {
                    return Err(StorageError::Rejected(format!(
                        "upload of {} returned no entity tag",
                        key
                    )));
                }
                Ok(())
            })
            .await?;

        Ok(StoredAsset {
            url: format!("{}/{}", self.public_url, key),
            storage_id: key,
        })
    }

    async fn delete(&self, storage_id: &str) -> StorageResult<()> {
        info!("Deleting asset from S3: {}", storage_id);

        self.retry
            .run("delete", || async {
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(storage_id)
                    .send()
                    .await
                    .map_err(|e| StorageError::Upstream(DisplayErrorContext(e).to_string()))?;
                Ok(())
            })
            .await
    }
}

#[derive(Debug, Default)]
struct MemoryObjects {
    objects: HashMap<String, Vec<u8>>,
    deletes: HashMap<String, u32>,
    fail_uploads: bool,
    fail_deletes: bool,
}

/// In-process object storage
///
/// Records every delete so callers can verify asset lifecycles, and can be
/// told to fail uploads or deletes.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    base_url: String,
    state: Arc<Mutex<MemoryObjects>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://assets")
    }
}

impl MemoryStorage {
    /// Create an empty storage serving URLs under `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(MemoryObjects::default())),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryObjects> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every following upload fail
    pub fn fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    /// Make every following delete fail
    pub fn fail_deletes(&self, fail: bool) {
        self.state().fail_deletes = fail;
    }

    /// Whether an object is currently stored
    pub fn contains(&self, storage_id: &str) -> bool {
        self.state().objects.contains_key(storage_id)
    }

    /// Number of objects currently stored
    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    /// How many times an object was deleted
    pub fn delete_count(&self, storage_id: &str) -> u32 {
        self.state().deletes.get(storage_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        local_path: &Path,
        folder: &str,
        desired_id: Option<&str>,
    ) -> StorageResult<StoredAsset> {
        let content = tokio::fs::read(local_path).await?;

        let mut state = self.state();
        if state.fail_uploads {
            return Err(StorageError::Rejected("upload refused".to_string()));
        }

        let key = object_key(folder, desired_id, local_path);
        state.objects.insert(key.clone(), content);

        Ok(StoredAsset {
            url: format!("{}/{}", self.base_url, key),
            storage_id: key,
        })
    }

    async fn delete(&self, storage_id: &str) -> StorageResult<()> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(StorageError::Upstream("delete refused".to_string()));
        }

        state.objects.remove(storage_id);
        *state.deletes.entry(storage_id.to_string()).or_default() += 1;
        Ok(())
    }
}
