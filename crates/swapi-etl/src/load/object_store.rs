use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::parquet::{encode, PARQUET_CONTENT_TYPE};
use super::LayerPaths;
use crate::config::StorageConfig;
use crate::error::{EtlError, Result};
use crate::table::Table;
use crate::transform::GoldTables;

/// Destination for encoded layer files, addressed by object key.
#[async_trait]
pub trait LayerWriter: Send + Sync {
    /// Write `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult>;

    /// Human readable location of `key`, for logs.
    fn location(&self, key: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// S3-compatible bucket client (Cloud Storage through its interoperability
/// endpoint, MinIO, or S3 itself).
#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
}

impl ObjectStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let missing = |name: &str| EtlError::storage(format!("{} is not configured", name));
        let bucket = config.bucket.clone().ok_or_else(|| missing("GCS_BUCKET"))?;
        let access_key = config
            .access_key
            .as_deref()
            .ok_or_else(|| missing("STORAGE_ACCESS_KEY"))?;
        let secret_key = config
            .secret_key
            .as_deref()
            .ok_or_else(|| missing("STORAGE_SECRET_KEY"))?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "swapi-etl");

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(bucket = %bucket, endpoint = ?config.endpoint, "Storage client initialized");

        Ok(Self { client, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, data))]
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<UploadResult> {
        let checksum = calculate_sha256(&data);
        let size = data.len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.map_err(|e| {
            EtlError::storage(format!(
                "failed to upload s3://{}/{}: {}",
                self.bucket,
                key,
                DisplayErrorContext(&e)
            ))
        })?;

        info!("Uploaded s3://{}/{}", self.bucket, key);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }
}

#[async_trait]
impl LayerWriter for ObjectStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult> {
        self.upload(key, data, Some(PARQUET_CONTENT_TYPE)).await
    }

    fn location(&self, key: &str) -> String {
        LayerPaths::gs_uri(&self.bucket, key)
    }
}

/// Writes layer files below a local directory, mirroring the bucket layout.
#[derive(Debug, Clone)]
pub struct LocalLayerWriter {
    root: PathBuf,
}

impl LocalLayerWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl LayerWriter for LocalLayerWriter {
    #[instrument(skip(self, data))]
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<UploadResult> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let checksum = calculate_sha256(&data);
        let size = data.len() as i64;
        tokio::fs::write(&path, data).await?;

        info!("Wrote {} bytes to {}", size, path.display());

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    fn location(&self, key: &str) -> String {
        self.path_of(key).display().to_string()
    }
}

/// Encode and write the bronze, silver and gold layers.
///
/// Returns one [`UploadResult`] per file, bronze first.
pub async fn write_layers(
    writer: &dyn LayerWriter,
    paths: &LayerPaths,
    bronze: &Table,
    silver: &Table,
    gold: &GoldTables,
) -> Result<Vec<UploadResult>> {
    let mut files: Vec<(String, &Table)> = vec![(paths.bronze(), bronze), (paths.silver(), silver)];
    files.extend(gold.iter().map(|table| (paths.gold(table.name()), table)));

    let mut written = Vec::with_capacity(files.len());
    for (key, table) in files {
        info!(
            table = table.name(),
            rows = table.num_rows(),
            location = %writer.location(&key),
            "Writing layer file"
        );
        written.push(writer.put(&key, encode(table)?).await?);
    }

    Ok(written)
}

fn calculate_sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
