use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, retry::RetryConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl},
};
use aws_types::region::Region;
use chrono::{DateTime, Datelike, Utc};
use tracing::{error, info, warn};

use super::{ObjectStorage, Storage, StorageError, StorageResult, UploadLimits};
use crate::{
    config::Config,
    models::{
        BackendKind, FilePayload, FileStats, Location, ObjectKey, StorageStats, UploadedFile,
        UploadedThumbnail,
    },
    utils::{generate_file_name, metadata_value, normalize_category},
};

// S3-compatible object storage (AWS S3 or MinIO)
#[derive(Clone)]
pub struct CloudStorage {
    client: Option<Client>, // None while cloud storage is disabled
    bucket: String,
    region: String,
    endpoint: Option<String>, // Custom endpoint, set for MinIO
    cloudfront_domain: Option<String>,
    limits: UploadLimits,
}

impl CloudStorage {
    /// Builds the S3 client from config. No client is created when cloud storage is disabled.
    pub async fn new(config: &Config) -> Self {
        let endpoint = if config.use_minio {
            config.minio_endpoint.clone()
        } else {
            None
        };

        let client = if config.enable_cloud_storage {
            Some(Self::build_client(config, endpoint.as_deref()).await)
        } else {
            None
        };

        Self {
            client,
            bucket: config.s3_bucket_name.clone().unwrap_or_default(),
            region: config.aws_region.clone(),
            endpoint,
            cloudfront_domain: config.cloudfront_domain.clone(),
            limits: config.upload_limits(),
        }
    }

    async fn build_client(config: &Config, endpoint: Option<&str>) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .retry_config(RetryConfig::disabled());

        // Custom endpoint (MinIO) uses its own credentials
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
            if let (Some(access_key), Some(secret_key)) =
                (&config.minio_access_key, &config.minio_secret_key)
            {
                loader = loader.credentials_provider(Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "minio",
                ));
            }
        } else if let (Some(access_key), Some(secret_key)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "config",
            ));
        }

        let sdk_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(endpoint.is_some()) // Required for MinIO
                .build(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Checks that the bucket exists and tries to create it otherwise. Only logs.
    pub async fn ensure_bucket_exists(&self) {
        let Some(client) = &self.client else {
            return;
        };

        if client.head_bucket().bucket(&self.bucket).send().await.is_ok() {
            info!(bucket = %self.bucket, "Bucket exists");
            return;
        }

        let mut request = client.create_bucket().bucket(&self.bucket);
        if self.endpoint.is_none() && self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => info!(bucket = %self.bucket, "Bucket created successfully"),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("BucketAlreadyOwnedByYou")
                    || err_msg.contains("BucketAlreadyExists")
                {
                    info!(bucket = %self.bucket, "Bucket already exists");
                } else {
                    error!(
                        error = %err_msg,
                        bucket = %self.bucket,
                        "Bucket does not exist and cannot be created"
                    );
                }
            }
        }
    }

    /// Public URL of an object: path-style against a custom endpoint, virtual-hosted on AWS.
    pub fn object_url(&self, key: &ObjectKey) -> String {
        let path = encode_key(key);
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                path
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, path
            ),
        }
    }

    fn enabled_client(&self) -> StorageResult<&Client> {
        self.client.as_ref().ok_or(StorageError::CloudDisabled)
    }

    async fn put_object(
        &self,
        client: &Client,
        key: &ObjectKey,
        payload: &FilePayload,
        metadata: Vec<(&'static str, String)>,
    ) -> StorageResult<()> {
        let start = Instant::now();
        let size = payload.size();

        let mut request = client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(ByteStream::from(payload.data.clone()))
            .content_type(&payload.mime_type)
            .acl(ObjectCannedAcl::PublicRead);
        for (name, value) in metadata {
            request = request.metadata(name, value);
        }

        request.send().await.map_err(|e| {
            error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Cloud storage upload failed"
            );
            StorageError::UploadError(format!("Failed to upload {} to cloud storage", key))
        })?;

        info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cloud storage upload successful"
        );
        Ok(())
    }
}

/// Key layout: `<directory>/<year>/<month>/<file_name>`, month not zero-padded.
pub fn object_key(directory: &str, file_name: &str, at: DateTime<Utc>) -> ObjectKey {
    ObjectKey::new(format!(
        "{}/{}/{}/{}",
        directory,
        at.year(),
        at.month(),
        file_name
    ))
}

/// Percent-encodes each segment of a key, leaving the `/` separators intact.
fn encode_key(key: &ObjectKey) -> String {
    key.as_str()
        .split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn to_utc(timestamp: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[async_trait]
impl Storage for CloudStorage {
    async fn upload_file(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedFile> {
        let client = self.enabled_client()?;
        self.limits.check_file(payload)?;
        let category = normalize_category(category)?;

        let now = Utc::now();
        let file_name = generate_file_name(&payload.original_name);
        let key = object_key(&category, &file_name, now);

        self.put_object(
            client,
            &key,
            payload,
            vec![
                ("original-name", metadata_value(&payload.original_name)),
                ("upload-date", now.to_rfc3339()),
            ],
        )
        .await?;

        Ok(UploadedFile {
            file_name,
            original_name: payload.original_name.clone(),
            location: Location::Cloud {
                url: self.object_url(&key),
                key,
            },
        })
    }

    async fn upload_thumbnail(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedThumbnail> {
        let client = self.enabled_client()?;
        self.limits.check_thumbnail(payload)?;
        let category = normalize_category(category)?;

        let file_name = generate_file_name(&payload.original_name);
        let key = object_key(&format!("{}-thumbnails", category), &file_name, Utc::now());

        self.put_object(
            client,
            &key,
            payload,
            vec![("original-name", metadata_value(&payload.original_name))],
        )
        .await?;

        Ok(UploadedThumbnail {
            file_name,
            location: Location::Cloud {
                url: self.object_url(&key),
                key,
            },
        })
    }

    async fn delete_file(&self, location: &Location) -> bool {
        match location.key() {
            Some(key) => self.delete_object(key).await,
            None => {
                warn!(url = location.url(), "Cannot delete a cloud object without its key");
                false
            }
        }
    }

    async fn get_file_stats(&self, location: &Location) -> Option<FileStats> {
        self.object_stats(location.key()?).await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }
}

#[async_trait]
impl ObjectStorage for CloudStorage {
    async fn delete_object(&self, key: &ObjectKey) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        match client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, key = %key, "File deleted from cloud storage");
                true
            }
            Err(e) => {
                error!(error = %e, bucket = %self.bucket, key = %key, "Cloud storage delete error");
                false
            }
        }
    }

    async fn signed_url(&self, key: &ObjectKey, expires_in: Duration) -> Option<String> {
        let client = self.client.as_ref()?;

        let presigning = match PresigningConfig::expires_in(expires_in) {
            Ok(presigning) => presigning,
            Err(e) => {
                error!(error = %e, key = %key, "Invalid signed URL expiry");
                return None;
            }
        };

        match client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning)
            .await
        {
            Ok(request) => Some(request.uri().to_string()),
            Err(e) => {
                error!(error = %e, bucket = %self.bucket, key = %key, "Error generating signed URL");
                None
            }
        }
    }

    async fn object_stats(&self, key: &ObjectKey) -> Option<FileStats> {
        let client = self.client.as_ref()?;

        match client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(head) => Some(FileStats {
                size: head.content_length().unwrap_or(0).max(0) as u64,
                created_at: None,
                modified_at: head.last_modified().and_then(to_utc),
                content_type: head.content_type().map(str::to_owned),
            }),
            Err(e) => {
                error!(error = %e, bucket = %self.bucket, key = %key, "Error getting file stats");
                None
            }
        }
    }

    async fn list_files(&self, prefix: &str, max_keys: i32) -> Vec<String> {
        let Some(client) = &self.client else {
            return Vec::new();
        };

        match client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
        {
            Ok(page) => page
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_owned))
                .collect(),
            Err(e) => {
                error!(error = %e, bucket = %self.bucket, prefix, "Error listing files");
                Vec::new()
            }
        }
    }

    async fn storage_stats(&self) -> StorageStats {
        let Some(client) = &self.client else {
            return StorageStats::default();
        };

        let start = Instant::now();
        let mut stats = StorageStats::default();
        let mut continuation_token: Option<String> = None;
        let mut pages = 0u64;

        loop {
            let page = match client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        error = %e,
                        bucket = %self.bucket,
                        pages,
                        "Error getting storage stats"
                    );
                    return StorageStats::default();
                }
            };
            pages += 1;

            for object in page.contents() {
                stats.file_count += 1;
                stats.total_size += object.size().unwrap_or(0).max(0) as u64;
            }

            match page.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }

        info!(
            bucket = %self.bucket,
            pages,
            file_count = stats.file_count,
            total_size = stats.total_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Computed storage stats"
        );
        stats
    }

    fn distribution_url(&self, key: &ObjectKey) -> Option<String> {
        self.cloudfront_domain
            .as_ref()
            .map(|domain| {
                format!("https://{}/{}", domain.trim_end_matches('/'), encode_key(key))
            })
    }
}
