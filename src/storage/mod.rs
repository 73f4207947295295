// Submodules for local file system storage and S3-compatible cloud storage
pub mod cloud;
pub mod local;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use cloud::CloudStorage;
pub use local::LocalStorage;

use crate::{
    config::Config,
    models::{
        BackendKind, FilePayload, FileStats, Location, ObjectKey, StorageStats, UploadedFile,
        UploadedThumbnail,
    },
    utils::is_allowed_thumbnail_mime_type,
};

/// Largest primary media upload accepted (500 MiB).
pub const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Largest thumbnail upload accepted (10 MiB).
pub const MAX_THUMBNAIL_SIZE: u64 = 10 * 1024 * 1024;

/// Lifetime of signed URLs when the caller has no preference.
pub const DEFAULT_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// Page size of `list_files` when the caller has no preference.
pub const DEFAULT_LIST_LIMIT: i32 = 100;

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File size {size} exceeds maximum limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Unsupported thumbnail type {0}: only JPEG, PNG, and WebP images are allowed")]
    UnsupportedMediaType(String),

    #[error("Invalid category: {0:?}")]
    InvalidCategory(String),

    #[error("Cloud storage is not enabled")]
    CloudDisabled,

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload Error: {0}")]
    UploadError(String),
}

impl StorageError {
    /// True when the input itself was rejected, as opposed to a deployment or transport failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StorageError::FileTooLarge { .. }
                | StorageError::UnsupportedMediaType(_)
                | StorageError::InvalidCategory(_)
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Size ceilings applied before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_thumbnail_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_thumbnail_size: MAX_THUMBNAIL_SIZE,
        }
    }
}

impl UploadLimits {
    pub(crate) fn check_file(&self, payload: &FilePayload) -> StorageResult<()> {
        if payload.size() > self.max_file_size {
            return Err(StorageError::FileTooLarge {
                size: payload.size(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    pub(crate) fn check_thumbnail(&self, payload: &FilePayload) -> StorageResult<()> {
        if !is_allowed_thumbnail_mime_type(&payload.mime_type) {
            return Err(StorageError::UnsupportedMediaType(payload.mime_type.clone()));
        }
        if payload.size() > self.max_thumbnail_size {
            return Err(StorageError::FileTooLarge {
                size: payload.size(),
                limit: self.max_thumbnail_size,
            });
        }
        Ok(())
    }
}

/// Operations every backend supports.
///
/// Writes return errors. Deletes and stats never fail: they report `false` / `None`
/// so cleanup jobs keep going.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stores a primary media file under `category`.
    async fn upload_file(&self, payload: &FilePayload, category: &str)
    -> StorageResult<UploadedFile>;

    /// Stores a JPEG, PNG or WebP thumbnail under `<category>-thumbnails`.
    async fn upload_thumbnail(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedThumbnail>;

    /// Removes a stored file. `true` only when something was actually deleted.
    async fn delete_file(&self, location: &Location) -> bool;

    /// Returns metadata, or `None` when the file is missing or the backend failed.
    async fn get_file_stats(&self, location: &Location) -> Option<FileStats>;

    fn kind(&self) -> BackendKind;
}

/// Operations only the object store offers. All of them need an [`ObjectKey`].
#[async_trait]
pub trait ObjectStorage: Storage {
    async fn delete_object(&self, key: &ObjectKey) -> bool;

    /// Time-limited GET URL for private access.
    async fn signed_url(&self, key: &ObjectKey, expires_in: Duration) -> Option<String>;

    async fn object_stats(&self, key: &ObjectKey) -> Option<FileStats>;

    /// Keys under `prefix`, a single page of at most `max_keys`.
    async fn list_files(&self, prefix: &str, max_keys: i32) -> Vec<String>;

    /// Size and object count of the whole bucket. Walks every page, so keep it off request paths.
    async fn storage_stats(&self) -> StorageStats;

    /// CDN URL for `key`, when a distribution domain is configured.
    fn distribution_url(&self, key: &ObjectKey) -> Option<String>;
}

/// Chooses between the local and the cloud backend.
///
/// Clones share the selection flag, so a switch is seen by every holder.
#[derive(Clone)]
pub struct StorageService {
    local: LocalStorage,
    cloud: CloudStorage,
    use_cloud: Arc<AtomicBool>,
}

impl StorageService {
    pub fn new(local: LocalStorage, cloud: CloudStorage, use_cloud: bool) -> Self {
        Self {
            local,
            cloud,
            use_cloud: Arc::new(AtomicBool::new(use_cloud)),
        }
    }

    /// Pins the backend selected right now.
    ///
    /// Uploads that belong together (a file and its thumbnail) should go through one
    /// snapshot so a concurrent switch cannot split them across backends.
    pub fn active(&self) -> ActiveStorage<'_> {
        ActiveStorage {
            service: self,
            kind: self.storage_backend(),
        }
    }

    pub async fn upload_file(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedFile> {
        self.active().upload_file(payload, category).await
    }

    pub async fn upload_thumbnail(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedThumbnail> {
        self.active().upload_thumbnail(payload, category).await
    }

    /// Cloud locations go to the cloud backend only while it is selected; everything
    /// else is resolved by URL on the local backend.
    pub async fn delete_file(&self, location: &Location) -> bool {
        self.active().delete_file(location).await
    }

    pub async fn get_file_stats(&self, location: &Location) -> Option<FileStats> {
        self.active().get_file_stats(location).await
    }

    /// Bucket usage while the cloud backend is selected, zeros otherwise.
    pub async fn get_storage_stats(&self) -> StorageStats {
        match self.storage_backend() {
            BackendKind::Cloud => self.cloud.storage_stats().await,
            BackendKind::Local => StorageStats::default(),
        }
    }

    pub fn switch_storage_backend(&self, use_cloud: bool) {
        let previous = self.use_cloud.swap(use_cloud, Ordering::SeqCst);
        if previous != use_cloud {
            info!(
                backend = %self.storage_backend(),
                "Switched storage backend"
            );
        }
    }

    pub fn storage_backend(&self) -> BackendKind {
        if self.use_cloud.load(Ordering::SeqCst) {
            BackendKind::Cloud
        } else {
            BackendKind::Local
        }
    }

    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    pub fn cloud(&self) -> &CloudStorage {
        &self.cloud
    }
}

/// A [`StorageService`] with its backend fixed at the time [`StorageService::active`] was called.
#[derive(Clone, Copy)]
pub struct ActiveStorage<'a> {
    service: &'a StorageService,
    kind: BackendKind,
}

impl<'a> ActiveStorage<'a> {
    fn cloud_key<'l>(&self, location: &'l Location) -> Option<&'l ObjectKey> {
        match self.kind {
            BackendKind::Cloud => location.key(),
            BackendKind::Local => None,
        }
    }
}

#[async_trait]
impl<'a> Storage for ActiveStorage<'a> {
    async fn upload_file(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedFile> {
        match self.kind {
            BackendKind::Local => self.service.local.upload_file(payload, category).await,
            BackendKind::Cloud => self.service.cloud.upload_file(payload, category).await,
        }
    }

    async fn upload_thumbnail(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedThumbnail> {
        match self.kind {
            BackendKind::Local => self.service.local.upload_thumbnail(payload, category).await,
            BackendKind::Cloud => self.service.cloud.upload_thumbnail(payload, category).await,
        }
    }

    async fn delete_file(&self, location: &Location) -> bool {
        match self.cloud_key(location) {
            Some(key) => self.service.cloud.delete_object(key).await,
            None => self.service.local.delete_url(location.url()).await,
        }
    }

    async fn get_file_stats(&self, location: &Location) -> Option<FileStats> {
        match self.cloud_key(location) {
            Some(key) => self.service.cloud.object_stats(key).await,
            None => self.service.local.stat_url(location.url()).await,
        }
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}

// Initialize both backends and select one based on config
pub async fn init_storage(config: &Config) -> StorageResult<StorageService> {
    let local = LocalStorage::new(&config.upload_dir, config.upload_limits()).await?;
    let cloud = CloudStorage::new(config).await;

    if config.enable_cloud_storage {
        info!("Initializing cloud storage");
        cloud.ensure_bucket_exists().await;
    } else {
        info!("Initializing local storage");
    }

    Ok(StorageService::new(
        local,
        cloud,
        config.enable_cloud_storage,
    ))
}
