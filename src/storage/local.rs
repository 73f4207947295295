use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{error, info, warn};

use super::{Storage, StorageResult, UploadLimits};
use crate::{
    models::{BackendKind, FilePayload, FileStats, Location, UploadedFile, UploadedThumbnail},
    utils::{generate_file_name, normalize_category},
};

/// URL prefix under which the HTTP layer serves the upload directory.
pub const URL_PREFIX: &str = "/uploads";

// Local filesystem storage
#[derive(Clone)]
pub struct LocalStorage {
    upload_dir: PathBuf, // Root directory; category directories live directly below it
    limits: UploadLimits,
}

impl LocalStorage {
    /// Creates a new LocalStorage instance and makes sure the upload directory exists
    pub async fn new(upload_dir: impl Into<PathBuf>, limits: UploadLimits) -> StorageResult<Self> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir).await?;

        Ok(Self { upload_dir, limits })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Maps `/uploads/<dir>/<name>` back to a path inside the upload directory.
    fn resolve_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(URL_PREFIX)?
            .strip_prefix('/')?;

        let relative = Path::new(relative);
        let mut components = relative.components().peekable();
        components.peek()?;
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }

        Some(self.upload_dir.join(relative))
    }

    /// Writes the whole payload into `directory` and returns `(file_name, url)`.
    async fn write(&self, directory: &str, payload: &FilePayload) -> StorageResult<(String, String)> {
        let dir = self.upload_dir.join(directory);
        fs::create_dir_all(&dir).await?;

        let file_name = generate_file_name(&payload.original_name);
        let path = dir.join(&file_name);

        if let Err(e) = write_all(&path, payload).await {
            error!(error = %e, path = %path.display(), "Failed to write file");
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        info!(
            path = %path.display(),
            size_bytes = payload.size(),
            "Saved file"
        );

        let url = format!("{}/{}/{}", URL_PREFIX, directory, file_name);
        Ok((file_name, url))
    }

    /// Deletes the file behind a local URL. Missing files and errors yield `false`.
    pub async fn delete_url(&self, url: &str) -> bool {
        let Some(path) = self.resolve_url(url) else {
            warn!(url, "Refusing to delete URL outside the upload directory");
            return false;
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "File deleted");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                error!(error = %e, path = %path.display(), "Error deleting file");
                false
            }
        }
    }

    /// Filesystem metadata for a local URL, `None` when missing or unreadable.
    pub async fn stat_url(&self, url: &str) -> Option<FileStats> {
        let path = self.resolve_url(url)?;

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                error!(error = %e, path = %path.display(), "Error getting file stats");
                return None;
            }
        };

        if !metadata.is_file() {
            return None;
        }

        Some(FileStats {
            size: metadata.len(),
            created_at: metadata.created().ok().map(DateTime::<Utc>::from),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            content_type: None,
        })
    }
}

async fn write_all(path: &Path, payload: &FilePayload) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(&payload.data).await?;
    file.flush().await
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_file(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedFile> {
        self.limits.check_file(payload)?;
        let category = normalize_category(category)?;

        let (file_name, url) = self.write(&category, payload).await?;

        Ok(UploadedFile {
            file_name,
            original_name: payload.original_name.clone(),
            location: Location::Local { url },
        })
    }

    async fn upload_thumbnail(
        &self,
        payload: &FilePayload,
        category: &str,
    ) -> StorageResult<UploadedThumbnail> {
        self.limits.check_thumbnail(payload)?;
        let category = normalize_category(category)?;

        let directory = format!("{}-thumbnails", category);
        let (file_name, url) = self.write(&directory, payload).await?;

        Ok(UploadedThumbnail {
            file_name,
            location: Location::Local { url },
        })
    }

    async fn delete_file(&self, location: &Location) -> bool {
        self.delete_url(location.url()).await
    }

    async fn get_file_stats(&self, location: &Location) -> Option<FileStats> {
        self.stat_url(location.url()).await
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }
}
