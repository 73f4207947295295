use serde::Serialize;
use tracing::{error, info};

use crate::{
    error::AppError,
    models::{UploadedFile, UploadedThumbnail},
    multipart::MediaUploadForm,
    storage::{Storage, StorageService},
};

/// Locations of a stored media file and its thumbnail. Callers persist these,
/// including any object keys, on the record that references the media.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub file: UploadedFile,
    pub thumbnail: Option<UploadedThumbnail>,
}

/// Stores a form's file and optional thumbnail on one backend.
///
/// Both uploads use the backend selected when the call starts. When the thumbnail
/// is rejected, the already stored file is removed before the error is returned.
pub async fn store_media(
    storage: &StorageService,
    mut form: MediaUploadForm,
) -> Result<StoredMedia, AppError> {
    let file = form.take_file()?;
    let category = form.take_category()?;
    let backend = storage.active();

    let stored = backend.upload_file(&file, &category).await?;

    let thumbnail = match &form.thumbnail {
        Some(thumbnail) => match backend.upload_thumbnail(thumbnail, &category).await {
            Ok(uploaded) => Some(uploaded),
            Err(e) => {
                error!("Thumbnail upload failed, removing {}: {}", stored.file_url(), e);
                if !backend.delete_file(&stored.location).await {
                    error!("Failed to remove {} after thumbnail failure", stored.file_url());
                }
                return Err(e.into());
            }
        },
        None => None,
    };

    info!(
        backend = %backend.kind(),
        file = %stored.file_url(),
        size_bytes = file.size(),
        "Media stored"
    );

    Ok(StoredMedia {
        file: stored,
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        models::{BackendKind, FilePayload},
        storage::init_storage,
    };
    use tempfile::tempdir;

    async fn local_service(dir: &std::path::Path) -> StorageService {
        let config = Config::from_lookup(|name| match name {
            "UPLOAD_DIR" => Some(dir.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap();
        init_storage(&config).await.unwrap()
    }

    fn form(thumbnail: Option<FilePayload>) -> MediaUploadForm {
        MediaUploadForm {
            file: Some(FilePayload::new(b"video".to_vec(), "video/mp4", "lesson.mp4")),
            thumbnail,
            category: Some("Education".to_string()),
        }
    }

    #[tokio::test]
    async fn test_stores_file_and_thumbnail() {
        let dir = tempdir().unwrap();
        let storage = local_service(dir.path()).await;

        let stored = store_media(
            &storage,
            form(Some(FilePayload::new(vec![0xFF; 64], "image/jpeg", "cover.jpg"))),
        )
        .await
        .unwrap();

        assert_eq!(stored.file.location.backend(), BackendKind::Local);
        assert!(stored.file.file_url().starts_with("/uploads/education/"));
        let thumbnail = stored.thumbnail.unwrap();
        assert!(thumbnail.thumbnail_url().starts_with("/uploads/education-thumbnails/"));
    }

    #[tokio::test]
    async fn test_rejected_thumbnail_removes_file() {
        let dir = tempdir().unwrap();
        let storage = local_service(dir.path()).await;

        let result = store_media(
            &storage,
            form(Some(FilePayload::new(vec![0u8; 8], "image/gif", "cover.gif"))),
        )
        .await;

        assert!(matches!(result, Err(AppError::UnSupportedMediaType(_))));
        let mut entries = tokio::fs::read_dir(dir.path().join("education")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requires_file_and_category() {
        let dir = tempdir().unwrap();
        let storage = local_service(dir.path()).await;

        let result = store_media(&storage, MediaUploadForm::default()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let mut no_category = form(None);
        no_category.category = None;
        let result = store_media(&storage, no_category).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
