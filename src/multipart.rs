use axum::extract::{Multipart, multipart::Field};
use tracing::error;

use crate::{error::AppError, models::FilePayload};

/// Fields of a media upload form: the primary `file`, an optional `thumbnail`
/// and the `category` text field.
#[derive(Debug, Default)]
pub struct MediaUploadForm {
    pub file: Option<FilePayload>,
    pub thumbnail: Option<FilePayload>,
    pub category: Option<String>,
}

impl MediaUploadForm {
    /// Parses a `multipart/form-data` body. Unknown fields are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MediaUploadForm::default();

        // Parse multipart fields
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            error!("Error parsing multipart: {}", e);
            AppError::MultipartError(format!("Failed to parse multipart form: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => form.file = Some(read_file(field).await?),
                "thumbnail" => form.thumbnail = Some(read_file(field).await?),
                "category" => {
                    let category = field.text().await.map_err(|e| {
                        AppError::MultipartError(format!("Failed to read category: {}", e))
                    })?;
                    if !category.is_empty() {
                        form.category = Some(category);
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// The primary file, or a bad request when the form had none.
    pub fn take_file(&mut self) -> Result<FilePayload, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("No file provided".into()))
    }

    pub fn take_category(&mut self) -> Result<String, AppError> {
        self.category
            .take()
            .ok_or_else(|| AppError::BadRequest("No category provided".into()))
    }
}

async fn read_file(field: Field<'_>) -> Result<FilePayload, AppError> {
    let name = field.name().unwrap_or("file").to_string();
    let original_name = field
        .file_name()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::BadRequest(format!("Field {} is not a file", name)))?;
    let mime_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    // Read file bytes
    let data = field.bytes().await.map_err(|e| {
        error!("Error reading file bytes: {}", e);
        AppError::FileProcessingError(format!("Failed to read the file: {}", e))
    })?;

    Ok(FilePayload::new(data, mime_type, original_name))
}
