use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file extracted from an upload request, held entirely in memory.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub data: Bytes,
    pub mime_type: String,
    pub original_name: String,
}

impl FilePayload {
    pub fn new(
        data: impl Into<Bytes>,
        mime_type: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            original_name: original_name.into(),
        }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Handle of an object in the cloud bucket.
///
/// It is the only way to delete, stat or sign a cloud object later, so callers
/// persist it next to the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Location {
    /// Relative URL under `/uploads`, served by the HTTP layer.
    Local { url: String },
    /// Public object URL plus the key needed for later operations.
    Cloud { url: String, key: ObjectKey },
}

impl Location {
    pub fn url(&self) -> &str {
        match self {
            Location::Local { url } | Location::Cloud { url, .. } => url,
        }
    }

    pub fn key(&self) -> Option<&ObjectKey> {
        match self {
            Location::Local { .. } => None,
            Location::Cloud { key, .. } => Some(key),
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Location::Local { .. } => BackendKind::Local,
            Location::Cloud { .. } => BackendKind::Cloud,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_name: String,
    pub original_name: String,
    #[serde(flatten)]
    pub location: Location,
}

impl UploadedFile {
    pub fn file_url(&self) -> &str {
        self.location.url()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedThumbnail {
    pub file_name: String,
    #[serde(flatten)]
    pub location: Location,
}

impl UploadedThumbnail {
    pub fn thumbnail_url(&self) -> &str {
        self.location.url()
    }
}

/// Metadata of a stored file. Fields a backend cannot report are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_size: u64,
    pub file_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Cloud,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Cloud => "cloud",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cloud_descriptor_serializes_key() {
        let uploaded = UploadedFile {
            file_name: "abc.mp4".to_string(),
            original_name: "Lesson 1.mp4".to_string(),
            location: Location::Cloud {
                url: "https://media.s3.us-east-1.amazonaws.com/education/2026/3/abc.mp4".to_string(),
                key: ObjectKey::new("education/2026/3/abc.mp4"),
            },
        };

        assert_eq!(
            serde_json::to_value(&uploaded).unwrap(),
            json!({
                "fileName": "abc.mp4",
                "originalName": "Lesson 1.mp4",
                "backend": "cloud",
                "url": "https://media.s3.us-east-1.amazonaws.com/education/2026/3/abc.mp4",
                "key": "education/2026/3/abc.mp4",
            })
        );
    }

    #[test]
    fn test_local_location_restores_without_key() {
        let location: Location =
            serde_json::from_value(json!({"backend": "local", "url": "/uploads/skill/a.png"}))
                .unwrap();

        assert_eq!(location.url(), "/uploads/skill/a.png");
        assert!(location.key().is_none());
        assert_eq!(location.backend(), BackendKind::Local);
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Local.to_string(), "local");
        assert_eq!(BackendKind::Cloud.to_string(), "cloud");
    }
}
