use std::path::Path;
use uuid::Uuid;

use crate::storage::{StorageError, StorageResult};

/// MIME types accepted for thumbnail uploads.
pub const ALLOWED_THUMBNAIL_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Extracts the file extension from a filename, keeping its case.
pub fn get_file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_owned)
}

/// Generates a unique stored name: a v4 UUID plus the original extension, if any.
pub fn generate_file_name(original_name: &str) -> String {
    match get_file_extension(original_name) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

/// Checks if a MIME type may be stored as a thumbnail.
pub fn is_allowed_thumbnail_mime_type(mime_type: &str) -> bool {
    ALLOWED_THUMBNAIL_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
}

/// Lower-cases a category so it can be used as a single directory or key segment.
pub fn normalize_category(category: &str) -> StorageResult<String> {
    let normalized = category.to_lowercase();
    if normalized.is_empty()
        || normalized == "."
        || normalized == ".."
        || normalized.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidCategory(category.to_string()));
    }
    Ok(normalized)
}

/// Replaces anything outside printable ASCII, since object metadata travels as HTTP headers.
pub fn metadata_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_keeps_case() {
        assert_eq!(get_file_extension("Lecture.MP4").as_deref(), Some("MP4"));
        assert_eq!(get_file_extension("clip.mp4").as_deref(), Some("mp4"));
        assert_eq!(get_file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(get_file_extension("README"), None);
        assert_eq!(get_file_extension("trailing."), None);
    }

    #[test]
    fn test_generated_names_are_unique() {
        let first = generate_file_name("photo.jpg");
        let second = generate_file_name("photo.jpg");
        assert_ne!(first, second);

        let stem = first.strip_suffix(".jpg").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
        assert!(Uuid::parse_str(&generate_file_name("noext")).is_ok());

        let upper = generate_file_name("Intro.MP4");
        assert!(Uuid::parse_str(upper.strip_suffix(".MP4").unwrap()).is_ok());
    }

    #[test]
    fn test_thumbnail_mime_allow_list() {
        assert!(is_allowed_thumbnail_mime_type("image/jpeg"));
        assert!(is_allowed_thumbnail_mime_type("image/PNG"));
        assert!(is_allowed_thumbnail_mime_type("IMAGE/JPEG"));
        assert!(is_allowed_thumbnail_mime_type("image/webp"));
        assert!(!is_allowed_thumbnail_mime_type("image/gif"));
        assert!(!is_allowed_thumbnail_mime_type("video/mp4"));
    }

    #[test]
    fn test_category_normalization() {
        assert_eq!(normalize_category("Skill").unwrap(), "skill");
        assert_eq!(normalize_category("EDUCATION").unwrap(), "education");
        assert!(matches!(normalize_category(""), Err(StorageError::InvalidCategory(_))));
        assert!(matches!(normalize_category(".."), Err(StorageError::InvalidCategory(_))));
        assert!(matches!(normalize_category("a/b"), Err(StorageError::InvalidCategory(_))));
        assert!(matches!(normalize_category("a\\b"), Err(StorageError::InvalidCategory(_))));
    }

    #[test]
    fn test_metadata_value_strips_non_ascii() {
        assert_eq!(metadata_value("report 1.pdf"), "report 1.pdf");
        assert_eq!(metadata_value("résumé.pdf"), "r_sum_.pdf");
    }
}
