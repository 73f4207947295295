use std::{borrow::Cow, env, path::PathBuf};

use dotenvy::dotenv;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::storage::{MAX_FILE_SIZE, MAX_THUMBNAIL_SIZE, UploadLimits};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_cloud_settings"))]
pub struct Config {
    pub upload_dir: PathBuf,
    #[validate(range(min = 1, max = 524288000))] // Max 500MB
    pub max_file_size: u64,
    #[validate(range(min = 1, max = 10485760))] // Max 10MB
    pub max_thumbnail_size: u64,
    pub enable_cloud_storage: bool,
    pub s3_bucket_name: Option<String>,
    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub use_minio: bool,
    pub minio_endpoint: Option<String>,
    pub minio_access_key: Option<String>,
    pub minio_secret_key: Option<String>,
    pub cloudfront_domain: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load environment variables from `.env` file (if it exists)
        dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let flag = |name: &str| var(name).as_deref() == Some("true");
        let size = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { name, value }),
                None => Ok(default),
            }
        };

        let config = Config {
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_file_size: size("MAX_FILE_SIZE", MAX_FILE_SIZE)?,
            max_thumbnail_size: size("MAX_THUMBNAIL_SIZE", MAX_THUMBNAIL_SIZE)?,
            enable_cloud_storage: flag("ENABLE_CLOUD_STORAGE"),
            s3_bucket_name: var("S3_BUCKET_NAME"),
            aws_region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: var("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            use_minio: flag("USE_MINIO"),
            minio_endpoint: var("MINIO_ENDPOINT"),
            minio_access_key: var("MINIO_ACCESS_KEY"),
            minio_secret_key: var("MINIO_SECRET_KEY"),
            cloudfront_domain: var("CLOUDFRONT_DOMAIN"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_size: self.max_file_size,
            max_thumbnail_size: self.max_thumbnail_size,
        }
    }
}

fn validate_cloud_settings(config: &Config) -> Result<(), ValidationError> {
    if !config.enable_cloud_storage {
        return Ok(());
    }
    if config.s3_bucket_name.is_none() {
        return Err(ValidationError::new("bucket_required").with_message(Cow::Borrowed(
            "S3_BUCKET_NAME is required when cloud storage is enabled",
        )));
    }
    if config.use_minio && config.minio_endpoint.is_none() {
        return Err(ValidationError::new("endpoint_required").with_message(Cow::Borrowed(
            "MINIO_ENDPOINT is required when USE_MINIO is set",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.upload_limits(), UploadLimits::default());
        assert!(!config.enable_cloud_storage);
        assert!(!config.use_minio);
        assert_eq!(config.aws_region, "us-east-1");
        assert!(config.cloudfront_domain.is_none());
    }

    #[test]
    fn test_flags_require_exact_true() {
        let config = load(&[("ENABLE_CLOUD_STORAGE", "TRUE"), ("USE_MINIO", "1")]).unwrap();
        assert!(!config.enable_cloud_storage);
        assert!(!config.use_minio);
    }

    #[test]
    fn test_cloud_requires_bucket() {
        let result = load(&[("ENABLE_CLOUD_STORAGE", "true"), ("S3_BUCKET_NAME", "  ")]);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = load(&[("ENABLE_CLOUD_STORAGE", "true"), ("S3_BUCKET_NAME", "media")]).unwrap();
        assert_eq!(config.s3_bucket_name.as_deref(), Some("media"));
    }

    #[test]
    fn test_minio_requires_endpoint() {
        let result = load(&[
            ("ENABLE_CLOUD_STORAGE", "true"),
            ("S3_BUCKET_NAME", "media"),
            ("USE_MINIO", "true"),
        ]);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_limits_are_bounded() {
        let config = load(&[("MAX_FILE_SIZE", "1048576"), ("MAX_THUMBNAIL_SIZE", "2048")]).unwrap();
        assert_eq!(config.max_file_size, 1_048_576);
        assert_eq!(config.max_thumbnail_size, 2048);

        let too_large = load(&[("MAX_FILE_SIZE", "524288001")]);
        assert!(matches!(too_large, Err(ConfigError::Invalid(_))));

        let zero = load(&[("MAX_THUMBNAIL_SIZE", "0")]);
        assert!(matches!(zero, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unparsable_size() {
        let result = load(&[("MAX_FILE_SIZE", "lots")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "MAX_FILE_SIZE", .. })
        ));
    }
}
