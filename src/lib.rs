pub mod config;
pub mod error;
pub mod models;
pub mod multipart;
pub mod storage;
pub mod upload;
pub mod utils;

pub use config::Config;
pub use error::AppError;
pub use models::{
    BackendKind, FilePayload, FileStats, Location, ObjectKey, StorageStats, UploadedFile,
    UploadedThumbnail,
};
pub use storage::{
    ActiveStorage, CloudStorage, LocalStorage, ObjectStorage, Storage, StorageError,
    StorageService, init_storage,
};
