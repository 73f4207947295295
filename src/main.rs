use media_storage::{
    config::Config,
    storage::{DEFAULT_LIST_LIMIT, ObjectStorage, init_storage},
};
use serde_json::json;
use tracing::info;

/// Prints the active backend and its usage. Walks the whole bucket when cloud
/// storage is active, so run it from a maintenance job rather than a request path.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let storage = init_storage(&config).await?;
    let backend = storage.storage_backend();
    info!(%backend, "Storage initialized");

    let stats = storage.get_storage_stats().await;
    let mut report = json!({
        "backend": backend,
        "uploadDir": storage.local().upload_dir().display().to_string(),
        "stats": stats,
    });
    if storage.cloud().is_enabled() {
        report["bucket"] = json!(storage.cloud().bucket());
    }

    // Optional prefix argument lists keys under it
    if let Some(prefix) = std::env::args().nth(1) {
        let files = storage.cloud().list_files(&prefix, DEFAULT_LIST_LIMIT).await;
        report["files"] = json!(files);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
