use dermascan_core::{create_classifier, create_store, DermascanConfig, DermascanError};
use tokio::sync::broadcast;

use crate::http::{self, HttpState};

/// Build the shared handler state: upload directory, record store and classifier.
/// The store handle is created once here and shared by every request.
pub async fn build_state(config: DermascanConfig) -> Result<HttpState, DermascanError> {
    tokio::fs::create_dir_all(&config.upload.dir).await?;

    let store = create_store(&config).await?;
    let classifier = create_classifier(&config.classifier)?;
    tracing::info!(
        "Classifier: {} | uploads: {} (max {} bytes)",
        classifier.name(),
        config.upload.dir,
        config.upload.max_bytes
    );

    Ok(HttpState {
        store,
        classifier,
        config,
    })
}

/// Serve HTTP until the shutdown signal fires.
pub async fn run(config: DermascanConfig, shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
    let state = build_state(config).await?;
    http::start_http_server(state, shutdown).await
}
