use crate::config::StorageSettings;
use crate::services::storage::S3Connector;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(settings: &StorageSettings) -> Arc<S3Connector> {
    if settings.enabled {
        info!(
            "☁️  S3 Storage: {} (Bucket: {})",
            settings.endpoint.as_deref().unwrap_or("aws"),
            settings.bucket
        );
    } else {
        info!("☁️  S3 Storage disabled, uploads will not be reconciled");
    }

    // Shared base config: credential chain, retry and HTTP client setup.
    let aws_config = aws_config::from_env().load().await;

    Arc::new(S3Connector::new(aws_config))
}
