use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_reconciler::config::{ServerConfig, StorageSettings};
use upload_reconciler::infrastructure::storage;
use upload_reconciler::services::events::LocalEventBus;
use upload_reconciler::services::reconciler::UploadReconciler;
use upload_reconciler::services::schema::SchemaRegistry;
use upload_reconciler::{AppState, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_reconciler=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting upload reconciler...");

    let config = ServerConfig::from_env();
    let settings = StorageSettings::from_env();

    let schemas = match &config.collections_file {
        Some(path) => SchemaRegistry::from_file(path)?,
        None => {
            tracing::warn!("COLLECTIONS_FILE not set, every hook will hit an unknown collection");
            SchemaRegistry::default()
        }
    };
    info!("📚 Loaded {} collection schema(s)", schemas.len());

    let connector = storage::setup_storage(&settings).await;
    let (settings_tx, settings_rx) = watch::channel(settings);
    tokio::spawn(reload_settings_on_hangup(settings_tx));

    // Wire the reconciler to the in-process event bus
    let events = Arc::new(LocalEventBus::new());
    if !config.hook_collections.is_empty() {
        info!("🎯 Hooked collections: {}", config.hook_collections.join(", "));
    }
    let reconciler = Arc::new(
        UploadReconciler::new(connector).with_collections(config.hook_collections.clone()),
    );
    reconciler.subscribe(events.as_ref(), settings_rx.clone());

    let state = AppState {
        events,
        schemas: Arc::new(schemas),
        settings: settings_rx,
        config: config.clone(),
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    info!("✅ Server ready at http://{}", config.bind_addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

/// Re-reads the storage settings from the environment on SIGHUP.
#[cfg(unix)]
async fn reload_settings_on_hangup(tx: watch::Sender<StorageSettings>) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!("Settings reload disabled: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        dotenvy::dotenv_override().ok();
        let settings = StorageSettings::from_env();
        info!(
            "🔄 Reloaded storage settings (enabled={}, bucket={})",
            settings.enabled, settings.bucket
        );
        tx.send_replace(settings);
    }
}

#[cfg(not(unix))]
async fn reload_settings_on_hangup(tx: watch::Sender<StorageSettings>) {
    tx.closed().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
