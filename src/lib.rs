pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::{ServerConfig, StorageSettings};
use crate::services::events::LocalEventBus;
use crate::services::schema::SchemaRegistry;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::watch;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::hooks::record_hook,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::hooks::RecordHookRequest,
            api::handlers::health::HealthResponse,
            models::UploadedFile,
            models::ReconcileReport,
        )
    ),
    tags(
        (name = "hooks", description = "Record upload hooks"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<LocalEventBus>,
    pub schemas: Arc<SchemaRegistry>,
    pub settings: watch::Receiver<StorageSettings>,
    pub config: ServerConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/hooks/records/:kind",
            post(api::handlers::hooks::record_hook).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::hook_auth_middleware,
            )),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
