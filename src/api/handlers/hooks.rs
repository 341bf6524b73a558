use crate::AppState;
use crate::api::error::AppError;
use crate::models::{EventKind, RecordRef, ReconcileReport, UploadEvent, UploadedFile};
use crate::services::context::ExecutionContext;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordHookRequest {
    /// Collection id or name
    pub collection: String,
    pub record_id: String,
    /// Files uploaded in the request, keyed by field name
    #[serde(default)]
    pub files: BTreeMap<String, Vec<UploadedFile>>,
}

#[utoipa::path(
    post,
    path = "/hooks/records/{kind}",
    params(
        ("kind" = String, Path, description = "Record event kind: `created` or `updated`")
    ),
    request_body = RecordHookRequest,
    responses(
        (status = 200, description = "Uploaded objects reconciled", body = ReconcileReport),
        (status = 400, description = "Unknown event kind"),
        (status = 401, description = "Missing or invalid hook secret"),
        (status = 404, description = "Unknown collection"),
        (status = 500, description = "Reconciliation failed")
    ),
    tag = "hooks"
)]
pub async fn record_hook(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<RecordHookRequest>,
) -> Result<Json<ReconcileReport>, AppError> {
    let kind: EventKind = kind.parse().map_err(AppError::BadRequest)?;
    let collection = state
        .schemas
        .get(&req.collection)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Unknown collection: {}", req.collection)))?;

    let context = ExecutionContext::with_timeout(state.config.request_timeout());
    // the caller going away cancels in-flight bucket calls
    let _cancel = context.cancel_on_drop();

    let event = UploadEvent::new(kind, RecordRef::new(req.record_id, collection), req.files)
        .with_context(context);

    let report = state.events.emit(event).await?;
    Ok(Json(report))
}
