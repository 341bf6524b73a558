use crate::api::error::{
    AppError, FIX_HEADERS_FAILED, HOOK_NOT_HANDLED, OPEN_BUCKET_FAILED, PROTECT_FILES_FAILED,
};
use crate::config::StorageSettings;
use crate::models::{CollectionSchema, EventKind, ReconcileReport, UploadEvent};
use crate::services::acl;
use crate::services::error::ReconcileError;
use crate::services::events::{EventSource, HookInvocation};
use crate::services::headers::{self, HeaderOutcome};
use crate::services::storage::BucketConnector;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Brings uploaded objects in line with their field's access policy after a
/// record is created or updated.
pub struct UploadReconciler {
    connector: Arc<dyn BucketConnector>,
    collections: Vec<String>,
}

impl UploadReconciler {
    pub fn new(connector: Arc<dyn BucketConnector>) -> Self {
        Self {
            connector,
            collections: Vec::new(),
        }
    }

    /// Restricts reconciliation to the given collection ids or names. An
    /// empty list handles every collection.
    pub fn with_collections(mut self, collections: Vec<String>) -> Self {
        self.collections = collections;
        self
    }

    pub fn handles(&self, collection: &CollectionSchema) -> bool {
        self.collections.is_empty()
            || self
                .collections
                .iter()
                .any(|c| *c == collection.id || *c == collection.name)
    }

    /// Reconciles every object of `event` under `settings`.
    ///
    /// Headers are fixed before the ACL is asserted because an in-place copy
    /// resets the object's ACL. The ACL pass runs even when the header pass
    /// failed; the header failure is the one reported.
    pub async fn on_record_event(
        &self,
        settings: &StorageSettings,
        event: &UploadEvent,
    ) -> Result<ReconcileReport, AppError> {
        if !event.has_uploads() {
            return Ok(ReconcileReport::default());
        }
        if !self.handles(&event.record.collection) {
            tracing::debug!(
                "Collection {} is not hooked, skipping record {}",
                event.record.collection.name,
                event.record.id
            );
            return Ok(ReconcileReport::default());
        }
        if !settings.enabled {
            tracing::debug!(
                "S3 disabled, skipping reconciliation of record {}",
                event.record.id
            );
            return Ok(ReconcileReport::default());
        }

        tracing::info!(
            "🔧 Reconciling {} file(s) of {} record {}/{}",
            event.file_count(),
            event.kind,
            event.record.collection.name,
            event.record.id
        );

        let session = self
            .connector
            .open(settings)
            .await
            .map_err(|e| AppError::internal(OPEN_BUCKET_FAILED, ReconcileError::Connect(e)))?;

        let headers = headers::fix_object_headers(
            &event.context,
            session.client(),
            session.bucket(),
            &event.record,
            &event.uploads,
        )
        .await;

        let protected = acl::protect_files(
            &event.context,
            session.client(),
            session.bucket(),
            &event.record,
            &event.uploads,
        )
        .await;

        drop(session);

        let outcomes = headers.map_err(|e| AppError::internal(FIX_HEADERS_FAILED, e))?;
        let acl_applied = protected.map_err(|e| AppError::internal(PROTECT_FILES_FAILED, e))?;

        let report = ReconcileReport {
            headers_rewritten: outcomes
                .iter()
                .filter(|o| **o == HeaderOutcome::Rewritten)
                .count(),
            headers_skipped: outcomes
                .iter()
                .filter(|o| **o == HeaderOutcome::AlreadyTagged)
                .count(),
            acl_applied,
        };

        tracing::info!(
            "✅ Record {}: {} header(s) rewritten, {} already tagged, {} set private",
            event.record.id,
            report.headers_rewritten,
            report.headers_skipped,
            report.acl_applied
        );
        Ok(report)
    }

    /// Subscribes to record created/updated events of `source`. Every event
    /// is handled on its own task with the settings current when it arrives.
    pub fn subscribe(
        self: &Arc<Self>,
        source: &dyn EventSource,
        settings: watch::Receiver<StorageSettings>,
    ) -> Vec<JoinHandle<()>> {
        EventKind::ALL
            .into_iter()
            .map(|kind| {
                let events = source.on(kind);
                tokio::spawn(Arc::clone(self).serve(kind, events, settings.clone()))
            })
            .collect()
    }

    async fn serve(
        self: Arc<Self>,
        kind: EventKind,
        mut events: BoxStream<'static, HookInvocation>,
        settings: watch::Receiver<StorageSettings>,
    ) {
        tracing::info!("👂 Listening for record {} events", kind);

        while let Some(invocation) = events.next().await {
            let settings = settings.borrow().clone();
            let reconciler = Arc::clone(&self);
            tokio::spawn(async move {
                let (event, reply) = invocation.into_parts();
                let handled =
                    tokio::spawn(async move { reconciler.on_record_event(&settings, &event).await })
                        .await;
                let result = handled.unwrap_or_else(|e| {
                    tracing::error!("Record {} reconciliation task failed: {}", kind, e);
                    Err(AppError::internal(HOOK_NOT_HANDLED, ReconcileError::Join(e)))
                });
                let _ = reply.send(result);
            });
        }

        tracing::info!("🛑 Record {} event stream closed", kind);
    }
}
