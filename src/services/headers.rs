use crate::models::{HeaderUpdate, ObjectRef, RecordRef, UploadMap};
use crate::services::context::ExecutionContext;
use crate::services::error::ReconcileError;
use crate::services::fanout::FanOut;
use crate::services::policy;
use crate::services::storage::BucketClient;
use crate::utils::disposition::attachment_disposition;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    Rewritten,
    AlreadyTagged,
}

/// Stamps `Content-Disposition` (and `Cache-Control: no-cache` for protected
/// fields) on every uploaded object that does not carry a disposition yet.
pub async fn fix_object_headers(
    ctx: &ExecutionContext,
    client: Arc<dyn BucketClient>,
    bucket: &str,
    record: &RecordRef,
    uploads: &UploadMap,
) -> Result<Vec<HeaderOutcome>, ReconcileError> {
    let mut fanout = FanOut::new();

    for (field, files) in uploads {
        let policy = match policy::resolve(&record.collection, field) {
            Ok(policy) => policy,
            Err(e) => {
                // already dispatched objects still run to completion
                if let Err(dispatched) = fanout.wait().await {
                    tracing::warn!("Dispatched header reconciliation failed: {}", dispatched);
                }
                return Err(e);
            }
        };
        let cache_control = policy.cache_control();

        for file in files {
            let object = ObjectRef::new(bucket, record.object_key(&file.name));
            let update = HeaderUpdate {
                content_disposition: attachment_disposition(&file.original_name),
                cache_control: cache_control.clone(),
            };
            let client = Arc::clone(&client);
            let ctx = ctx.clone();
            fanout.spawn(async move { reconcile_object(&ctx, client.as_ref(), object, update).await });
        }
    }

    fanout.wait().await
}

async fn reconcile_object(
    ctx: &ExecutionContext,
    client: &dyn BucketClient,
    object: ObjectRef,
    update: HeaderUpdate,
) -> Result<HeaderOutcome, ReconcileError> {
    let current = ctx
        .run(&object, client.get_object_metadata(&object))
        .await?
        .map_err(|source| ReconcileError::Fetch {
            object: object.clone(),
            source,
        })?;

    if current.has_disposition() {
        tracing::debug!("{} already has a content-disposition, skipping", object);
        return Ok(HeaderOutcome::AlreadyTagged);
    }

    ctx.run(&object, client.copy_object_with_metadata(&object, &update, &current))
        .await?
        .map_err(|source| ReconcileError::Rewrite {
            object: object.clone(),
            source,
        })?;

    tracing::debug!(
        "Rewrote headers of {}: disposition={:?}, cache_control={:?}",
        object,
        update.content_disposition,
        update.cache_control
    );
    Ok(HeaderOutcome::Rewritten)
}
