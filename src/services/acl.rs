use crate::models::{ObjectAcl, ObjectRef, RecordRef, UploadMap};
use crate::services::context::ExecutionContext;
use crate::services::error::ReconcileError;
use crate::services::fanout::FanOut;
use crate::services::policy;
use crate::services::storage::BucketClient;
use std::sync::Arc;

/// Sets every object uploaded into a protected field private.
///
/// Objects of unprotected fields are not touched at all. The write is
/// issued unconditionally; re-asserting `private` is always valid.
/// Returns the number of objects set private.
pub async fn protect_files(
    ctx: &ExecutionContext,
    client: Arc<dyn BucketClient>,
    bucket: &str,
    record: &RecordRef,
    uploads: &UploadMap,
) -> Result<usize, ReconcileError> {
    let mut fanout: FanOut<(), ReconcileError> = FanOut::new();

    for (field, files) in uploads {
        let policy = match policy::resolve(&record.collection, field) {
            Ok(policy) => policy,
            Err(e) => {
                // already dispatched objects still run to completion
                if let Err(dispatched) = fanout.wait().await {
                    tracing::warn!("Dispatched ACL reconciliation failed: {}", dispatched);
                }
                return Err(e);
            }
        };
        if !policy.is_protected {
            continue;
        }

        for file in files {
            let object = ObjectRef::new(bucket, record.object_key(&file.name));
            let client = Arc::clone(&client);
            let ctx = ctx.clone();
            fanout.spawn(async move {
                ctx.run(&object, client.set_object_acl(&object, ObjectAcl::Private))
                    .await?
                    .map_err(|source| ReconcileError::Acl {
                        object: object.clone(),
                        source,
                    })?;
                tracing::debug!("Set ACL of {} to {}", object, ObjectAcl::Private.as_str());
                Ok::<(), ReconcileError>(())
            });
        }
    }

    Ok(fanout.wait().await?.len())
}
