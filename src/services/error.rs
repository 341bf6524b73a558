use crate::models::{EventKind, ObjectRef};
use thiserror::Error;

/// Failure of a single reconciliation step.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("field `{field}` does not exist in collection `{collection}`")]
    UnknownField { collection: String, field: String },

    #[error("field `{field}` of collection `{collection}` is not a file field")]
    NotAFileField { collection: String, field: String },

    #[error("failed to fetch metadata of {object}")]
    Fetch {
        object: ObjectRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to rewrite headers of {object}")]
    Rewrite {
        object: ObjectRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to set ACL of {object}")]
    Acl {
        object: ObjectRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("request for {object} was cancelled")]
    Cancelled { object: ObjectRef },

    #[error("request for {object} exceeded its deadline")]
    DeadlineExceeded { object: ObjectRef },

    #[error("failed to open storage bucket")]
    Connect(#[source] anyhow::Error),

    #[error("reconciliation task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("no subscriber for record {0} events")]
    NoSubscriber(EventKind),

    #[error("record {0} hook did not reply")]
    NoReply(EventKind),
}

impl ReconcileError {
    /// The object the failure is attributed to, if any.
    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            ReconcileError::Fetch { object, .. }
            | ReconcileError::Rewrite { object, .. }
            | ReconcileError::Acl { object, .. }
            | ReconcileError::Cancelled { object }
            | ReconcileError::DeadlineExceeded { object } => Some(object),
            _ => None,
        }
    }

    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::UnknownField { .. } | ReconcileError::NotAFileField { .. }
        )
    }
}
