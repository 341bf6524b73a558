use crate::models::ObjectRef;
use crate::services::error::ReconcileError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation scope of one triggering request.
///
/// Clones share the same token, so cancelling any clone cancels every
/// in-flight bucket call started under it.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the context when the returned guard is dropped.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Runs one bucket call for `object`, racing it against cancellation and
    /// the deadline. A context that is already done never starts the call.
    pub async fn run<F, T>(&self, object: &ObjectRef, call: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = T>,
    {
        if self.token.is_cancelled() {
            return Err(ReconcileError::Cancelled {
                object: object.clone(),
            });
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(ReconcileError::DeadlineExceeded {
                object: object.clone(),
            });
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ReconcileError::Cancelled {
                object: object.clone(),
            }),
            _ = expired => Err(ReconcileError::DeadlineExceeded {
                object: object.clone(),
            }),
            out = call => Ok(out),
        }
    }
}
