use crate::api::error::{AppError, HOOK_NOT_HANDLED};
use crate::models::{EventKind, ReconcileReport, UploadEvent};
use crate::services::error::ReconcileError;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

pub type HookResult = Result<ReconcileReport, AppError>;

/// An upload event waiting for its subscriber's verdict.
pub struct HookInvocation {
    pub event: UploadEvent,
    reply: oneshot::Sender<HookResult>,
}

impl HookInvocation {
    pub fn new(event: UploadEvent) -> (Self, oneshot::Receiver<HookResult>) {
        let (reply, rx) = oneshot::channel();
        (Self { event, reply }, rx)
    }

    pub fn into_parts(self) -> (UploadEvent, oneshot::Sender<HookResult>) {
        (self.event, self.reply)
    }
}

/// Host-side source of "record created/updated with uploads" events.
pub trait EventSource: Send + Sync {
    fn on(&self, kind: EventKind) -> BoxStream<'static, HookInvocation>;
}

/// In-process event source: hosts `emit` events and wait for the result.
#[derive(Default)]
pub struct LocalEventBus {
    subscribers: Mutex<HashMap<EventKind, mpsc::UnboundedSender<HookInvocation>>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_subscriber(&self, kind: EventKind) -> bool {
        self.subscribers
            .lock()
            .map(|subs| subs.get(&kind).is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Delivers `event` to the subscriber of its kind and waits for the
    /// outcome. Events without uploads succeed immediately; an event with
    /// uploads that nobody handles is an error.
    pub async fn emit(&self, event: UploadEvent) -> HookResult {
        if !event.has_uploads() {
            return Ok(ReconcileReport::default());
        }

        let kind = event.kind;
        let sender = match self.subscribers.lock() {
            Ok(subs) => subs.get(&kind).cloned(),
            Err(_) => None,
        };
        let Some(sender) = sender else {
            tracing::warn!("No subscriber for record {} events", kind);
            return Err(AppError::internal(
                HOOK_NOT_HANDLED,
                ReconcileError::NoSubscriber(kind),
            ));
        };

        let (invocation, rx) = HookInvocation::new(event);
        if sender.send(invocation).is_err() {
            tracing::warn!("Subscriber for record {} events is gone", kind);
            return Err(AppError::internal(
                HOOK_NOT_HANDLED,
                ReconcileError::NoSubscriber(kind),
            ));
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Record {} hook dropped without replying", kind);
                Err(AppError::internal(HOOK_NOT_HANDLED, ReconcileError::NoReply(kind)))
            }
        }
    }
}

impl EventSource for LocalEventBus {
    fn on(&self, kind: EventKind) -> BoxStream<'static, HookInvocation> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.lock() {
            Ok(mut subs) => {
                if subs.insert(kind, tx).is_some() {
                    tracing::warn!("Replaced existing subscriber for record {} events", kind);
                }
            }
            Err(_) => return stream::empty().boxed(),
        }

        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|next| (next, rx))
        })
        .boxed()
    }
}
