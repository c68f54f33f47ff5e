use async_trait::async_trait;
use std::sync::Arc;

use crate::queue::error::QueueError;
use crate::queue::message::JobMessage;

/// Receipt returned by the queue for an accepted message. Opaque to
/// callers: it is logged for diagnostics, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueReceipt {
    pub message_id: String,
}

/// JobQueue trait defining the interface for handing crop jobs to the
/// external worker.
///
/// Sends are fire-and-forget beyond queue-accept. The queue deduplicates on
/// the message's deduplication key, so resending the same logical job yields
/// the original receipt rather than a second job.
#[async_trait]
pub trait JobQueue: Send + Sync + 'static {
    /// Send a job message to the queue.
    async fn send_job(&self, message: &JobMessage) -> Result<QueueReceipt, QueueError>;
}

/// Implementation of JobQueue for Arc<T> where T implements JobQueue, so a
/// queue client can be shared across components.
#[async_trait]
impl<T: JobQueue + ?Sized> JobQueue for Arc<T> {
    async fn send_job(&self, message: &JobMessage) -> Result<QueueReceipt, QueueError> {
        (**self).send_job(message).await
    }
}
