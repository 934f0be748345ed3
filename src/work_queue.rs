use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::domain::CorrelationId;

/// Request to run a health check and publish its outcome under `correlation_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub correlation_id: CorrelationId,
    /// Starts at 1, incremented on every redelivery.
    pub delivery_attempt: u32,
}

impl WorkItem {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            delivery_attempt: 1,
        }
    }

    pub fn redelivery(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            delivery_attempt: self.delivery_attempt + 1,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EnqueueError {
    #[error("The work queue has no consumer left to deliver to.")]
    Closed,
    #[error("The work queue stayed full for {timeout:?}.")]
    Full { timeout: Duration },
}

/// Producer side of an at-least-once delivery channel.
#[async_trait::async_trait]
pub trait WorkQueue: Send + Sync {
    /// Either hands the item over to the queue or fails; an item is never
    /// dropped silently.
    async fn enqueue(&self, item: WorkItem) -> Result<(), EnqueueError>;
}

/// Bounded in-process queue backed by a `tokio` channel.
#[derive(Debug, Clone)]
pub struct InProcessQueue {
    sender: mpsc::Sender<WorkItem>,
    enqueue_timeout: Duration,
}

impl InProcessQueue {
    /// A handle that can enqueue without keeping the channel open, so the
    /// consumer can redeliver and still observe every producer going away.
    pub fn downgrade(&self) -> WeakInProcessQueue {
        WeakInProcessQueue {
            sender: self.sender.downgrade(),
            enqueue_timeout: self.enqueue_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeakInProcessQueue {
    sender: mpsc::WeakSender<WorkItem>,
    enqueue_timeout: Duration,
}

/// Delivery side of an [`InProcessQueue`], consumed by the health check worker.
#[derive(Debug)]
pub struct QueueReceiver(mpsc::Receiver<WorkItem>);

impl QueueReceiver {
    /// Waits for the next delivery. Returns `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<WorkItem> {
        self.0.recv().await
    }
}

pub fn in_process_queue(
    capacity: usize,
    enqueue_timeout: Duration,
) -> (InProcessQueue, QueueReceiver) {
    // `mpsc::channel` panics on a zero capacity.
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        InProcessQueue {
            sender,
            enqueue_timeout,
        },
        QueueReceiver(receiver),
    )
}

#[async_trait::async_trait]
impl WorkQueue for InProcessQueue {
    #[tracing::instrument(
        name = "Enqueue health check",
        skip(self, item),
        fields(
            correlation_id = %item.correlation_id,
            delivery_attempt = item.delivery_attempt
        )
    )]
    async fn enqueue(&self, item: WorkItem) -> Result<(), EnqueueError> {
        self.sender
            .send_timeout(item, self.enqueue_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Closed(_) => EnqueueError::Closed,
                SendTimeoutError::Timeout(_) => EnqueueError::Full {
                    timeout: self.enqueue_timeout,
                },
            })
    }
}

#[async_trait::async_trait]
impl WorkQueue for WeakInProcessQueue {
    async fn enqueue(&self, item: WorkItem) -> Result<(), EnqueueError> {
        let queue = InProcessQueue {
            sender: self.sender.upgrade().ok_or(EnqueueError::Closed)?,
            enqueue_timeout: self.enqueue_timeout,
        };
        queue.enqueue(item).await
    }
}
