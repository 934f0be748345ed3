use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;

use crate::configuration::WorkerSettings;
use crate::result_store::ResultStore;
use crate::work_queue::{QueueReceiver, WorkItem, WorkQueue};

/// The business logic behind the queue: decides whether the service is healthy.
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, item: &WorkItem) -> Result<bool, anyhow::Error>;
}

/// Reports healthy whenever the worker gets to run at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct LivenessCheck;

#[async_trait::async_trait]
impl HealthCheck for LivenessCheck {
    async fn check(&self, _item: &WorkItem) -> Result<bool, anyhow::Error> {
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Redelivered,
    Dropped,
}

/// Processes deliveries until every producer of the queue is gone.
/// `redelivery` must not keep the queue open itself (see
/// [`InProcessQueue::downgrade`](crate::work_queue::InProcessQueue::downgrade)),
/// otherwise the worker only stops when aborted.
pub async fn run_worker_until_stopped(
    mut receiver: QueueReceiver,
    redelivery: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    health_check: Arc<dyn HealthCheck>,
    settings: WorkerSettings,
) -> Result<(), anyhow::Error> {
    let permits = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    while let Some(item) = receiver.recv().await {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("The worker semaphore was closed")?;
        let redelivery = Arc::clone(&redelivery);
        let store = Arc::clone(&store);
        let health_check = Arc::clone(&health_check);
        let settings = settings.clone();
        tokio::spawn(async move {
            let outcome =
                execute_health_check(&item, store.as_ref(), health_check.as_ref()).await;
            // Waiting out the redelivery delay must not hold up other deliveries.
            drop(permit);
            if let Err(error) = outcome {
                redeliver_or_drop(item, error, redelivery.as_ref(), &settings).await;
            }
        });
    }
    tracing::info!("Work queue closed, stopping the health check worker");
    Ok(())
}

/// Runs the check and publishes its outcome. Nothing is written when the
/// check itself fails.
#[tracing::instrument(
    name = "Execute health check",
    skip_all,
    fields(
        correlation_id = %item.correlation_id,
        delivery_attempt = item.delivery_attempt
    )
)]
pub async fn execute_health_check(
    item: &WorkItem,
    store: &dyn ResultStore,
    health_check: &dyn HealthCheck,
) -> Result<(), anyhow::Error> {
    let healthy = health_check
        .check(item)
        .await
        .context("The health check failed to complete")?;
    store
        .set(&item.correlation_id, healthy)
        .await
        .context("Failed to publish the health check result")?;
    tracing::info!(healthy, "Published health check result");
    Ok(())
}

#[tracing::instrument(
    name = "Handle failed health check delivery",
    skip_all,
    fields(
        correlation_id = %item.correlation_id,
        delivery_attempt = item.delivery_attempt
    )
)]
pub async fn redeliver_or_drop(
    item: WorkItem,
    error: anyhow::Error,
    queue: &dyn WorkQueue,
    settings: &WorkerSettings,
) -> DeliveryOutcome {
    if item.delivery_attempt >= settings.max_deliveries {
        tracing::error!(
            error.cause_chain = ?error,
            max_deliveries = settings.max_deliveries,
            "Dropping health check after exhausting its deliveries",
        );
        return DeliveryOutcome::Dropped;
    }

    tracing::warn!(
        error.cause_chain = ?error,
        "Health check delivery failed, scheduling a redelivery",
    );
    tokio::time::sleep(settings.redelivery_delay()).await;
    match queue.enqueue(item.redelivery()).await {
        Ok(()) => DeliveryOutcome::Redelivered,
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                "Failed to redeliver health check, dropping it",
            );
            DeliveryOutcome::Dropped
        }
    }
}
