pub mod error;

use actix_web::{HttpResponse, web};
pub use error::HealthCheckError;

use crate::domain::CorrelationIdGenerator;
use crate::poller::{PollOutcome, PollSettings, wait_for_result};
use crate::result_store::ResultStore;
use crate::work_queue::{WorkItem, WorkQueue};

#[tracing::instrument(
    name = "Run a queued health check",
    skip_all,
    fields(correlation_id = tracing::field::Empty)
)]
pub async fn health_check(
    generator: web::Data<CorrelationIdGenerator>,
    queue: web::Data<dyn WorkQueue>,
    store: web::Data<dyn ResultStore>,
    poll_settings: web::Data<PollSettings>,
) -> Result<HttpResponse, HealthCheckError> {
    let correlation_id = generator.generate();
    tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));

    // No polling unless the work item actually made it onto the queue.
    queue
        .enqueue(WorkItem::new(correlation_id.clone()))
        .await
        .map_err(HealthCheckError::Enqueue)?;

    match wait_for_result(store.get_ref(), &correlation_id, &poll_settings).await {
        PollOutcome::Ready { .. } => Ok(HttpResponse::NoContent().finish()),
        PollOutcome::TimedOut { reads, .. } => Err(HealthCheckError::TimedOut { attempts: reads }),
    }
}
