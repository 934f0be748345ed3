use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt::Formatter;

use crate::utility::error_chain_fmt;
use crate::work_queue::EnqueueError;

#[derive(thiserror::Error)]
pub enum HealthCheckError {
    #[error("Failed to enqueue the health check.")]
    Enqueue(#[source] EnqueueError),
    #[error("No health check result showed up after {attempts} attempts.")]
    TimedOut { attempts: u32 },
}

impl std::fmt::Debug for HealthCheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for HealthCheckError {
    fn status_code(&self) -> StatusCode {
        match self {
            HealthCheckError::Enqueue(_) | HealthCheckError::TimedOut { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Failures carry no payload, only the status.
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code()).finish()
    }
}
