use std::num::NonZeroU32;
use std::time::Duration;

use crate::domain::CorrelationId;
use crate::result_store::ResultStore;

pub const DEFAULT_MAX_TRIES: NonZeroU32 = NonZeroU32::new(30).unwrap();
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed-interval polling budget. The worst-case wait is roughly
/// `max_tries * sleep_interval`.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub max_tries: NonZeroU32,
    pub sleep_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { reads: u32 },
    TimedOut { reads: u32, sleeps: u32 },
}

/// Reads `store` until a truthy result shows up for `correlation_id` or the
/// budget runs out. There is no pause after the last attempt.
#[tracing::instrument(
    name = "Wait for health check result",
    skip(store, settings),
    fields(max_tries = settings.max_tries.get())
)]
pub async fn wait_for_result<S>(
    store: &S,
    correlation_id: &CorrelationId,
    settings: &PollSettings,
) -> PollOutcome
where
    S: ResultStore + ?Sized,
{
    let max_tries = settings.max_tries.get();
    let mut sleeps = 0;
    for attempt in 1..=max_tries {
        match store.get(correlation_id).await {
            Ok(Some(true)) => return PollOutcome::Ready { reads: attempt },
            Ok(_) => {}
            Err(error) => {
                // A failed read costs an attempt, same as a missing result.
                tracing::warn!(
                    error.cause_chain = ?error,
                    attempt,
                    "Failed to read the health check result",
                );
            }
        }

        if attempt < max_tries {
            tracing::debug!(
                attempt,
                max_tries,
                sleep_interval = ?settings.sleep_interval,
                "Health check result not ready. Retrying after sleep.",
            );
            tokio::time::sleep(settings.sleep_interval).await;
            sleeps += 1;
        }
    }

    tracing::error!("Timed out waiting for health check result");
    PollOutcome::TimedOut {
        reads: max_tries,
        sleeps,
    }
}
