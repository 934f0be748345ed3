use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::domain::CorrelationId;

/// Shared key-value store through which the worker publishes outcomes and
/// the request handler observes them.
#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, correlation_id: &CorrelationId) -> Result<Option<bool>, anyhow::Error>;

    /// Last write wins.
    async fn set(&self, correlation_id: &CorrelationId, outcome: bool)
    -> Result<(), anyhow::Error>;
}

#[derive(Debug, Clone, Copy)]
struct ResultEntry {
    outcome: bool,
    written_at: Instant,
}

/// Process-local store. Entries older than `entry_ttl` read as absent and are
/// removed by [`InMemoryResultStore::purge_expired`], which reclaims the
/// results that arrive after a request has already given up.
#[derive(Debug)]
pub struct InMemoryResultStore {
    entries: DashMap<CorrelationId, ResultEntry>,
    entry_ttl: Duration,
}

impl InMemoryResultStore {
    pub fn new(entry_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            entry_ttl,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &ResultEntry, now: Instant) -> bool {
        now.duration_since(entry.written_at) >= self.entry_ttl
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait::async_trait]
impl ResultStore for InMemoryResultStore {
    async fn get(&self, correlation_id: &CorrelationId) -> Result<Option<bool>, anyhow::Error> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(correlation_id)
            .filter(|entry| !self.is_expired(entry, now))
            .map(|entry| entry.outcome))
    }

    async fn set(
        &self,
        correlation_id: &CorrelationId,
        outcome: bool,
    ) -> Result<(), anyhow::Error> {
        self.entries.insert(
            correlation_id.clone(),
            ResultEntry {
                outcome,
                written_at: Instant::now(),
            },
        );
        Ok(())
    }
}

/// Sweeps expired entries every `interval` for as long as the application runs.
pub async fn run_reaper_until_stopped(
    store: Arc<InMemoryResultStore>,
    interval: Duration,
) -> Result<(), anyhow::Error> {
    if interval.is_zero() {
        anyhow::bail!("The result store reap interval must be greater than zero.");
    }
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let purged = store.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired health check results");
        }
    }
}
