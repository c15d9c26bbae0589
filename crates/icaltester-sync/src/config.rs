//! Sync configuration.

use std::time::Duration;

use icaltester_fetch::FetchLimits;

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Limits applied to every feed fetch.
    pub fetch: FetchLimits,

    /// Maximum subscriptions claimed per batch.
    pub batch_size: usize,

    /// Maximum subscriptions synced at the same time within a batch.
    pub concurrency: usize,

    /// How far a claim pushes `next_due_at` while the sync runs.
    pub claim_lease: Duration,

    /// Interval between batch runs in the scheduler loop.
    pub tick_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch: FetchLimits::default(),
            batch_size: 25,
            concurrency: 4,
            claim_lease: Duration::from_secs(120),
            tick_interval: Duration::from_secs(60),
        }
    }
}

impl SyncConfig {
    /// Creates a configuration with the given fetch limits.
    pub fn new(fetch: FetchLimits) -> Self {
        Self {
            fetch,
            ..Default::default()
        }
    }

    /// Builder: set batch size (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builder: set concurrency (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Builder: set claim lease.
    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    /// Builder: set tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}
