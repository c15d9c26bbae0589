//! One subscription's sync attempt.
//!
//! An attempt walks `Validating -> Fetching -> Parsing -> Reconciling ->
//! Persisting -> Logging -> Done`, and any of the first five stages can end
//! in `Failed`. Whatever happens, the attempt is logged and the subscription
//! is rescheduled to `now + poll_interval_sec`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use icaltester_core::parse_calendar;
use icaltester_fetch::{FetchGuard, HttpTransport, ReqwestTransport};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::SyncError;
use crate::model::{Subscription, SyncDirection, SyncLogEntry, SyncStateUpdate, SyncStatus};
use crate::reconcile::{ReconcileContext, reconcile};
use crate::store::SyncStore;

/// Stage of a sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStage {
    Validating,
    Fetching,
    Parsing,
    Reconciling,
    Persisting,
    Logging,
    Done,
    Failed,
}

impl SyncStage {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Reconciling => "reconciling",
            Self::Persisting => "persisting",
            Self::Logging => "logging",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Added/updated/removed counts of one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Structured result of one attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub subscription_id: String,
    pub status: SyncStatus,
    /// Failure message, as written to the log and `last_error`.
    pub error: Option<String>,
    /// Stage the attempt failed in, if it failed.
    pub failed_stage: Option<SyncStage>,
    pub counts: SyncCounts,
    pub http_status: Option<u16>,
    pub bytes: Option<u64>,
    pub vevent_count: Option<usize>,
    pub ran_at: DateTime<Utc>,
    pub next_due_at: DateTime<Utc>,
}

impl SyncOutcome {
    /// Returns true if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }

    /// Returns the counts on success, or the failure message.
    pub fn result(&self) -> Result<SyncCounts, &str> {
        match &self.error {
            None => Ok(self.counts),
            Some(message) => Err(message),
        }
    }
}

/// Telemetry gathered as the attempt progresses; unreached stages stay `None`.
#[derive(Debug, Default)]
struct Progress {
    stage: Option<SyncStage>,
    counts: SyncCounts,
    http_status: Option<u16>,
    bytes: Option<u64>,
    vevent_count: Option<usize>,
}

impl Progress {
    fn enter(&mut self, stage: SyncStage) {
        debug!(stage = %stage, "Entering stage");
        self.stage = Some(stage);
    }
}

/// Runs sync attempts against a store through a fetch guard.
///
/// Holds no per-subscription state, so attempts for different subscriptions
/// can run concurrently on one orchestrator.
pub struct SyncOrchestrator<S, T = ReqwestTransport> {
    store: Arc<S>,
    guard: FetchGuard<T>,
}

impl<S, T> SyncOrchestrator<S, T>
where
    S: SyncStore,
    T: HttpTransport,
{
    /// Creates an orchestrator.
    pub fn new(store: Arc<S>, guard: FetchGuard<T>) -> Self {
        Self { store, guard }
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the fetch guard.
    pub fn guard(&self) -> &FetchGuard<T> {
        &self.guard
    }

    /// Syncs the subscription with the given id.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionNotFound` for an unknown id, or `Persistence` if
    /// the subscription cannot be loaded. Nothing is logged in either case.
    /// Every later failure is reported through the returned [`SyncOutcome`].
    pub async fn sync_subscription(&self, id: &str) -> Result<SyncOutcome, SyncError> {
        let subscription = self
            .store
            .get_subscription(id)
            .await?
            .ok_or_else(|| SyncError::not_found(id))?;
        Ok(self.sync(&subscription).await)
    }

    /// Runs one attempt for an already loaded subscription.
    pub async fn sync(&self, subscription: &Subscription) -> SyncOutcome {
        let span = info_span!(
            "sync",
            subscription_id = %subscription.id,
            calendar_id = %subscription.calendar_id
        );
        self.run_attempt(subscription).instrument(span).await
    }

    async fn run_attempt(&self, subscription: &Subscription) -> SyncOutcome {
        let ran_at = Utc::now();
        let mut progress = Progress::default();

        let result = self.attempt(subscription, &mut progress).await;

        let failed_stage = result.as_ref().err().and(progress.stage);
        let error = result.err().map(|e| e.to_string());
        match (&error, failed_stage) {
            (Some(message), Some(stage)) => {
                warn!(stage = %stage, error = %message, "Sync failed");
            }
            _ => info!(
                added = progress.counts.added,
                updated = progress.counts.updated,
                removed = progress.counts.removed,
                vevent_count = progress.vevent_count,
                "Sync completed"
            ),
        }

        progress.enter(SyncStage::Logging);
        let status = if error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Success
        };
        let entry = SyncLogEntry {
            calendar_id: subscription.calendar_id.clone(),
            subscription_id: subscription.id.clone(),
            direction: SyncDirection::Import,
            status,
            message: error.clone(),
            events_added: progress.counts.added,
            events_updated: progress.counts.updated,
            events_removed: progress.counts.removed,
            http_status: progress.http_status,
            bytes: progress.bytes,
            vevent_count: progress.vevent_count,
            ran_at,
        };
        if let Err(e) = self.store.append_sync_log(entry).await {
            error!(error = %e, "Failed to append sync log");
        }

        let finished_at = Utc::now();
        let next_due_at = subscription.next_due_after(finished_at);
        let update = SyncStateUpdate {
            last_synced_at: finished_at,
            last_status: progress.http_status,
            last_error: error.clone(),
            next_due_at,
        };
        if let Err(e) = self
            .store
            .update_subscription_sync_state(&subscription.id, update)
            .await
        {
            error!(error = %e, "Failed to update subscription sync state");
        }
        debug!(next_due_at = %next_due_at, "Rescheduled");

        SyncOutcome {
            subscription_id: subscription.id.clone(),
            status,
            error,
            failed_stage,
            counts: progress.counts,
            http_status: progress.http_status,
            bytes: progress.bytes,
            vevent_count: progress.vevent_count,
            ran_at,
            next_due_at,
        }
    }

    async fn attempt(
        &self,
        subscription: &Subscription,
        progress: &mut Progress,
    ) -> Result<(), SyncError> {
        progress.enter(SyncStage::Validating);
        let user_id = subscription
            .user_id
            .as_deref()
            .filter(|user| !user.is_empty())
            .ok_or(SyncError::MissingOwner)?;
        self.guard.validate(&subscription.ical_url)?;
        let existing = self.store.imported_event_uids(&subscription.id).await?;

        progress.enter(SyncStage::Fetching);
        let fetched = self.guard.fetch_text(&subscription.ical_url).await?;
        progress.http_status = Some(fetched.status);
        progress.bytes = Some(fetched.bytes);
        if !fetched.is_success() {
            return Err(SyncError::FetchFailed {
                status: fetched.status,
            });
        }

        progress.enter(SyncStage::Parsing);
        let parsed = parse_calendar(&fetched.text);
        progress.vevent_count = Some(parsed.events.len());
        if parsed.dropped_blocks > 0 {
            debug!(dropped = parsed.dropped_blocks, "Skipped incomplete VEVENT blocks");
        }

        progress.enter(SyncStage::Reconciling);
        let ctx = ReconcileContext {
            subscription,
            user_id,
            now: Utc::now(),
        };
        let delta = reconcile(&existing, &parsed.events, ctx);
        // Recorded only once both writes have landed.
        let counts = SyncCounts {
            added: delta.added,
            updated: delta.updated,
            removed: delta.removed,
        };

        progress.enter(SyncStage::Persisting);
        if !delta.upserts.is_empty() {
            self.store.upsert_imported_events(delta.upserts).await?;
        }
        if !delta.stale_uids.is_empty() {
            self.store
                .delete_imported_events(&subscription.id, delta.stale_uids)
                .await?;
        }
        progress.counts = counts;

        progress.enter(SyncStage::Done);
        Ok(())
    }
}
