//! Storage interface consumed by the orchestrator, batch driver and feed.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use icaltester_core::Booking;
use icaltester_fetch::BoxFuture;

use crate::error::StoreResult;
use crate::model::{FeedCalendar, ImportedEvent, Subscription, SyncLogEntry, SyncStateUpdate};

/// Persistence for subscriptions, imported events and sync logs.
///
/// Implementations must make `upsert_imported_events` and
/// `delete_imported_events` idempotent and scoped by subscription.
pub trait SyncStore: Send + Sync {
    /// Looks up one subscription.
    fn get_subscription<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Subscription>>>;

    /// Returns the `source_uid`s currently persisted for a subscription.
    fn imported_event_uids<'a>(
        &'a self,
        subscription_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>>;

    /// Inserts or replaces rows keyed by `(subscription_id, source_uid)`.
    fn upsert_imported_events(&self, rows: Vec<ImportedEvent>) -> BoxFuture<'_, StoreResult<()>>;

    /// Deletes the given `source_uid`s of one subscription.
    fn delete_imported_events<'a>(
        &'a self,
        subscription_id: &'a str,
        source_uids: Vec<String>,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Appends one sync log row.
    fn append_sync_log(&self, entry: SyncLogEntry) -> BoxFuture<'_, StoreResult<()>>;

    /// Writes the sync-state fields of a subscription.
    fn update_subscription_sync_state<'a>(
        &'a self,
        id: &'a str,
        update: SyncStateUpdate,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Claims up to `limit` due subscriptions, oldest `next_due_at` first.
    ///
    /// Claiming moves `next_due_at` to `now + lease` so a concurrent caller
    /// does not pick up the same subscription while it is being synced.
    fn claim_due_subscriptions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> BoxFuture<'_, StoreResult<Vec<Subscription>>>;

    /// Finds the calendar whose feed token hashes to `token_hash`.
    fn find_calendar_by_token_hash<'a>(
        &'a self,
        token_hash: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<FeedCalendar>>>;

    /// Returns the manual bookings of a calendar, ordered by start date.
    fn list_bookings<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Booking>>>;

    /// Returns every imported event of a calendar, across subscriptions.
    fn list_imported_events<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<ImportedEvent>>>;
}
