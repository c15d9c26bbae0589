//! In-memory [`SyncStore`] with optional JSON persistence.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use icaltester_core::Booking;
use icaltester_fetch::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::StoreResult;
use crate::model::{FeedCalendar, ImportedEvent, Subscription, SyncLogEntry, SyncStateUpdate};
use crate::store::SyncStore;

/// Everything a [`MemoryStore`] holds, in the shape of its state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub calendars: Vec<FeedCalendar>,
    /// Manual bookings keyed by calendar id.
    pub bookings: BTreeMap<String, Vec<Booking>>,
    pub subscriptions: Vec<Subscription>,
    pub imported_events: Vec<ImportedEvent>,
    pub sync_logs: Vec<SyncLogEntry>,
}

/// A store that keeps everything behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Loads a store from a JSON state file. A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "State file not found, starting empty");
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            subscriptions = snapshot.subscriptions.len(),
            imported = snapshot.imported_events.len(),
            "Loaded state file"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the current state to `path`, replacing it atomically.
    pub async fn save(&self, path: &Path) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(&*self.state.read().await)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Saved state file");
        Ok(())
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }

    /// Adds or replaces a calendar.
    pub async fn put_calendar(&self, calendar: FeedCalendar) {
        let mut state = self.state.write().await;
        state.calendars.retain(|c| c.id != calendar.id);
        state.calendars.push(calendar);
    }

    /// Adds a manual booking to a calendar.
    pub async fn add_booking(&self, calendar_id: impl Into<String>, booking: Booking) {
        self.state
            .write()
            .await
            .bookings
            .entry(calendar_id.into())
            .or_default()
            .push(booking);
    }

    /// Adds or replaces a subscription.
    pub async fn put_subscription(&self, subscription: Subscription) {
        let mut state = self.state.write().await;
        state.subscriptions.retain(|s| s.id != subscription.id);
        state.subscriptions.push(subscription);
    }

    /// Returns the imported events of one subscription, ordered by `source_uid`.
    pub async fn imported_events_for(&self, subscription_id: &str) -> Vec<ImportedEvent> {
        let mut rows: Vec<_> = self
            .state
            .read()
            .await
            .imported_events
            .iter()
            .filter(|e| e.subscription_id == subscription_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.source_uid.cmp(&b.source_uid));
        rows
    }

    /// Returns the sync log rows of one subscription, in insertion order.
    pub async fn sync_logs_for(&self, subscription_id: &str) -> Vec<SyncLogEntry> {
        self.state
            .read()
            .await
            .sync_logs
            .iter()
            .filter(|l| l.subscription_id == subscription_id)
            .cloned()
            .collect()
    }
}

impl SyncStore for MemoryStore {
    fn get_subscription<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Subscription>>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.subscriptions.iter().find(|s| s.id == id).cloned())
        })
    }

    fn imported_event_uids<'a>(
        &'a self,
        subscription_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .imported_events
                .iter()
                .filter(|e| e.subscription_id == subscription_id)
                .map(|e| e.source_uid.clone())
                .collect())
        })
    }

    fn upsert_imported_events(&self, rows: Vec<ImportedEvent>) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            for row in rows {
                let existing = state.imported_events.iter().position(|e| {
                    e.subscription_id == row.subscription_id && e.source_uid == row.source_uid
                });
                match existing {
                    Some(i) => state.imported_events[i] = row,
                    None => state.imported_events.push(row),
                }
            }
            trace!(total = state.imported_events.len(), "Upserted imported events");
            Ok(())
        })
    }

    fn delete_imported_events<'a>(
        &'a self,
        subscription_id: &'a str,
        source_uids: Vec<String>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let stale: HashSet<String> = source_uids.into_iter().collect();
            self.state.write().await.imported_events.retain(|e| {
                !(e.subscription_id == subscription_id && stale.contains(&e.source_uid))
            });
            Ok(())
        })
    }

    fn append_sync_log(&self, entry: SyncLogEntry) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.state.write().await.sync_logs.push(entry);
            Ok(())
        })
    }

    fn update_subscription_sync_state<'a>(
        &'a self,
        id: &'a str,
        update: SyncStateUpdate,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if let Some(sub) = state.subscriptions.iter_mut().find(|s| s.id == id) {
                sub.last_synced_at = Some(update.last_synced_at);
                sub.last_status = update.last_status;
                sub.last_error = update.last_error;
                sub.next_due_at = Some(update.next_due_at);
            }
            Ok(())
        })
    }

    fn claim_due_subscriptions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> BoxFuture<'_, StoreResult<Vec<Subscription>>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let leased_until = chrono::Duration::from_std(lease)
                .ok()
                .and_then(|lease| now.checked_add_signed(lease))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);

            let mut due: Vec<usize> = state
                .subscriptions
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_due(now))
                .map(|(i, _)| i)
                .collect();
            due.sort_by_key(|&i| state.subscriptions[i].next_due_at);
            due.truncate(limit);

            let claimed = due
                .into_iter()
                .map(|i| {
                    let sub = &mut state.subscriptions[i];
                    let snapshot = sub.clone();
                    sub.next_due_at = Some(leased_until);
                    snapshot
                })
                .collect::<Vec<_>>();
            debug!(claimed = claimed.len(), "Claimed due subscriptions");
            Ok(claimed)
        })
    }

    fn find_calendar_by_token_hash<'a>(
        &'a self,
        token_hash: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<FeedCalendar>>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .calendars
                .iter()
                .find(|c| c.feed_token_hash.eq_ignore_ascii_case(token_hash))
                .cloned())
        })
    }

    fn list_bookings<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Booking>>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut bookings = state.bookings.get(calendar_id).cloned().unwrap_or_default();
            bookings.sort_by_key(|b| b.start_date);
            Ok(bookings)
        })
    }

    fn list_imported_events<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<ImportedEvent>>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .imported_events
                .iter()
                .filter(|e| e.calendar_id == calendar_id)
                .cloned()
                .collect())
        })
    }
}
