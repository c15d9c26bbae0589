//! Persisted records: subscriptions, imported events, sync logs, calendars.

use chrono::{DateTime, Duration, Utc};
use icaltester_core::{CalendarDate, CalendarEvent, EventStatus, FeedEvent};
use serde::{Deserialize, Serialize};

/// A subscription to an external iCal feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub calendar_id: String,
    /// Owner of the calendar; imported rows are attributed to this user.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub ical_url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between syncs. Zero means manual-only.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_sec: u64,
    #[serde(default)]
    pub next_due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// HTTP status of the last attempt, if a response was received.
    #[serde(default)]
    pub last_status: Option<u16>,
    #[serde(default)]
    pub last_error: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    Subscription::DEFAULT_POLL_INTERVAL_SEC
}

impl Subscription {
    /// Default poll interval in seconds.
    pub const DEFAULT_POLL_INTERVAL_SEC: u64 = 300;

    /// Creates an enabled subscription due immediately.
    pub fn new(
        id: impl Into<String>,
        calendar_id: impl Into<String>,
        ical_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            user_id: None,
            name: String::new(),
            ical_url: ical_url.into(),
            enabled: true,
            poll_interval_sec: Self::DEFAULT_POLL_INTERVAL_SEC,
            next_due_at: Some(Utc::now()),
            last_synced_at: None,
            last_status: None,
            last_error: None,
        }
    }

    /// Builder: set the owning user.
    pub fn with_owner(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builder: set the poll interval.
    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.poll_interval_sec = seconds;
        self
    }

    /// Returns true if the batch driver should consider this subscription.
    pub fn is_scheduled(&self) -> bool {
        self.enabled && self.poll_interval_sec > 0
    }

    /// Returns true if the subscription is scheduled and due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_scheduled() && self.next_due_at.is_none_or(|due| due <= now)
    }

    /// Next due time after an attempt that finished at `finished_at`.
    pub fn next_due_after(&self, finished_at: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.poll_interval_sec).unwrap_or(i64::MAX);
        Duration::try_seconds(secs)
            .and_then(|interval| finished_at.checked_add_signed(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Sync-state fields written once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStateUpdate {
    pub last_synced_at: DateTime<Utc>,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub next_due_at: DateTime<Utc>,
}

/// An event imported from a subscription, keyed by `(subscription_id, source_uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedEvent {
    pub subscription_id: String,
    pub calendar_id: String,
    pub user_id: String,
    /// UID assigned by the remote calendar.
    pub source_uid: String,
    pub start_date: CalendarDate,
    pub end_date: CalendarDate,
    pub summary: String,
    pub status: EventStatus,
    pub updated_at: DateTime<Utc>,
}

impl ImportedEvent {
    /// Builds a row from a parsed event.
    pub fn from_event(
        event: &CalendarEvent,
        subscription: &Subscription,
        user_id: &str,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id: subscription.id.clone(),
            calendar_id: subscription.calendar_id.clone(),
            user_id: user_id.to_string(),
            source_uid: event.uid.clone(),
            start_date: event.start,
            end_date: event.end,
            summary: event.summary.clone(),
            status: event.status,
            updated_at,
        }
    }

    /// UID used when the event is re-published in a calendar feed.
    pub fn feed_uid(&self) -> String {
        format!("i-{}-{}@icaltester", self.subscription_id, self.source_uid)
    }

    /// Returns the feed entry for this event.
    pub fn to_feed_event(&self) -> FeedEvent {
        FeedEvent::new(
            self.feed_uid(),
            self.start_date,
            self.end_date,
            self.summary.clone(),
            self.status.into(),
        )
    }
}

/// Sync direction. Only imports exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    #[default]
    Import,
}

/// Outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

impl SyncStatus {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// One row per sync attempt. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub calendar_id: String,
    pub subscription_id: String,
    pub direction: SyncDirection,
    pub status: SyncStatus,
    /// Failure message; `None` on success.
    pub message: Option<String>,
    pub events_added: usize,
    pub events_updated: usize,
    pub events_removed: usize,
    pub http_status: Option<u16>,
    pub bytes: Option<u64>,
    pub vevent_count: Option<usize>,
    /// When the attempt started.
    pub ran_at: DateTime<Utc>,
}

/// A calendar as seen by the public feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCalendar {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub include_imported_in_export: bool,
    /// SHA-256 hex digest of the feed token.
    pub feed_token_hash: String,
}
