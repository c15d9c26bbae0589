//! Public calendar feed: manual bookings plus, optionally, imported events.

use chrono::{DateTime, Utc};
use icaltester_core::{CalendarDocument, FeedEvent, build_calendar_text_at};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::error::StoreError;
use crate::store::SyncStore;

/// Errors from [`build_public_feed`].
#[derive(Debug, Error)]
pub enum FeedError {
    /// No calendar matches the token.
    #[error("Calendar not found")]
    NotFound,

    /// Storage failure while assembling the feed.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// A rendered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFeed {
    pub calendar_id: String,
    pub calendar_name: String,
    pub event_count: usize,
    /// iCalendar text, CRLF-terminated.
    pub text: String,
}

/// Returns the lowercase SHA-256 hex digest of a feed token.
pub fn hash_feed_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Renders the feed of the calendar whose token is `token`.
pub async fn build_public_feed<S: SyncStore + ?Sized>(
    store: &S,
    token: &str,
) -> Result<PublicFeed, FeedError> {
    build_public_feed_at(store, token, Utc::now()).await
}

/// Like [`build_public_feed`], stamping events with `stamped_at`.
pub async fn build_public_feed_at<S: SyncStore + ?Sized>(
    store: &S,
    token: &str,
    stamped_at: DateTime<Utc>,
) -> Result<PublicFeed, FeedError> {
    let token_hash = hash_feed_token(token);
    debug!(token_hash_prefix = &token_hash[..8], "Resolving feed");

    let calendar = store
        .find_calendar_by_token_hash(&token_hash)
        .await?
        .ok_or(FeedError::NotFound)?;

    let mut events: Vec<FeedEvent> = store
        .list_bookings(&calendar.id)
        .await?
        .iter()
        .map(FeedEvent::from)
        .collect();

    if calendar.include_imported_in_export {
        let imported = store.list_imported_events(&calendar.id).await?;
        events.extend(imported.iter().map(|e| e.to_feed_event()));
    }

    let event_count = events.len();
    let document = CalendarDocument::new(calendar.name.clone()).with_events(events);
    let text = build_calendar_text_at(&document, stamped_at);
    debug!(calendar_id = %calendar.id, events = event_count, "Generated feed");

    Ok(PublicFeed {
        calendar_id: calendar.id,
        calendar_name: calendar.name,
        event_count,
        text,
    })
}
