//! Test doubles shared by the sync tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use icaltester_core::Booking;
use icaltester_fetch::{
    BoxFuture, FetchError, FetchResult, HttpTransport, ResponseBody, TransportResponse,
};
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::model::{FeedCalendar, ImportedEvent, Subscription, SyncLogEntry, SyncStateUpdate};
use crate::store::SyncStore;

/// An enabled subscription owned by `owner-1`, polled every 600 s, due now.
pub fn subscription(id: &str, url: &str) -> Subscription {
    Subscription::new(id, "cal-1", url)
        .with_owner("owner-1")
        .with_poll_interval(600)
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    location: Option<String>,
    body: Vec<u8>,
    delay: Option<Duration>,
}

impl StubResponse {
    pub fn ok(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            location: None,
            body: body.as_bytes().to_vec(),
            delay: None,
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            location: Some(location.to_string()),
            body: Vec::new(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Transport answering from a URL-keyed table and recording every request.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, StubResponse>>,
    requested: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: StubResponse) -> Self {
        self.set(url, response);
        self
    }

    pub fn set(&self, url: &str, response: StubResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

struct StubBody(VecDeque<Vec<u8>>);

impl ResponseBody for StubBody {
    fn next_chunk(&mut self) -> BoxFuture<'_, FetchResult<Option<Vec<u8>>>> {
        Box::pin(async move { Ok(self.0.pop_front()) })
    }
}

impl HttpTransport for StubTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, FetchResult<TransportResponse>> {
        Box::pin(async move {
            self.requested.lock().unwrap().push(url.to_string());
            let response = self
                .routes
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::network(format!("connection refused: {}", url)))?;
            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(TransportResponse {
                status: response.status,
                location: response.location,
                content_length: Some(response.body.len() as u64),
                body: Box::new(StubBody(VecDeque::from([response.body]))),
            })
        })
    }
}

/// A [`MemoryStore`] whose upserts can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_upserts: bool,
}

impl FailingStore {
    pub fn failing_upserts() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_upserts: true,
        }
    }
}

impl SyncStore for FailingStore {
    fn get_subscription<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<Subscription>>> {
        self.inner.get_subscription(id)
    }

    fn imported_event_uids<'a>(
        &'a self,
        subscription_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<HashSet<String>>> {
        self.inner.imported_event_uids(subscription_id)
    }

    fn upsert_imported_events(&self, rows: Vec<ImportedEvent>) -> BoxFuture<'_, StoreResult<()>> {
        if self.fail_upserts {
            return Box::pin(async { Err(StoreError::backend("upsert rejected")) });
        }
        self.inner.upsert_imported_events(rows)
    }

    fn delete_imported_events<'a>(
        &'a self,
        subscription_id: &'a str,
        source_uids: Vec<String>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        self.inner.delete_imported_events(subscription_id, source_uids)
    }

    fn append_sync_log(&self, entry: SyncLogEntry) -> BoxFuture<'_, StoreResult<()>> {
        self.inner.append_sync_log(entry)
    }

    fn update_subscription_sync_state<'a>(
        &'a self,
        id: &'a str,
        update: SyncStateUpdate,
    ) -> BoxFuture<'a, StoreResult<()>> {
        self.inner.update_subscription_sync_state(id, update)
    }

    fn claim_due_subscriptions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease: Duration,
    ) -> BoxFuture<'_, StoreResult<Vec<Subscription>>> {
        self.inner.claim_due_subscriptions(now, limit, lease)
    }

    fn find_calendar_by_token_hash<'a>(
        &'a self,
        token_hash: &'a str,
    ) -> BoxFuture<'a, StoreResult<Option<FeedCalendar>>> {
        self.inner.find_calendar_by_token_hash(token_hash)
    }

    fn list_bookings<'a>(&'a self, calendar_id: &'a str) -> BoxFuture<'a, StoreResult<Vec<Booking>>> {
        self.inner.list_bookings(calendar_id)
    }

    fn list_imported_events<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<ImportedEvent>>> {
        self.inner.list_imported_events(calendar_id)
    }
}
