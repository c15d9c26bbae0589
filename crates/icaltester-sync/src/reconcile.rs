//! Three-way delta between persisted and freshly parsed events.
//!
//! Every parsed event whose UID is already persisted counts as updated,
//! whether or not any field changed. `updated` is therefore always
//! `parsed.len() - added`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use icaltester_core::CalendarEvent;

use crate::model::{ImportedEvent, Subscription};

/// Who the reconciled rows belong to and when they were written.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub subscription: &'a Subscription,
    pub user_id: &'a str,
    pub now: DateTime<Utc>,
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// One row per parsed event, in input order.
    pub upserts: Vec<ImportedEvent>,
    /// Persisted UIDs missing from the parsed set, sorted.
    pub stale_uids: Vec<String>,
}

impl Reconciliation {
    /// Returns true if applying this delta changes nothing but `updated_at`.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Computes the delta between `existing` UIDs and `parsed` events.
pub fn reconcile(
    existing: &HashSet<String>,
    parsed: &[CalendarEvent],
    ctx: ReconcileContext<'_>,
) -> Reconciliation {
    let added = parsed.iter().filter(|e| !existing.contains(&e.uid)).count();
    let updated = parsed.len() - added;

    let upserts = parsed
        .iter()
        .map(|event| ImportedEvent::from_event(event, ctx.subscription, ctx.user_id, ctx.now))
        .collect();

    let fresh: HashSet<&str> = parsed.iter().map(|e| e.uid.as_str()).collect();
    let mut stale_uids: Vec<String> = existing
        .iter()
        .filter(|uid| !fresh.contains(uid.as_str()))
        .cloned()
        .collect();
    stale_uids.sort();

    Reconciliation {
        added,
        updated,
        removed: stale_uids.len(),
        upserts,
        stale_uids,
    }
}
