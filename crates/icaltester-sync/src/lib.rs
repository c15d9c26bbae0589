//! Subscription sync: reconciliation, orchestrator, scheduler, public feed.
//!
//! This crate keeps imported events in step with external iCal feeds:
//! - [`reconcile`] computes the added/updated/removed delta
//! - [`SyncOrchestrator`] runs one logged, rescheduled attempt per subscription
//! - [`run_due_batch`] and [`Scheduler`] drive due subscriptions in batches
//! - [`build_public_feed`] renders a calendar's merged outbound feed
//!
//! Storage is abstracted behind [`SyncStore`]; [`MemoryStore`] is the
//! in-process implementation used by the CLI and the tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use icaltester_fetch::{FetchGuard, FetchLimits};
//! use icaltester_sync::{MemoryStore, SyncOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let guard = FetchGuard::new(FetchLimits::default())?;
//!     let orchestrator = SyncOrchestrator::new(store, guard);
//!
//!     let outcome = orchestrator.sync_subscription("sub-1").await?;
//!     println!("{:?}", outcome.result());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod feed;
mod memory;
mod model;
mod orchestrator;
mod reconcile;
mod scheduler;
mod store;

#[cfg(test)]
mod testing;

pub use config::SyncConfig;
pub use error::{StoreError, StoreResult, SyncError};
pub use feed::{FeedError, PublicFeed, build_public_feed, build_public_feed_at, hash_feed_token};
pub use memory::{MemoryStore, StoreSnapshot};
pub use model::{
    FeedCalendar, ImportedEvent, Subscription, SyncDirection, SyncLogEntry, SyncStateUpdate,
    SyncStatus,
};
pub use orchestrator::{SyncCounts, SyncOrchestrator, SyncOutcome, SyncStage};
pub use reconcile::{ReconcileContext, Reconciliation, reconcile};
pub use scheduler::{
    BatchReport, Scheduler, SchedulerCommand, SchedulerHandle, SchedulerState,
    SharedSchedulerState, run_due_batch,
};
pub use store::SyncStore;
