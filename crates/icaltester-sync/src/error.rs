//! Sync error types.

use std::io;

use icaltester_fetch::{FetchError, UrlRejection};
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`SyncStore`](crate::SyncStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error reading or writing persisted state.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Persisted state could not be encoded or decoded.
    #[error("State file error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Any other backend failure, carried as-is.
    #[error("{message}")]
    Backend { message: String },
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Errors from one sync attempt.
///
/// Only [`SyncError::SubscriptionNotFound`] escapes
/// [`SyncOrchestrator::sync_subscription`](crate::SyncOrchestrator::sync_subscription);
/// the rest end up as the message of a failed attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The stored feed URL failed validation.
    #[error("ical_url invalid: {0}")]
    UrlRejected(#[from] UrlRejection),

    /// The guarded fetch failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The feed answered with a non-2xx status.
    #[error("Fetch failed: {status}")]
    FetchFailed { status: u16 },

    /// Storage failure.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// No subscription with this id.
    #[error("Subscription not found: {id}")]
    SubscriptionNotFound { id: String },

    /// The subscription's calendar has no owning user.
    #[error("Missing calendar owner")]
    MissingOwner,
}

impl SyncError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::SubscriptionNotFound { id: id.into() }
    }

    /// Returns true for URL rejections and SSRF blocks, wherever they happened.
    pub fn is_ssrf(&self) -> bool {
        match self {
            Self::UrlRejected(rejection) => rejection.is_ssrf(),
            Self::Fetch(err) => err.code() == icaltester_fetch::FetchErrorCode::SsrfBlocked,
            _ => false,
        }
    }

    /// Returns true if the next scheduled attempt may succeed without
    /// anyone changing the subscription.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_retryable(),
            Self::FetchFailed { status } => *status >= 500 || *status == 429,
            Self::Persistence(_) => true,
            _ => false,
        }
    }
}
