//! Client error types.

use std::fmt;

use icaltester_fetch::{FetchError, UrlRejection};
use icaltester_sync::{FeedError, StoreError, SyncError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Bad input file or argument.
    Input(String),
    /// IO error.
    Io(std::io::Error),
    /// JSON encoding or decoding failed.
    Json(serde_json::Error),
    /// URL refused by the fetch guard.
    UrlRejected(UrlRejection),
    /// Guarded fetch failed.
    Fetch(FetchError),
    /// The server answered with a non-2xx status.
    HttpStatus(u16),
    /// Sync failed before an attempt could start.
    Sync(SyncError),
    /// A requested sync attempt ran and failed.
    SyncFailed(String),
    /// State file could not be read or written.
    Store(StoreError),
    /// Feed could not be rendered.
    Feed(FeedError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Json(err) => write!(f, "JSON error: {}", err),
            Self::UrlRejected(rejection) => {
                write!(f, "URL rejected ({}): {}", rejection.as_str(), rejection)
            }
            Self::Fetch(err) => write!(f, "fetch failed: {}", err),
            Self::HttpStatus(status) => write!(f, "server answered HTTP {}", status),
            Self::Sync(err) => write!(f, "sync error: {}", err),
            Self::SyncFailed(msg) => write!(f, "sync failed: {}", msg),
            Self::Store(err) => write!(f, "state error: {}", err),
            Self::Feed(err) => write!(f, "feed error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UrlRejected(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Feed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<UrlRejection> for ClientError {
    fn from(err: UrlRejection) -> Self {
        Self::UrlRejected(err)
    }
}

impl From<FetchError> for ClientError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<SyncError> for ClientError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<FeedError> for ClientError {
    fn from(err: FeedError) -> Self {
        Self::Feed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_display_names_the_check() {
        let err = ClientError::from(UrlRejection::PortNotAllowed(8443));
        assert_eq!(
            err.to_string(),
            "URL rejected (port_not_allowed): port 8443 is not allowed"
        );
    }

    #[test]
    fn feed_not_found() {
        let err = ClientError::from(FeedError::NotFound);
        assert_eq!(err.to_string(), "feed error: Calendar not found");
    }
}
