//! Guarded outbound fetching for untrusted calendar URLs.
//!
//! This crate fetches remote iCalendar feeds on behalf of users while
//! resisting server-side request forgery and resource exhaustion:
//!
//! - [`validate_url`] - Scheme, credential, host, address and port checks
//! - [`FetchGuard`] - Bounded GET with manual, re-validated redirects
//! - [`HttpTransport`] - The network seam; [`ReqwestTransport`] in production
//! - [`FetchError`] - Error types for fetch operations
//!
//! # Example
//!
//! ```ignore
//! use icaltester_fetch::{FetchGuard, FetchLimits};
//!
//! let guard = FetchGuard::new(FetchLimits::default())?;
//! let fetched = guard.fetch_text("https://example.com/calendar.ics").await?;
//! println!("{} bytes, status {}", fetched.bytes, fetched.status);
//! ```

pub mod error;
pub mod fetch;
pub mod guard;
pub mod limits;
pub mod transport;

pub use error::{FetchError, FetchErrorCode, FetchResult, UrlRejection};
pub use fetch::{FetchGuard, FetchedText, fetch_text_with_limits};
pub use guard::validate_url;
pub use limits::{FetchLimits, UrlPolicy};
pub use transport::{BoxFuture, HttpTransport, ReqwestTransport, ResponseBody, TransportResponse};
