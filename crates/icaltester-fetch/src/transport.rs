//! HTTP transport seam.
//!
//! [`FetchGuard`](crate::FetchGuard) never talks to the network directly; it
//! drives an [`HttpTransport`] one hop at a time. The transport must not
//! follow redirects itself and must hand the body back in chunks so the guard
//! can stop reading at the byte cap.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::{Client, redirect};
use tracing::trace;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::limits::FetchLimits;

/// A boxed future for async trait methods.
///
/// Keeps [`HttpTransport`] and [`ResponseBody`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A body read incrementally.
pub trait ResponseBody: Send {
    /// Returns the next chunk, or `None` once the body is exhausted.
    fn next_chunk(&mut self) -> BoxFuture<'_, FetchResult<Option<Vec<u8>>>>;
}

/// One HTTP response, headers read, body pending.
pub struct TransportResponse {
    /// Status code.
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
    /// Declared `Content-Length`, if present and numeric.
    pub content_length: Option<u64>,
    /// The body, not yet read.
    pub body: Box<dyn ResponseBody>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("location", &self.location)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues single, non-redirecting GET requests.
pub trait HttpTransport: Send + Sync {
    /// Sends a GET to `url` and returns once headers are available.
    ///
    /// # Errors
    ///
    /// Returns a `Network` or `Timeout` [`FetchError`] if no response arrives.
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, FetchResult<TransportResponse>>;
}

/// Production transport on top of `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client that never follows redirects.
    pub fn new(limits: &FetchLimits) -> FetchResult<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(limits.timeout)
            .user_agent(&limits.user_agent)
            .build()
            .map_err(|e| {
                FetchError::network(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, FetchResult<TransportResponse>> {
        Box::pin(async move {
            trace!(url = %url, "Sending GET");
            let response = self.client.get(url.clone()).send().await?;

            let headers = response.headers();
            let location = headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let content_length = headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());

            Ok(TransportResponse {
                status: response.status().as_u16(),
                location,
                content_length,
                body: Box::new(ReqwestBody(response)),
            })
        })
    }
}

struct ReqwestBody(reqwest::Response);

impl ResponseBody for ReqwestBody {
    fn next_chunk(&mut self) -> BoxFuture<'_, FetchResult<Option<Vec<u8>>>> {
        Box::pin(async move {
            let chunk = self.0.chunk().await?;
            Ok(chunk.map(|bytes| bytes.to_vec()))
        })
    }
}
