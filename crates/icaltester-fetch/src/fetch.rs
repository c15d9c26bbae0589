//! Guarded fetch: validation, manual redirects, byte cap, deadline.

use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult, UrlRejection};
use crate::guard::validate_url;
use crate::limits::FetchLimits;
use crate::transport::{HttpTransport, ReqwestTransport, ResponseBody};

/// Body and metadata of a completed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedText {
    /// Status of the final (non-redirect) response.
    pub status: u16,
    /// Body decoded as UTF-8 (invalid sequences replaced, BOM stripped).
    pub text: String,
    /// Raw body size in bytes.
    pub bytes: u64,
    /// URL of the final hop.
    pub final_url: Url,
    /// Number of redirects followed.
    pub redirects: u32,
}

impl FetchedText {
    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches untrusted URLs under [`FetchLimits`].
///
/// Every hop, including each redirect target, is validated before it is
/// requested. No retries happen here.
#[derive(Debug, Clone)]
pub struct FetchGuard<T = ReqwestTransport> {
    transport: T,
    limits: FetchLimits,
}

impl FetchGuard<ReqwestTransport> {
    /// Creates a guard backed by a `reqwest` client.
    pub fn new(limits: FetchLimits) -> FetchResult<Self> {
        let transport = ReqwestTransport::new(&limits)?;
        Ok(Self { transport, limits })
    }
}

impl<T: HttpTransport> FetchGuard<T> {
    /// Creates a guard over a custom transport.
    pub fn with_transport(transport: T, limits: FetchLimits) -> Self {
        Self { transport, limits }
    }

    /// Returns the limits in force.
    pub fn limits(&self) -> &FetchLimits {
        &self.limits
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates `input` against this guard's URL policy.
    pub fn validate(&self, input: &str) -> Result<Url, UrlRejection> {
        validate_url(input, &self.limits.policy)
    }

    /// Fetches `input` as text.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl`/`SsrfBlocked` if the URL or any redirect target fails validation
    /// - `TooManyRedirects` past `max_redirects`
    /// - `InvalidRedirect` for a redirect with no usable `Location`
    /// - `ResponseTooLarge` if the declared or received size exceeds `max_bytes`
    /// - `Timeout` if the whole exchange exceeds `timeout`
    /// - `Network` for transport failures
    pub async fn fetch_text(&self, input: &str) -> FetchResult<FetchedText> {
        let url = self.validate(input)?;
        let timeout = self.limits.timeout;

        match tokio::time::timeout(timeout, self.follow(url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %input, timeout_ms = timeout.as_millis() as u64, "Fetch timed out");
                Err(FetchError::timeout(timeout))
            }
        }
    }

    async fn follow(&self, mut current: Url) -> FetchResult<FetchedText> {
        let mut redirects = 0u32;

        loop {
            let mut response = self.transport.get(&current).await?;

            if is_redirect(response.status) {
                let location = response.location.take().ok_or_else(|| {
                    FetchError::invalid_redirect(format!(
                        "{} redirect without Location",
                        response.status
                    ))
                })?;
                if redirects >= self.limits.max_redirects {
                    return Err(FetchError::too_many_redirects(self.limits.max_redirects));
                }
                let next = current.join(&location).map_err(|e| {
                    FetchError::invalid_redirect(format!("bad Location `{}`: {}", location, e))
                })?;
                let next = self.validate(next.as_str()).map_err(|rejection| {
                    warn!(from = %current, to = %next, reason = %rejection, "Redirect target rejected");
                    FetchError::rejected(rejection)
                })?;

                debug!(status = response.status, from = %current, to = %next, "Following redirect");
                current = next;
                redirects += 1;
                continue;
            }

            if let Some(declared) = response.content_length
                && declared > self.limits.max_bytes
            {
                debug!(declared, max = self.limits.max_bytes, "Declared length over cap");
                return Err(FetchError::too_large(self.limits.max_bytes));
            }

            let body = read_capped(response.body.as_mut(), self.limits.max_bytes).await?;
            let bytes = body.len() as u64;

            debug!(status = response.status, bytes, redirects, url = %current, "Fetched");

            return Ok(FetchedText {
                status: response.status,
                text: decode(&body),
                bytes,
                final_url: current,
                redirects,
            });
        }
    }
}

/// Fetches `input` with a fresh `reqwest`-backed guard.
pub async fn fetch_text_with_limits(input: &str, limits: &FetchLimits) -> FetchResult<FetchedText> {
    FetchGuard::new(limits.clone())?.fetch_text(input).await
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Reads the body, failing as soon as more than `max_bytes` have arrived.
async fn read_capped(body: &mut dyn ResponseBody, max_bytes: u64) -> FetchResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut received = 0u64;

    while let Some(chunk) = body.next_chunk().await? {
        received += chunk.len() as u64;
        if received > max_bytes {
            debug!(received, max = max_bytes, "Body over cap, aborting read");
            return Err(FetchError::too_large(max_bytes));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf)
}

fn decode(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text.into_owned(),
    }
}
