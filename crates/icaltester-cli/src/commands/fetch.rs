//! `fetch`: guarded download of a live feed.

use std::io::Write;

use icaltester_core::parse_calendar;
use icaltester_fetch::{FetchGuard, FetchLimits, HttpTransport};
use tracing::info;

use super::write_events;
use crate::error::{ClientError, ClientResult};

/// Fetches `url` with the production transport and lists its events.
pub async fn fetch(
    out: &mut dyn Write,
    url: &str,
    limits: &FetchLimits,
    json: bool,
) -> ClientResult<()> {
    let guard = FetchGuard::new(limits.clone())?;
    fetch_with(out, &guard, url, json).await
}

/// Like [`fetch`], over an existing guard.
pub async fn fetch_with<T: HttpTransport>(
    out: &mut dyn Write,
    guard: &FetchGuard<T>,
    url: &str,
    json: bool,
) -> ClientResult<()> {
    let fetched = guard.fetch_text(url).await?;
    if !fetched.is_success() {
        return Err(ClientError::HttpStatus(fetched.status));
    }

    let parsed = parse_calendar(&fetched.text);
    info!(
        url = %fetched.final_url,
        status = fetched.status,
        bytes = fetched.bytes,
        redirects = fetched.redirects,
        events = parsed.events.len(),
        dropped = parsed.dropped_blocks,
        "Fetched feed"
    );

    if !json {
        writeln!(
            out,
            "# {} ({} bytes, {} redirects, {} events, {} dropped)",
            fetched.final_url,
            fetched.bytes,
            fetched.redirects,
            parsed.events.len(),
            parsed.dropped_blocks
        )?;
    }
    write_events(out, &parsed.events, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use icaltester_fetch::FetchErrorCode;

    #[tokio::test]
    async fn blocked_before_any_request() {
        let mut out = Vec::new();
        let err = fetch(&mut out, "https://localhost/feed.ics", &FetchLimits::default(), false)
            .await
            .unwrap_err();
        match err {
            ClientError::Fetch(e) => assert_eq!(e.code(), FetchErrorCode::SsrfBlocked),
            other => panic!("unexpected error: {other}"),
        }
        assert!(out.is_empty());
    }
}
