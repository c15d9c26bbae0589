//! `check-url`: run URL validation without fetching.

use std::io::Write;

use icaltester_fetch::{UrlPolicy, validate_url};
use tracing::debug;

use crate::error::ClientResult;

/// Prints the normalized URL if it passes, fails with the rejection otherwise.
pub fn check_url(out: &mut dyn Write, url: &str, policy: &UrlPolicy) -> ClientResult<()> {
    let parsed = validate_url(url, policy)?;
    debug!(url = %parsed, ports = ?policy.effective_ports(), "URL accepted");
    writeln!(out, "ok: {}", parsed)?;
    Ok(())
}
