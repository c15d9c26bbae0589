//! `feed`: render a calendar's public feed from a state file.

use std::io::Write;
use std::path::Path;

use icaltester_sync::{MemoryStore, build_public_feed};
use tracing::info;

use super::write_text;
use crate::error::ClientResult;

/// Renders the feed whose token is `token`.
pub async fn feed(
    out: &mut dyn Write,
    state_path: &Path,
    token: &str,
    output: Option<&Path>,
) -> ClientResult<()> {
    let store = MemoryStore::load(state_path)?;
    let feed = build_public_feed(&store, token).await?;
    info!(
        calendar_id = %feed.calendar_id,
        events = feed.event_count,
        "Rendered public feed"
    );
    write_text(out, output, &feed.text)
}
