//! `sync`: run due subscriptions from a state file, once or on a schedule.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use icaltester_fetch::FetchGuard;
use icaltester_sync::{
    MemoryStore, Scheduler, SyncConfig, SyncOrchestrator, SyncOutcome, run_due_batch,
};
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

/// How long `--watch` waits for a running batch after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Runs one due batch, or a single subscription, then saves the state file.
///
/// A batch succeeds even when some of its subscriptions fail; a single
/// subscription that fails makes the command fail.
pub async fn sync_once(
    out: &mut dyn Write,
    state_path: &Path,
    config: &SyncConfig,
    subscription: Option<&str>,
    json: bool,
) -> ClientResult<()> {
    let store = Arc::new(MemoryStore::load(state_path)?);
    let guard = FetchGuard::new(config.fetch.clone())?;
    let orchestrator = SyncOrchestrator::new(store.clone(), guard);

    let outcomes = match subscription {
        Some(id) => vec![orchestrator.sync_subscription(id).await?],
        None => run_due_batch(&orchestrator, config, Utc::now()).await?.outcomes,
    };
    store.save(state_path).await?;

    write_outcomes(out, &outcomes, json)?;

    if subscription.is_some()
        && let Some(outcome) = outcomes.first()
        && let Err(message) = outcome.result()
    {
        return Err(ClientError::SyncFailed(message.to_string()));
    }
    Ok(())
}

/// Runs the scheduler until Ctrl-C, saving the state file after each batch.
pub async fn watch(out: &mut dyn Write, state_path: PathBuf, config: SyncConfig) -> ClientResult<()> {
    let store = Arc::new(MemoryStore::load(&state_path)?);
    let guard = FetchGuard::new(config.fetch.clone())?;
    let orchestrator = Arc::new(SyncOrchestrator::new(store, guard));
    let scheduler = Scheduler::new(config.tick_interval);
    let handle = scheduler.handle();

    let config = Arc::new(config);
    let state_path = Arc::new(state_path);
    let batch_fn = move || {
        let orchestrator = orchestrator.clone();
        let config = config.clone();
        let state_path = state_path.clone();
        async move {
            let report = run_due_batch(&*orchestrator, &config, Utc::now())
                .await
                .map_err(|e| e.to_string())?;
            orchestrator
                .store()
                .save(&state_path)
                .await
                .map_err(|e| format!("failed to save state: {}", e))?;
            Ok::<_, String>(report)
        }
    };

    let task = tokio::spawn(scheduler.run(batch_fn));

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, stopping scheduler");
    if let Err(e) = handle.stop().await {
        warn!(error = %e, "Scheduler already stopped");
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Scheduler task failed"),
        Err(_) => warn!("Scheduler did not stop in time"),
    }

    let state = handle.state().await;
    writeln!(out, "{} batches run", state.batches)?;
    if let Some(report) = state.last_report {
        writeln!(
            out,
            "last batch: {} processed, {} succeeded, {} failed",
            report.processed, report.succeeded, report.failed
        )?;
    }
    Ok(())
}

fn write_outcomes(out: &mut dyn Write, outcomes: &[SyncOutcome], json: bool) -> ClientResult<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, outcomes)?;
        writeln!(out)?;
        return Ok(());
    }

    if outcomes.is_empty() {
        writeln!(out, "No subscriptions due.")?;
        return Ok(());
    }

    for outcome in outcomes {
        match outcome.result() {
            Ok(counts) => writeln!(
                out,
                "{}  ok     +{} ~{} -{}  (HTTP {}, {} bytes, {} VEVENTs)",
                outcome.subscription_id,
                counts.added,
                counts.updated,
                counts.removed,
                outcome.http_status.unwrap_or_default(),
                outcome.bytes.unwrap_or_default(),
                outcome.vevent_count.unwrap_or_default()
            )?,
            Err(message) => writeln!(out, "{}  error  {}", outcome.subscription_id, message)?,
        }
    }
    Ok(())
}
