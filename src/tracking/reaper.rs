//! Idle reaper: a background task that stops timers nobody has touched
//! for `auto_stop_after`.
//!
//! An abandoned entry is closed at its last recorded activity, so the
//! silent tail is never billed.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{ChangeNotifier, UpdateMessage};
use crate::db::utils::format_timestamp;
use crate::db::{Database, DbError, DbResult, TimeEntry, TimeEntryRepository};

/// Stop every running entry whose last activity is older than
/// `auto_stop_after_secs` at `now`. Returns the stopped entries.
pub async fn reap_idle_entries<D: Database>(
    db: &D,
    auto_stop_after_secs: i64,
    now: NaiveDateTime,
) -> DbResult<Vec<TimeEntry>> {
    let cutoff = format_timestamp(now - chrono::Duration::seconds(auto_stop_after_secs));
    let stale = db.time_entries().list_stale_running(&cutoff).await?;

    let mut stopped = Vec::with_capacity(stale.len());
    for entry in stale {
        match db
            .time_entries()
            .stop(&entry.team_id, &entry.id, &entry.last_activity_at)
            .await
        {
            Ok(entry) => stopped.push(entry),
            // Stopped by its owner between the scan and now
            Err(DbError::Conflict { .. }) | Err(DbError::NotFound { .. }) => {
                debug!(time_entry_id = %entry.id, "entry already stopped");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stopped)
}

/// Spawn the reaper loop. It ticks every `interval` until `cancel` fires.
pub fn spawn_reaper_task<D: Database + 'static>(
    db: Arc<D>,
    notifier: ChangeNotifier,
    interval: Duration,
    auto_stop_after_secs: i64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!(
            interval_secs = interval.as_secs(),
            auto_stop_after_secs, "idle reaper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let now = chrono::Utc::now().naive_utc();
            match reap_idle_entries(db.as_ref(), auto_stop_after_secs, now).await {
                Ok(stopped) => {
                    for entry in stopped {
                        warn!(
                            time_entry_id = %entry.id,
                            user_id = %entry.user_id,
                            "auto-stopped idle timer"
                        );
                        notifier.notify(
                            &entry.team_id,
                            UpdateMessage::TimeEntryStopped {
                                time_entry_id: entry.id,
                                user_id: entry.user_id,
                            },
                        );
                    }
                }
                Err(e) => error!(error = %e, "idle reaper pass failed"),
            }
        }

        info!("idle reaper stopped");
    })
}
