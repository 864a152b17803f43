//! Time tracking: heartbeat and idle accounting, summaries, and the
//! background reaper that stops abandoned timers.

mod activity;
mod reaper;
mod summary;

#[cfg(test)]
mod activity_test;
#[cfg(test)]
mod reaper_test;

pub use activity::{Heartbeat, apply_heartbeat, idle_gap_seconds, tracked_seconds};
pub use reaper::{reap_idle_entries, spawn_reaper_task};
pub use summary::{DayTotal, ProjectTotal, TimeSummary, UNASSIGNED, summarize};
