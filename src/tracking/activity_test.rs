use chrono::NaiveDateTime;

use super::*;
use crate::db::TimeEntry;
use crate::db::utils::parse_timestamp;

fn ts(s: &str) -> NaiveDateTime {
    parse_timestamp(s).unwrap()
}

fn entry(started_at: &str, ended_at: Option<&str>, last: &str, idle: i64) -> TimeEntry {
    TimeEntry {
        id: "te000001".to_string(),
        team_id: "team0001".to_string(),
        user_id: "user0001".to_string(),
        project_id: None,
        description: None,
        started_at: started_at.to_string(),
        ended_at: ended_at.map(str::to_string),
        last_activity_at: last.to_string(),
        idle_seconds: idle,
        created_at: started_at.to_string(),
    }
}

#[test]
fn short_gaps_are_active() {
    let last = ts("2025-03-01 09:00:00");
    assert_eq!(idle_gap_seconds(last, ts("2025-03-01 09:04:59"), 300), 0);
    assert_eq!(idle_gap_seconds(last, ts("2025-03-01 09:05:00"), 300), 0);
}

#[test]
fn long_gap_counts_entirely_as_idle() {
    let last = ts("2025-03-01 09:00:00");
    assert_eq!(idle_gap_seconds(last, ts("2025-03-01 09:05:01"), 300), 301);
    assert_eq!(idle_gap_seconds(last, ts("2025-03-01 10:00:00"), 300), 3600);
}

#[test]
fn heartbeat_from_the_past_adds_nothing_and_keeps_last_activity() {
    let e = entry("2025-03-01 09:00:00", None, "2025-03-01 09:30:00", 0);
    let hb = apply_heartbeat(&e, ts("2025-03-01 09:10:00"), 300).unwrap();
    assert_eq!(hb.idle_seconds_to_add, 0);
    assert_eq!(hb.last_activity_at, ts("2025-03-01 09:30:00"));
}

#[test]
fn heartbeat_after_idle_period() {
    let e = entry("2025-03-01 09:00:00", None, "2025-03-01 09:00:00", 0);
    let hb = apply_heartbeat(&e, ts("2025-03-01 09:20:00"), 300).unwrap();
    assert_eq!(hb.idle_seconds_to_add, 1200);
    assert_eq!(hb.last_activity_at, ts("2025-03-01 09:20:00"));
}

#[test]
fn tracked_seconds_subtracts_idle_and_floors_at_zero() {
    let stopped = entry(
        "2025-03-01 09:00:00",
        Some("2025-03-01 10:00:00"),
        "2025-03-01 10:00:00",
        600,
    );
    assert_eq!(
        tracked_seconds(&stopped, ts("2030-01-01 00:00:00")).unwrap(),
        3000
    );

    let running = entry("2025-03-01 09:00:00", None, "2025-03-01 09:00:00", 0);
    assert_eq!(
        tracked_seconds(&running, ts("2025-03-01 09:01:30")).unwrap(),
        90
    );

    let odd = entry("2025-03-01 09:00:00", None, "2025-03-01 09:00:00", 9999);
    assert_eq!(tracked_seconds(&odd, ts("2025-03-01 09:01:00")).unwrap(), 0);
}

#[test]
fn bad_timestamps_are_reported() {
    let e = entry("yesterday", None, "2025-03-01 09:00:00", 0);
    assert!(tracked_seconds(&e, ts("2025-03-01 09:00:00")).is_err());
}
