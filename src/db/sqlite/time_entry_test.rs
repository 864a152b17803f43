//! Tests for SqliteTimeEntryRepository.

use super::fixtures::{make_team, setup_team};
use crate::db::{
    Database, DbError, PageSort, TimeEntry, TimeEntryQuery, TimeEntryRepository,
};

fn entry(team_id: &str, user_id: &str, started_at: &str) -> TimeEntry {
    TimeEntry {
        id: String::new(),
        team_id: team_id.to_string(),
        user_id: user_id.to_string(),
        project_id: None,
        description: Some("coding".to_string()),
        started_at: started_at.to_string(),
        ended_at: None,
        last_activity_at: String::new(),
        idle_seconds: 0,
        created_at: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn start_creates_running_entry() {
    let (db, user, team) = setup_team().await;

    let started = db
        .time_entries()
        .start(&entry(&team.id, &user.id, "2025-03-01 09:00:00"))
        .await
        .unwrap();

    assert!(started.is_running());
    assert_eq!(started.last_activity_at, "2025-03-01 09:00:00");
    assert_eq!(started.idle_seconds, 0);

    let running = db
        .time_entries()
        .get_running(&team.id, &user.id)
        .await
        .unwrap()
        .expect("entry should be running");
    assert_eq!(running.id, started.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_running_entry_is_conflict() {
    let (db, user, team) = setup_team().await;
    db.time_entries()
        .start(&entry(&team.id, &user.id, "2025-03-01 09:00:00"))
        .await
        .unwrap();

    let again = db
        .time_entries()
        .start(&entry(&team.id, &user.id, "2025-03-01 09:05:00"))
        .await;
    assert!(matches!(again, Err(DbError::Conflict { .. })));

    // A different team is independent
    let other = make_team(&db, "Side gig", &user).await;
    db.time_entries()
        .start(&entry(&other.id, &user.id, "2025-03-01 09:05:00"))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn start_with_unknown_project_is_validation_error() {
    let (db, user, team) = setup_team().await;
    let result = db
        .time_entries()
        .start(&TimeEntry {
            project_id: Some("nonexist".to_string()),
            ..entry(&team.id, &user.id, "2025-03-01 09:00:00")
        })
        .await;
    assert!(matches!(result, Err(DbError::Validation { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn record_activity_accumulates_idle_time() {
    let (db, user, team) = setup_team().await;
    let repo = db.time_entries();
    let started = repo
        .start(&entry(&team.id, &user.id, "2025-03-01 09:00:00"))
        .await
        .unwrap();

    repo.record_activity(&team.id, &started.id, "2025-03-01 09:10:00", 600)
        .await
        .unwrap();
    let updated = repo
        .record_activity(&team.id, &started.id, "2025-03-01 09:11:00", 0)
        .await
        .unwrap();

    assert_eq!(updated.idle_seconds, 600);
    assert_eq!(updated.last_activity_at, "2025-03-01 09:11:00");
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_is_once_only() {
    let (db, user, team) = setup_team().await;
    let repo = db.time_entries();
    let started = repo
        .start(&entry(&team.id, &user.id, "2025-03-01 09:00:00"))
        .await
        .unwrap();

    let stopped = repo
        .stop(&team.id, &started.id, "2025-03-01 10:00:00")
        .await
        .unwrap();
    assert_eq!(stopped.ended_at.as_deref(), Some("2025-03-01 10:00:00"));
    assert!(repo.get_running(&team.id, &user.id).await.unwrap().is_none());

    let again = repo.stop(&team.id, &started.id, "2025-03-01 11:00:00").await;
    assert!(matches!(again, Err(DbError::Conflict { .. })));

    let heartbeat = repo
        .record_activity(&team.id, &started.id, "2025-03-01 11:00:00", 0)
        .await;
    assert!(matches!(heartbeat, Err(DbError::Conflict { .. })));

    let missing = repo.stop(&team.id, "nonexist", "2025-03-01 11:00:00").await;
    assert!(matches!(missing, Err(DbError::NotFound { .. })));

    // Stopped entries free the slot for a new timer
    repo.start(&entry(&team.id, &user.id, "2025-03-01 12:00:00"))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn list_is_newest_first_and_filters_by_range() {
    let (db, user, team) = setup_team().await;
    let repo = db.time_entries();
    for (start, end) in [
        ("2025-03-01 09:00:00", "2025-03-01 10:00:00"),
        ("2025-03-02 09:00:00", "2025-03-02 10:00:00"),
        ("2025-03-03 09:00:00", "2025-03-03 10:00:00"),
    ] {
        let e = repo.start(&entry(&team.id, &user.id, start)).await.unwrap();
        repo.stop(&team.id, &e.id, end).await.unwrap();
    }

    let all = repo.list(&team.id, None).await.unwrap();
    let starts: Vec<_> = all.items.iter().map(|e| e.started_at.as_str()).collect();
    assert_eq!(
        starts,
        vec!["2025-03-03 09:00:00", "2025-03-02 09:00:00", "2025-03-01 09:00:00"]
    );

    let ranged = repo
        .list(
            &team.id,
            Some(&TimeEntryQuery {
                from: Some("2025-03-02 00:00:00".to_string()),
                to: Some("2025-03-03 00:00:00".to_string()),
                user_id: Some(user.id.clone()),
                page: PageSort::default(),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(ranged.total, 1);
    assert_eq!(ranged.items[0].started_at, "2025-03-02 09:00:00");
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_running_entries_are_found_across_teams() {
    let (db, user, team) = setup_team().await;
    let repo = db.time_entries();
    let stale = repo
        .start(&entry(&team.id, &user.id, "2025-03-01 09:00:00"))
        .await
        .unwrap();
    let other = make_team(&db, "Other", &user).await;
    repo.start(&entry(&other.id, &user.id, "2025-03-01 11:50:00"))
        .await
        .unwrap();

    let found = repo.list_stale_running("2025-03-01 11:30:00").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, stale.id);
}
