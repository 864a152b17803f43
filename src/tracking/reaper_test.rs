use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::api::{ChangeNotifier, UpdateMessage};
use crate::db::utils::{current_timestamp, parse_timestamp};
use crate::db::{
    Database, SqliteDatabase, Team, TeamRepository, TimeEntry, TimeEntryRepository, User,
    UserRepository,
};

async fn setup() -> (SqliteDatabase, String, String) {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    let user = db
        .users()
        .create(&User {
            id: String::new(),
            email: "r@example.com".to_string(),
            name: "Reaper Test".to_string(),
            password_hash: "x".to_string(),
            avatar_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap();
    let team = db
        .teams()
        .create(
            &Team {
                id: String::new(),
                name: "T".to_string(),
                created_at: String::new(),
                updated_at: String::new(),
            },
            &user.id,
        )
        .await
        .unwrap();
    (db, team.id, user.id)
}

fn running(team_id: &str, user_id: &str, started_at: &str) -> TimeEntry {
    TimeEntry {
        id: String::new(),
        team_id: team_id.to_string(),
        user_id: user_id.to_string(),
        project_id: None,
        description: None,
        started_at: started_at.to_string(),
        ended_at: None,
        last_activity_at: String::new(),
        idle_seconds: 0,
        created_at: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_entries_stop_at_last_activity() {
    let (db, team_id, user_id) = setup().await;
    let entry = db
        .time_entries()
        .start(&running(&team_id, &user_id, "2025-03-01 09:00:00"))
        .await
        .unwrap();
    db.time_entries()
        .record_activity(&team_id, &entry.id, "2025-03-01 09:40:00", 0)
        .await
        .unwrap();

    // 29 minutes after the last activity: not yet
    let now = parse_timestamp("2025-03-01 10:09:00").unwrap();
    assert!(reap_idle_entries(&db, 1800, now).await.unwrap().is_empty());

    let now = parse_timestamp("2025-03-01 10:11:00").unwrap();
    let stopped = reap_idle_entries(&db, 1800, now).await.unwrap();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].ended_at.as_deref(), Some("2025-03-01 09:40:00"));

    // A second pass finds nothing
    assert!(reap_idle_entries(&db, 1800, now).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reaper_task_notifies_and_honours_cancellation() {
    let (db, team_id, user_id) = setup().await;
    db.time_entries()
        .start(&running(&team_id, &user_id, "2020-01-01 00:00:00"))
        .await
        .unwrap();

    let db = Arc::new(db);
    let notifier = ChangeNotifier::new();
    let mut rx = notifier.subscribe();
    let cancel = CancellationToken::new();

    let handle = spawn_reaper_task(
        Arc::clone(&db),
        notifier.clone(),
        Duration::from_millis(20),
        60,
        cancel.clone(),
    );

    let update = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("reaper should notify")
        .unwrap();
    assert_eq!(update.team_id, team_id);
    assert!(matches!(update.message, UpdateMessage::TimeEntryStopped { .. }));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("reaper should stop")
        .unwrap();

    // A fresh timer is untouched
    db.time_entries()
        .start(&running(&team_id, &user_id, &current_timestamp()))
        .await
        .unwrap();
    assert!(
        db.time_entries()
            .get_running(&team_id, &user_id)
            .await
            .unwrap()
            .is_some()
    );
}
