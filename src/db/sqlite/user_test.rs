//! Tests for SqliteUserRepository and SqliteSessionRepository.

use super::fixtures::{make_team, make_user, setup_db};
use crate::db::{
    Database, DbError, Session, SessionRepository, TeamRepository, TeamRole, User,
    UserRepository,
};

#[tokio::test(flavor = "multi_thread")]
async fn create_normalizes_email_and_generates_id() {
    let db = setup_db().await;
    let user = make_user(&db, "  Alice@Example.COM ", "Alice").await;

    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.id.len(), 8);
    assert!(!user.created_at.is_empty());

    let found = db
        .users()
        .get_by_email("ALICE@example.com")
        .await
        .unwrap()
        .expect("user should be found by email");
    assert_eq!(found.id, user.id);
    assert_eq!(found.password_hash, "hash");
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_email_is_already_exists() {
    let db = setup_db().await;
    make_user(&db, "bob@example.com", "Bob").await;

    let result = db
        .users()
        .create(&User {
            id: String::new(),
            email: "BOB@example.com".to_string(),
            name: "Other Bob".to_string(),
            password_hash: "x".to_string(),
            avatar_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await;

    assert!(matches!(result, Err(DbError::AlreadyExists { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn get_missing_user_is_not_found() {
    let db = setup_db().await;
    assert!(matches!(
        db.users().get("deadbeef").await,
        Err(DbError::NotFound { .. })
    ));
    assert!(db.users().get_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_changes_name_and_avatar() {
    let db = setup_db().await;
    let mut user = make_user(&db, "carol@example.com", "Carol").await;

    user.name = "Carol C.".to_string();
    user.avatar_url = Some("https://example.com/c.png".to_string());
    let updated = db.users().update(&user).await.unwrap();

    assert_eq!(updated.name, "Carol C.");
    assert_eq!(updated.avatar_url.as_deref(), Some("https://example.com/c.png"));
}

#[tokio::test(flavor = "multi_thread")]
async fn search_members_only_returns_team_members_by_prefix() {
    let db = setup_db().await;
    let owner = make_user(&db, "owner@example.com", "Olive").await;
    let team = make_team(&db, "Acme", &owner).await;
    let dana = make_user(&db, "dana@example.com", "Dana").await;
    let _outsider = make_user(&db, "dave@example.com", "Dave").await;
    db.teams()
        .add_member(&team.id, &dana.id, TeamRole::Member)
        .await
        .unwrap();

    let found = db.users().search_members(&team.id, "da", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, dana.id);

    // Prefix on email works too
    let found = db.users().search_members(&team.id, "owner@", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, owner.id);

    // Empty prefix lists every member up to the limit
    let found = db.users().search_members(&team.id, "", 1).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_members_treats_wildcards_literally() {
    let db = setup_db().await;
    let owner = make_user(&db, "owner@example.com", "Olive").await;
    let team = make_team(&db, "Acme", &owner).await;

    let found = db.users().search_members(&team.id, "%", 10).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn session_lookup_respects_expiry() {
    let db = setup_db().await;
    let user = make_user(&db, "erin@example.com", "Erin").await;
    let sessions = db.sessions();

    sessions
        .create(&Session {
            token_hash: "live".to_string(),
            user_id: user.id.clone(),
            created_at: "2025-01-01 00:00:00".to_string(),
            expires_at: "2025-02-01 00:00:00".to_string(),
        })
        .await
        .unwrap();
    sessions
        .create(&Session {
            token_hash: "old".to_string(),
            user_id: user.id.clone(),
            created_at: "2024-01-01 00:00:00".to_string(),
            expires_at: "2024-02-01 00:00:00".to_string(),
        })
        .await
        .unwrap();

    let now = "2025-01-15 00:00:00";
    let found = sessions.find_user("live", now).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id.clone()));
    assert!(sessions.find_user("old", now).await.unwrap().is_none());
    assert!(sessions.find_user("unknown", now).await.unwrap().is_none());

    let removed = sessions.delete_expired(now).await.unwrap();
    assert_eq!(removed, 1);

    sessions.delete("live").await.unwrap();
    assert!(sessions.find_user("live", now).await.unwrap().is_none());
}
