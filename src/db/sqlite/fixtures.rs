//! Shared setup for repository tests.

use crate::db::{Database, SqliteDatabase, Team, TeamRepository, User, UserRepository};

pub async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Migration should succeed");
    db
}

pub async fn make_user(db: &SqliteDatabase, email: &str, name: &str) -> User {
    db.users()
        .create(&User {
            id: String::new(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: "hash".to_string(),
            avatar_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .expect("Create user should succeed")
}

pub async fn make_team(db: &SqliteDatabase, name: &str, owner: &User) -> Team {
    db.teams()
        .create(
            &Team {
                id: String::new(),
                name: name.to_string(),
                created_at: String::new(),
                updated_at: String::new(),
            },
            &owner.id,
        )
        .await
        .expect("Create team should succeed")
}

/// A database with one user owning one team.
pub async fn setup_team() -> (SqliteDatabase, User, Team) {
    let db = setup_db().await;
    let user = make_user(&db, "owner@example.com", "Olive Owner").await;
    let team = make_team(&db, "Acme", &user).await;
    (db, user, team)
}
