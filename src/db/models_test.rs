//! Tests for domain models.

use crate::db::models::*;

#[test]
fn team_role_deserializes_from_database_format() {
    let owner: TeamRole = serde_json::from_str("\"owner\"").unwrap();
    assert_eq!(owner, TeamRole::Owner);

    let member: TeamRole = "member".parse().unwrap();
    assert_eq!(member, TeamRole::Member);
}

#[test]
fn team_role_rejects_unknown_value() {
    assert!("superuser".parse::<TeamRole>().is_err());
}

#[test]
fn team_role_ordering() {
    assert!(TeamRole::Owner.at_least(TeamRole::Admin));
    assert!(TeamRole::Admin.at_least(TeamRole::Admin));
    assert!(TeamRole::Admin.at_least(TeamRole::Member));
    assert!(!TeamRole::Member.at_least(TeamRole::Admin));
    assert!(!TeamRole::Admin.at_least(TeamRole::Owner));
}

#[test]
fn user_serialization_hides_password_hash() {
    let user = User {
        id: "u0000001".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        avatar_url: None,
        created_at: "2025-01-01 00:00:00".to_string(),
        updated_at: "2025-01-01 00:00:00".to_string(),
    };

    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["email"], "ada@example.com");
}

#[test]
fn time_entry_running_state() {
    let mut entry = TimeEntry {
        id: "e0000001".to_string(),
        team_id: "t0000001".to_string(),
        user_id: "u0000001".to_string(),
        project_id: None,
        description: None,
        started_at: "2025-01-01 09:00:00".to_string(),
        ended_at: None,
        last_activity_at: "2025-01-01 09:00:00".to_string(),
        idle_seconds: 0,
        created_at: "2025-01-01 09:00:00".to_string(),
    };
    assert!(entry.is_running());

    entry.ended_at = Some("2025-01-01 10:00:00".to_string());
    assert!(!entry.is_running());
}
