//! Tests for SqliteTeamRepository.

use super::fixtures::{make_team, make_user, setup_db, setup_team};
use crate::db::{Database, DbError, Team, TeamRepository, TeamRole};

#[tokio::test(flavor = "multi_thread")]
async fn create_makes_creator_owner() {
    let (db, owner, team) = setup_team().await;

    assert_eq!(
        db.teams().get_role(&team.id, &owner.id).await.unwrap(),
        Some(TeamRole::Owner)
    );

    let memberships = db.teams().list_for_user(&owner.id).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].team.id, team.id);
    assert_eq!(memberships[0].role, TeamRole::Owner);
}

#[tokio::test(flavor = "multi_thread")]
async fn rename_and_delete_team() {
    let (db, _owner, team) = setup_team().await;

    let renamed = db
        .teams()
        .update(&Team {
            name: "Acme Corp".to_string(),
            ..team.clone()
        })
        .await
        .unwrap();
    assert_eq!(renamed.name, "Acme Corp");

    db.teams().delete(&team.id).await.unwrap();
    assert!(matches!(
        db.teams().get(&team.id).await,
        Err(DbError::NotFound { .. })
    ));
    assert!(matches!(
        db.teams().delete(&team.id).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_member_twice_is_already_exists() {
    let (db, _owner, team) = setup_team().await;
    let user = make_user(&db, "m@example.com", "Mia").await;

    let member = db
        .teams()
        .add_member(&team.id, &user.id, TeamRole::Admin)
        .await
        .unwrap();
    assert_eq!(member.role, TeamRole::Admin);
    assert_eq!(member.user.email, "m@example.com");

    let again = db.teams().add_member(&team.id, &user.id, TeamRole::Member).await;
    assert!(matches!(again, Err(DbError::AlreadyExists { .. })));

    let members = db.teams().list_members(&team.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn last_owner_cannot_be_demoted_or_removed() {
    let (db, owner, team) = setup_team().await;

    let demote = db.teams().set_role(&team.id, &owner.id, TeamRole::Admin).await;
    assert!(matches!(demote, Err(DbError::Conflict { .. })));

    let remove = db.teams().remove_member(&team.id, &owner.id).await;
    assert!(matches!(remove, Err(DbError::Conflict { .. })));

    assert_eq!(
        db.teams().get_role(&team.id, &owner.id).await.unwrap(),
        Some(TeamRole::Owner)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn owner_can_step_down_once_another_owner_exists() {
    let (db, owner, team) = setup_team().await;
    let second = make_user(&db, "second@example.com", "Second").await;
    db.teams()
        .add_member(&team.id, &second.id, TeamRole::Member)
        .await
        .unwrap();

    db.teams()
        .set_role(&team.id, &second.id, TeamRole::Owner)
        .await
        .unwrap();
    let demoted = db
        .teams()
        .set_role(&team.id, &owner.id, TeamRole::Member)
        .await
        .unwrap();
    assert_eq!(demoted.role, TeamRole::Member);

    db.teams().remove_member(&team.id, &owner.id).await.unwrap();
    assert_eq!(db.teams().get_role(&team.id, &owner.id).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn membership_is_per_team() {
    let db = setup_db().await;
    let a = make_user(&db, "a@example.com", "A").await;
    let b = make_user(&db, "b@example.com", "B").await;
    let team_a = make_team(&db, "Alpha", &a).await;
    let team_b = make_team(&db, "Beta", &b).await;

    assert_eq!(db.teams().get_role(&team_b.id, &a.id).await.unwrap(), None);
    assert_eq!(db.teams().get_role(&team_a.id, &b.id).await.unwrap(), None);

    let missing = db.teams().set_role(&team_b.id, &a.id, TeamRole::Admin).await;
    assert!(matches!(missing, Err(DbError::NotFound { .. })));
}
