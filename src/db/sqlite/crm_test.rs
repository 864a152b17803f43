//! Tests for the SQLite CRM repositories.

use super::fixtures::{make_team, make_user, setup_team};
use crate::db::{
    ClientQuery, CrmClient, CrmClientRepository, CrmTag, CrmTagRepository, Database, DbError,
};

fn tag(team_id: &str, name: &str) -> CrmTag {
    CrmTag {
        id: String::new(),
        team_id: team_id.to_string(),
        name: name.to_string(),
        color: "#ff8800".to_string(),
        created_at: String::new(),
    }
}

fn client(team_id: &str, name: &str, tag_ids: Vec<String>) -> CrmClient {
    CrmClient {
        id: String::new(),
        team_id: team_id.to_string(),
        name: name.to_string(),
        email: None,
        phone: None,
        company: None,
        notes: None,
        tag_ids,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn tag_names_are_unique_per_team_ignoring_case() {
    let (db, _user, team) = setup_team().await;
    db.crm_tags().create(&tag(&team.id, "VIP")).await.unwrap();

    let dup = db.crm_tags().create(&tag(&team.id, "vip")).await;
    assert!(matches!(dup, Err(DbError::AlreadyExists { .. })));

    // Same name in another team is fine
    let other_owner = make_user(&db, "o@example.com", "O").await;
    let other = make_team(&db, "Other", &other_owner).await;
    db.crm_tags().create(&tag(&other.id, "VIP")).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn list_tags_orders_by_name() {
    let (db, _user, team) = setup_team().await;
    for name in ["lead", "Active", "churned"] {
        db.crm_tags().create(&tag(&team.id, name)).await.unwrap();
    }

    let names: Vec<String> = db
        .crm_tags()
        .list(&team.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Active", "churned", "lead"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn client_carries_tags_and_filters_by_tag() {
    let (db, _user, team) = setup_team().await;
    let vip = db.crm_tags().create(&tag(&team.id, "VIP")).await.unwrap();
    let lead = db.crm_tags().create(&tag(&team.id, "Lead")).await.unwrap();

    let acme = db
        .crm_clients()
        .create(&client(&team.id, "Acme", vec![vip.id.clone(), lead.id.clone()]))
        .await
        .unwrap();
    db.crm_clients()
        .create(&client(&team.id, "Globex", vec![lead.id.clone()]))
        .await
        .unwrap();

    assert_eq!(acme.tag_ids.len(), 2);
    // Tags come back ordered by tag name
    assert_eq!(acme.tag_ids, vec![lead.id.clone(), vip.id.clone()]);

    let vips = db
        .crm_clients()
        .list(
            &team.id,
            Some(&ClientQuery {
                tag_id: Some(vip.id.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(vips.total, 1);
    assert_eq!(vips.items[0].name, "Acme");
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_tag_is_rejected_without_partial_write() {
    let (db, _user, team) = setup_team().await;
    let other_owner = make_user(&db, "o@example.com", "O").await;
    let other = make_team(&db, "Other", &other_owner).await;
    let foreign = db.crm_tags().create(&tag(&other.id, "Theirs")).await.unwrap();

    let result = db
        .crm_clients()
        .create(&client(&team.id, "Sneaky", vec![foreign.id]))
        .await;
    assert!(matches!(result, Err(DbError::Validation { .. })));

    assert_eq!(db.crm_clients().list(&team.id, None).await.unwrap().total, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_matches_name_email_and_company() {
    let (db, _user, team) = setup_team().await;
    db.crm_clients()
        .create(&CrmClient {
            email: Some("jane@initech.com".to_string()),
            ..client(&team.id, "Jane", vec![])
        })
        .await
        .unwrap();
    db.crm_clients()
        .create(&CrmClient {
            company: Some("Initech".to_string()),
            ..client(&team.id, "Peter", vec![])
        })
        .await
        .unwrap();
    db.crm_clients()
        .create(&client(&team.id, "Milton", vec![]))
        .await
        .unwrap();

    let found = db
        .crm_clients()
        .list(
            &team.id,
            Some(&ClientQuery {
                search: Some("initech".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    let names: Vec<_> = found.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Jane", "Peter"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_replaces_tags_and_tag_delete_unlinks() {
    let (db, _user, team) = setup_team().await;
    let vip = db.crm_tags().create(&tag(&team.id, "VIP")).await.unwrap();
    let lead = db.crm_tags().create(&tag(&team.id, "Lead")).await.unwrap();

    let mut acme = db
        .crm_clients()
        .create(&client(&team.id, "Acme", vec![vip.id.clone()]))
        .await
        .unwrap();

    acme.tag_ids = vec![lead.id.clone()];
    acme.phone = Some("555-0100".to_string());
    let updated = db.crm_clients().update(&acme).await.unwrap();
    assert_eq!(updated.tag_ids, vec![lead.id.clone()]);
    assert_eq!(updated.phone.as_deref(), Some("555-0100"));

    db.crm_tags().delete(&team.id, &lead.id).await.unwrap();
    let after = db.crm_clients().get(&team.id, &acme.id).await.unwrap();
    assert!(after.tag_ids.is_empty());

    db.crm_clients().delete(&team.id, &acme.id).await.unwrap();
    assert!(matches!(
        db.crm_clients().get(&team.id, &acme.id).await,
        Err(DbError::NotFound { .. })
    ));
}
