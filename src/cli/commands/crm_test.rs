use serde_json::json;

use super::test_server::spawn_test_server;
use crate::api::test_helpers::json_body;
use crate::cli::commands::crm::*;

#[tokio::test(flavor = "multi_thread")]
async fn test_list_clients_with_filters() {
    let server = spawn_test_server().await;
    let app = &server.app;

    let response = app
        .call(
            "POST",
            "/api/v1/crm/tags",
            &server.token,
            &server.team,
            Some(json!({"name": "Lead"})),
        )
        .await;
    let lead = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    for body in [
        json!({"name": "Globex", "company": "Globex Corp", "tag_ids": [lead]}),
        json!({"name": "Initech"}),
    ] {
        app.call(
            "POST",
            "/api/v1/crm/clients",
            &server.token,
            &server.team,
            Some(body),
        )
        .await;
    }

    let output = list_clients(&server.client(), None, None, "table")
        .await
        .unwrap();
    assert!(output.contains("Globex Corp"));
    assert!(output.contains("Initech"));

    let output = list_clients(&server.client(), None, Some(&lead), "json")
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["name"], "Globex");

    let output = list_clients(&server.client(), Some("nothing-matches"), None, "table")
        .await
        .unwrap();
    assert_eq!(output, "No clients found.");
}
