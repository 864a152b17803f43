use super::test_server::spawn_test_server;
use crate::cli::commands::time::*;
use crate::cli::error::CliError;

#[test]
fn test_format_report_empty() {
    let summary = TimeSummary {
        total_seconds: 0,
        idle_seconds: 0,
        entry_count: 0,
        by_project: vec![],
        by_day: vec![],
    };
    assert_eq!(format_report(&summary), "No time entries found.");
}

#[test]
fn test_format_report_totals() {
    let summary = TimeSummary {
        total_seconds: 5400,
        idle_seconds: 600,
        entry_count: 2,
        by_project: vec![ProjectTotal {
            project: "unassigned".to_string(),
            seconds: 5400,
            entries: 2,
        }],
        by_day: vec![DayTotal {
            day: "2025-03-01".to_string(),
            seconds: 5400,
        }],
    };

    let output = format_report(&summary);
    assert!(output.starts_with("Total: 1h 30m across 2 entries (idle 10m)"));
    assert!(output.contains("unassigned"));
    assert!(output.contains("2025-03-01"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_stop_report() {
    let server = spawn_test_server().await;
    let client = server.client();

    let output = start(&client, None, Some("Writing docs")).await.unwrap();
    assert!(output.starts_with("✓ Started Writing docs"));

    // Second start conflicts
    match start(&client, None, None).await {
        Err(CliError::ApiError { status, .. }) => assert_eq!(status, 409),
        other => panic!("expected conflict, got {:?}", other),
    }

    let output = stop(&client).await.unwrap();
    assert!(output.starts_with("✓ Stopped Writing docs"));

    let output = report(&client, None, None, "json").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["entry_count"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_without_timer() {
    let server = spawn_test_server().await;

    match stop(&server.client()).await {
        Err(CliError::ApiError { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "No running time entry");
        }
        other => panic!("expected not found, got {:?}", other),
    }
}
