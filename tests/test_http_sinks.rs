//! Tracking and reporting clients against a mock HTTP server

use kommunekode_sync::reporting::{DataQualityIssue, HttpReporter, ReportError, Reporter};
use kommunekode_sync::tracking::{HttpTracker, TaskTracker, TrackingError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASIC_AUTH: &str = "Basic cm9ib3Q6cHc=";

#[tokio::test]
async fn test_tracker_posts_process_name_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains(
            r#""process_name":"Opdatering af kommunekode på leverandør i Nexus""#,
        ))
        .and(body_string_contains(r#""timestamp":""#))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let tracker = HttpTracker::new(
        format!("{}/tasks", server.uri()),
        "robot",
        "pw",
        Duration::from_secs(5),
    )
    .unwrap();

    tracker
        .track_task("Opdatering af kommunekode på leverandør i Nexus")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tracker_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tracker = HttpTracker::new(server.uri(), "robot", "pw", Duration::from_secs(5)).unwrap();
    let err = tracker.track_task("x").await.unwrap_err();

    assert!(matches!(err, TrackingError::UnexpectedStatus(503)));
}

#[tokio::test]
async fn test_reporter_posts_report_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reports"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(json!({
            "report_id": "opdatering_af_kommunekode_paa_leverandoer_i_nexus",
            "group": "Postnummer uden kommunekode",
            "json": {"Leverandør": "3 - C", "Postnummer": "9999"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let reporter = HttpReporter::new(
        format!("{}/reports", server.uri()),
        "robot",
        "pw",
        Duration::from_secs(5),
    )
    .unwrap();
    let issue = DataQualityIssue::unmapped_postal_code("3 - C", "9999");

    reporter
        .report(
            "opdatering_af_kommunekode_paa_leverandoer_i_nexus",
            issue.category.group(),
            &issue.payload(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reporter_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let reporter =
        HttpReporter::new(server.uri(), "robot", "pw", Duration::from_secs(5)).unwrap();
    let err = reporter
        .report("r", "Manglende postnummer", &json!({"Leverandør": "1 - A"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::UnexpectedStatus(500)));
}
