//! Automation server client against a mock HTTP server

use kommunekode_sync::automation::{
    AutomationError, AutomationServerClient, CredentialStore, WorkItemStatus, WorkQueue,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, workqueue_id: Option<i64>) -> AutomationServerClient {
    AutomationServerClient::new(
        &format!("{}/api/", server.uri()),
        "ats-token",
        workqueue_id,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_get_credential_with_instance_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/credentials/by_name/KMD%20Nexus%20-%20produktion"))
        .and(header("authorization", "Bearer ats-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "KMD Nexus - produktion",
            "username": "client-id",
            "password": "client-secret",
            "data": {"instance": "odense"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = client(&server, None)
        .get_credential("KMD Nexus - produktion")
        .await
        .unwrap();

    assert_eq!(credential.username, "client-id");
    assert_eq!(credential.password, "client-secret");
    assert_eq!(credential.data_str("instance"), Some("odense"));
}

#[tokio::test]
async fn test_unknown_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .get_credential("RoboA")
        .await
        .unwrap_err();

    assert!(matches!(err, AutomationError::CredentialNotFound(name) if name == "RoboA"));
}

#[tokio::test]
async fn test_add_item_posts_data_and_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/workqueues/12/add"))
        .and(body_json(json!({
            "data": {"leverandør_id": 1, "kommunekode": "461", "postnummer": "5000"},
            "reference": "1 - Fysioterapi Syd"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 501,
            "data": {"leverandør_id": 1, "kommunekode": "461", "postnummer": "5000"},
            "reference": "1 - Fysioterapi Syd",
            "status": "new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = client(&server, Some(12))
        .add_item(
            json!({"leverandør_id": 1, "kommunekode": "461", "postnummer": "5000"}),
            "1 - Fysioterapi Syd",
        )
        .await
        .unwrap();

    assert_eq!(item.id, 501);
    assert_eq!(item.reference, "1 - Fysioterapi Syd");
}

#[tokio::test]
async fn test_clear_new_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/workqueues/12/clear"))
        .and(body_json(json!({"workitem_status": "new"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, Some(12))
        .clear(WorkItemStatus::New)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_next_item_on_empty_queue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workqueues/12/next_item"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let item = client(&server, Some(12)).next_item().await.unwrap();

    assert!(item.is_none());
}

#[tokio::test]
async fn test_next_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workqueues/12/next_item"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "data": {"leverandør_id": 3, "kommunekode": null, "postnummer": "5000"},
            "reference": "3 - C"
        })))
        .mount(&server)
        .await;

    let item = client(&server, Some(12))
        .next_item()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(item.id, 7);
    assert_eq!(item.data["postnummer"], "5000");
}

#[tokio::test]
async fn test_fail_sends_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/workitems/7/status"))
        .and(body_json(json!({
            "status": "failed",
            "message": "Failed to update supplier: conflict"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, Some(12))
        .fail(7, "Failed to update supplier: conflict")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_complete_sends_empty_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/workitems/7/status"))
        .and(body_json(json!({"status": "completed", "message": ""})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, Some(12)).complete(7).await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server, Some(12)).next_item().await.unwrap_err();

    assert!(matches!(
        err,
        AutomationError::UnexpectedStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_queue_operations_need_a_workqueue() {
    let server = MockServer::start().await;

    let err = client(&server, None).next_item().await.unwrap_err();

    assert!(matches!(err, AutomationError::NotConfigured(_)));
}
