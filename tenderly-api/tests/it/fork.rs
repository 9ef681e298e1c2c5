use crate::*;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;
use tenderly_api::{errors::TenderlyError, ForkId, ForkRequest, ACCESS_KEY_HEADER};

#[tokio::test]
async fn create_fork_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", forks_path().as_str())
        .match_header(ACCESS_KEY_HEADER, ACCESS_KEY)
        .match_body(Matcher::Json(json!({
            "network_id": "1",
            "chain_config": { "chain_id": 11, "shanghai_time": 1677557088 }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "simulation_fork": { "id": "abc-123", "network_id": "1" } }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let fork = client.create_fork(&ForkRequest::default()).await.unwrap();

    assert_eq!(fork, ForkId::from("abc-123"));
    mock.assert_async().await;
}

#[tokio::test]
async fn create_fork_missing_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", forks_path().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "simulation_fork": { "network_id": "1" } }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_fork(&ForkRequest::default()).await.unwrap_err();

    assert!(matches!(err, TenderlyError::MissingForkId));
    mock.assert_async().await;
}

#[tokio::test]
async fn create_fork_malformed_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", forks_path().as_str())
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_fork(&ForkRequest::default()).await.unwrap_err();

    assert!(matches!(err, TenderlyError::Serde(_)));
}

#[tokio::test]
async fn create_fork_rejected() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", forks_path().as_str())
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "error": { "slug": "invalid_network", "message": "unknown network" } })
                .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_fork(&ForkRequest::new("424242")).await.unwrap_err();

    assert!(matches!(err, TenderlyError::Api { ref slug, .. } if slug == "invalid_network"));
}

#[tokio::test]
async fn create_fork_wrong_access_key() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", forks_path().as_str())
        .with_status(401)
        .with_body(json!({ "error": { "slug": "unauthorized", "message": "invalid api key" } }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.create_fork(&ForkRequest::default()).await.unwrap_err();

    assert!(matches!(err, TenderlyError::Unauthorized(_)));
}

#[tokio::test]
async fn delete_fork_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", format!("{}/abc-123", forks_path()).as_str())
        .match_header(ACCESS_KEY_HEADER, ACCESS_KEY)
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    client.delete_fork(&ForkId::from("abc-123")).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn spawn_delete_fork_issues_single_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", format!("{}/abc-123", forks_path()).as_str())
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let handle = client.spawn_delete_fork(ForkId::from("abc-123"));

    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn spawn_delete_fork_swallows_errors() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", format!("{}/does-not-exist", forks_path()).as_str())
        .with_status(404)
        .with_body(json!({ "error": { "slug": "not_found", "message": "fork not found" } }).to_string())
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let handle = client.spawn_delete_fork(ForkId::from("does-not-exist"));

    // the task completes normally, the failure is only logged
    handle.await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn spawn_delete_fork_unreachable_api() {
    // nothing listens on port 9 of localhost
    let client = Client::builder()
        .with_api_url("http://127.0.0.1:9/api/v1")
        .unwrap()
        .with_user(USER)
        .with_project(PROJECT)
        .with_access_key(ACCESS_KEY)
        .build()
        .unwrap();

    let handle = client.spawn_delete_fork(ForkId::from("abc-123"));
    handle.await.unwrap();

    let err = client.delete_fork(&ForkId::from("abc-123")).await.unwrap_err();
    assert!(err.is_transport());
}
