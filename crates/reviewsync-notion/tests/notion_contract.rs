//! Notion client contract tests
//!
//! Verify the HTTP requests the client issues and how it reads the answers,
//! using a wiremock server in place of api.notion.com.

use reviewsync_core::{list_all, Error, NotionConfig, RecordStore};
use reviewsync_notion::NotionClient;
use secrecy::SecretString;
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, dump_path: Option<PathBuf>) -> NotionConfig {
    NotionConfig {
        token: SecretString::new("secret_test".to_string()),
        database_id: "db-1".to_string(),
        base_url: server.uri(),
        version: "2022-06-28".to_string(),
        page_size: 100,
        dump_path,
        timeout_secs: 5,
    }
}

fn page(id: &str, url: &str) -> serde_json::Value {
    json!({
        "object": "page",
        "id": id,
        "archived": false,
        "properties": {"URL": {"title": [{"text": {"content": url}}]}}
    })
}

#[tokio::test]
async fn test_query_sends_auth_and_version() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(header("authorization", "Bearer secret_test"))
        .and(header("notion-version", "2022-06-28"))
        .and(body_json(json!({"page_size": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [page("p1", "https://x/pull/1")],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let page = client.query(100, None).await.unwrap();

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].url(), Some("https://x/pull/1"));
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_list_all_pages_through_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_json(json!({"page_size": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p1", "u1"), page("p2", "u2")],
            "has_more": true,
            "next_cursor": "c1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_json(json!({"page_size": 2, "start_cursor": "c1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p3", "u3"), page("p4", "u4")],
            "has_more": true,
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_json(json!({"page_size": 2, "start_cursor": "c2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p5", "u5")],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let records = list_all(&client, 2, None).await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5"]);
}

#[tokio::test]
async fn test_first_page_is_dumped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("db.json");

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p1", "https://x/pull/1")],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, Some(dump.clone()))).unwrap();
    client.query(100, None).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(written["results"][0]["id"], "p1");
}

#[tokio::test]
async fn test_query_error_status_is_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error",
            "code": "unauthorized"
        })))
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let err = client.query(100, None).await.unwrap_err();

    match err {
        Error::Api { service, status, .. } => {
            assert_eq!(service, "Notion");
            assert_eq!(status, 401);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_query_malformed_body_is_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    assert!(client.query(100, None).await.is_err());
}

#[tokio::test]
async fn test_create_posts_parent_and_properties() {
    let server = MockServer::start().await;
    let properties = json!({"URL": {"title": [{"text": {"content": "https://x/pull/9"}}]}});

    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .and(body_json(json!({
            "parent": {"database_id": "db-1"},
            "properties": properties.clone()
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "page", "id": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let outcome = client.create(&properties).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.body["id"], "new");
}

#[tokio::test]
async fn test_create_rejection_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "object": "error",
            "code": "validation_error"
        })))
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let outcome = client.create(&json!({})).await.unwrap();

    assert_eq!(outcome.status, 400);
    assert!(!outcome.is_success());
    assert_eq!(outcome.body["code"], "validation_error");
}

#[tokio::test]
async fn test_update_patches_properties() {
    let server = MockServer::start().await;
    let properties = json!({"Requestor": {"rich_text": [{"text": {"content": "bob"}}]}});

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/p1"))
        .and(body_json(json!({"properties": properties.clone()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let outcome = client.update("p1", &properties).await.unwrap();
    assert_eq!(outcome.status, 200);
}

#[tokio::test]
async fn test_archive_sets_flag() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/p7"))
        .and(body_json(json!({"archived": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p7", "archived": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = NotionClient::new(&config(&server, None)).unwrap();
    let outcome = client.archive("p7").await.unwrap();
    assert!(outcome.is_success());
}
