//! GitHub client contract tests

use reviewsync_core::{fetch_open_review_requests, Error, GitHubConfig, ReviewSource};
use reviewsync_github::GitHubClient;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(&GitHubConfig {
        token: SecretString::new("ghp_test".to_string()),
        username: "octocat".to_string(),
        base_url: server.uri(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn item(title: &str, number: u32, login: &str, state: &str) -> serde_json::Value {
    json!({
        "title": title,
        "number": number,
        "html_url": format!("https://github.com/o/r/pull/{}", number),
        "user": {"login": login},
        "created_at": "2024-01-05T10:30:00Z",
        "state": state
    })
}

#[test]
fn test_review_query() {
    assert_eq!(GitHubClient::review_query("octocat"), "is:pr review-requested:octocat");
}

#[tokio::test]
async fn test_search_sends_query_and_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", "is:pr review-requested:octocat"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [item("Add cache", 1, "alice", "open"), item("Old", 2, "bob", "closed")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client(&server).search_review_requests("octocat").await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Add cache");
    assert_eq!(items[0].user.login, "alice");
}

#[tokio::test]
async fn test_fetch_filters_and_formats() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("Add cache", 1, "alice", "open"), item("Old", 2, "bob", "closed")]
        })))
        .mount(&server)
        .await;

    let requests = fetch_open_review_requests(&client(&server), "octocat")
        .await
        .unwrap();

    assert_eq!(requests.len(), 1);
    let request = &requests["Add cache"];
    assert_eq!(request.url, "https://github.com/o/r/pull/1");
    assert_eq!(request.requestor, "alice");
    assert_eq!(request.created, "January 05, 2024 10:30");
}

#[tokio::test]
async fn test_missing_items_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_count": 0})))
        .mount(&server)
        .await;

    let items = client(&server).search_review_requests("octocat").await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_unauthorized_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .search_review_requests("octocat")
        .await
        .unwrap_err();

    match err {
        Error::Api { service, status, body } => {
            assert_eq!(service, "GitHub");
            assert_eq!(status, 401);
            assert!(body.contains("Bad credentials"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
