use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wikipage_domain::profile::ThrottlePolicy;
use wikipage_mw_api::{ClientConfig, ReqwestMwClient};
use wikipage_page::{EditOptions, Page, PageError, TextOptions};
use wikipage_telemetry::{TelemetryConfig, init_telemetry};
use wiremock::matchers::{body_string_contains, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_throttle() -> ThrottlePolicy {
    ThrottlePolicy {
        min_edit_interval: Duration::from_millis(10),
        maxlag: 5,
        max_retries: 2,
        backoff_base: Duration::from_millis(10),
    }
}

async fn mount_session(server: &MockServer, userinfo: serde_json::Value) {
    Mock::given(method("GET"))
        .and(query_param("meta", "userinfo|siteinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {
                "userinfo": userinfo,
                "general": {"generator": "MediaWiki 1.41.0", "writeapi": ""}
            }
        })))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(query_param("prop", "info"))
        .and(query_param("titles", "Sandbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": {"7": {
                "pageid": 7, "ns": 4, "title": "Project:Sandbox",
                "touched": "2024-03-01T00:00:00Z", "lastrevid": 900, "length": 12,
                "protection": []
            }}}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("prop", "revisions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": "",
            "query": {"pages": {"7": {"revisions": [{
                "revid": 900,
                "timestamp": "2024-03-01T10:20:30Z",
                "slots": {"main": {"contentmodel": "wikitext", "content": "Sandbox text"}}
            }]}}}
        })))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> Arc<ReqwestMwClient> {
    let config = ClientConfig::new(url::Url::parse(&server.uri()).unwrap()).with_throttle(fast_throttle());
    Arc::new(ReqwestMwClient::connect(config).await.unwrap())
}

fn editor() -> serde_json::Value {
    json!({"id": 12, "name": "ExampleBot", "rights": ["read", "edit", "bot"]})
}

#[tokio::test]
async fn test_fetch_and_edit_with_stale_token_retry() {
    let _ = init_telemetry(&TelemetryConfig::default());
    let server = MockServer::start().await;
    mount_session(&server, editor()).await;
    mount_page(&server).await;

    Mock::given(method("GET"))
        .and(query_param("meta", "tokens"))
        .and(query_param("type", "csrf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"tokens": {"csrftoken": "abc+\\"}}
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("action=edit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "badtoken", "info": "Invalid CSRF token."}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("action=edit"))
        .and(body_string_contains("basetimestamp=20240301102030"))
        .and(body_string_contains("assert=user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "edit": {"result": "Success", "pageid": 7, "title": "Project:Sandbox",
                "oldrevid": 900, "newrevid": 901, "newtimestamp": "2024-03-02T00:00:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let site = connect(&server).await;
    let mut page = Page::load(Arc::clone(&site), "Sandbox").await.unwrap();
    assert_eq!(page.name(), "Project:Sandbox");
    assert_eq!(page.page_title(), "Sandbox");

    let text = page.text(&TextOptions::default()).await.unwrap();
    assert_eq!(text, "Sandbox text");

    let response = page.edit("Sandbox text, edited", &EditOptions::new("test edit")).await.unwrap();
    assert_eq!(response.new_revid, Some(901));
    assert_eq!(page.last_rev_time().map(|t| t.format()).as_deref(), Some("20240302000000"));
    assert_eq!(page.cached_texts(), 0);
}

#[tokio::test]
async fn test_server_protection_error_is_classified() {
    let server = MockServer::start().await;
    mount_session(&server, editor()).await;
    mount_page(&server).await;

    Mock::given(method("GET"))
        .and(query_param("meta", "tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"tokens": {"csrftoken": "abc+\\"}}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("action=edit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "protectedpage", "info": "This page has been protected to prevent editing."}
        })))
        .mount(&server)
        .await;

    let site = connect(&server).await;
    let mut page = Page::load(Arc::clone(&site), "Sandbox").await.unwrap();
    let err = page.edit("x", &EditOptions::default()).await.unwrap_err();
    match err {
        PageError::ProtectedPage { page, code, .. } => {
            assert_eq!(page, "Project:Sandbox");
            assert_eq!(code.as_str(), "protectedpage");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_anonymous_session_cannot_edit() {
    let server = MockServer::start().await;
    mount_session(&server, json!({"id": 0, "name": "127.0.0.1", "anon": "", "rights": ["read", "edit"]})).await;
    mount_page(&server).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let site = connect(&server).await;
    let mut page = Page::load(Arc::clone(&site), "Sandbox").await.unwrap();
    assert!(page.can("edit").await);
    let err = page.edit("x", &EditOptions::default()).await.unwrap_err();
    assert!(matches!(err, PageError::SessionAssertion));
}

#[tokio::test]
async fn test_blocked_session_cannot_edit() {
    let server = MockServer::start().await;
    mount_session(
        &server,
        json!({"id": 12, "name": "ExampleBot", "rights": ["read", "edit"],
            "blockid": 3, "blockedby": "Admin", "blockreason": "testing", "blockexpiry": "infinite"}),
    )
    .await;
    mount_page(&server).await;

    let site = connect(&server).await;
    let mut page = Page::load(Arc::clone(&site), "Sandbox").await.unwrap();
    match page.edit("x", &EditOptions::default()).await {
        Err(PageError::UserBlocked(block)) => assert_eq!(block.reason.as_deref(), Some("testing")),
        other => panic!("unexpected {other:?}"),
    }
}
