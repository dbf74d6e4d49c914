//! Integration tests for the search dispatcher and presenter against a mock
//! backend: query construction, response normalization, and the
//! stale-response guard.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use lexica_client::config::ServiceConfig;
use lexica_client::models::{CodeFilter, RoleFilter, SearchFilters};
use lexica_client::{present, LexicaClient, SearchDispatcher, SearchOutcome};

fn dispatcher_for(server: &MockServer) -> SearchDispatcher {
    let client = LexicaClient::new(&ServiceConfig {
        base_url: server.base_url(),
        timeout_secs: 5,
    })
    .unwrap();
    SearchDispatcher::new(client, 10)
}

#[tokio::test]
async fn test_filters_become_query_params() {
    let server = MockServer::start_async().await;

    let search = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/datasets/ds1/search")
                .query_param("q", "hello")
                .query_param("k", "10")
                .query_param("role", "user")
                .query_param("has_code", "true");
            then.status(200).json_body(json!({
                "ok": true,
                "results": [
                    {"msg": 12, "conv_id": "c9", "role": "user", "score": 0.84231,
                     "ts": "2025-01-03T10:00:00Z", "title": "Borrow checker",
                     "snippet": "fighting the borrow checker"},
                    {"msg": 3, "conv_id": "c2", "role": "user", "score": 0.41}
                ]
            }));
        })
        .await;

    let filters = SearchFilters {
        query: "hello".to_string(),
        top_k: Some(10),
        role: RoleFilter::User,
        has_code: CodeFilter::True,
        ..Default::default()
    };

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher.search(Some("ds1"), &filters).await;
    let set = outcome.into_result_set().unwrap();

    search.assert_async().await;
    assert!(set.ok);
    assert_eq!(set.results.len(), 2);
    // Order as received, never re-sorted.
    assert_eq!(set.results[0].message_index, 12);
    assert_eq!(set.results[1].message_index, 3);

    let model = present(&set);
    assert_eq!(model.header, "2 results");
    assert_eq!(model.rows[0].score, "0.842");
    assert_eq!(model.rows[0].title.as_deref(), Some("Borrow checker"));
    assert!(model.rows[1].title.is_none());
}

#[tokio::test]
async fn test_missing_dataset_issues_no_request() {
    let server = MockServer::start_async().await;

    let any_search = server
        .mock_async(|when, then| {
            when.path_contains("/datasets");
            then.status(200).json_body(json!({"ok": true, "results": []}));
        })
        .await;

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher.search(None, &SearchFilters::new("hello")).await;
    let set = outcome.into_result_set().unwrap();

    assert!(!set.ok);
    assert!(set.error.is_some());
    assert_eq!(any_search.hits_async().await, 0);
}

#[tokio::test]
async fn test_backend_error_body_normalizes_to_error_set() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/datasets/ds1/search");
            then.status(200)
                .json_body(json!({"ok": false, "error": "index missing"}));
        })
        .await;

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher
        .search(Some("ds1"), &SearchFilters::new("hello"))
        .await;
    let set = outcome.into_result_set().unwrap();

    assert!(!set.ok);
    assert_eq!(set.error.as_deref(), Some("index missing"));

    let model = present(&set);
    assert_eq!(model.header, "Search error");
}

#[tokio::test]
async fn test_http_failure_never_escapes_as_error() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/datasets/ds1/search");
            then.status(500).body("engine on fire");
        })
        .await;

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher
        .search(Some("ds1"), &SearchFilters::new("hello"))
        .await;
    let set = outcome.into_result_set().unwrap();

    assert!(!set.ok);
    let message = set.error.unwrap();
    assert!(message.contains("500") && message.contains("engine on fire"));
}

#[tokio::test]
async fn test_malformed_body_normalizes_to_error_set() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/datasets/ds1/search");
            then.status(200).body("<html>definitely not json</html>");
        })
        .await;

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher
        .search(Some("ds1"), &SearchFilters::new("hello"))
        .await;
    let set = outcome.into_result_set().unwrap();

    assert!(!set.ok);
    assert!(set.error.unwrap().contains("malformed response"));
}

#[tokio::test]
async fn test_missing_results_field_is_empty_not_fault() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/datasets/ds1/search");
            then.status(200).json_body(json!({"ok": true}));
        })
        .await;

    let dispatcher = dispatcher_for(&server);
    let outcome = dispatcher
        .search(Some("ds1"), &SearchFilters::new("hello"))
        .await;
    let set = outcome.into_result_set().unwrap();

    assert!(set.ok);
    assert!(set.results.is_empty());
    assert_eq!(present(&set).header, "0 results");
}

#[tokio::test]
async fn test_slow_earlier_search_is_superseded_by_faster_later_one() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/datasets/ds1/search")
                .query_param("q", "slow");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"ok": true, "results": [{"msg": 1, "score": 0.1}]}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/datasets/ds1/search")
                .query_param("q", "fast");
            then.status(200)
                .json_body(json!({"ok": true, "results": [{"msg": 2, "score": 0.9}]}));
        })
        .await;

    let dispatcher = Arc::new(dispatcher_for(&server));

    let slow = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(
            async move { dispatcher.search(Some("ds1"), &SearchFilters::new("slow")).await },
        )
    };
    // Let the slow search claim the earlier sequence token first.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let fast = dispatcher
        .search(Some("ds1"), &SearchFilters::new("fast"))
        .await;
    let fast_set = fast.into_result_set().unwrap();
    assert_eq!(fast_set.results[0].message_index, 2);

    // The earlier search finishes later; its response must be discarded.
    let slow = slow.await.unwrap();
    assert!(matches!(slow, SearchOutcome::Superseded));
    assert!(slow.into_result_set().is_none());
}

#[tokio::test]
async fn test_search_failure_leaves_dataset_searchable() {
    let server = MockServer::start_async().await;

    // First call fails, second succeeds — no pipeline-level state is
    // involved, each search stands alone.
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/datasets/ds1/search")
                .query_param("q", "boom");
            then.status(502).body("upstream gone");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/datasets/ds1/search")
                .query_param("q", "ok");
            then.status(200)
                .json_body(json!({"ok": true, "results": [{"msg": 5, "score": 1.5}]}));
        })
        .await;

    let dispatcher = dispatcher_for(&server);

    let failed = dispatcher
        .search(Some("ds1"), &SearchFilters::new("boom"))
        .await
        .into_result_set()
        .unwrap();
    assert!(!failed.ok);

    let retried = dispatcher
        .search(Some("ds1"), &SearchFilters::new("ok"))
        .await
        .into_result_set()
        .unwrap();
    assert!(retried.ok);
    assert_eq!(retried.results.len(), 1);
}
