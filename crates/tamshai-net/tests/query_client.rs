use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tamshai_auth::prelude::ServerConfig;
use tamshai_net::prelude::*;
use tamshai_types::prelude::{CallerIdentity, QueryStatus, ResponseEnvelope};
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_for(mock: &MockServer, name: &str) -> ServerConfig {
    let base = Url::parse(&mock.uri()).expect("mock uri");
    ServerConfig::new(name, base, ["hr-read"], "test server")
}

fn caller() -> CallerIdentity {
    CallerIdentity::new("u-1", "alice").with_roles(["hr-read"])
}

fn client(policy: QueryPolicy) -> HttpQueryClient {
    HttpQueryClient::builder()
        .with_policy(policy)
        .build()
        .expect("client")
}

fn page(start: u32, len: u32, cursor: Option<&str>) -> Value {
    let data: Vec<Value> = (start..start + len).map(|id| json!({ "id": id })).collect();
    json!({
        "status": "success",
        "data": data,
        "metadata": { "hasMore": cursor.is_some(), "nextCursor": cursor, "returnedCount": len }
    })
}

async fn mount_pages(mock: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(0, 20, Some("c2"))))
        .with_priority(10)
        .mount(mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "cursor": "c2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(20, 20, Some("c3"))))
        .mount(mock)
        .await;
}

#[tokio::test]
async fn slow_server_is_timeout_not_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "data": []}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock)
        .await;

    let client = client(QueryPolicy::default().with_read_timeout(Duration::from_millis(100)));
    let started = Instant::now();
    let outcome = client
        .query_server(&server_for(&mock, "finance"), &caller(), QueryRequest::new("q"))
        .await;

    assert_eq!(outcome.status, QueryStatus::Timeout);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("100ms"));
    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(client.metrics().snapshot().timeouts, 1);
}

#[tokio::test]
async fn write_queries_use_the_write_timeout() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "data": {"ok": true}}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock)
        .await;

    let policy = QueryPolicy::default()
        .with_read_timeout(Duration::from_millis(50))
        .with_write_timeout(Duration::from_secs(2));
    let outcome = client(policy)
        .query_server(&server_for(&mock, "hr"), &caller(), QueryRequest::new("q").write())
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn upstream_failures_are_errors() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&mock)
        .await;

    let client = client(QueryPolicy::default());
    let outcome = client
        .query_server(&server_for(&mock, "hr"), &caller(), QueryRequest::new("q"))
        .await;
    assert_eq!(outcome.status, QueryStatus::Error);
    assert!(outcome.error.is_some());

    let unreachable = ServerConfig::new(
        "gone",
        Url::parse("http://127.0.0.1:9").unwrap(),
        ["hr-read"],
        "",
    );
    let outcome = client
        .query_server(&unreachable, &caller(), QueryRequest::new("q"))
        .await;
    assert_eq!(outcome.status, QueryStatus::Error);
}

#[tokio::test]
async fn walks_all_pages_and_concatenates() {
    let mock = MockServer::start().await;
    mount_pages(&mock).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "cursor": "c3" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(40, 10, None)))
        .mount(&mock)
        .await;

    let outcome = client(QueryPolicy::default())
        .query_server(&server_for(&mock, "hr"), &caller(), QueryRequest::new("list employees"))
        .await;

    assert!(outcome.is_success());
    let envelope = outcome.envelope().expect("envelope");
    let ResponseEnvelope::Success { data, .. } = &envelope else {
        panic!("expected success, got {envelope:?}");
    };
    let items = data.as_array().expect("array");
    assert_eq!(items.len(), 50);
    assert_eq!(items[49]["id"], 49);
    let meta = envelope.pagination().expect("pagination");
    assert!(!meta.has_more);
    assert_eq!(meta.returned_count, 50);
    assert_eq!(meta.pages_retrieved, Some(3));
}

#[tokio::test]
async fn page_cap_stops_pagination() {
    let mock = MockServer::start().await;
    mount_pages(&mock).await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({ "cursor": "c3" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(40, 10, None)))
        .expect(0)
        .mount(&mock)
        .await;

    let outcome = client(QueryPolicy::default().with_max_pages(2))
        .query_server(&server_for(&mock, "hr"), &caller(), QueryRequest::new("q"))
        .await;

    let envelope = outcome.envelope().expect("envelope");
    let meta = envelope.pagination().expect("pagination");
    assert!(meta.has_more);
    assert_eq!(meta.next_cursor.as_deref(), Some("c3"));
    assert_eq!(meta.returned_count, 40);
    assert_eq!(meta.pages_retrieved, Some(2));
}

#[tokio::test]
async fn disabled_auto_pagination_reads_one_page() {
    let mock = MockServer::start().await;
    mount_pages(&mock).await;

    let outcome = client(QueryPolicy::default())
        .query_server(
            &server_for(&mock, "hr"),
            &caller(),
            QueryRequest::new("q").auto_paginate(false),
        )
        .await;
    let meta = outcome.envelope().unwrap().pagination().cloned().unwrap();
    assert_eq!(meta.pages_retrieved, Some(1));
    assert_eq!(meta.next_cursor.as_deref(), Some("c2"));
}

#[tokio::test]
async fn non_array_and_pending_bodies_pass_through() {
    let mock = MockServer::start().await;
    let body = json!({
        "status": "pending_confirmation",
        "confirmationId": "c-9",
        "message": "Delete employee emp-42?",
        "confirmationData": {"action": "delete_employee", "mcpServer": "hr", "userId": "u-1", "employeeId": "emp-42"}
    });
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("x-user-id", "u-1"))
        .and(header("x-user-roles", "hr-read"))
        .and(body_partial_json(json!({ "query": "delete emp-42", "userContext": { "userId": "u-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&mock)
        .await;

    let outcome = client(QueryPolicy::default())
        .query_server(&server_for(&mock, "hr"), &caller(), QueryRequest::new("delete emp-42"))
        .await;
    assert!(outcome.is_success());
    assert_eq!(outcome.data, body);
}

#[tokio::test]
async fn tool_calls_relay_status_and_body() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools/get_employee"))
        .and(query_param("employeeId", "emp-404"))
        .and(header("x-user-id", "u-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "error", "code": "EMPLOYEE_NOT_FOUND", "message": "No such employee"
        })))
        .mount(&mock)
        .await;

    let response = client(QueryPolicy::default())
        .call_tool(
            &server_for(&mock, "hr"),
            &caller(),
            ToolCall::get("get_employee", vec![("employeeId".into(), "emp-404".into())]),
        )
        .await
        .expect("relayed");
    assert_eq!(response.status, 404);
    assert_eq!(response.body["code"], "EMPLOYEE_NOT_FOUND");
}

#[tokio::test]
async fn execute_posts_action_and_surfaces_failures() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({ "action": "delete_employee", "data": { "employeeId": "emp-42" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": {"deleted": true}})))
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .and(body_partial_json(json!({ "action": "explode" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&mock)
        .await;

    let client = client(QueryPolicy::default());
    let server = server_for(&mock, "hr");
    let result = client
        .execute(&server, &caller(), "delete_employee", &json!({"employeeId": "emp-42"}))
        .await
        .expect("executed");
    assert_eq!(result["data"]["deleted"], true);

    let err = client
        .execute(&server, &caller(), "explode", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.0.http_status(), 502);
    assert_eq!(err.0.details.as_ref().unwrap()["upstreamStatus"], 500);
}
