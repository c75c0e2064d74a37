//! End-to-end protocol tests against a scripted transport.
//!
//! The mock plays back canned coordinator responses and records every
//! request, so the tests can assert both the rows a caller sees and the
//! exact HTTP conversation that produced them.

use presto_link::{
    AuthProvider, Connection, HttpScheme, Param, PrestoLinkClient, PrestoLinkError, QueryState,
    RetryPolicy, Result, Transport, TransportResponse, Value,
};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct RecordedCall {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<String>,
}

struct MockTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    fn new(responses: Vec<TransportResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            headers,
            body,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PrestoLinkError::Transport("mock script exhausted".into()))
    }
}

fn ok(body: serde_json::Value) -> TransportResponse {
    TransportResponse {
        status: 200,
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}

fn ok_with_headers(body: serde_json::Value, pairs: &[(&str, &str)]) -> TransportResponse {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.append(
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
    }
    TransportResponse {
        status: 200,
        headers,
        body: body.to_string(),
    }
}

fn status(code: u16) -> TransportResponse {
    TransportResponse {
        status: code,
        headers: HeaderMap::new(),
        body: String::new(),
    }
}

fn bigint_columns() -> serde_json::Value {
    json!([{ "name": "x", "type": "bigint" }])
}

fn client(transport: Arc<MockTransport>) -> PrestoLinkClient {
    PrestoLinkClient::builder("localhost", "alice")
        .transport(transport)
        .server_retry(RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn single_page_query_delivers_rows_and_finishes() {
    let transport = MockTransport::new(vec![ok(json!({
        "id": "q_1",
        "infoUri": "http://localhost:8080/ui/q_1",
        "columns": bigint_columns(),
        "data": [[1]],
        "stats": { "state": "FINISHED" }
    }))]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT 1").await.unwrap();
    assert_eq!(query.state(), QueryState::Finished);
    assert_eq!(query.query_id(), "q_1");

    let page = query.advance().await.unwrap().unwrap();
    assert_eq!(page.rows, vec![vec![Value::BigInt(1)]]);
    assert!(query.advance().await.unwrap().is_none());

    // One POST, nothing else.
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(calls[0].url, "http://localhost:8080/v1/statement");
    assert_eq!(calls[0].headers.get("X-Presto-User").unwrap(), "alice");
}

#[tokio::test]
async fn pages_are_followed_until_next_uri_disappears() {
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_2",
            "nextUri": "http://localhost:8080/v1/statement/q_2/1",
            "stats": { "state": "QUEUED" }
        })),
        ok(json!({
            "id": "q_2",
            "nextUri": "http://localhost:8080/v1/statement/q_2/2",
            "columns": bigint_columns(),
            "stats": { "state": "RUNNING" }
        })),
        ok(json!({
            "id": "q_2",
            "columns": bigint_columns(),
            "data": [[42]],
            "stats": { "state": "FINISHED" }
        })),
    ]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT slow()").await.unwrap();
    assert_eq!(query.state(), QueryState::Queued);

    let mut rows = Vec::new();
    while let Some(page) = query.advance().await.unwrap() {
        rows.extend(page.rows);
    }
    assert_eq!(rows, vec![vec![Value::BigInt(42)]]);
    assert_eq!(query.state(), QueryState::Finished);

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].method, Method::GET);
    assert_eq!(calls[1].url, "http://localhost:8080/v1/statement/q_2/1");
    assert_eq!(calls[2].url, "http://localhost:8080/v1/statement/q_2/2");
}

#[tokio::test]
async fn rows_preserve_order_across_pages() {
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_3",
            "nextUri": "http://localhost:8080/v1/statement/q_3/1",
            "columns": bigint_columns(),
            "data": [[1], [2]],
            "stats": { "state": "RUNNING" }
        })),
        ok(json!({
            "id": "q_3",
            "columns": bigint_columns(),
            "data": [[3], [4]],
            "stats": { "state": "FINISHED" }
        })),
    ]);
    let client = client(transport);

    let mut query = client.submit("SELECT x FROM t ORDER BY x").await.unwrap();
    let mut rows = Vec::new();
    while let Some(page) = query.advance().await.unwrap() {
        rows.extend(page.rows);
    }
    let expected: Vec<Vec<Value>> = (1..=4).map(|n| vec![Value::BigInt(n)]).collect();
    assert_eq!(rows, expected);
}

#[tokio::test]
async fn server_retryable_error_is_repolled_at_same_uri() {
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_4",
            "nextUri": "http://localhost:8080/v1/statement/q_4/1",
            "stats": { "state": "RUNNING" }
        })),
        ok(json!({
            "id": "q_4",
            "stats": { "state": "FAILED" },
            "error": {
                "message": "worker restarting",
                "errorCode": 65540,
                "errorName": "PAGE_TRANSPORT_TIMEOUT",
                "errorType": "INTERNAL_ERROR",
                "retriable": true
            }
        })),
        ok(json!({
            "id": "q_4",
            "columns": bigint_columns(),
            "data": [[7]],
            "stats": { "state": "FINISHED" }
        })),
    ]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT x FROM t").await.unwrap();
    // First advance yields the (empty) first page.
    let first = query.advance().await.unwrap().unwrap();
    assert!(first.rows.is_empty());
    // The transient failure is absorbed and the same URI re-polled.
    let page = query.advance().await.unwrap().unwrap();
    assert_eq!(page.rows, vec![vec![Value::BigInt(7)]]);
    assert_eq!(query.state(), QueryState::Finished);

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].url, calls[2].url);
}

#[tokio::test]
async fn retryable_error_budget_is_bounded() {
    let error_page = json!({
        "id": "q_5",
        "stats": { "state": "FAILED" },
        "error": {
            "message": "worker restarting",
            "errorCode": 65540,
            "errorName": "PAGE_TRANSPORT_TIMEOUT",
            "errorType": "INTERNAL_ERROR",
            "retriable": true
        }
    });
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_5",
            "nextUri": "http://localhost:8080/v1/statement/q_5/1",
            "stats": { "state": "RUNNING" }
        })),
        ok(error_page.clone()),
        ok(error_page.clone()),
        ok(error_page.clone()),
        ok(error_page),
    ]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT x FROM t").await.unwrap();
    query.advance().await.unwrap();
    // Budget of 3 retries: attempt + 3 re-polls, then the error surfaces.
    let err = query.advance().await.unwrap_err();
    assert!(matches!(err, PrestoLinkError::ServerQuery(_)));
    assert_eq!(query.state(), QueryState::Failed);
    assert_eq!(transport.calls().len(), 5);
}

#[tokio::test]
async fn non_retryable_error_fails_immediately() {
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_6",
            "nextUri": "http://localhost:8080/v1/statement/q_6/1",
            "stats": { "state": "RUNNING" }
        })),
        ok(json!({
            "id": "q_6",
            "stats": { "state": "FAILED" },
            "error": {
                "message": "line 1:8: Column 'y' cannot be resolved",
                "errorCode": 47,
                "errorName": "COLUMN_NOT_FOUND",
                "errorType": "USER_ERROR",
                "retriable": false,
                "errorLocation": { "lineNumber": 1, "columnNumber": 8 }
            }
        })),
    ]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT y FROM t").await.unwrap();
    query.advance().await.unwrap();
    let err = query.advance().await.unwrap_err();
    match err {
        PrestoLinkError::ServerQuery(e) => {
            assert_eq!(e.error_name.as_deref(), Some("COLUMN_NOT_FOUND"));
            assert!(!e.is_retryable());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(query.state(), QueryState::Failed);

    // Terminal: no further requests are issued.
    let before = transport.calls().len();
    assert!(query.advance().await.unwrap().is_none());
    assert_eq!(transport.calls().len(), before);
}

#[tokio::test]
async fn cancel_issues_delete_and_stops_paging() {
    let transport = MockTransport::new(vec![
        ok(json!({
            "id": "q_7",
            "nextUri": "http://localhost:8080/v1/statement/q_7/1",
            "columns": bigint_columns(),
            "data": [[1]],
            "stats": { "state": "RUNNING" }
        })),
        status(204),
    ]);
    let client = client(transport.clone());

    let mut query = client.submit("SELECT x FROM huge").await.unwrap();
    query.cancel().await;
    assert_eq!(query.state(), QueryState::Cancelled);
    assert!(query.advance().await.unwrap().is_none());

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].method, Method::DELETE);
    assert_eq!(calls[1].url, "http://localhost:8080/v1/statement/q_7/1");

    // Cancelling again is a no-op.
    query.cancel().await;
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn submission_rejection_maps_to_submission_error() {
    let transport = MockTransport::new(vec![status(400)]);
    let client = client(transport);

    let err = client.submit("SELEC 1").await.unwrap_err();
    assert!(matches!(err, PrestoLinkError::QuerySubmission(_)));
}

#[tokio::test]
async fn credential_rejection_maps_to_auth_error() {
    let transport = MockTransport::new(vec![status(401)]);
    let client = client(transport);

    let err = client.submit("SELECT 1").await.unwrap_err();
    assert!(matches!(err, PrestoLinkError::Auth(_)));
}

#[tokio::test]
async fn session_deltas_carry_into_subsequent_statements() {
    let transport = MockTransport::new(vec![
        ok_with_headers(
            json!({ "id": "q_8", "stats": { "state": "FINISHED" }, "updateType": "SET SESSION" }),
            &[("X-Presto-Set-Session", "optimize_joins=true")],
        ),
        ok(json!({
            "id": "q_9",
            "columns": bigint_columns(),
            "data": [[1]],
            "stats": { "state": "FINISHED" }
        })),
    ]);
    let client = client(transport.clone());
    let mut connection = Connection::new(client);

    let mut cursor = connection.cursor();
    cursor.execute("SET SESSION optimize_joins = true").await.unwrap();
    cursor.fetch_all().await.unwrap();
    cursor.execute("SELECT 1").await.unwrap();
    let rows = cursor.fetch_all().await.unwrap();
    assert_eq!(rows, vec![vec![Value::BigInt(1)]]);

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].headers.get("X-Presto-Session").is_none());
    assert_eq!(
        calls[1].headers.get("X-Presto-Session").unwrap(),
        "optimize_joins=true"
    );
}

#[tokio::test]
async fn transaction_id_is_carried_and_cleared() {
    let transport = MockTransport::new(vec![
        // START TRANSACTION
        ok_with_headers(
            json!({ "id": "q_10", "stats": { "state": "FINISHED" } }),
            &[("X-Presto-Started-Transaction-Id", "txn-abc")],
        ),
        // statement inside the transaction
        ok(json!({
            "id": "q_11",
            "columns": bigint_columns(),
            "data": [[1]],
            "stats": { "state": "FINISHED" }
        })),
        // COMMIT
        ok_with_headers(
            json!({ "id": "q_12", "stats": { "state": "FINISHED" } }),
            &[("X-Presto-Clear-Transaction-Id", "true")],
        ),
    ]);
    let client = client(transport.clone());
    let mut connection = Connection::new(client);

    connection
        .begin(presto_link::IsolationLevel::ReadCommitted)
        .await
        .unwrap();
    assert_eq!(connection.session().transaction_id.as_deref(), Some("txn-abc"));

    let mut cursor = connection.cursor();
    cursor.execute("SELECT 1").await.unwrap();
    cursor.fetch_all().await.unwrap();
    drop(cursor);

    connection.commit().await.unwrap();
    assert!(connection.session().transaction_id.is_none());

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].headers.get("X-Presto-Transaction-Id").is_none());
    assert_eq!(
        calls[1].headers.get("X-Presto-Transaction-Id").unwrap(),
        "txn-abc"
    );
    assert_eq!(
        calls[2].headers.get("X-Presto-Transaction-Id").unwrap(),
        "txn-abc"
    );
}

#[tokio::test]
async fn cursor_fetch_sizes() {
    let transport = MockTransport::new(vec![ok(json!({
        "id": "q_13",
        "columns": bigint_columns(),
        "data": [[1], [2], [3]],
        "stats": { "state": "FINISHED" }
    }))]);
    let client = client(transport);
    let mut connection = Connection::new(client);
    let mut cursor = connection.cursor();

    cursor.execute("SELECT x FROM t").await.unwrap();
    assert_eq!(
        cursor.description().unwrap(),
        vec![("x".to_string(), "bigint".to_string())]
    );
    assert_eq!(cursor.fetch_one().await.unwrap(), Some(vec![Value::BigInt(1)]));
    assert_eq!(
        cursor.fetch_many(Some(2)).await.unwrap(),
        vec![vec![Value::BigInt(2)], vec![Value::BigInt(3)]]
    );
    assert_eq!(cursor.fetch_one().await.unwrap(), None);
}

#[tokio::test]
async fn execute_params_substitutes_literals_into_statement() {
    let transport = MockTransport::new(vec![ok(json!({
        "id": "q_14",
        "columns": bigint_columns(),
        "data": [[1]],
        "stats": { "state": "FINISHED" }
    }))]);
    let client = client(transport.clone());
    let mut connection = Connection::new(client);
    let mut cursor = connection.cursor();

    cursor
        .execute_params(
            "SELECT x FROM t WHERE name = ? AND n IN ?",
            &[
                Param::String("O'Brien".into()),
                Param::Sequence(vec![Param::BigInt(1), Param::BigInt(2)]),
            ],
        )
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(
        calls[0].body.as_deref(),
        Some("SELECT x FROM t WHERE name = 'O''Brien' AND n IN (1,2)")
    );

    // A placeholder/parameter mismatch never reaches the wire.
    let before = transport.calls().len();
    let err = cursor
        .execute_params("SELECT ?", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PrestoLinkError::Configuration(_)));
    assert_eq!(transport.calls().len(), before);
}

#[test]
fn auth_over_plain_http_is_refused() {
    let err = PrestoLinkClient::builder("localhost", "alice")
        .scheme(HttpScheme::Http)
        .auth(AuthProvider::basic("alice", "secret"))
        .build()
        .unwrap_err();
    assert!(matches!(err, PrestoLinkError::Configuration(_)));
}
