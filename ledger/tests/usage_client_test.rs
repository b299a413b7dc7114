use std::collections::HashMap;

use axum::{
    extract::Query,
    http::{header::COOKIE, HeaderMap},
    routing::get,
    Json, Router,
};
use ledger::usage::{UsageClient, UsageError};
use serde_json::{json, Value};

const COOKIE_VALUE: &str = "WorkosCursorSessionToken=user_01%3A%3Atok";

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(COOKIE).and_then(|v| v.to_str().ok()) == Some(COOKIE_VALUE)
}

async fn usage(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    if !authorized(&headers) || params.get("user").map(String::as_str) != Some("user_01") {
        return Json(json!({}));
    }
    Json(json!({
        "gpt-4": {"numRequests": 120, "maxRequestUsage": 500},
        "gpt-3.5-turbo": {"numRequests": 3, "maxRequestUsage": null}
    }))
}

async fn stripe(headers: HeaderMap) -> Json<Value> {
    if !authorized(&headers) {
        return Json(json!({}));
    }
    Json(json!({"membershipType": "free_trial", "daysRemainingOnTrial": 7}))
}

async fn spawn_api() -> String {
    let app = Router::new()
        .route("/api/usage", get(usage))
        .route("/api/auth/stripe", get(stripe))
        .route("/broken/api/usage", get(|| async { "<html>oops</html>" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_remaining_balance_from_api() -> Result<(), Box<dyn std::error::Error>> {
    let client = UsageClient::new().with_base_url(spawn_api().await);

    assert_eq!(client.get_remaining_balance("user_01", "tok").await?, Some(380));
    // wrong token: the server answers without the usage bucket
    assert_eq!(client.get_remaining_balance("user_01", "other").await?, None);

    let unlimited = client.clone().with_model("gpt-3.5-turbo");
    assert_eq!(unlimited.get_remaining_balance("user_01", "tok").await?, None);

    Ok(())
}

#[tokio::test]
async fn test_trial_days_from_api() -> Result<(), Box<dyn std::error::Error>> {
    let client = UsageClient::new().with_base_url(spawn_api().await);

    assert_eq!(client.get_trial_remaining_days("user_01", "tok").await?, Some(7));
    assert_eq!(client.get_trial_remaining_days("user_01", "other").await?, None);

    Ok(())
}

#[tokio::test]
async fn test_non_json_body_is_a_parse_error() {
    let base = spawn_api().await;
    let client = UsageClient::new().with_base_url(format!("{}/broken", base));

    let result = client.get_remaining_balance("user_01", "tok").await;
    assert!(matches!(result, Err(UsageError::Json(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_an_http_error() {
    let client = UsageClient::new().with_base_url("http://127.0.0.1:1");
    let result = client.get_trial_remaining_days("user_01", "tok").await;
    assert!(matches!(result, Err(UsageError::Http(_))));
}
