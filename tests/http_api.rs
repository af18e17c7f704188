//! HTTP API tests driven through the router with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use rust_poll_chat::api::{self, ApiState};
use rust_poll_chat::chat::MessageBoard;
use rust_poll_chat::presence::PresenceTracker;
use rust_poll_chat::storage::{ChatDatabase, ChatStore};

fn app() -> (Router, Arc<PresenceTracker>) {
    let store: Arc<dyn ChatStore> = Arc::new(ChatDatabase::in_memory().unwrap());
    let tracker = Arc::new(PresenceTracker::new(store.clone()));
    let board = Arc::new(MessageBoard::new(store));
    (api::routes(ApiState::new(tracker.clone(), board)), tracker)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        // Raw bytes so non-ASCII names travel as UTF-8, like real clients send them.
        builder = builder.header("User", HeaderValue::from_bytes(user.as_bytes()).unwrap());
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, name: &str) -> StatusCode {
    send(app, "POST", "/participants", None, Some(json!({ "name": name })))
        .await
        .0
}

#[tokio::test]
async fn registration_rejects_blank_and_duplicate_names() {
    let (app, _) = app();

    assert_eq!(register(&app, "alice").await, StatusCode::OK);
    assert_eq!(register(&app, "alice").await, StatusCode::CONFLICT);
    assert_eq!(register(&app, "").await, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, "POST", "/participants", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/participants", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "alice");
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/participants")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn heartbeat_requires_known_user() {
    let (app, _) = app();
    register(&app, "alice").await;

    let (status, _) = send(&app, "POST", "/status", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/status", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/status", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn private_messages_are_filtered_per_reader() {
    let (app, _) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;

    let (status, posted) = send(
        &app,
        "POST",
        "/messages",
        Some("alice"),
        Some(json!({ "to": "bob", "text": "hi", "type": "private_message" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["from"], "alice");

    let has_private = |messages: &Value| {
        messages
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["id"] == posted["id"])
    };

    let (status, for_carol) = send(&app, "GET", "/messages", Some("carol"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!has_private(&for_carol));

    let (_, for_bob) = send(&app, "GET", "/messages", Some("bob"), None).await;
    assert!(has_private(&for_bob));
}

#[tokio::test]
async fn limit_returns_tail_and_rejects_bad_values() {
    let (app, _) = app();
    register(&app, "alice").await;
    for i in 1..=4 {
        send(
            &app,
            "POST",
            "/messages",
            Some("alice"),
            Some(json!({ "to": "ALL", "text": format!("m{i}"), "type": "message" })),
        )
        .await;
    }

    // The join status plus four posts are visible; keep the last two.
    let (status, body) = send(&app, "GET", "/messages?limit=2", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["m3", "m4"]);

    for bad in ["0", "-1", "abc"] {
        let (status, _) = send(
            &app,
            "GET",
            &format!("/messages?limit={bad}"),
            Some("bob"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "limit={bad}");
    }
}

#[tokio::test]
async fn posting_requires_valid_payload_from_participant() {
    let (app, _) = app();
    register(&app, "alice").await;

    let cases = [
        (Some("alice"), json!({ "to": "", "text": "hi", "type": "message" })),
        (Some("alice"), json!({ "to": "ALL", "text": "hi", "type": "status" })),
        (Some("mallory"), json!({ "to": "ALL", "text": "hi", "type": "message" })),
        (None, json!({ "to": "ALL", "text": "hi", "type": "message" })),
    ];
    for (user, payload) in cases {
        let (status, _) = send(&app, "POST", "/messages", user, Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn only_owner_may_edit_or_delete() {
    let (app, _) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;

    let (_, posted) = send(
        &app,
        "POST",
        "/messages",
        Some("alice"),
        Some(json!({ "to": "ALL", "text": "hello", "type": "message" })),
    )
    .await;
    let uri = format!("/messages/{}", posted["id"].as_str().unwrap());
    let edit = json!({ "to": "ALL", "text": "edited", "type": "message" });

    let (status, _) = send(&app, "PUT", &uri, Some("bob"), Some(edit.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "DELETE", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "PUT", &uri, Some("alice"), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");

    let (status, _) = send(&app, "DELETE", &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sweep_eviction_is_visible_to_pollers() {
    let (app, tracker) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    send(&app, "POST", "/status", Some("bob"), None).await;

    let later = Utc::now() + ChronoDuration::seconds(30);
    tracker
        .heartbeat("bob", later)
        .expect("bob is registered");
    let report = tracker
        .sweep(later, std::time::Duration::from_secs(10))
        .unwrap();
    assert_eq!(report.evicted, vec!["alice".to_string()]);

    let (_, messages) = send(&app, "GET", "/messages", Some("bob"), None).await;
    let left = messages
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["from"] == "alice" && m["type"] == "status" && m["text"] == "left")
        .count();
    assert_eq!(left, 1);

    // The name is free again after eviction.
    assert_eq!(register(&app, "alice").await, StatusCode::OK);
}

#[tokio::test]
async fn non_ascii_names_work_through_the_user_header() {
    let (app, _) = app();
    assert_eq!(register(&app, "José").await, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/status", Some("José"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, posted) = send(
        &app,
        "POST",
        "/messages",
        Some("José"),
        Some(json!({ "to": "ALL", "text": "olá", "type": "message" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["from"], "José");

    let uri = format!("/messages/{}", posted["id"].as_str().unwrap());
    let (status, _) = send(&app, "DELETE", &uri, Some("José"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_query_string_is_a_validation_error() {
    let (app, _) = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "GET",
        "/messages?limit=1&limit=2",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn broadcast_name_cannot_be_registered() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/participants", None, Some(json!({ "name": "ALL" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (_, participants) = send(&app, "GET", "/participants", None, None).await;
    assert!(participants.as_array().unwrap().is_empty());
}
