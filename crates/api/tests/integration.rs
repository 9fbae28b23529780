//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//! The HR backend is the in-memory fake and read state lives in memory, so
//! no external services are needed.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use hrdesk_api::middleware::auth::encode_jwt;
use hrdesk_api::routes::create_router;
use hrdesk_api::sessions::SessionRegistry;
use hrdesk_api::state::AppState;
use hrdesk_common::config::{AppConfig, ReadStateBackendKind};
use hrdesk_common::types::Role;
use hrdesk_engine::{NotificationAggregator, ReadStateStore};
use hrdesk_sources::FetcherRegistry;
use hrdesk_sources::backend::HrBackend;
use hrdesk_sources::dto::DecisionStatus;
use hrdesk_sources::fake::{FakeHrBackend, announcement, expense, leave};

// ============================================================
// Helpers
// ============================================================

/// Create a test AppConfig with a specific JWT secret.
fn test_config() -> AppConfig {
    AppConfig {
        hr_api_base_url: "http://unused".to_string(),
        hr_api_token: None,
        hr_api_timeout_ms: 10_000,
        feed_poll_interval_secs: 60,
        feed_session_idle_secs: 900,
        read_state_backend: ReadStateBackendKind::Memory,
        read_state_dir: "unused".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        jwt_secret: "test-jwt-secret-for-integration-tests".to_string(),
        jwt_expiry_hours: 24,
        api_bind_addr: "127.0.0.1:0".to_string(),
        feed_user_id: None,
        feed_role: None,
    }
}

struct TestApp {
    state: AppState,
    store: ReadStateStore,
    backend: Arc<FakeHrBackend>,
}

fn build_test_app(backend: FakeHrBackend) -> TestApp {
    let backend = Arc::new(backend);
    let dyn_backend: Arc<dyn HrBackend> = backend.clone();
    let store = ReadStateStore::in_memory();
    let aggregator = Arc::new(NotificationAggregator::new(
        FetcherRegistry::new(dyn_backend),
        store.clone(),
    ));
    let sessions = Arc::new(SessionRegistry::new(
        aggregator,
        Duration::from_secs(60),
        Duration::from_secs(900),
    ));
    TestApp {
        state: AppState::new(sessions, test_config()),
        store,
        backend,
    }
}

/// Token for `user_id` carrying the HR backend token `hr-<user_id>`.
fn token_for(user_id: &str, role: Role) -> String {
    let config = test_config();
    let hr_token = format!("hr-{}", user_id);
    encode_jwt(
        user_id,
        role,
        Some(&hr_token),
        &config.jwt_secret,
        config.jwt_expiry_hours,
    )
    .unwrap()
}

fn two_announcements() -> FakeHrBackend {
    FakeHrBackend::new().with_announcements(Ok(vec![
        announcement("1", Some(Utc::now())),
        announcement("2", Some(Utc::now())),
    ]))
}

/// Send one request and decode the JSON body.
async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    let response = create_router(state.clone())
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn ids(snapshot: &serde_json::Value) -> Vec<String> {
    snapshot["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================
// API Route Tests
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app(FakeHrBackend::new());
    let (status, json) = send(&app.state, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "hrdesk-api");
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_feed_requires_auth() {
    let app = build_test_app(FakeHrBackend::new());

    let (status, json) = send(&app.state, "GET", "/api/notifications", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("Authorization"));

    let (status, _) = send(&app.state, "GET", "/api/notifications", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = encode_jwt("emp-1", Role::Employee, None, "another-secret", 1).unwrap();
    let (status, _) = send(&app.state, "GET", "/api/notifications", Some(&foreign)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_request_opens_session() {
    let app = build_test_app(two_announcements());
    let token = token_for("emp-1", Role::Employee);

    let (status, json) = send(&app.state, "GET", "/api/notifications", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["notifications"].is_array());
    assert_eq!(app.state.sessions.len().await, 1);

    // Same user again reuses the session.
    send(&app.state, "GET", "/api/notifications", Some(&token)).await;
    assert_eq!(app.state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_refresh_mark_and_mark_all() {
    let app = build_test_app(two_announcements());
    let token = token_for("emp-1", Role::Employee);

    let (status, json) = send(&app.state, "POST", "/api/notifications/refresh", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let mut feed_ids = ids(&json);
    feed_ids.sort();
    assert_eq!(feed_ids, vec!["ann_1", "ann_2"]);
    assert_eq!(json["unreadCount"], 2);

    let (status, json) = send(
        &app.state,
        "POST",
        "/api/notifications/ann_1/read",
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["unreadCount"], 1);
    let ann_1 = json["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == "ann_1")
        .unwrap();
    assert_eq!(ann_1["read"], true);
    assert_eq!(ann_1["navigationTarget"], "/employee/announcements");

    let (status, json) = send(&app.state, "POST", "/api/notifications/read-all", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["unreadCount"], 0);

    let persisted = app.store.get_read_ids("emp-1").await;
    assert!(persisted.contains("ann_1"));
    assert!(persisted.contains("ann_2"));
}

#[tokio::test]
async fn test_read_state_is_per_user() {
    let app = build_test_app(two_announcements());
    let alice = token_for("alice", Role::Employee);
    let bob = token_for("bob", Role::Employee);

    send(&app.state, "POST", "/api/notifications/refresh", Some(&alice)).await;
    send(&app.state, "POST", "/api/notifications/read-all", Some(&alice)).await;

    let (_, json) = send(&app.state, "POST", "/api/notifications/refresh", Some(&bob)).await;
    assert_eq!(json["unreadCount"], 2);
    assert!(app.store.get_read_ids("bob").await.is_empty());
}

#[tokio::test]
async fn test_each_user_sees_only_their_own_records() {
    let now = Utc::now();
    let alice_records =
        two_announcements().with_my_leaves(Ok(vec![leave("7", DecisionStatus::Approved, Some(now))]));
    let bob_records = two_announcements()
        .with_my_expenses(Ok(vec![expense("3", DecisionStatus::Rejected, Some(now))]));
    let backend = two_announcements()
        .with_user("alice", alice_records)
        .with_user("bob", bob_records);
    let app = build_test_app(backend);

    let (_, alice) = send(
        &app.state,
        "POST",
        "/api/notifications/refresh",
        Some(&token_for("alice", Role::Employee)),
    )
    .await;
    let (_, bob) = send(
        &app.state,
        "POST",
        "/api/notifications/refresh",
        Some(&token_for("bob", Role::Employee)),
    )
    .await;

    let alice_ids = ids(&alice);
    let bob_ids = ids(&bob);
    assert!(alice_ids.contains(&"leave_7_approved".to_string()));
    assert!(!alice_ids.contains(&"exp_3_rejected".to_string()));
    assert!(bob_ids.contains(&"exp_3_rejected".to_string()));
    assert!(!bob_ids.contains(&"leave_7_approved".to_string()));

    // Every collaborator call carried the requesting user's own token.
    let credentials = app.backend.credentials();
    assert!(!credentials.is_empty());
    assert!(credentials.iter().all(|c| matches!(
        c.as_deref(),
        Some("hr-alice") | Some("hr-bob")
    )));
    assert!(credentials.contains(&Some("hr-alice".to_string())));
    assert!(credentials.contains(&Some("hr-bob".to_string())));
}

#[tokio::test]
async fn test_role_change_rekeys_session() {
    let backend = two_announcements().with_pending_leaves(Ok(vec![leave(
        "42",
        DecisionStatus::Pending,
        Some(Utc::now()),
    )]));
    let app = build_test_app(backend);

    let as_employee = token_for("dana", Role::Employee);
    let (_, json) = send(&app.state, "POST", "/api/notifications/refresh", Some(&as_employee)).await;
    assert!(!ids(&json).contains(&"pending_leave_42".to_string()));

    let as_hr = token_for("dana", Role::Hr);
    let (_, json) = send(&app.state, "POST", "/api/notifications/refresh", Some(&as_hr)).await;
    assert!(ids(&json).contains(&"pending_leave_42".to_string()));
    assert_eq!(app.state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_end_session() {
    let app = build_test_app(two_announcements());
    let token = token_for("emp-1", Role::Employee);
    send(&app.state, "GET", "/api/notifications", Some(&token)).await;

    let (status, json) = send(&app.state, "DELETE", "/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ended"], true);
    assert!(app.state.sessions.is_empty().await);

    let (_, json) = send(&app.state, "DELETE", "/api/session", Some(&token)).await;
    assert_eq!(json["ended"], false);
}
