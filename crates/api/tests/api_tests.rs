//! HTTP surface tests against the in-memory and SQLite repositories.

use std::sync::Arc;

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use data_validator::{ValidationConfig, Validator};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use storage::{MemoryRepository, SqliteRepository};
use tower::ServiceExt;

fn memory_app() -> Router {
    create_router(Arc::new(AppState::new(Arc::new(MemoryRepository::new()))))
}

async fn sqlite_app() -> Router {
    let repo = SqliteRepository::connect("sqlite::memory:", 1).await.unwrap();
    create_router(Arc::new(AppState::new(Arc::new(repo))))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn test_health_checks_store() {
    let app = sqlite_app().await;
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_device_registration_and_conflict() {
    let app = memory_app();

    let (status, body) = post(&app, "/devices", json!({"id": "drone-1", "cert": "c1"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"id": "drone-1", "cert": "c1", "status": null, "last_seen": null}));

    let (status, body) = post(&app, "/devices", json!({"id": "drone-1", "cert": "other"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("drone-1"));

    let (status, body) = get(&app, "/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["cert"], "c1");
}

#[tokio::test]
async fn test_device_validation() {
    let app = memory_app();

    let (status, _) = post(&app, "/devices", json!({"id": "   "})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(&app, "/devices", json!({"cert": "no-id"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = get(&app, "/devices").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_heartbeat() {
    let app = sqlite_app().await;
    post(&app, "/devices", json!({"id": "cam-3", "status": "booting"})).await;

    let (status, body) = send(&app, Method::POST, "/devices/cam-3/heartbeat?status=online", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert!(body["last_seen"].is_string());

    let (status, body) = send(&app, Method::POST, "/devices/cam-3/heartbeat", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
}

#[tokio::test]
async fn test_heartbeat_unknown_device() {
    let app = memory_app();

    let (status, body) = send(&app, Method::POST, "/devices/ghost/heartbeat?status=online", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, devices) = get(&app, "/devices").await;
    assert_eq!(devices, json!([]));
}

#[tokio::test]
async fn test_policy_create_list_conflict() {
    let app = sqlite_app().await;
    let policy = json!({
        "name": "p1",
        "conditions": {"severity_gte": 5, "zone": "north"},
        "actions": [{"type": "notify"}, {"type": "ticket", "queue": "soc"}],
    });

    let (status, body) = post(&app, "/policies", policy.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["conditions"]["zone"], "north");

    let (status, _) = post(&app, "/policies", policy).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = get(&app, "/policies").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["actions"][1]["queue"], "soc");
}

#[tokio::test]
async fn test_policy_requires_conditions() {
    let app = memory_app();

    let (status, body) = post(&app, "/policies", json!({"name": "p"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("conditions"));

    let (status, body) = post(&app, "/policies", json!({"name": "p", "conditions": {}})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["actions"], Value::Null);

    let (_, policies) = get(&app, "/policies").await;
    assert_eq!(policies.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_alert_null_data_accepted() {
    let app = sqlite_app().await;

    let (status, body) = post(
        &app,
        "/alerts",
        json!({"source": "ids", "rule_id": "r1", "severity": 4, "data": null}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!({}));
}

#[tokio::test]
async fn test_severity_range_fixed_for_every_store() {
    let validator = Validator::new(ValidationConfig {
        max_identifier_len: 4096,
    });
    let sqlite = SqliteRepository::connect("sqlite::memory:", 1).await.unwrap();
    let apps = [
        create_router(Arc::new(
            AppState::new(Arc::new(MemoryRepository::new())).with_validator(validator.clone()),
        )),
        create_router(Arc::new(
            AppState::new(Arc::new(sqlite)).with_validator(validator),
        )),
    ];

    for app in &apps {
        let (status, _) = post(
            app,
            "/alerts",
            json!({"source": "ids", "rule_id": "r1", "severity": 15}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, alerts) = get(app, "/alerts").await;
        assert_eq!(alerts, json!([]));
    }
}

#[tokio::test]
async fn test_receive_alert_is_unprocessed() {
    let app = memory_app();

    let (status, body) = post(
        &app,
        "/alerts",
        json!({"source": "ids", "rule_id": "r1", "severity": 4, "data": {"ip": "10.0.0.9"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["processed"], false);
    assert_eq!(body["decision"], Value::Null);
    assert_eq!(body["data"]["ip"], "10.0.0.9");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn test_alert_severity_validation() {
    let app = memory_app();

    for severity in [-1, 11] {
        let (status, body) = post(
            &app,
            "/alerts/process",
            json!({"source": "ids", "rule_id": "r1", "severity": severity}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("severity"));
    }

    let (_, alerts) = get(&app, "/alerts").await;
    assert_eq!(alerts, json!([]));
}

#[tokio::test]
async fn test_process_alert_severity_threshold() {
    let app = sqlite_app().await;
    post(
        &app,
        "/policies",
        json!({"name": "p1", "conditions": {"severity_gte": 5}, "actions": {"type": "notify"}}),
    )
    .await;

    let (status, body) = post(
        &app,
        "/alerts/process",
        json!({"source": "s1", "rule_id": "r1", "severity": 7}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["processed"], true);
    assert_eq!(body["decision"]["actions"], json!([{"type": "notify", "policy": "p1"}]));

    let (_, body) = post(
        &app,
        "/alerts/process",
        json!({"source": "s1", "rule_id": "r1", "severity": 3}),
    )
    .await;
    assert_eq!(body["processed"], true);
    assert_eq!(body["decision"]["actions"], json!([]));
}

#[tokio::test]
async fn test_process_alert_policy_order_and_disabled() {
    let app = memory_app();
    for policy in [
        json!({"name": "first", "conditions": {}, "actions": {"type": "notify"}}),
        json!({"name": "off", "conditions": {}, "actions": {"type": "wipe"}, "enabled": false}),
        json!({"name": "second", "conditions": {"source_in": [], "rule_id_in": ["r1"]}, "actions": [{"type": "isolate"}]}),
        json!({"name": "other-source", "conditions": {"source_in": ["edr"]}, "actions": {"type": "page"}}),
    ] {
        let (status, _) = post(&app, "/policies", policy).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = post(
        &app,
        "/alerts/process",
        json!({"source": "ids", "rule_id": "r1", "severity": 0}),
    )
    .await;
    assert_eq!(
        body["decision"]["actions"],
        json!([
            {"type": "notify", "policy": "first"},
            {"type": "isolate", "policy": "second"},
        ])
    );
}

#[tokio::test]
async fn test_alerts_listed_newest_first_with_filters() {
    let app = sqlite_app().await;
    let alert = json!({"source": "ids", "rule_id": "r1", "severity": 2});

    let (_, first) = post(&app, "/alerts", alert.clone()).await;
    let (_, second) = post(&app, "/alerts/process", alert.clone()).await;
    let (_, third) = post(&app, "/alerts", alert).await;

    let (_, all) = get(&app, "/alerts").await;
    let ids: Vec<&Value> = all.as_array().unwrap().iter().map(|a| &a["id"]).collect();
    assert_eq!(ids, vec![&third["id"], &second["id"], &first["id"]]);

    let (_, processed) = get(&app, "/alerts?processed=true").await;
    assert_eq!(processed.as_array().unwrap().len(), 1);
    assert_eq!(processed[0]["id"], second["id"]);

    let (_, limited) = get(&app, "/alerts?limit=1").await;
    assert_eq!(limited.as_array().unwrap().len(), 1);
    assert_eq!(limited[0]["id"], third["id"]);
}

#[tokio::test]
async fn test_rth_stub() {
    let app = memory_app();

    let (status, body) = post(&app, "/actions/rth", json!({"drone_id": "uav-9"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"drone_id": "uav-9", "mode": "RTL", "status": "sent"}));

    let (_, body) = post(&app, "/actions/rth", json!({"drone_id": "uav-9", "mode": "LAND"})).await;
    assert_eq!(body["mode"], "LAND");

    let (status, _) = post(&app, "/actions/rth", json!({"drone_id": ""})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_metrics_and_fallback() {
    let (status, _) = get(&memory_app(), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = create_router(Arc::new(
        AppState::new(Arc::new(MemoryRepository::new())).with_metrics(handle),
    ));
    let (status, _) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not found"}));
}

#[tokio::test]
async fn test_end_to_end_over_tcp() {
    let repo = SqliteRepository::connect("sqlite::memory:", 1).await.unwrap();
    let app = create_router(Arc::new(AppState::new(Arc::new(repo))));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let response = client
        .post(format!("{}/policies", base))
        .json(&json!({"name": "crit", "conditions": {"severity_gte": 9}, "actions": {"type": "page"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let alert: Value = client
        .post(format!("{}/alerts/process", base))
        .json(&json!({"source": "edr", "rule_id": "ransomware", "severity": 10}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alert["decision"]["actions"], json!([{"type": "page", "policy": "crit"}]));

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}
