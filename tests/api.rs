use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use session_timer::{
    create_router,
    state::AppState,
    storage::MemoryStorage,
    timer::ManualClock,
};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    clock: Arc<ManualClock>,
}

fn test_app() -> TestApp {
    let clock = Arc::new(ManualClock::at_epoch_ms(1_700_000_000_000));
    let state = Arc::new(AppState::new(
        Arc::new(MemoryStorage::new()),
        clock.clone(),
        30,
        None,
    ));
    TestApp {
        router: create_router(Arc::clone(&state)),
        state,
        clock,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn open(&self, body: Value) -> String {
        let (status, value) = self.send(Method::POST, "/tabs", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        value["timer"]["tabId"].as_str().unwrap().to_string()
    }

    async fn action(&self, tab: &str, action: &str) -> Value {
        let (status, value) = self
            .send(Method::POST, &format!("/tabs/{tab}/{action}"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        value
    }
}

#[tokio::test]
async fn health_reports_version() {
    let app = test_app();
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn open_uses_server_default_duration() {
    let app = test_app();
    let (status, body) = app.send(Method::POST, "/tabs", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["timer"]["key"], "default");
    assert_eq!(body["timer"]["phase"], "idle");
    assert_eq!(body["timer"]["remainingSeconds"], 1800);
    assert_eq!(body["timer"]["display"], "30:00");

    let (_, server) = app.send(Method::GET, "/status", None).await;
    assert_eq!(server["open_tabs"], 1);
}

#[tokio::test]
async fn disabled_widget_mounts_nothing() {
    let app = test_app();
    let (status, body) = app
        .send(Method::POST, "/tabs", Some(json!({ "enabled": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disabled");
    assert!(body["timer"].is_null());
    assert_eq!(app.state.tab_count(), 0);
}

#[tokio::test]
async fn start_then_pause_keeps_remaining_time() {
    let app = test_app();
    let tab = app.open(json!({ "sessionId": "5", "targetMinutes": 10 })).await;

    let body = app.action(&tab, "start").await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["phase"], "running");

    app.clock.advance(Duration::seconds(90));
    let body = app.action(&tab, "pause").await;
    assert_eq!(body["timer"]["phase"], "paused");
    assert_eq!(body["timer"]["remainingSeconds"], 510);

    let body = app.action(&tab, "pause").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn second_tab_is_read_only_while_first_runs() {
    let app = test_app();
    let first = app.open(json!({ "sessionId": "8" })).await;
    app.action(&first, "start").await;

    let second = app.open(json!({ "sessionId": "8" })).await;
    let (_, body) = app.send(Method::GET, &format!("/tabs/{second}"), None).await;
    assert_eq!(body["timer"]["readOnly"], true);

    let body = app.action(&second, "pause").await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "read_only");

    // A different session is unaffected
    let other = app.open(json!({ "sessionId": "9" })).await;
    let body = app.action(&other, "start").await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn running_reset_needs_a_hold() {
    let app = test_app();
    let tab = app.open(json!({})).await;
    app.action(&tab, "start").await;

    let body = app.action(&tab, "reset").await;
    assert_eq!(body["code"], "hold_required");
    assert!(body["timer"]["hint"].is_string());

    app.action(&tab, "reset/press").await;
    app.clock.advance(Duration::milliseconds(700));
    let body = app.action(&tab, "reset/release").await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["phase"], "idle");
}

#[tokio::test]
async fn adjust_defaults_to_one_minute() {
    let app = test_app();
    let tab = app.open(json!({})).await;
    let (_, body) = app
        .send(Method::POST, &format!("/tabs/{tab}/adjust"), Some(json!({})))
        .await;
    assert_eq!(body["timer"]["remainingSeconds"], 1860);
    let (_, body) = app
        .send(
            Method::POST,
            &format!("/tabs/{tab}/adjust"),
            Some(json!({ "deltaSeconds": -120 })),
        )
        .await;
    assert_eq!(body["timer"]["remainingSeconds"], 1740);
}

#[tokio::test]
async fn finish_then_end_session_without_site_navigates() {
    let app = test_app();
    let tab = app
        .open(json!({ "sessionId": "5", "targetMinutes": 1 }))
        .await;
    app.action(&tab, "start").await;

    let (_, body) = app.send(Method::POST, &format!("/tabs/{tab}/end-session"), None).await;
    assert_eq!(body["status"], "error");

    app.clock.advance(Duration::seconds(61));
    app.state.with_tab(&tab, |w| w.tick()).unwrap();

    let (_, notices) = app
        .send(Method::GET, &format!("/tabs/{tab}/notifications"), None)
        .await;
    assert_eq!(notices[0]["type"], "finished");
    assert_eq!(notices[0]["sessionId"], "5");

    let (status, body) = app.send(Method::POST, &format!("/tabs/{tab}/end-session"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["result"], "navigate");
    assert_eq!(body["outcome"]["url"], "/training/session/5/");
}

#[tokio::test]
async fn unknown_tab_is_not_found() {
    let app = test_app();
    let (status, _) = app.send(Method::POST, "/tabs/nope/start", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let tab = app.open(json!({})).await;
    let (status, _) = app.send(Method::DELETE, &format!("/tabs/{tab}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, &format!("/tabs/{tab}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn click_toggles_minimized_and_drag_snaps() {
    let app = test_app();
    let tab = app.open(json!({})).await;
    let pointer = |kind: &str, x: f64, y: f64| json!({ "kind": kind, "x": x, "y": y });
    let uri = format!("/tabs/{tab}/pointer");

    app.send(Method::POST, &uri, Some(pointer("down", 100.0, 100.0))).await;
    let (_, body) = app.send(Method::POST, &uri, Some(pointer("up", 101.0, 100.0))).await;
    assert_eq!(body["message"], "Clicked");
    assert_eq!(body["timer"]["minimized"], true);

    app.send(Method::POST, &uri, Some(pointer("down", 100.0, 100.0))).await;
    app.send(Method::POST, &uri, Some(pointer("move", 40.0, 40.0))).await;
    let (_, body) = app.send(Method::POST, &uri, Some(pointer("up", 40.0, 40.0))).await;
    assert!(body["message"].as_str().unwrap().starts_with("Snapped"));
}

#[tokio::test]
async fn out_of_range_adjust_and_extend_keep_the_tab_usable() {
    let app = test_app();
    let tab = app.open(json!({})).await;
    let uri = |action: &str| format!("/tabs/{tab}/{action}");

    let (status, body) = app
        .send(Method::POST, &uri("adjust"), Some(json!({ "deltaSeconds": i64::MAX })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["remainingSeconds"], 4 * 3600);

    let (status, body) = app
        .send(Method::POST, &uri("extend"), Some(json!({ "seconds": i64::MAX })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["remainingSeconds"], 4 * 3600);

    let (status, body) = app.send(Method::GET, &format!("/tabs/{tab}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
