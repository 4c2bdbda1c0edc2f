//! Integration tests for onair-sync API endpoints

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::{playing, STATION};
use http_body_util::BodyExt;
use onair_common::db::{self, DeviceStore};
use onair_common::events::{EventBus, StationEvent, TransitionEvent};
use onair_common::FailureKind;
use onair_sync::cell::{status_cell, StatusWriter};
use onair_sync::history::TransitionLog;
use onair_sync::AppState;
use serde_json::{json, Value};
use std::time::Duration;
use tower::util::ServiceExt;

struct TestApp {
    app: Router,
    writer: StatusWriter,
    bus: EventBus,
    history: TransitionLog,
}

/// Test helper: create test app with in-memory database
async fn create_test_app() -> TestApp {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create in-memory database");

    let (writer, reader) = status_cell();
    let bus = EventBus::new(16);
    let history = TransitionLog::new(10);

    let app = onair_sync::build_router(AppState {
        station_id: STATION.to_string(),
        status: reader,
        bus: bus.clone(),
        history: history.clone(),
        devices: DeviceStore::new(pool),
    });

    TestApp {
        app,
        writer,
        bus,
        history,
    }
}

fn test_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn extract_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = create_test_app().await;

    let response = test
        .app
        .oneshot(test_request("GET", "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "onair-sync");
}

#[tokio::test]
async fn test_status_before_first_poll() {
    let test = create_test_app().await;

    let response = test
        .app
        .oneshot(test_request("GET", "/api/status", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["station_id"], STATION);
    assert!(json["status"].is_null());
    assert_eq!(json["now_playing"], "unknown");
    assert_eq!(json["stale"], false);
}

#[tokio::test]
async fn test_status_reflects_cell_and_staleness() {
    let test = create_test_app().await;
    test.writer
        .replace(playing("Bonobo - Kerala", "2024-05-01T12:00:00Z"));

    let json = extract_json(
        test.app
            .clone()
            .oneshot(test_request("GET", "/api/status", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["now_playing"], "playing");
    assert_eq!(json["status"]["current_track"]["title"], "Bonobo - Kerala");
    assert_eq!(json["status"]["source_mode"], "automated");

    test.writer.record_failure(FailureKind::UpstreamUnavailable);
    let json = extract_json(
        test.app
            .oneshot(test_request("GET", "/api/status", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json["stale"], true);
    assert_eq!(json["consecutive_failures"], 1);
    assert_eq!(json["last_error"], "UpstreamUnavailable");
    // last known good status is still served
    assert_eq!(json["status"]["current_track"]["title"], "Bonobo - Kerala");
}

#[tokio::test]
async fn test_history_newest_first() {
    let test = create_test_app().await;
    for (from, to) in [("A", "B"), ("B", "C")] {
        test.history
            .record(&TransitionEvent::TrackChanged {
                old: playing(from, "2024-05-01T12:00:00Z"),
                new: playing(to, "2024-05-01T12:04:00Z"),
            })
            .await;
    }

    let response = test
        .app
        .oneshot(test_request("GET", "/api/history", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = extract_json(response).await;
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["track_title"], "C");
    assert_eq!(entries[0]["kind"], "TrackChanged");
    assert_eq!(entries[1]["summary"], "Now playing: B");
}

#[tokio::test]
async fn test_device_registration_lifecycle() {
    let test = create_test_app().await;

    let response = test
        .app
        .clone()
        .oneshot(test_request(
            "POST",
            "/api/devices",
            Some(json!({"token": "tok-1", "platform": "android"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = extract_json(response).await;
    assert_eq!(json["token"], "tok-1");
    assert_eq!(json["platform"], "android");

    let json = extract_json(
        test.app
            .clone()
            .oneshot(test_request("GET", "/api/devices", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = test
        .app
        .clone()
        .oneshot(test_request("DELETE", "/api/devices/tok-1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = test
        .app
        .oneshot(test_request("DELETE", "/api/devices/tok-1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_blank_device_token_rejected() {
    let test = create_test_app().await;

    let response = test
        .app
        .oneshot(test_request(
            "POST",
            "/api/devices",
            Some(json!({"token": "   "})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_event_stream_starts_with_current_snapshot() {
    let test = create_test_app().await;
    test.writer
        .replace(playing("Bonobo - Kerala", "2024-05-01T12:00:00Z"));

    let response = test
        .app
        .oneshot(test_request("GET", "/api/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
    assert_eq!(test.bus.subscriber_count(), 1);

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("no SSE frame")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: Snapshot"), "got {}", text);
    assert!(text.contains("Bonobo - Kerala"));

    // later transitions follow the snapshot on the same stream
    test.bus.emit(&StationEvent::Transition {
        transition: TransitionEvent::TrackChanged {
            old: playing("Bonobo - Kerala", "2024-05-01T12:00:00Z"),
            new: playing("Tycho - Awake", "2024-05-01T12:04:00Z"),
        },
    });
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("no SSE frame")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: TrackChanged"), "got {}", text);

    drop(body);
    assert_eq!(test.bus.subscriber_count(), 0);
}
