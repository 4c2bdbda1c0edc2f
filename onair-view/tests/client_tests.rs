//! Client and runner tests against a mock sync server

use chrono::Utc;
use futures::StreamExt;
use onair_common::api::StatusView;
use onair_common::events::{StationEvent, TransitionEvent, TransitionKind};
use onair_common::{OnlineState, SourceMode, StationStatus, Track};
use onair_view::{ClientError, ConnectionMode, SyncClient, ViewRunner};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn status(title: &str) -> StationStatus {
    StationStatus {
        station_id: "s1".into(),
        online_state: OnlineState::Online,
        source_mode: SourceMode::Automated,
        current_track: Some(Track {
            title: title.into(),
            artwork_url: None,
            start_time: Some("2024-05-01T12:00:00Z".parse().unwrap()),
        }),
        bitrate: Some(128),
        listener_count: 7,
        collaborator: None,
        recent_titles: vec![],
        fetched_at: Utc::now(),
    }
}

fn view(title: &str) -> StatusView {
    StatusView::new("s1", Some(status(title)), 0, None)
}

/// Serialize events the way the server frames them
fn sse_body(events: &[StationEvent]) -> String {
    let mut body = String::from(": keep-alive\n\n");
    for event in events {
        body.push_str(&format!(
            "event: {}\ndata: {}\n\n",
            event.event_type(),
            event.payload_json().unwrap()
        ));
    }
    body
}

async fn mount_status(server: &MockServer, title: &str) {
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(view(title)))
        .mount(server)
        .await;
}

async fn mount_events(server: &MockServer, events: &[StationEvent]) {
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(events)),
        )
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> SyncClient {
    SyncClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_cold_start_status() {
    let server = MockServer::start().await;
    mount_status(&server, "A - One").await;

    let status = client(&server).status().await.unwrap();
    assert_eq!(status.now_playing, "playing");
    assert_eq!(status.status.unwrap().current_track.unwrap().title, "A - One");
}

#[tokio::test]
async fn test_status_error_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).status().await,
        Err(ClientError::Status(503))
    ));
    assert!(matches!(
        client(&server).events().await,
        Err(ClientError::Status(503))
    ));
}

#[tokio::test]
async fn test_event_stream_decodes_in_order() {
    let server = MockServer::start().await;
    let transition = TransitionEvent::TrackChanged {
        old: status("A - One"),
        new: status("B - Two"),
    };
    mount_events(
        &server,
        &[
            StationEvent::Snapshot { view: view("A - One") },
            StationEvent::Transition { transition },
        ],
    )
    .await;

    let events: Vec<_> = client(&server)
        .events()
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|e| e.unwrap().event_type())
        .collect();
    assert_eq!(events, vec!["Snapshot", "TrackChanged"]);
}

#[tokio::test]
async fn test_runner_falls_back_to_polling_when_push_drops() {
    let server = MockServer::start().await;
    mount_status(&server, "C - Three").await;
    let went_live = {
        let old = status("A - One");
        let mut new = status("B - Two");
        new.source_mode = SourceMode::Live;
        new.collaborator = Some("DJ X".into());
        TransitionEvent::WentLive {
            collaborator: Some("DJ X".into()),
            old,
            new,
        }
    };
    // the mock closes the stream after these events
    mount_events(
        &server,
        &[
            StationEvent::Snapshot { view: view("A - One") },
            StationEvent::Transition { transition: went_live },
        ],
    )
    .await;

    let (runner, mut rx) = ViewRunner::new(client(&server), Duration::from_secs(1));
    assert_eq!(runner.interval(), Duration::from_secs(10));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(runner.run(cancel.clone()));

    let seen_live = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|v| v.last_transition == Some(TransitionKind::WentLive)),
    )
    .await
    .expect("push events not applied")
    .unwrap()
    .clone();
    assert_eq!(seen_live.last_summary.as_deref(), Some("Live: DJ X"));

    let polled = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|v| v.mode == ConnectionMode::Polling),
    )
    .await
    .expect("no fallback to polling")
    .unwrap()
    .clone();
    assert_eq!(
        polled.status.unwrap().current_track.unwrap().title,
        "C - Three"
    );

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("runner did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_runner_marks_unreachable_server_stale() {
    // nothing listens on the discard port
    let client = SyncClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
    let (runner, mut rx) = ViewRunner::new(client, Duration::from_secs(10));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(runner.run(cancel.clone()));

    let view = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|v| v.mode == ConnectionMode::Polling),
    )
    .await
    .expect("no fallback to polling")
    .unwrap()
    .clone();
    assert!(view.stale);
    assert!(view.status.is_none());

    cancel.cancel();
    handle.await.unwrap();
}
