//! End-to-end runner tests against a wiremock job service.
//!
//! ```bash
//! cargo test -p skyview-tasks --test task_runner
//! ```

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use skyview_core::{BroadcastNotifier, NotificationAction, NotificationKind, TaskConfig, TaskPhase};
use skyview_tasks::{HttpJobService, JobService, SubmitRequest, TaskError, TaskRunner};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(label: &str) -> TaskConfig {
    TaskConfig::new(label).with_poll_interval(Duration::from_millis(10))
}

fn runner_for(server: &MockServer, config: TaskConfig) -> (TaskRunner, Arc<BroadcastNotifier>) {
    let service = HttpJobService::new(server.uri()).unwrap();
    let notifier = Arc::new(BroadcastNotifier::new(32));
    let runner = TaskRunner::new(Arc::new(service), config).with_notifier(notifier.clone());
    (runner, notifier)
}

async fn mount_submit(server: &MockServer, route: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(id))
        .mount(server)
        .await;
}

async fn mount_ready(server: &MockServer, id: &str, ready: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{id}/ready")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready))
        .mount(server)
        .await;
}

async fn mount_result(server: &MockServer, id: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{id}/result")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

fn notification_kinds(
    rx: &mut tokio::sync::broadcast::Receiver<skyview_core::NotificationEvent>,
) -> Vec<(NotificationAction, Option<NotificationKind>)> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push((e.action, e.notification.map(|n| n.kind)));
    }
    events
}

#[tokio::test]
async fn resolves_after_job_becomes_ready() {
    let server = MockServer::start().await;
    mount_submit(&server, "/spectrographs/fills/manual-fill", "abc123").await;
    Mock::given(method("GET"))
        .and(path("/tasks/abc123/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(false))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ready(&server, "abc123", true).await;
    mount_result(
        &server,
        "abc123",
        serde_json::json!({"is_err": false, "is_ready": true, "return_value": 42, "execution_time": 0.8}),
    )
    .await;

    let (runner, notifier) = runner_for(&server, config("manual fill"));
    let mut rx = notifier.subscribe();

    let value: i64 = runner.run("/spectrographs/fills/manual-fill").await.unwrap();
    assert_eq!(value, 42);

    assert_eq!(
        request_paths(&server).await,
        vec![
            "/spectrographs/fills/manual-fill",
            "/tasks/abc123/ready",
            "/tasks/abc123/ready",
            "/tasks/abc123/result",
        ]
    );
    assert_eq!(
        notification_kinds(&mut rx),
        vec![
            (NotificationAction::Show, Some(NotificationKind::InProgress)),
            (NotificationAction::Update, Some(NotificationKind::Success)),
        ]
    );
    let snap = runner.snapshot();
    assert_eq!(snap.phase, TaskPhase::Idle);
    assert!(snap.job_id.is_none());
}

#[tokio::test]
async fn submission_http_500_rejects_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spectrographs/fills/abort"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let (runner, notifier) = runner_for(&server, config("abort fill"));
    let mut rx = notifier.subscribe();

    let err = runner
        .run::<serde_json::Value>("/spectrographs/fills/abort")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Task abort fill failed to start.");
    assert!(matches!(err, TaskError::StartFailed { .. }));

    assert_eq!(request_paths(&server).await, vec!["/spectrographs/fills/abort"]);
    assert_eq!(
        notification_kinds(&mut rx),
        vec![(NotificationAction::Show, Some(NotificationKind::Failure))]
    );
    assert!(runner.snapshot().job_id.is_none());
}

#[tokio::test]
async fn submission_connection_refused_rejects() {
    // Bind then drop a listener to get an address nothing listens on
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let service = HttpJobService::new(uri).unwrap();
    let runner = TaskRunner::new(Arc::new(service), config("open dome").without_notifications());

    let err = runner.run::<()>("/enclosure/open").await.unwrap_err();
    assert!(matches!(err, TaskError::StartFailed { .. }));
    assert!(!runner.is_running());
}

#[tokio::test]
async fn readiness_failure_rejects_and_resets() {
    let server = MockServer::start().await;
    mount_submit(&server, "/enclosure/close", "xyz").await;
    Mock::given(method("GET"))
        .and(path("/tasks/xyz/ready"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let (runner, notifier) = runner_for(&server, config("close dome"));
    let mut rx = notifier.subscribe();

    let err = runner.run::<()>("/enclosure/close").await.unwrap_err();
    assert!(matches!(err, TaskError::PollFailed { .. }));
    assert!(err.to_string().contains("503"));

    assert!(!request_paths(&server).await.iter().any(|p| p.ends_with("/result")));
    assert_eq!(
        notification_kinds(&mut rx),
        vec![
            (NotificationAction::Show, Some(NotificationKind::InProgress)),
            (NotificationAction::Update, Some(NotificationKind::Failure)),
        ]
    );
    let snap = runner.snapshot();
    assert!(!snap.running);
    assert!(snap.job_id.is_none());
}

#[tokio::test]
async fn result_fetch_failure_rejects_with_generic_message() {
    let server = MockServer::start().await;
    mount_submit(&server, "/macros/shutdown", "s1").await;
    mount_ready(&server, "s1", true).await;
    Mock::given(method("GET"))
        .and(path("/tasks/s1/result"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let (runner, notifier) = runner_for(&server, config("shutdown").with_generic_errors());
    let mut rx = notifier.subscribe();

    let err = runner.run::<()>("/macros/shutdown").await.unwrap_err();
    assert_eq!(err.to_string(), "Task shutdown failed.");
    match &err {
        TaskError::PollFailed { detail, .. } => assert!(detail.contains("500")),
        other => panic!("expected PollFailed, got {other:?}"),
    }

    assert_eq!(
        notification_kinds(&mut rx),
        vec![
            (NotificationAction::Show, Some(NotificationKind::InProgress)),
            (NotificationAction::Update, Some(NotificationKind::Failure)),
        ]
    );
    let snap = runner.snapshot();
    assert!(!snap.running);
    assert!(snap.job_id.is_none());
    assert_eq!(snap.phase, TaskPhase::Idle);
}

#[tokio::test]
async fn reported_error_carries_detail() {
    let server = MockServer::start().await;
    mount_submit(&server, "/actors/restart/lvmecp", "r1").await;
    mount_ready(&server, "r1", true).await;
    mount_result(
        &server,
        "r1",
        serde_json::json!({"is_err": true, "is_ready": true, "error": "device offline"}),
    )
    .await;

    let (runner, _) = runner_for(&server, config("restart lvmecp"));
    let err = runner.run::<()>("/actors/restart/lvmecp").await.unwrap_err();
    assert!(err.to_string().contains("device offline"));
}

#[tokio::test]
async fn sequential_runs_behave_identically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/macros/shutdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json("first"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_submit(&server, "/macros/shutdown", "second").await;
    for id in ["first", "second"] {
        mount_ready(&server, id, true).await;
        mount_result(&server, id, serde_json::json!({"is_err": false, "return_value": id})).await;
    }

    let (runner, notifier) = runner_for(&server, config("emergency shutdown"));
    let mut rx = notifier.subscribe();

    assert_eq!(runner.run::<String>("/macros/shutdown").await.unwrap(), "first");
    let first = notification_kinds(&mut rx);
    assert_eq!(runner.run::<String>("/macros/shutdown").await.unwrap(), "second");
    let second = notification_kinds(&mut rx);

    assert_eq!(first, second);
    assert_eq!(runner.snapshot().phase, TaskPhase::Idle);
}

#[tokio::test]
async fn run_with_forwards_method_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/spectrographs/fills/manual-fill"))
        .and(header("X-Operator", "night-ops"))
        .and(body_json(serde_json::json!({"spectrographs": ["sp1", "sp2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain-id"))
        .expect(1)
        .mount(&server)
        .await;
    mount_ready(&server, "plain-id", true).await;
    mount_result(&server, "plain-id", serde_json::json!({"is_err": false, "return_value": null})).await;

    let (runner, _) = runner_for(&server, config("manual fill"));
    let request = SubmitRequest::post(serde_json::json!({"spectrographs": ["sp1", "sp2"]}))
        .with_header("X-Operator", "night-ops");

    runner
        .run_with::<()>("/spectrographs/fills/manual-fill", request)
        .await
        .unwrap();
}

#[tokio::test]
async fn independent_runners_run_concurrently() {
    let server = MockServer::start().await;
    mount_submit(&server, "/enclosure/open", "dome").await;
    mount_submit(&server, "/spectrographs/fills/manual-fill", "fill").await;
    mount_ready(&server, "dome", true).await;
    mount_ready(&server, "fill", true).await;
    mount_result(&server, "dome", serde_json::json!({"is_err": false, "return_value": "open"})).await;
    mount_result(&server, "fill", serde_json::json!({"is_err": false, "return_value": "filled"})).await;

    let (dome, _) = runner_for(&server, config("open dome"));
    let (fill, _) = runner_for(&server, config("manual fill"));

    let (a, b) = tokio::join!(
        dome.run::<String>("/enclosure/open"),
        fill.run::<String>("/spectrographs/fills/manual-fill"),
    );
    assert_eq!(a.unwrap(), "open");
    assert_eq!(b.unwrap(), "filled");
}

#[tokio::test]
async fn http_service_reports_readiness() {
    let server = MockServer::start().await;
    mount_ready(&server, "abc", false).await;

    let service = HttpJobService::new(server.uri()).unwrap();
    assert!(!service.is_ready(&"abc".into()).await.unwrap());
}
