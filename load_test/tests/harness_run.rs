//! End-to-end harness runs against a mocked ticketing service.

use std::time::Duration;

use ticket_load_test::config::profiles::ProfileMix;
use ticket_load_test::config::RunConfig;
use ticket_load_test::user::ThinkTime;
use ticket_load_test::{Harness, HarnessError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn short_run(host: &str, mix: ProfileMix) -> RunConfig {
    let mut config = RunConfig::new(host, mix);
    config.users = 4;
    config.spawn_rate = 50.0;
    config.duration = Duration::from_secs(1);
    config.report_interval = None;
    config.stop_grace = Duration::from_secs(2);
    config.seed = Some(99);
    config
}

#[tokio::test]
async fn test_entry_run_totals_match_endpoint_breakdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>바로 입장 가능</p>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/entry/join"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/entry/waiting?userId=1"),
        )
        .mount(&server)
        .await;

    let harness = Harness::new(short_run(&server.uri(), ProfileMix::Entry)).unwrap();
    let snapshot = harness.run().await.unwrap();

    assert!(snapshot.total.requests > 0);
    assert_eq!(
        snapshot.total.requests,
        snapshot.endpoints.values().map(|e| e.requests).sum::<u64>()
    );
    assert_eq!(snapshot.total.failures, 0, "{:?}", snapshot.failure_reasons);
    assert!(snapshot.passed());
    assert!(harness.stats().is_finalized());
    assert!(harness.cancellation_token().is_cancelled());
}

#[tokio::test]
async fn test_failing_target_does_not_pass() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/queue/enter"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harness = Harness::new(short_run(&server.uri(), ProfileMix::Queue)).unwrap();
    let snapshot = harness.run().await.unwrap();

    assert!(snapshot.total.failures > 0);
    assert_eq!(snapshot.total.failures, snapshot.total.requests);
    assert_eq!(
        snapshot.failure_reasons.get("queue enter status: 500"),
        Some(&snapshot.total.failures)
    );
    assert!(!snapshot.passed());
}

#[tokio::test]
async fn test_cancelled_run_still_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entry"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = short_run(&server.uri(), ProfileMix::Journey);
    config.duration = Duration::from_secs(60);
    let harness = Harness::new(config).unwrap();

    let cancel = harness.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let snapshot = tokio::time::timeout(Duration::from_secs(10), harness.run())
        .await
        .expect("cancelled run stops promptly")
        .unwrap();
    assert!(snapshot.elapsed < Duration::from_secs(10));
}

/// Journey target whose users never get admitted and whose rank check is slow
async fn slow_waiting_room() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entry"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/entry/join"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/entry/waiting?userId=1"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/entry/waiting"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/entry/api/rank/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"rank": 3, "isAdmitted": false}))
                .set_delay(Duration::from_millis(700)),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_stop_mid_poll_keeps_healthy_run_passing() {
    let server = slow_waiting_room().await;
    let mut config = short_run(&server.uri(), ProfileMix::Journey);
    config.stop_grace = Duration::from_secs(3);
    let harness = Harness::new(config).unwrap();

    let snapshot = harness.run().await.unwrap();

    assert_eq!(snapshot.total.failures, 0, "{:?}", snapshot.failure_reasons);
    assert_eq!(snapshot.abandoned, 0);
    assert!(snapshot.journeys.started > 0);
    assert_eq!(snapshot.journeys.started, snapshot.journeys.finished());
    assert!(snapshot.passed());
}

#[tokio::test]
async fn test_requests_cut_off_after_grace_are_abandoned_not_failed() {
    let server = slow_waiting_room().await;
    let mut config = short_run(&server.uri(), ProfileMix::Journey);
    config.stop_grace = Duration::from_millis(100);
    config.poll.delay = ThinkTime::between(0.0, 0.0);
    let harness = Harness::new(config).unwrap();

    let snapshot = harness.run().await.unwrap();

    assert!(snapshot.abandoned > 0);
    assert_eq!(snapshot.total.failures, 0, "{:?}", snapshot.failure_reasons);
    assert_eq!(snapshot.journeys.started, snapshot.journeys.finished());
    assert!(snapshot.passed());
}

#[tokio::test]
async fn test_unreachable_target_aborts_run() {
    let harness = Harness::new(short_run("http://127.0.0.1:1", ProfileMix::Entry)).unwrap();

    match harness.run().await {
        Err(HarnessError::Unreachable { host, .. }) => assert_eq!(host, "http://127.0.0.1:1"),
        other => panic!("expected unreachable target, got {:?}", other.map(|s| s.total)),
    }
}
