#![allow(clippy::unwrap_used)]
// Integration tests for discovery, control election and bulk pushes
// against wiremock devices.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use encfleet_core::{
    BulkUpdater, CoreError, Credentials, DeviceTarget, DiscoverRequest, Fleet, FleetConfig,
    JobState, MissingState, OutcomeStatus, RetryPolicy, SettingsFetcher, SettingsPlan,
    TemplateSnapshot, default_settings, merge,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn credentials() -> Credentials {
    Credentials::new("Admin", SecretString::from("hunter2".to_string()))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_delay(Duration::from_millis(10))
}

fn config_for(port: u16) -> FleetConfig {
    FleetConfig {
        device_port: port,
        subnet: Some("127.0.0.1/32".into()),
        retry: fast_retry(),
        ..FleetConfig::new(credentials())
    }
}

fn address_of(server: &MockServer) -> String {
    server.address().to_string()
}

async fn mount_login(server: &MockServer, result: u32) {
    Mock::given(method("GET"))
        .and(path("/usapi"))
        .and(query_param("method", "login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "sid=abc123; Path=/")
                .set_body_json(json!({"result": result})),
        )
        .mount(server)
        .await;
}

async fn mount_ping(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/usapi"))
        .and(query_param("method", "ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_settings(server: &MockServer, settings: Value) {
    Mock::given(method("GET"))
        .and(path("/usapi"))
        .and(query_param("method", "get-settings"))
        .and(header("cookie", "sid=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings))
        .mount(server)
        .await;
}

fn updater() -> BulkUpdater {
    BulkUpdater::new(
        reqwest::Client::new(),
        80,
        credentials(),
        fast_retry(),
        Duration::from_secs(5),
        2,
    )
}

// ── Bulk orchestration ──────────────────────────────────────────────

#[tokio::test]
async fn test_one_login_failure_does_not_affect_siblings() {
    let mut servers = Vec::new();
    let mut targets = Vec::new();

    for n in 0..5 {
        let server = MockServer::start().await;
        let id = format!("Encoder-{n}");
        if n == 2 {
            mount_login(&server, 31).await;
            Mock::given(method("POST"))
                .and(query_param("method", "import-settings"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
                .expect(0)
                .mount(&server)
                .await;
        } else {
            mount_login(&server, 0).await;
            Mock::given(method("POST"))
                .and(path("/usapi"))
                .and(query_param("method", "import-settings"))
                .and(header("cookie", "sid=abc123"))
                .and(body_json(default_settings(&id).as_map()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
                .expect(1)
                .mount(&server)
                .await;
        }
        targets.push(DeviceTarget::new(address_of(&server), id));
        servers.push(server);
    }

    let outcomes = updater().run(targets.clone(), SettingsPlan::Defaults).await;

    assert_eq!(outcomes.len(), 5);
    for (n, (outcome, target)) in outcomes.iter().zip(&targets).enumerate() {
        assert_eq!(outcome.id, target.id);
        assert_eq!(outcome.address, target.address);
        if n == 2 {
            assert!(
                matches!(outcome.status, OutcomeStatus::LoginFailed { .. }),
                "got {:?}",
                outcome.status
            );
        } else {
            assert_eq!(outcome.status, OutcomeStatus::Updated);
        }
    }
}

#[tokio::test]
async fn test_template_push_merges_per_target() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;

    let template = Arc::new(TemplateSnapshot {
        version: 7,
        source_address: "10.0.0.1".into(),
        elected_at: Utc::now(),
        settings: serde_json::from_value(json!({
            "udp-mtu": 1400,
            "rec-channels": [{"id": 0, "dir-name": "Control", "prefix-name": "Control"}]
        }))
        .unwrap(),
    });
    let expected = merge("Encoder-3", &template.settings);

    Mock::given(method("POST"))
        .and(query_param("method", "import-settings"))
        .and(body_json(expected.as_map()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let target = DeviceTarget::new(address_of(&server), "Encoder-3");
    let outcome = updater()
        .update_one(&target, &SettingsPlan::Template(template))
        .await;
    assert_eq!(outcome.status, OutcomeStatus::Updated);
    assert_eq!(
        expected.get("rec-channels"),
        default_settings("Encoder-3").get("rec-channels")
    );
}

#[tokio::test]
async fn test_import_rejection_is_push_failed() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;
    Mock::given(method("POST"))
        .and(query_param("method", "import-settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 5})))
        .expect(1)
        .mount(&server)
        .await;

    let target = DeviceTarget::new(address_of(&server), "Encoder-4");
    let outcome = updater().update_one(&target, &SettingsPlan::Defaults).await;
    match outcome.status {
        OutcomeStatus::PushFailed { reason } => assert!(reason.contains("result 5"), "{reason}"),
        other => panic!("expected push-failed, got {other:?}"),
    }
}

/// Answers login normally and drops every other connection after reading
/// its request head. Returns the port and the number of dropped requests.
async fn flaky_push_device() -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dropped = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dropped);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut head = Vec::new();
            let mut buf = [0_u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let request = String::from_utf8_lossy(&head);
            if request.contains("method=login") {
                let body = r#"{"result":0}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Set-Cookie: sid=abc123; Path=/\r\nContent-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            } else {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        }
    });

    (port, dropped)
}

#[tokio::test]
async fn test_push_connection_errors_are_retried_three_times() {
    let (port, dropped) = flaky_push_device().await;
    let updater = BulkUpdater::new(
        reqwest::Client::new(),
        port,
        credentials(),
        RetryPolicy::default(),
        Duration::from_secs(5),
        10,
    );

    let started = Instant::now();
    let outcome = updater
        .update_one(
            &DeviceTarget::new("127.0.0.1", "Encoder-5"),
            &SettingsPlan::Defaults,
        )
        .await;
    let elapsed = started.elapsed();

    assert!(
        matches!(outcome.status, OutcomeStatus::PushFailed { .. }),
        "got {:?}",
        outcome.status
    );
    assert_eq!(dropped.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_secs(4), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "elapsed {elapsed:?}");
}

// ── Settings retrieval ──────────────────────────────────────────────

#[tokio::test]
async fn test_fetcher_falls_back_to_report() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;
    Mock::given(method("GET"))
        .and(query_param("method", "get-settings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("method", "get-report"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<h2>SETTINGS</h2><pre class="json">{"name": "Encoder-6"}</pre>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = SettingsFetcher::new(
        reqwest::Client::new(),
        80,
        credentials(),
        fast_retry(),
        Duration::from_secs(2),
    );
    let doc = fetcher.fetch(&address_of(&server)).await;
    assert_eq!(doc.name(), Some("Encoder-6"));
}

#[tokio::test]
async fn test_fetcher_yields_empty_document_on_login_failure() {
    let server = MockServer::start().await;
    mount_login(&server, 31).await;

    let fetcher = SettingsFetcher::new(
        reqwest::Client::new(),
        80,
        credentials(),
        fast_retry(),
        Duration::from_secs(2),
    );
    assert!(fetcher.fetch(&address_of(&server)).await.is_empty());
    assert!(matches!(
        fetcher.try_fetch(&address_of(&server)).await,
        Err(CoreError::AuthFailure { .. })
    ));
}

// ── Fleet facade ────────────────────────────────────────────────────

#[tokio::test]
async fn test_discover_serves_cache_until_rescan() {
    let server = MockServer::start().await;
    mount_ping(&server, 2).await;
    mount_login(&server, 0).await;
    mount_settings(&server, json!({"name": "Encoder-1", "udp-mtu": 1400})).await;

    let fleet = Fleet::new(config_for(server.address().port())).unwrap();
    assert_eq!(fleet.local_subnet(), "127.0.0.1/32");

    let first = fleet.discover(DiscoverRequest::default()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.devices.len(), 1);
    assert_eq!(first.devices[0].id, "Encoder-1");
    assert_eq!(first.devices[0].address, "127.0.0.1");

    let second = fleet.discover(DiscoverRequest::default()).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.devices, first.devices);
    assert_eq!(second.scanned_at, first.scanned_at);

    let third = fleet
        .discover(DiscoverRequest {
            rescan: true,
            ..DiscoverRequest::default()
        })
        .await
        .unwrap();
    assert!(!third.cached);
    // `mount_ping` expects exactly two probes: the first scan and the rescan.
}

#[tokio::test]
async fn test_empty_scan_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usapi"))
        .and(query_param("method", "ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = Fleet::new(config_for(server.address().port())).unwrap();

    let first = fleet.discover(DiscoverRequest::default()).await.unwrap();
    assert!(!first.cached);
    assert!(first.devices.is_empty());

    let second = fleet.discover(DiscoverRequest::default()).await.unwrap();
    assert!(second.cached);
    assert!(second.devices.is_empty());
    assert_eq!(second.scanned_at, first.scanned_at);
}

#[tokio::test]
async fn test_control_then_push_uses_template() {
    let server = MockServer::start().await;
    mount_ping(&server, 1).await;
    mount_login(&server, 0).await;
    mount_settings(&server, json!({"name": "Control-1", "udp-mtu": 1400})).await;

    let fleet = Fleet::new(config_for(server.address().port())).unwrap();
    fleet.discover(DiscoverRequest::default()).await.unwrap();

    let preview = fleet.set_control("127.0.0.1", "Encoder-9").unwrap();
    assert_eq!(preview.template_version, 1);
    assert_eq!(preview.settings.get("udp-mtu"), Some(&json!(1400)));
    assert_eq!(
        preview.settings.get("rec-channels"),
        default_settings("Encoder-9").get("rec-channels")
    );

    Mock::given(method("POST"))
        .and(query_param("method", "import-settings"))
        .and(body_json(preview.settings.as_map()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let report = fleet
        .push_updates(vec![DeviceTarget::new("127.0.0.1", "Encoder-9")])
        .await
        .unwrap();
    assert_eq!(report.template_version, 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, OutcomeStatus::Updated);
}

#[tokio::test]
async fn test_state_failures() {
    let fleet = Fleet::new(config_for(80)).unwrap();

    assert!(matches!(
        fleet.set_control("127.0.0.1", "Encoder-1"),
        Err(CoreError::StateFailure(MissingState::ScanCache))
    ));
    assert!(matches!(
        fleet.push_updates(vec![DeviceTarget::new("127.0.0.1", "E")]).await,
        Err(CoreError::StateFailure(MissingState::ControlTemplate))
    ));
    assert!(matches!(
        fleet.job(encfleet_core::JobId::new()),
        Err(CoreError::StateFailure(MissingState::Job { .. }))
    ));
}

#[tokio::test]
async fn test_control_requires_known_device() {
    let server = MockServer::start().await;
    mount_ping(&server, 1).await;
    mount_login(&server, 0).await;
    mount_settings(&server, json!({"name": "Encoder-1"})).await;

    let fleet = Fleet::new(config_for(server.address().port())).unwrap();
    fleet.discover(DiscoverRequest::default()).await.unwrap();

    assert!(matches!(
        fleet.set_control("10.9.9.9", "Encoder-2"),
        Err(CoreError::StateFailure(MissingState::Device { .. }))
    ));
}

#[tokio::test]
async fn test_invalid_subnet_is_rejected_before_scanning() {
    let fleet = Fleet::new(config_for(80)).unwrap();
    let err = fleet
        .discover(DiscoverRequest {
            subnet: Some("10.0.0.0/99".into()),
            ..DiscoverRequest::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidSubnet { .. }));
}

#[tokio::test]
async fn test_bulk_update_job_can_be_polled() {
    let server = MockServer::start().await;
    mount_login(&server, 0).await;
    Mock::given(method("POST"))
        .and(query_param("method", "import-settings"))
        .and(body_json(default_settings("Encoder-1").as_map()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = Fleet::new(config_for(80)).unwrap();
    let csv = format!("Device ID,IP Address\nEncoder-1,{}\n", address_of(&server));
    let accepted = fleet.bulk_update(&csv).unwrap();
    assert_eq!(accepted.targets, 1);

    let mut record = fleet.job(accepted.job_id).unwrap();
    for _ in 0..200 {
        if record.state == JobState::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
        record = fleet.job(accepted.job_id).unwrap();
    }

    assert_eq!(record.state, JobState::Completed);
    assert_eq!(record.template_version, None);
    assert_eq!(record.outcomes.len(), 1);
    assert_eq!(record.outcomes[0].status, OutcomeStatus::Updated);
    assert!(record.finished_at.is_some());
}

#[tokio::test]
async fn test_bulk_update_rejects_bad_csv_before_starting() {
    let fleet = Fleet::new(config_for(80)).unwrap();
    let err = fleet.bulk_update("id,ip\nEncoder-1,not-an-ip\n").unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput { .. }));
    assert!(fleet.store().jobs().is_empty());
}
