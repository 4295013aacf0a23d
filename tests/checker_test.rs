//! Tests for the checker loop with real TCP probes

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use status_monitor::models::{IpPort, ProbeStatus};
use status_monitor::monitor::{
    Checker, CheckerSettings, ConfigStore, Prober, SnapshotStore, TcpProber,
};

fn settings(timeout: Duration) -> CheckerSettings {
    CheckerSettings {
        interval: Duration::from_millis(50),
        timeout,
        concurrency: 4,
    }
}

fn checker_for(yaml: &str, timeout: Duration) -> (tempfile::TempDir, Arc<SnapshotStore>, Arc<Checker>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("players.yml");
    std::fs::write(&path, yaml).unwrap();

    let snapshots = Arc::new(SnapshotStore::new(Duration::from_millis(50), timeout));
    let checker = Arc::new(Checker::new(
        ConfigStore::new(path),
        Arc::new(TcpProber),
        snapshots.clone(),
        settings(timeout),
    ));
    (dir, snapshots, checker)
}

#[tokio::test]
async fn test_discard_port_is_offline() {
    let (_dir, _snapshots, checker) = checker_for(
        "players:\n  - name: A\n    ip_port: \"127.0.0.1:9\"\n",
        Duration::from_secs(1),
    );

    let snapshot = checker.run_cycle().await.unwrap();
    assert_eq!(snapshot.results.len(), 1);

    let json = serde_json::to_value(&snapshot.results[0]).unwrap();
    assert_eq!(json["name"], "A");
    assert_eq!(json["ip_port"], "127.0.0.1:9");
    assert_eq!(json["status"], "offline");
    assert!(json["latency_ms"].is_null());
}

#[tokio::test]
async fn test_cycle_publishes_one_snapshot_for_all_players() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap();
    let closed_port = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap().port()
    };

    let yaml = format!(
        "players:\n  - name: Up\n    ip_port: \"{}\"\n  - name: Down\n    ip_port: \"127.0.0.1:{}\"\n  - name: UpAgain\n    ip_port: \"{}\"\n",
        open, closed_port, open
    );
    // Duplicate address is dropped on load
    let (_dir, snapshots, checker) = checker_for(&yaml, Duration::from_secs(1));

    let snapshot = checker.run_cycle().await.unwrap();
    assert_eq!(snapshot.results.len(), 2);
    assert_eq!(snapshot.results[0].status, ProbeStatus::Online);
    assert!(snapshot.results[0].latency_ms.is_some());
    assert_eq!(snapshot.results[1].status, ProbeStatus::Offline);

    let updated_at = snapshot.updated_at.unwrap();
    assert!(snapshot.results.iter().all(|r| r.last_checked == updated_at));

    let report = snapshots.report().await;
    assert_eq!(report.players.len(), 2);
    assert_eq!(report.updated_at, Some(updated_at));
}

#[tokio::test]
async fn test_unroutable_probe_respects_timeout() {
    // TEST-NET-1 is reserved and never answers
    let addr: IpPort = "192.0.2.1:80".parse().unwrap();
    let timeout = Duration::from_millis(300);

    let started = Instant::now();
    let outcome = TcpProber.probe(&addr, timeout).await;
    assert_eq!(outcome.status, ProbeStatus::Offline);
    assert!(started.elapsed() < timeout + Duration::from_millis(500));
}

#[tokio::test]
async fn test_started_loop_publishes_and_picks_up_edits() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap();
    let (dir, snapshots, checker) = checker_for(
        &format!("players:\n  - name: A\n    ip_port: \"{}\"\n", open),
        Duration::from_millis(500),
    );

    assert!(checker.start());
    assert!(!checker.start());

    let deadline = Instant::now() + Duration::from_secs(5);
    while snapshots.read().await.updated_at.is_none() {
        assert!(Instant::now() < deadline, "checker never published");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(snapshots.read().await.results.len(), 1);

    std::fs::write(
        dir.path().join("players.yml"),
        format!(
            "players:\n  - name: A\n    ip_port: \"{}\"\n  - name: B\n    ip_port: \"127.0.0.1:9\"\n",
            open
        ),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while snapshots.read().await.results.len() != 2 {
        assert!(Instant::now() < deadline, "checker never reloaded");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_loop_survives_unparsable_file() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap();
    let (dir, snapshots, checker) = checker_for("players: [unclosed\n", Duration::from_millis(500));

    assert!(checker.start());

    // Several intervals of failing cycles publish nothing
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(snapshots.read().await.updated_at.is_none());
    assert!(checker.is_running());

    std::fs::write(
        dir.path().join("players.yml"),
        format!("players:\n  - name: Fixed\n    ip_port: \"{}\"\n", open),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while snapshots.read().await.results.is_empty() {
        assert!(Instant::now() < deadline, "checker stopped after a bad cycle");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let snapshot = snapshots.read().await;
    assert_eq!(snapshot.results[0].name, "Fixed");
    assert_eq!(snapshot.results[0].status, ProbeStatus::Online);
}
