use std::time::Duration;

use ox9::{scan, scan_with_cancel, PortRange, ScanConfig, ScanError};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Two loopback listeners on nearby ports, so a short range covers both.
async fn two_listeners() -> (TcpListener, TcpListener) {
    let first = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let p = first.local_addr().unwrap().port();
    for k in 1..64u16 {
        let Some(q) = p.checked_add(k) else { break };
        if let Ok(second) = TcpListener::bind(("127.0.0.1", q)).await {
            return (first, second);
        }
    }
    // Fall back below the first port.
    for k in 1..64u16 {
        let Some(q) = p.checked_sub(k).filter(|q| *q > 0) else { break };
        if let Ok(second) = TcpListener::bind(("127.0.0.1", q)).await {
            return (second, first);
        }
    }
    panic!("no free port near {p}");
}

fn port(l: &TcpListener) -> u16 {
    l.local_addr().unwrap().port()
}

fn spanning(a: u16, b: u16) -> PortRange {
    PortRange::new(a, b).unwrap()
}

#[tokio::test]
async fn finds_exactly_the_listening_ports() {
    let (a, b) = two_listeners().await;
    let (pa, pb) = (port(&a), port(&b));
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(spanning(pa, pb))
        .with_concurrency(50)
        .with_timeout(Duration::from_millis(200));

    let report = scan(&cfg).await.unwrap();
    assert_eq!(report.open_ports(), &[pa, pb]);
    assert_eq!(report.scanned(), cfg.ports.len());
    assert!(!report.is_cancelled());
    assert_eq!(report.target(), "127.0.0.1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn order_and_result_independent_of_concurrency() {
    let (a, b) = two_listeners().await;
    let range = spanning(port(&a), port(&b));
    let mut reports = Vec::new();
    for concurrency in [1, 3, 1000] {
        let cfg = ScanConfig::new("127.0.0.1")
            .with_ports(range)
            .with_concurrency(concurrency)
            .with_timeout(Duration::from_millis(200));
        reports.push(scan(&cfg).await.unwrap());
    }
    for r in &reports {
        assert!(r.open_ports().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(r.open_ports(), reports[0].open_ports());
    }
}

#[tokio::test]
async fn consecutive_scans_are_identical() {
    let (a, b) = two_listeners().await;
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(spanning(port(&a), port(&b)))
        .with_concurrency(16)
        .with_timeout(Duration::from_millis(200));
    let first = scan(&cfg).await.unwrap();
    let second = scan(&cfg).await.unwrap();
    assert_eq!(first.open_ports(), second.open_ports());
}

#[tokio::test]
async fn probe_connections_are_closed_after_scan() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let p = port(&listener);
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(PortRange::single(p).unwrap())
        .with_concurrency(1)
        .with_timeout(Duration::from_millis(200));
    let report = scan(&cfg).await.unwrap();
    assert_eq!(report.open_ports(), &[p]);

    // The probe sent nothing and hung up: the accepted side reads EOF.
    let (mut conn, _) = time::timeout(Duration::from_secs(1), listener.accept())
        .await
        .unwrap()
        .unwrap();
    let mut buf = [0u8; 16];
    let n = time::timeout(Duration::from_secs(1), conn.read(&mut buf))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn no_open_ports_is_an_empty_report() {
    // Free a port so nothing listens on it.
    let p = {
        let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
        port(&l)
    };
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(PortRange::single(p).unwrap())
        .with_concurrency(4)
        .with_timeout(Duration::from_millis(200));
    let report = scan(&cfg).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.lines().count(), 0);
}

#[tokio::test]
async fn unreachable_target_is_empty_not_error() {
    // TEST-NET-1, never routed.
    let cfg = ScanConfig::new("192.0.2.1")
        .with_ports(PortRange::new(1, 10).unwrap())
        .with_concurrency(5)
        .with_timeout(Duration::from_millis(100));
    let report = scan(&cfg).await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.scanned(), 10);
}

#[tokio::test]
async fn concurrency_above_port_count_still_scans() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let p = port(&listener);
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(PortRange::single(p).unwrap())
        .with_concurrency(100_000)
        .with_timeout(Duration::from_millis(200));
    let report = scan(&cfg).await.unwrap();
    assert_eq!(report.open_ports(), &[p]);
    assert_eq!(report.scanned(), 1);
}

#[tokio::test]
async fn empty_target_is_config_error() {
    let cfg = ScanConfig::new("");
    match scan(&cfg).await {
        Err(ScanError::Config(msg)) => assert!(msg.contains("target")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_returns_partial_report() {
    let cfg = ScanConfig::new("127.0.0.1")
        .with_ports(PortRange::new(1, 65535).unwrap())
        .with_concurrency(2)
        .with_timeout(Duration::from_millis(200));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let report = time::timeout(Duration::from_secs(10), scan_with_cancel(&cfg, cancel))
        .await
        .expect("cancelled scan returns promptly")
        .unwrap();
    assert!(report.is_cancelled());
    assert!(report.scanned() < report.total());
    assert!(report.open_ports().windows(2).all(|w| w[0] < w[1]));
}
