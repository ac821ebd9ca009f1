use crate::collector::ResultCollector;
use crate::config::ScanConfig;
use crate::error::ScanResult;
use crate::pool::WorkerPool;
use crate::ports;
use crate::probe::probe_port;
use crate::types::{now_rfc3339, ScanReport};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of one scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Configured,
    Running,
    Draining,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanState::Configured => "configured",
            ScanState::Running => "running",
            ScanState::Draining => "draining",
            ScanState::Completed => "completed",
            ScanState::Cancelled => "cancelled",
            ScanState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Scan the configured port range of one target with a bounded pool of TCP connect probes.
///
/// - Fails with `ScanError::Config` before any connection attempt if the config is invalid.
/// - At most `config.concurrency` connects are in flight at any instant.
/// - Returns open ports strictly ascending; an empty report is not an error.
pub async fn scan(config: &ScanConfig) -> ScanResult<ScanReport> {
    scan_with_cancel(config, CancellationToken::new()).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
///
/// On cancel the port source stops, in-flight probes are abandoned, and the
/// report holds the open ports found so far with `is_cancelled()` set.
pub async fn scan_with_cancel(
    config: &ScanConfig,
    cancel: CancellationToken,
) -> ScanResult<ScanReport> {
    let mut state = ScanState::Configured;
    let target = match config.validate() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            transition(&mut state, ScanState::Failed);
            return Err(e);
        }
    };

    let started_at = now_rfc3339();
    let total = config.ports.len();
    let workers = config.effective_concurrency();
    info!(
        target = %target,
        ports = %config.ports,
        concurrency = config.concurrency,
        workers,
        timeout_ms = config.timeout.as_millis() as u64,
        "starting scan"
    );
    transition(&mut state, ScanState::Running);

    // Candidate buffer sized to the pool: backpressure on the producer.
    let (cand_tx, cand_rx) = mpsc::channel::<u16>(workers);

    let timeout = config.timeout;
    let probe_target = target.clone();
    let mut pool = WorkerPool::new(workers).spawn(
        cand_rx,
        move |port: u16| {
            let target = probe_target.clone();
            async move { probe_port(&target, port, timeout).await }
        },
        cancel.clone(),
    );

    let producer = tokio::spawn(ports::produce(config.ports, cand_tx, cancel.clone()));

    let mut collector = ResultCollector::new();
    collector.drain(pool.outcomes()).await;
    transition(&mut state, ScanState::Draining);

    let joined = pool.join().await;
    let produced = producer.await;
    let (completed, produced) = match (joined, produced) {
        (Ok(c), Ok(p)) => (c, p),
        (Err(e), _) => {
            transition(&mut state, ScanState::Failed);
            return Err(e);
        }
        (_, Err(e)) => {
            transition(&mut state, ScanState::Failed);
            return Err(e.into());
        }
    };
    debug!(produced, completed, received = collector.received(), "scan drained");

    let report = collector.finish(target.to_string(), total, started_at);
    if report.is_cancelled() {
        transition(&mut state, ScanState::Cancelled);
        warn!(
            scanned = report.scanned(),
            total,
            "scan cancelled, report is partial"
        );
    } else {
        transition(&mut state, ScanState::Completed);
    }
    info!(open = report.open_ports().len(), scanned = report.scanned(), "scan finished");
    Ok(report)
}

fn transition(state: &mut ScanState, next: ScanState) {
    debug!(from = %state, to = %next, "scan state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortRange;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_target_fails_before_probing() {
        let err = scan(&ScanConfig::default()).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn precancelled_scan_returns_partial_report() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cfg = ScanConfig::new("127.0.0.1")
            .with_ports(PortRange::new(1, 100).unwrap())
            .with_concurrency(4)
            .with_timeout(Duration::from_millis(100));
        let report = scan_with_cancel(&cfg, cancel).await.unwrap();
        assert!(report.is_cancelled());
        assert!(report.scanned() < 100);
        assert_eq!(report.total(), 100);
    }

    #[test]
    fn state_names() {
        assert_eq!(ScanState::Draining.to_string(), "draining");
        assert_eq!(ScanState::Failed.to_string(), "failed");
    }
}
