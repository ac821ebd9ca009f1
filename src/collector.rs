use crate::types::{ProbeOutcome, ScanReport};
use tokio::sync::mpsc;

/// Fan-in consumer: keeps open ports, counts every outcome.
#[derive(Debug, Default)]
pub struct ResultCollector {
    open: Vec<u16>,
    received: u64,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ProbeOutcome) {
        self.received += 1;
        if outcome.is_open() {
            self.open.push(outcome.port);
        }
    }

    /// Consumes outcomes until the channel reaches end-of-stream.
    pub async fn drain(&mut self, outcomes: &mut mpsc::UnboundedReceiver<ProbeOutcome>) {
        while let Some(outcome) = outcomes.recv().await {
            self.record(outcome);
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Sorts and dedups the open ports into the final report.
    pub fn finish(self, target: String, total: u64, started_at: String) -> ScanReport {
        let mut open = self.open;
        open.sort_unstable();
        open.dedup();
        ScanReport::new(target, open, self.received, total, started_at)
    }
}
