use ::time::{format_description::well_known, OffsetDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classification of a single probe.
///
/// Refused, timed out and unreachable attempts all collapse into `NotOpen`;
/// closed and filtered ports are not told apart.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Open,
    NotOpen,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::NotOpen => write!(f, "not-open"),
        }
    }
}

/// Result of probing one port.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: u16,
    pub status: PortStatus,
}

impl ProbeOutcome {
    pub fn open(port: u16) -> Self {
        Self { port, status: PortStatus::Open }
    }

    pub fn not_open(port: u16) -> Self {
        Self { port, status: PortStatus::NotOpen }
    }

    pub fn is_open(&self) -> bool {
        self.status == PortStatus::Open
    }
}

/// Final, immutable result of one scan.
///
/// `open_ports` is strictly ascending with no duplicates. `cancelled` is only
/// set when the scan was stopped before every candidate was probed, in which
/// case `open_ports` holds what was found up to that point.
///
/// Deserializing re-checks those invariants and rejects a report that breaks them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "ReportRecord")]
pub struct ScanReport {
    target: String,
    open_ports: Vec<u16>,
    scanned: u64,
    total: u64,
    cancelled: bool,
    started_at: String,
    finished_at: String,
}

impl ScanReport {
    pub(crate) fn new(
        target: String,
        open_ports: Vec<u16>,
        scanned: u64,
        total: u64,
        started_at: String,
    ) -> Self {
        Self {
            target,
            open_ports,
            scanned,
            total,
            cancelled: scanned < total,
            started_at,
            finished_at: now_rfc3339(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn open_ports(&self) -> &[u16] {
        &self.open_ports
    }

    /// Number of candidates that produced an outcome.
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Number of candidates in the configured range.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_empty(&self) -> bool {
        self.open_ports.is_empty()
    }

    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    pub fn finished_at(&self) -> &str {
        &self.finished_at
    }

    /// Text rendering, one `"<port> open"` line per open port.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.open_ports.iter().map(|p| format!("{p} {}", PortStatus::Open))
    }
}

/// Unchecked wire shape of [`ScanReport`].
#[derive(Deserialize)]
struct ReportRecord {
    target: String,
    open_ports: Vec<u16>,
    scanned: u64,
    total: u64,
    cancelled: bool,
    started_at: String,
    finished_at: String,
}

impl TryFrom<ReportRecord> for ScanReport {
    type Error = String;

    fn try_from(r: ReportRecord) -> Result<Self, Self::Error> {
        if r.open_ports.first() == Some(&0) {
            return Err("open_ports contains port 0".into());
        }
        if !r.open_ports.windows(2).all(|w| w[0] < w[1]) {
            return Err(format!(
                "open_ports must be strictly ascending without duplicates: {:?}",
                r.open_ports
            ));
        }
        if r.scanned > r.total || r.open_ports.len() as u64 > r.scanned {
            return Err(format!(
                "inconsistent counts: {} open, {} scanned, {} total",
                r.open_ports.len(),
                r.scanned,
                r.total
            ));
        }
        if r.cancelled != (r.scanned < r.total) {
            return Err("cancelled flag does not match scanned/total".into());
        }
        Ok(Self {
            target: r.target,
            open_ports: r.open_ports,
            scanned: r.scanned,
            total: r.total,
            cancelled: r.cancelled,
            started_at: r.started_at,
            finished_at: r.finished_at,
        })
    }
}

pub(crate) fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
