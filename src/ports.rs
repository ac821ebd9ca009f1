use crate::error::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Inclusive TCP port range, always `1 <= low <= high`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "(u16, u16)", into = "(u16, u16)")]
pub struct PortRange {
    low: u16,
    high: u16,
}

// Never empty, so no `is_empty`.
#[allow(clippy::len_without_is_empty)]
impl PortRange {
    pub fn new(low: u16, high: u16) -> ScanResult<Self> {
        if low == 0 {
            return Err(ScanError::config("port range must start at 1 or above"));
        }
        if low > high {
            return Err(ScanError::config(format!(
                "invalid port range {low}-{high} (start > end)"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn single(port: u16) -> ScanResult<Self> {
        Self::new(port, port)
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn len(&self) -> u64 {
        u64::from(self.high - self.low) + 1
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.low..=self.high).contains(&port)
    }

    pub fn iter(&self) -> RangeInclusive<u16> {
        self.low..=self.high
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self { low: 1, high: 1024 }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// Parses `80` or `1-1024`.
impl FromStr for PortRange {
    type Err = ScanError;

    fn from_str(s: &str) -> ScanResult<Self> {
        let s = s.trim();
        if let Some((a, b)) = s.split_once('-') {
            let start = parse_port_str(a.trim())
                .map_err(|e| ScanError::config(format!("invalid start in range {s}: {e}")))?;
            let end = parse_port_str(b.trim())
                .map_err(|e| ScanError::config(format!("invalid end in range {s}: {e}")))?;
            return Self::new(start, end);
        }
        let p = parse_port_str(s)
            .map_err(|e| ScanError::config(format!("invalid port value {s}: {e}")))?;
        Self::single(p)
    }
}

impl TryFrom<(u16, u16)> for PortRange {
    type Error = ScanError;

    fn try_from((low, high): (u16, u16)) -> ScanResult<Self> {
        Self::new(low, high)
    }
}

impl From<PortRange> for (u16, u16) {
    fn from(r: PortRange) -> Self {
        (r.low, r.high)
    }
}

fn parse_port_str(s: &str) -> Result<u16, String> {
    let val: u32 = s.parse::<u32>().map_err(|e| e.to_string())?;
    if val == 0 || val > 65535 {
        return Err(format!("port out of range: {val}"));
    }
    Ok(val as u16)
}

/// Feeds every port of `range` in ascending order into the bounded candidate
/// buffer, then drops the sender, closing the buffer exactly once.
///
/// Stops early when `cancel` fires or when every receiver is gone. Returns the
/// number of candidates handed over.
pub async fn produce(
    range: PortRange,
    tx: mpsc::Sender<u16>,
    cancel: CancellationToken,
) -> u64 {
    let mut produced = 0u64;
    for port in range.iter() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(produced, "port source cancelled");
                break;
            }
            sent = tx.send(port) => {
                if sent.is_err() {
                    trace!(port, "candidate buffer closed by consumers");
                    break;
                }
                produced += 1;
            }
        }
    }
    drop(tx);
    produced
}
