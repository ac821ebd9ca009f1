use crate::error::{ScanError, ScanResult};
use crate::ports::PortRange;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 500;
/// Workers beyond one per possible port would never get a candidate.
pub const MAX_CONCURRENCY: usize = 65_535;

/// Parameters of one scan invocation. Read-only once the scan starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Host name or IP literal (IPv6 may be bracketed).
    pub target: String,
    pub ports: PortRange,
    /// Ceiling on in-flight connects. Values above the number of ports in
    /// range are clamped, see [`ScanConfig::effective_concurrency`].
    pub concurrency: usize,
    /// Per-connection timeout.
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            ports: PortRange::default(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl ScanConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, ports: PortRange) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Worker count and candidate buffer capacity actually used: the
    /// configured limit, capped by the number of ports in range.
    pub fn effective_concurrency(&self) -> usize {
        let ports = usize::try_from(self.ports.len()).unwrap_or(MAX_CONCURRENCY);
        self.concurrency.clamp(1, MAX_CONCURRENCY).min(ports)
    }

    /// Checks every parameter and returns the dialable target.
    pub fn validate(&self) -> ScanResult<Target> {
        if self.concurrency == 0 {
            return Err(ScanError::config("concurrency must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::config("timeout must be greater than zero"));
        }
        // PortRange upholds 1 <= low <= high on construction.
        Target::parse(&self.target)
    }
}

/// A target that a connection address can be formed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Ip(IpAddr),
    /// Resolved at dial time, on every probe. Zoned IPv6 literals
    /// (`fe80::1%eth0`) are kept here too; the resolver applies the zone.
    Host(String),
}

impl Target {
    pub fn parse(raw: &str) -> ScanResult<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ScanError::config("missing target host"));
        }
        let unbracketed = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(s);
        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Target::Ip(ip));
        }
        if let Some((addr, zone)) = unbracketed.split_once('%') {
            let zone_ok = !zone.is_empty()
                && zone.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c));
            if zone_ok && addr.parse::<Ipv6Addr>().is_ok() {
                return Ok(Target::Host(unbracketed.to_string()));
            }
        }
        if s.chars().any(|c| c.is_whitespace() || matches!(c, '/' | ':' | '%')) {
            return Err(ScanError::config(format!("invalid target host: {raw:?}")));
        }
        Ok(Target::Host(s.to_string()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Ip(ip) => write!(f, "{ip}"),
            Target::Host(h) => write!(f, "{h}"),
        }
    }
}
