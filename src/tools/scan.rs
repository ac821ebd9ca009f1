use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{parse_args, render_usage, Tool};
use crate::config::{ScanConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MS};
use crate::ports::PortRange;
use crate::scanner;
use crate::types::ScanReport;

/// scan: bounded-concurrency TCP connect scan of one host.
#[derive(Debug, Clone, Parser)]
#[command(about = "Bounded-concurrency TCP connect port scan of one host.", long_about = None)]
pub struct ScanArgs {
    /// Host name or IP address to scan.
    #[arg(short, long)]
    pub target: String,

    /// Port or inclusive port range, e.g. `80` or `1-1024`.
    #[arg(short, long, default_value = "1-1024")]
    pub ports: PortRange,

    /// Max concurrent TCP connect attempts.
    #[arg(short, long, env = "OX9_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", env = "OX9_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Print the report as pretty JSON instead of `<port> open` lines.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write the report as pretty JSON to this path.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    pub fn to_config(&self) -> ScanConfig {
        ScanConfig::new(self.target.clone())
            .with_ports(self.ports)
            .with_concurrency(self.concurrency)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

pub struct ScanTool;

#[async_trait]
impl Tool for ScanTool {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn about(&self) -> &'static str {
        "TCP connect port scanner"
    }

    fn usage(&self) -> String {
        render_usage::<ScanArgs>(self.name())
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<ScanArgs>(self.name(), args)? else {
            return Ok(());
        };
        let config = args.to_config();

        // Ctrl-C cancels the scan; the partial report is still printed.
        let cancel = CancellationToken::new();
        let cancel_ctrlc = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_ctrlc.cancel();
            }
        });

        let res = scanner::scan_with_cancel(&config, cancel).await;
        watcher.abort();
        let report = res.with_context(|| format!("scan of {} failed", config.target))?;

        let stdout = io::stdout();
        write_report(&mut stdout.lock(), &report, args.json)?;
        if report.is_cancelled() {
            warn!(
                scanned = report.scanned(),
                total = report.total(),
                "scan interrupted before completion"
            );
        }
        if let Some(path) = args.output.as_deref() {
            write_report_json(path, &report)?;
        }
        Ok(())
    }
}

/// Writes one `<port> open` line per open port, or the pretty JSON report.
pub fn write_report(out: &mut impl Write, report: &ScanReport, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
    } else {
        for line in report.lines() {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn write_report_json(path: &Path, report: &ScanReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ScanArgs {
        ScanArgs::try_parse_from(std::iter::once("scan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_config_defaults() {
        let a = parse(&["--target", "10.0.0.1"]);
        let c = a.to_config();
        assert_eq!(c.ports, PortRange::default());
        assert_eq!(c.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(c.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert!(!a.json);
    }

    #[test]
    fn custom_flags() {
        let a = parse(&["-t", "localhost", "-p", "20-25", "-c", "5", "--timeout-ms", "50"]);
        let c = a.to_config();
        assert_eq!(c.ports, PortRange::new(20, 25).unwrap());
        assert_eq!(c.concurrency, 5);
        assert_eq!(c.timeout, Duration::from_millis(50));
    }

    #[test]
    fn bad_range_rejected_by_parser() {
        let r = ScanArgs::try_parse_from(["scan", "-t", "h", "-p", "9-1"]);
        assert!(r.is_err());
    }

    #[test]
    fn target_required() {
        assert!(ScanArgs::try_parse_from(["scan"]).is_err());
    }
}
