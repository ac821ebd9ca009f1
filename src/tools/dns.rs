use std::io::{self, Write};
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use tokio::net::lookup_host;
use tokio::time::{self, Instant};
use tracing::debug;

use super::{parse_args, render_usage, Tool};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum RecordType {
    A,
    Aaaa,
    Any,
}

impl RecordType {
    fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
            RecordType::Any => true,
        }
    }
}

/// dns: address lookups through the system resolver.
#[derive(Debug, Clone, Parser)]
#[command(about = "Look up the addresses of a domain through the system resolver.", long_about = None)]
pub struct DnsArgs {
    /// Domain to look up.
    #[arg(short, long)]
    pub domain: String,

    /// Record type to return.
    #[arg(short, long, value_enum, ignore_case = true, default_value = "A")]
    pub rtype: RecordType,
}

pub struct DnsTool;

#[async_trait]
impl Tool for DnsTool {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn about(&self) -> &'static str {
        "DNS address lookups"
    }

    fn usage(&self) -> String {
        render_usage::<DnsArgs>(self.name())
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<DnsArgs>(self.name(), args)? else {
            return Ok(());
        };
        let (addrs, latency) = resolve(&args.domain, args.rtype).await?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "latency {latency:?}")?;
        writeln!(out, "-------------------------------------------------")?;
        if addrs.is_empty() {
            writeln!(out, "No answer records found")?;
        }
        for ip in addrs {
            let kind = if ip.is_ipv4() { "A" } else { "AAAA" };
            writeln!(out, "{}   {kind}   {ip}", args.domain)?;
        }
        Ok(())
    }
}

/// Resolves `domain`, keeping addresses of the requested family, in resolver
/// order without duplicates.
pub async fn resolve(domain: &str, rtype: RecordType) -> Result<(Vec<IpAddr>, Duration)> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        bail!("missing --domain parameter");
    }
    let start = Instant::now();
    let found = time::timeout(LOOKUP_TIMEOUT, lookup_host((domain, 0)))
        .await
        .with_context(|| format!("dns lookup for {domain} timed out"))?
        .with_context(|| format!("dns lookup for {domain} failed"))?;
    let latency = start.elapsed();

    let mut addrs: Vec<IpAddr> = Vec::new();
    for sa in found {
        let ip = sa.ip();
        if rtype.matches(&ip) && !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }
    debug!(domain, count = addrs.len(), ?latency, "dns lookup done");
    Ok((addrs, latency))
}
