use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use reqwest::header::HeaderMap;
use tracing::debug;

use super::{parse_args, render_usage, Tool};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// headers: repeat a GET request and dump the response headers.
#[derive(Debug, Clone, Parser)]
#[command(about = "Send repeated GET requests to a URL and print the response headers.", long_about = None)]
pub struct HeadersArgs {
    /// URL to make requests to.
    #[arg(short, long)]
    pub url: reqwest::Url,

    /// Number of requests to make.
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,
}

pub struct HeadersTool;

#[async_trait]
impl Tool for HeadersTool {
    fn name(&self) -> &'static str {
        "headers"
    }

    fn about(&self) -> &'static str {
        "HTTP response header dumper"
    }

    fn usage(&self) -> String {
        render_usage::<HeadersArgs>(self.name())
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<HeadersArgs>(self.name(), args)? else {
            return Ok(());
        };
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        for i in 0..args.count {
            let resp = client
                .get(args.url.clone())
                .send()
                .await
                .with_context(|| format!("request {i} to {} failed", args.url))?;
            debug!(request = i, status = %resp.status(), "response received");
            let mut out = io::stdout().lock();
            writeln!(out, "================= REQUEST [{i}] ================= ")?;
            write_headers(&mut out, resp.headers())?;
        }
        Ok(())
    }
}

/// Writes `Name: value` for every header value, repeated names included.
pub fn write_headers(out: &mut impl Write, headers: &HeaderMap) -> Result<()> {
    for (name, value) in headers {
        writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
    }
    Ok(())
}
