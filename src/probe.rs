use crate::config::Target;
use crate::types::ProbeOutcome;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tracing::trace;

/// Attempts a single TCP connect to `target:port`, bounded by `timeout`.
///
/// A completed handshake is `Open`; the stream is dropped straight away
/// without reading or writing. Any failure (refused, timed out, unreachable,
/// name resolution) is `NotOpen`. There is no retry.
pub async fn probe_port(target: &Target, port: u16, timeout: Duration) -> ProbeOutcome {
    match time::timeout(timeout, connect(target, port)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            ProbeOutcome::open(port)
        }
        Ok(Err(e)) => {
            trace!(%target, port, error = %e, "connect failed");
            ProbeOutcome::not_open(port)
        }
        Err(_) => {
            trace!(%target, port, ?timeout, "connect timed out");
            ProbeOutcome::not_open(port)
        }
    }
}

async fn connect(target: &Target, port: u16) -> io::Result<TcpStream> {
    match target {
        Target::Ip(ip) => TcpStream::connect(SocketAddr::new(*ip, port)).await,
        Target::Host(host) => TcpStream::connect((host.as_str(), port)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortStatus;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    const LOOPBACK: Target = Target::Ip(IpAddr::V4(Ipv4Addr::LOCALHOST));

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let out = probe_port(&LOOPBACK, port, Duration::from_millis(500)).await;
        assert_eq!(out, ProbeOutcome::open(port));
    }

    #[tokio::test]
    async fn closed_port_is_not_open() {
        // Bind then drop to get a port that nothing listens on.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let out = probe_port(&LOOPBACK, port, Duration::from_millis(500)).await;
        assert_eq!(out.status, PortStatus::NotOpen);
        assert_eq!(out.port, port);
    }

    #[tokio::test]
    async fn unresolvable_host_is_not_open() {
        let target = Target::Host("no-such-host.invalid".into());
        let out = probe_port(&target, 80, Duration::from_millis(300)).await;
        assert!(!out.is_open());
    }
}
