use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::DEFAULT_DIAL_TIMEOUT_SECS;
use crate::status::{Status, classify_io_error};
use crate::types::{CheckKind, ProbeResult, Started};

/// Bare TCP connect check: open, note the latency, close.
#[derive(Debug, Clone)]
pub struct ReachabilityChecker {
    dial_timeout: Duration,
    target: String,
}

impl Default for ReachabilityChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityChecker {
    pub fn new() -> Self {
        Self {
            dial_timeout: Duration::from_secs(DEFAULT_DIAL_TIMEOUT_SECS),
            target: String::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Target text stamped on every result.
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    pub async fn check(&self, ip: IpAddr, port: u16) -> ProbeResult {
        let started = Started::now();
        let socket_addr = SocketAddr::new(ip, port);
        let target = if self.target.is_empty() { socket_addr.to_string() } else { self.target.clone() };

        let result = match timeout(self.dial_timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeResult::new(target, CheckKind::Reachability, &started)
            }
            Ok(Err(e)) => {
                let status = classify_io_error(&e);
                ProbeResult::failed(
                    target,
                    CheckKind::Reachability,
                    &started,
                    status,
                    format!("connect {socket_addr}: {e}"),
                )
            }
            Err(_) => ProbeResult::failed(
                target,
                CheckKind::Reachability,
                &started,
                Status::Unresponsive,
                format!("connect {socket_addr}: timed out after {}ms", self.dial_timeout.as_millis()),
            ),
        }
        .at(Some(ip), Some(port));

        log::trace!("[probe::reach] check: addr={} status={} latency={}ms",
            socket_addr, result.status, result.latency_millis);
        result
    }
}

/// One-shot reachability check of `ip:port`.
pub async fn check_reachable(ip: IpAddr, port: u16, dial_timeout: Duration) -> ProbeResult {
    ReachabilityChecker::new().with_timeout(dial_timeout).check(ip, port).await
}
