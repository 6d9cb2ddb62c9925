use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Instant;

use crate::status::Status;

/// Which unit of a probe produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Certificate,
    Reachability,
    /// Synthesised by the orchestrator itself (cancellation, no result).
    Probe,
}

/// Start of a unit of work: wall-clock time for reporting, monotonic clock
/// for latency.
#[derive(Debug, Clone, Copy)]
pub struct Started {
    pub at: DateTime<Utc>,
    clock: Instant,
}

impl Started {
    pub fn now() -> Self {
        Self {
            at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of one probe unit. Persisted upstream as a domain tracking row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub target: String,
    pub check: CheckKind,
    pub server_ip: Option<IpAddr>,
    pub port: Option<u16>,
    pub issuer: String,
    pub expires: Option<DateTime<Utc>>,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    /// SHA-1 of the signature bytes, hex.
    pub signature: String,
    /// SHA-1 of the DER SubjectPublicKeyInfo, hex.
    pub public_key_fingerprint: String,
    /// Comma separated DNS names.
    pub dns_names: String,
    pub key_usage: String,
    pub ext_key_usages: Vec<String>,
    pub encoded_pem: String,
    pub status: Status,
    pub last_polled_at: DateTime<Utc>,
    pub latency_millis: u64,
    pub error: Option<String>,
}

impl ProbeResult {
    /// Empty result of `check` for `target`, stamped `Healthy` and timed from
    /// `started`. Callers fill in the rest.
    pub fn new(target: impl Into<String>, check: CheckKind, started: &Started) -> Self {
        Self {
            target: target.into(),
            check,
            server_ip: None,
            port: None,
            issuer: String::new(),
            expires: None,
            signature_algorithm: String::new(),
            public_key_algorithm: String::new(),
            signature: String::new(),
            public_key_fingerprint: String::new(),
            dns_names: String::new(),
            key_usage: String::new(),
            ext_key_usages: Vec::new(),
            encoded_pem: String::new(),
            status: Status::Healthy,
            last_polled_at: started.at,
            latency_millis: started.elapsed_millis(),
            error: None,
        }
    }

    /// A failed unit. `status` must be one of the failure statuses.
    pub fn failed(
        target: impl Into<String>,
        check: CheckKind,
        started: &Started,
        status: Status,
        error: impl Into<String>,
    ) -> Self {
        debug_assert!(status.is_failure());
        let mut result = Self::new(target, check, started);
        result.status = status;
        result.error = Some(error.into());
        result
    }

    pub fn at(mut self, server_ip: Option<IpAddr>, port: Option<u16>) -> Self {
        self.server_ip = server_ip;
        self.port = port;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == Status::Healthy
    }

    /// Names from `dns_names` as a list.
    pub fn dns_name_list(&self) -> Vec<&str> {
        self.dns_names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
