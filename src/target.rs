use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use url::{Host, Url};

use crate::error::{ProbeError, Result};
use crate::hostname::is_valid_hostname;
use crate::range::{AddressRange, expand_range, is_cidr};

static PORT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(:(\d+))?$").expect("Invalid port suffix regex"));
static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[.*\]$").expect("Invalid bracket regex"));

#[derive(Debug, Clone)]
pub enum TargetKind {
    Host(String),
    Address(IpAddr),
    Range(AddressRange),
}

/// A parsed probe target: a host name, a literal address or an address
/// block, optionally with an explicit port.
#[derive(Debug, Clone)]
pub struct Target {
    pub original: String,
    pub kind: TargetKind,
    pub port: Option<u16>,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ProbeError::InvalidTarget("empty target".to_string()));
        }

        // URLs carry a path, which would otherwise read as a prefix length
        if trimmed.contains("://") {
            return Self::parse_url(trimmed);
        }

        let (host, port) = split_host_port(trimmed);
        let port = parse_port(trimmed, port)?;

        let kind = if is_cidr(&host) {
            TargetKind::Range(expand_range(&host)?)
        } else if let Ok(ip) = host.parse::<IpAddr>() {
            TargetKind::Address(ip)
        } else if is_valid_hostname(&host) {
            TargetKind::Host(host)
        } else {
            return Err(ProbeError::InvalidTarget(format!("{trimmed}: not a host name, address or range")));
        };

        log::debug!("[target] parse: input={} kind={:?} port={:?}", trimmed, kind_name(&kind), port);

        Ok(Self {
            original: trimmed.to_string(),
            kind,
            port,
        })
    }

    fn parse_url(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| ProbeError::InvalidTarget(format!("{input}: {e}")))?;
        let kind = match url.host() {
            Some(Host::Domain(domain)) if is_valid_hostname(domain) => TargetKind::Host(domain.to_string()),
            Some(Host::Ipv4(ip)) => TargetKind::Address(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => TargetKind::Address(IpAddr::V6(ip)),
            _ => return Err(ProbeError::InvalidTarget(format!("{input}: URL has no usable host"))),
        };

        Ok(Self {
            original: input.to_string(),
            kind,
            port: url.port(),
        })
    }

    pub fn is_range(&self) -> bool {
        matches!(self.kind, TargetKind::Range(_))
    }

    /// Host to dial and present via SNI for the certificate handshake. A
    /// block is inspected at its first address.
    pub fn tls_host(&self) -> String {
        match &self.kind {
            TargetKind::Host(host) => host.trim_end_matches('.').to_string(),
            TargetKind::Address(ip) => ip.to_string(),
            TargetKind::Range(range) => range.first().to_string(),
        }
    }

    /// Ports to sweep per address: the explicit port alone, else `defaults`.
    pub fn sweep_ports(&self, defaults: &[u16]) -> Vec<u16> {
        match self.port {
            Some(port) => vec![port],
            None => defaults.to_vec(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.original
    }
}

fn kind_name(kind: &TargetKind) -> &'static str {
    match kind {
        TargetKind::Host(_) => "host",
        TargetKind::Address(_) => "address",
        TargetKind::Range(_) => "range",
    }
}

fn parse_port(input: &str, port: Option<String>) -> Result<Option<u16>> {
    match port {
        None => Ok(None),
        Some(p) => p
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ProbeError::InvalidTarget(format!("{input}: port {p} out of range"))),
    }
}

/// Splits an optional trailing `:port` off `addr`.
///
/// Handles bracketed IPv6 (`[::1]:443`), address blocks with a port
/// (`10.0.0.0/30:8080`) and bare IPv6 whose last group merely looks like a
/// port (`2001:db8::1` keeps its `:1`).
pub fn split_host_port(addr: &str) -> (String, Option<String>) {
    let Some(caps) = PORT_SUFFIX.captures(addr) else {
        return (addr.to_string(), None);
    };
    let mut host = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let port = caps.get(3).map(|m| m.as_str().to_string());
    let is_ipv6 = host.contains(':');

    if is_ipv6 && BRACKETED.is_match(&host) {
        host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        return (host, port);
    }

    let Some(port) = port else {
        return (host, None);
    };

    if is_cidr(&host) {
        return (host, Some(port));
    }

    // more than four digits can only be a port, not a hex group
    if is_ipv6 && port.len() <= 4 {
        let joined = format!("{host}:{port}");
        if joined.parse::<IpAddr>().is_ok() {
            return (joined, None);
        }
    }

    (host, Some(port))
}
