use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::probe::{CertificateInspector, ReachabilityChecker};
use crate::prober::ProbeState;
use crate::range::AddressRange;
use crate::types::ProbeResult;

/// One independently scheduled piece of a probe. Units report onto a shared
/// channel and must not block when nobody is listening any more.
#[async_trait]
pub trait Unit {
    /// Unit identifier for logging
    fn name(&self) -> &'static str;

    /// Probe state entered when this unit is launched
    fn state(&self) -> ProbeState;

    /// Perform the unit's work, sending each result as it becomes known.
    async fn run(&self, results: mpsc::Sender<ProbeResult>);

    /// Send one result. Returns false once the receiver is gone.
    async fn report(&self, results: &mpsc::Sender<ProbeResult>, result: ProbeResult) -> bool {
        match results.send(result).await {
            Ok(()) => true,
            Err(_) => {
                log::trace!("[unit] receiver_closed: unit={}", self.name());
                false
            }
        }
    }
}

/// TLS handshake and certificate harvest against one host.
#[derive(Debug, Clone)]
pub struct CertificateUnit {
    inspector: CertificateInspector,
    host: String,
    port: u16,
}

impl CertificateUnit {
    pub fn new(inspector: CertificateInspector, host: impl Into<String>, port: u16) -> Self {
        Self {
            inspector,
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl Unit for CertificateUnit {
    fn name(&self) -> &'static str {
        "certificate"
    }

    fn state(&self) -> ProbeState {
        ProbeState::DialingCertificate
    }

    async fn run(&self, results: mpsc::Sender<ProbeResult>) {
        log::debug!("[unit] run: unit={} host={} port={}", self.name(), self.host, self.port);
        let result = self.inspector.inspect(&self.host, self.port).await;
        self.report(&results, result).await;
    }
}

/// Reachability sweep over every address of a block times each port, with
/// at most `max_in_flight` connects outstanding.
#[derive(Debug, Clone)]
pub struct SweepUnit {
    checker: ReachabilityChecker,
    range: AddressRange,
    ports: Vec<u16>,
    max_in_flight: usize,
}

impl SweepUnit {
    pub fn new(checker: ReachabilityChecker, range: AddressRange, ports: Vec<u16>) -> Self {
        Self {
            checker,
            range,
            ports,
            max_in_flight: crate::config::DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_concurrency(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.clamp(1, crate::config::MAX_IN_FLIGHT_LIMIT);
        self
    }

    /// Number of checks this sweep will run.
    pub fn planned(&self) -> u128 {
        self.range.remaining().saturating_mul(self.ports.len() as u128)
    }
}

#[async_trait]
impl Unit for SweepUnit {
    fn name(&self) -> &'static str {
        "sweep"
    }

    fn state(&self) -> ProbeState {
        ProbeState::ProbingAddresses
    }

    async fn run(&self, results: mpsc::Sender<ProbeResult>) {
        log::debug!("[unit] run: unit={} range={} ports={:?} planned={} max_in_flight={}",
            self.name(), self.range, self.ports, self.planned(), self.max_in_flight);

        let ports = self.ports.clone();
        let pairs: Box<dyn Iterator<Item = (std::net::IpAddr, u16)> + Send> = Box::new(
            self.range
                .clone()
                .flat_map(move |ip| ports.clone().into_iter().map(move |port| (ip, port))),
        );

        let mut checks = stream::iter(pairs)
            .map(|(ip, port)| self.checker.check(ip, port))
            .buffer_unordered(self.max_in_flight);

        let mut sent = 0u64;
        while let Some(result) = checks.next().await {
            if !self.report(&results, result).await {
                log::debug!("[unit] sweep_abandoned: range={} sent={}", self.range, sent);
                return;
            }
            sent += 1;
        }

        log::debug!("[unit] sweep_completed: range={} sent={}", self.range, sent);
    }
}
