use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::{MAX_IN_FLIGHT_LIMIT, ProbeConfig};
use crate::context::{CancelReason, ProbeContext};
use crate::error::Result;
use crate::probe::{CertificateInspector, ReachabilityChecker};
use crate::status::Status;
use crate::target::{Target, TargetKind};
use crate::types::{CheckKind, ProbeResult, Started};
use crate::unit::{CertificateUnit, SweepUnit, Unit};

/// Spare channel slots beyond the sweep's in-flight bound.
const RESULT_CHANNEL_SLACK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Started,
    DialingCertificate,
    ProbingAddresses,
    Completed,
    Cancelled,
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeState::Started => "started",
            ProbeState::DialingCertificate => "dialing_certificate",
            ProbeState::ProbingAddresses => "probing_addresses",
            ProbeState::Completed => "completed",
            ProbeState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

fn enter(target: &str, state: ProbeState) {
    log::debug!("[prober] state: target={} state={}", target, state);
}

/// Units launched for one probe. Dropping it aborts whatever is still
/// running, which closes their sockets.
struct Launched {
    tasks: JoinSet<()>,
    results: mpsc::Receiver<ProbeResult>,
}

/// Runs the certificate inspection and, for address blocks, the
/// reachability sweep for a target.
#[derive(Debug, Clone, Default)]
pub struct Prober {
    config: ProbeConfig,
}

impl Prober {
    pub fn new(config: ProbeConfig) -> Self {
        log::debug!("[prober] new: dial_timeout={}s handshake_timeout={}s max_in_flight={} verify_chain={}",
            config.dial_timeout_secs, config.handshake_timeout_secs, config.max_in_flight, config.verify_chain);
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn units(&self, target: &Target) -> Vec<Box<dyn Unit + Send + Sync>> {
        let mut units: Vec<Box<dyn Unit + Send + Sync>> = Vec::new();

        let inspector = CertificateInspector::new()
            .with_dial_timeout(self.config.dial_timeout())
            .with_handshake_timeout(self.config.handshake_timeout())
            .with_expiry_warning(self.config.expiry_warning())
            .with_verify_chain(self.config.verify_chain)
            .for_target(target.display_name());
        let tls_port = target.port.unwrap_or(self.config.tls_port);
        units.push(Box::new(CertificateUnit::new(inspector, target.tls_host(), tls_port)));

        if let TargetKind::Range(range) = &target.kind {
            let checker = ReachabilityChecker::new()
                .with_timeout(self.config.dial_timeout())
                .for_target(target.display_name());
            let sweep = SweepUnit::new(checker, range.clone(), target.sweep_ports(&self.config.default_ports))
                .with_concurrency(self.config.max_in_flight.min(MAX_IN_FLIGHT_LIMIT));
            units.push(Box::new(sweep));
        }

        units
    }

    fn launch(&self, target: &Target) -> Launched {
        let capacity = self.config.max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT).saturating_add(RESULT_CHANNEL_SLACK);
        let (tx, results) = mpsc::channel(capacity);
        let mut tasks = JoinSet::new();

        for unit in self.units(target) {
            enter(target.display_name(), unit.state());

            let tx = tx.clone();
            tasks.spawn(async move {
                unit.run(tx).await;
            });
        }

        log::debug!("[prober] launched: target={} units={}", target.display_name(), tasks.len());
        Launched { tasks, results }
    }

    /// Probes `target` and returns the first result any unit produces, or a
    /// cancellation result if `ctx` ends first. Only an unparseable target is
    /// an error.
    pub async fn probe(&self, ctx: &ProbeContext, target: &str) -> Result<ProbeResult> {
        let started = Started::now();
        enter(target, ProbeState::Started);
        let target = Target::parse(target)?;

        let mut launched = self.launch(&target);

        let result = tokio::select! {
            biased;
            reason = ctx.cancelled() => {
                enter(target.display_name(), ProbeState::Cancelled);
                cancellation(&target, &started, reason)
            }
            received = launched.results.recv() => {
                enter(target.display_name(), ProbeState::Completed);
                received.unwrap_or_else(|| exhausted(&target, &started))
            }
        };

        log::debug!("[prober] probe_finished: target={} check={:?} status={} outstanding={}",
            target.display_name(), result.check, result.status, launched.tasks.len());
        Ok(result)
    }

    /// Probes `target` and collects every unit's results. If `ctx` ends
    /// first, what arrived so far is returned followed by a cancellation
    /// result.
    pub async fn probe_all(&self, ctx: &ProbeContext, target: &str) -> Result<Vec<ProbeResult>> {
        let started = Started::now();
        enter(target, ProbeState::Started);
        let target = Target::parse(target)?;

        let mut launched = self.launch(&target);
        let mut collected = Vec::new();

        loop {
            tokio::select! {
                biased;
                reason = ctx.cancelled() => {
                    enter(target.display_name(), ProbeState::Cancelled);
                    collected.push(cancellation(&target, &started, reason));
                    break;
                }
                received = launched.results.recv() => match received {
                    Some(result) => collected.push(result),
                    None => {
                        enter(target.display_name(), ProbeState::Completed);
                        break;
                    }
                }
            }
        }

        log::debug!("[prober] probe_all_finished: target={} results={}", target.display_name(), collected.len());
        Ok(collected)
    }
}

fn cancellation(target: &Target, started: &Started, reason: CancelReason) -> ProbeResult {
    ProbeResult::failed(target.display_name(), CheckKind::Probe, started, Status::Unresponsive, reason.to_string())
}

fn exhausted(target: &Target, started: &Started) -> ProbeResult {
    log::warn!("[prober] no_result: target={}", target.display_name());
    ProbeResult::failed(target.display_name(), CheckKind::Probe, started, Status::Unresponsive, "probe produced no result")
}

/// Probes `target` with the default configuration.
pub async fn probe(ctx: &ProbeContext, target: &str) -> Result<ProbeResult> {
    Prober::default().probe(ctx, target).await
}
