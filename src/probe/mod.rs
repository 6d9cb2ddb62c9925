pub mod cert;
pub mod reach;

pub use cert::{CertificateDetails, CertificateInspector, HarvestError};
pub use reach::{ReachabilityChecker, check_reachable};
