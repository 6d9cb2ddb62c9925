pub mod config;
pub mod context;
pub mod error;
pub mod hostname;
pub mod logging;
pub mod pretty;
pub mod probe;
pub mod prober;
pub mod range;
pub mod status;
pub mod target;
pub mod types;
pub mod unit;

// Re-export key types and functions at the crate root
pub use config::ProbeConfig;
pub use context::{CancelHandle, CancelReason, ProbeContext};
pub use error::{ProbeError, Result};
pub use hostname::is_valid_hostname;
pub use logging::{get_log_file_path, init_logging};
pub use probe::{CertificateInspector, ReachabilityChecker, check_reachable};
pub use prober::{ProbeState, Prober, probe};
pub use range::{AddressRange, expand_range};
pub use status::Status;
pub use target::Target;
pub use types::{CheckKind, ProbeResult};
pub use unit::Unit;
