use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{ProbeError, Result};
use crate::status::DEFAULT_EXPIRY_WARNING_DAYS;

pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TLS_PORT: u16 = 443;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
/// Upper bound on `max_in_flight`; it also sizes the result channel.
pub const MAX_IN_FLIGHT_LIMIT: usize = 65_536;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "CERTPOLL_CONFIG";

fn default_dial_timeout_secs() -> u64 {
    DEFAULT_DIAL_TIMEOUT_SECS
}

fn default_handshake_timeout_secs() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

fn default_expiry_warning_days() -> i64 {
    DEFAULT_EXPIRY_WARNING_DAYS
}

fn default_ports() -> Vec<u16> {
    vec![80, 443]
}

fn default_tls_port() -> u16 {
    DEFAULT_TLS_PORT
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

/// Tunables for a [`crate::Prober`]. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// TCP connect timeout for reachability checks and the TLS dial.
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Upper bound on dial plus TLS handshake.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    #[serde(default = "default_expiry_warning_days")]
    pub expiry_warning_days: i64,

    /// Ports swept for each address of a CIDR target without an explicit port.
    #[serde(default = "default_ports")]
    pub default_ports: Vec<u16>,

    /// Port used for the certificate handshake when the target names none.
    #[serde(default = "default_tls_port")]
    pub tls_port: u16,

    /// Reachability checks allowed in flight at once during a sweep.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Record the webpki verdict on the presented chain and report
    /// unverifiable certificates as invalid.
    #[serde(default)]
    pub verify_chain: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dial_timeout_secs: DEFAULT_DIAL_TIMEOUT_SECS,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            expiry_warning_days: DEFAULT_EXPIRY_WARNING_DAYS,
            default_ports: default_ports(),
            tls_port: DEFAULT_TLS_PORT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            verify_chain: false,
        }
    }
}

impl ProbeConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: ProbeConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("[config] load: path={}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Loads the file named by `CERTPOLL_CONFIG`, or the defaults when it is
    /// unset. `.env` files are honoured.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dial_timeout_secs == 0 || self.handshake_timeout_secs == 0 {
            return Err(ProbeError::Config("timeouts must be at least one second".to_string()));
        }
        if self.max_in_flight == 0 {
            return Err(ProbeError::Config("max_in_flight must be positive".to_string()));
        }
        if self.max_in_flight > MAX_IN_FLIGHT_LIMIT {
            return Err(ProbeError::Config(format!("max_in_flight must be at most {MAX_IN_FLIGHT_LIMIT}")));
        }
        if self.default_ports.is_empty() {
            return Err(ProbeError::Config("default_ports must not be empty".to_string()));
        }
        if self.expiry_warning_days < 0 {
            return Err(ProbeError::Config("expiry_warning_days must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
        self
    }

    pub fn with_default_ports(mut self, ports: Vec<u16>) -> Self {
        self.default_ports = ports;
        self
    }

    pub fn with_verify_chain(mut self, verify_chain: bool) -> Self {
        self.verify_chain = verify_chain;
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn expiry_warning(&self) -> chrono::Duration {
        chrono::Duration::days(self.expiry_warning_days)
    }
}
