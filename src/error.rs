use thiserror::Error;

/// Call-level failures. Anything that goes wrong on the network is reported
/// inside a [`crate::ProbeResult`] instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid range {cidr}: {reason}")]
    InvalidRange { cidr: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),
}

impl ProbeError {
    pub fn invalid_range(cidr: &str, reason: impl Into<String>) -> Self {
        ProbeError::InvalidRange {
            cidr: cidr.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
