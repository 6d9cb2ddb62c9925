use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Certificates closer than this to `NotAfter` are reported as expiring.
pub const DEFAULT_EXPIRY_WARNING_DAYS: i64 = 14;

/// Health of a probed domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    #[serde(rename = "expires")]
    ExpiresSoon,
    Expired,
    /// Certificate could not be verified or parsed.
    Invalid,
    /// Connection refused.
    Offline,
    /// Timed out or cancelled.
    Unresponsive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::ExpiresSoon => "expires",
            Status::Expired => "expired",
            Status::Invalid => "invalid",
            Status::Offline => "offline",
            Status::Unresponsive => "unresponsive",
        }
    }

    /// Statuses that always travel with an error message.
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Invalid | Status::Offline | Status::Unresponsive)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a certificate by how long it has left.
pub fn classify_expiry(not_after: DateTime<Utc>, warning: ChronoDuration) -> Status {
    classify_expiry_at(not_after, Utc::now(), warning)
}

pub fn classify_expiry_at(not_after: DateTime<Utc>, now: DateTime<Utc>, warning: ChronoDuration) -> Status {
    if not_after < now {
        Status::Expired
    } else if not_after - now < warning {
        Status::ExpiresSoon
    } else {
        Status::Healthy
    }
}

/// Classifies a failed dial or handshake.
///
/// The error kind and any wrapped `rustls::Error` are consulted first; the
/// message text is only a fallback for errors that carry neither.
pub fn classify_io_error(err: &io::Error) -> Status {
    if let Some(tls) = err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        return classify_tls_error(tls);
    }

    match err.kind() {
        io::ErrorKind::ConnectionRefused => Status::Offline,
        io::ErrorKind::TimedOut => Status::Unresponsive,
        _ => classify_message(&err.to_string()),
    }
}

pub fn classify_tls_error(err: &rustls::Error) -> Status {
    match err {
        rustls::Error::InvalidCertificate(_) | rustls::Error::NoCertificatesPresented => Status::Invalid,
        other => classify_message(&other.to_string()),
    }
}

/// Text matching for errors that arrive without a usable type.
pub fn classify_message(message: &str) -> Status {
    let lower = message.to_ascii_lowercase();
    if lower.contains("failed to verify") || lower.contains("invalid peer certificate") {
        Status::Invalid
    } else if lower.contains("connection refused") {
        Status::Offline
    } else {
        Status::Unresponsive
    }
}
