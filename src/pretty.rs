use chrono::{DateTime, Utc};

use crate::status::Status;
use crate::types::{CheckKind, ProbeResult};

const DAYS_PER_YEAR: i64 = 365;
const SEPARATOR_WIDTH: usize = 80;

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Healthy => "✅",
        Status::ExpiresSoon => "⚠️",
        Status::Expired => "⛔",
        Status::Invalid => "❌",
        Status::Offline => "🔌",
        Status::Unresponsive => "⏳",
    }
}

fn check_label(check: CheckKind) -> &'static str {
    match check {
        CheckKind::Certificate => "CERT",
        CheckKind::Reachability => "REACH",
        CheckKind::Probe => "PROBE",
    }
}

/// "in 3d", "in 2yr", "5d ago".
pub fn format_expiry(expires: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (expires - now).num_days();
    let span = |d: i64| {
        if d < DAYS_PER_YEAR {
            format!("{}d", d)
        } else {
            format!("{}yr", d / DAYS_PER_YEAR)
        }
    };
    if days < 0 { format!("{} ago", span(-days)) } else { format!("in {}", span(days)) }
}

/// One-line summary of a result, without the trailing detail lines.
pub fn format_summary(result: &ProbeResult) -> String {
    let mut line = format!("{} {} {}", status_icon(result.status), check_label(result.check), result.status);

    match (result.server_ip, result.port) {
        (Some(ip), Some(port)) => line.push_str(&format!(" {}", std::net::SocketAddr::new(ip, port))),
        (None, Some(port)) => line.push_str(&format!(" :{}", port)),
        _ => {}
    }

    if let Some(expires) = result.expires {
        line.push_str(&format!(", expires {} ({})", expires.format("%Y-%m-%d"), format_expiry(expires, Utc::now())));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" - {}", error));
    }

    line.push_str(&format!(" ({}ms)", result.latency_millis));
    line
}

pub fn print_result(result: &ProbeResult) {
    println!("{}", format_summary(result));

    if result.check != CheckKind::Certificate || result.expires.is_none() {
        return;
    }
    if !result.issuer.is_empty() {
        println!("  ├─ Issuer: {}", result.issuer);
    }
    if !result.dns_names.is_empty() {
        println!("  ├─ Names: {}", result.dns_names);
    }
    println!("  ├─ Key: {} ({})", result.public_key_algorithm, result.key_usage);
    if !result.ext_key_usages.is_empty() {
        println!("  ├─ Extended usage: {}", result.ext_key_usages.join(", "));
    }
    println!("  ├─ Signature: {} {}", result.signature_algorithm, result.signature);
    println!("  └─ Public key SHA-1: {}", result.public_key_fingerprint);
}

pub fn print_separator() {
    println!("{}", "─".repeat(SEPARATOR_WIDTH));
}

pub fn print_header(target: &str) {
    println!("🎯 Probing: {}", target);
    print_separator();
}

pub fn print_tally(results: &[ProbeResult]) {
    print_separator();
    let healthy = results.iter().filter(|r| r.is_healthy()).count();
    println!("{} results, {} healthy, {} not", results.len(), healthy, results.len() - healthy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Started;
    use chrono::Duration;

    #[test]
    fn test_format_expiry() {
        let now = Utc::now();
        assert_eq!(format_expiry(now + Duration::days(3) + Duration::hours(1), now), "in 3d");
        assert_eq!(format_expiry(now + Duration::days(800), now), "in 2yr");
        assert_eq!(format_expiry(now - Duration::days(5) - Duration::hours(1), now), "5d ago");
    }

    #[test]
    fn test_summary_for_failure() {
        let started = Started::now();
        let result = ProbeResult::failed("10.0.0.0/30", CheckKind::Reachability, &started, Status::Offline, "refused")
            .at(Some("10.0.0.1".parse().unwrap()), Some(443));
        let line = format_summary(&result);
        assert!(line.contains("REACH offline 10.0.0.1:443"));
        assert!(line.contains(" - refused"));
    }

    #[test]
    fn test_summary_for_certificate() {
        let started = Started::now();
        let mut result = ProbeResult::new("example.com", CheckKind::Certificate, &started).at(None, Some(443));
        result.expires = Some(Utc::now() + Duration::days(40));
        let line = format_summary(&result);
        assert!(line.starts_with("✅ CERT healthy :443, expires "));
        assert!(!line.contains(" - "));
    }
}
