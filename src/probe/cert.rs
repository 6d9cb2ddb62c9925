use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use sha1::{Digest, Sha1};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::der::parse_der;
use x509_parser::extensions::GeneralName;

use crate::config::{DEFAULT_DIAL_TIMEOUT_SECS, DEFAULT_HANDSHAKE_TIMEOUT_SECS};
use crate::hostname::is_valid_hostname;
use crate::status::{DEFAULT_EXPIRY_WARNING_DAYS, Status, classify_expiry, classify_io_error};
use crate::types::{CheckKind, ProbeResult, Started};

const PEM_LINE_WIDTH: usize = 64;
const DEFAULT_KEY_USAGE: &str = "digital signature";
const EXT_KEY_USAGE_OID: &str = "2.5.29.37";

/// Extended key usage OIDs and their labels.
const EXT_KEY_USAGES: &[(&str, &str)] = &[
    ("2.5.29.37.0", "any"),
    ("1.3.6.1.5.5.7.3.1", "server auth"),
    ("1.3.6.1.5.5.7.3.2", "client auth"),
    ("1.3.6.1.5.5.7.3.3", "code signing"),
    ("1.3.6.1.5.5.7.3.4", "email protection"),
    ("1.3.6.1.5.5.7.3.5", "IPS SEC system"),
    ("1.3.6.1.5.5.7.3.6", "IPS SEC tunnel"),
    ("1.3.6.1.5.5.7.3.7", "IPS SEC user"),
    ("1.3.6.1.5.5.7.3.8", "time stamping"),
    ("1.3.6.1.5.5.7.3.9", "OCSP signing"),
    ("1.3.6.1.4.1.311.10.3.3", "Microsoft server gated crypto"),
    ("2.16.840.1.113730.4.1", "Netscape server gated crypto"),
    ("1.3.6.1.4.1.311.2.1.22", "Microsoft commercial code signing"),
    ("1.3.6.1.4.1.311.61.1.1", "Microsoft kernel code signing"),
];

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("unparseable certificate: {0}")]
    Parse(String),

    #[error("certificate expiry {0} is out of range")]
    Validity(i64),
}

/// Fields lifted from a leaf certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDetails {
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    pub dns_names: Vec<String>,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    pub signature: String,
    pub public_key_fingerprint: String,
    pub key_usage: String,
    pub ext_key_usages: Vec<String>,
    pub encoded_pem: String,
}

impl CertificateDetails {
    pub fn from_der(der: &[u8]) -> Result<Self, HarvestError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der).map_err(|e| HarvestError::Parse(e.to_string()))?;

        let not_after_ts = cert.validity().not_after.timestamp();
        let not_after = DateTime::from_timestamp(not_after_ts, 0).ok_or(HarvestError::Validity(not_after_ts))?;

        Ok(Self {
            issuer: issuer_name(&cert),
            not_after,
            dns_names: dns_names(&cert),
            signature_algorithm: signature_algorithm_name(&cert.signature_algorithm.algorithm.to_id_string()),
            public_key_algorithm: public_key_algorithm_name(&cert.public_key().algorithm.algorithm.to_id_string()),
            signature: sha1_hex(&cert.signature_value.data),
            public_key_fingerprint: sha1_hex(cert.public_key().raw),
            key_usage: key_usage_label(&cert),
            ext_key_usages: ext_key_usage_labels(&cert),
            encoded_pem: encode_pem(der),
        })
    }
}

fn issuer_name(cert: &X509Certificate<'_>) -> String {
    let issuer = cert.issuer();
    issuer
        .iter_organization()
        .find_map(|attr| attr.as_str().ok())
        .or_else(|| issuer.iter_common_name().find_map(|attr| attr.as_str().ok()))
        .map(str::to_string)
        .unwrap_or_else(|| issuer.to_string())
}

/// Subject CN followed by the SAN DNS names, keeping only host-like names.
/// A CN repeated in the SANs is listed twice.
fn dns_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if is_valid_hostname(name) {
            names.push(name.to_string());
        }
    };

    if let Some(cn) = cert.subject().iter_common_name().find_map(|attr| attr.as_str().ok()) {
        push(cn);
    }

    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                push(dns);
            }
        }
    }

    names
}

pub fn signature_algorithm_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.2" => "MD2-RSA",
        "1.2.840.113549.1.1.4" => "MD5-RSA",
        "1.2.840.113549.1.1.5" => "SHA1-RSA",
        "1.2.840.113549.1.1.11" => "SHA256-RSA",
        "1.2.840.113549.1.1.12" => "SHA384-RSA",
        "1.2.840.113549.1.1.13" => "SHA512-RSA",
        "1.2.840.113549.1.1.10" => "RSA-PSS",
        "1.2.840.10040.4.3" => "DSA-SHA1",
        "2.16.840.1.101.3.4.3.2" => "DSA-SHA256",
        "1.2.840.10045.4.1" => "ECDSA-SHA1",
        "1.2.840.10045.4.3.2" => "ECDSA-SHA256",
        "1.2.840.10045.4.3.3" => "ECDSA-SHA384",
        "1.2.840.10045.4.3.4" => "ECDSA-SHA512",
        "1.3.101.112" => "Ed25519",
        other => return other.to_string(),
    };
    name.to_string()
}

pub fn public_key_algorithm_name(oid: &str) -> String {
    match oid {
        "1.2.840.113549.1.1.1" => "RSA",
        "1.2.840.10040.4.1" => "DSA",
        "1.2.840.10045.2.1" => "ECDSA",
        "1.3.101.112" => "Ed25519",
        _ => "unknown",
    }
    .to_string()
}

/// Label of the first key usage bit set, in priority order.
fn key_usage_label(cert: &X509Certificate<'_>) -> String {
    let Ok(Some(ext)) = cert.key_usage() else {
        return DEFAULT_KEY_USAGE.to_string();
    };
    let usage = ext.value;
    let bits = [
        (usage.digital_signature(), "digital signature"),
        (usage.non_repudiation(), "content commitment"),
        (usage.key_encipherment(), "key encipherment"),
        (usage.data_encipherment(), "data encipherment"),
        (usage.key_agreement(), "key agreement"),
        (usage.key_cert_sign(), "certificate sign"),
        (usage.crl_sign(), "CRL sign"),
        (usage.encipher_only(), "encipher only"),
        (usage.decipher_only(), "decipher only"),
    ];
    bits.iter()
        .find(|(set, _)| *set)
        .map_or(DEFAULT_KEY_USAGE, |(_, label)| label)
        .to_string()
}

fn ext_key_usage_labels(cert: &X509Certificate<'_>) -> Vec<String> {
    ext_key_usage_labels_for(&ext_key_usage_oids(cert))
}

/// EKU OIDs in the order the certificate lists them.
fn ext_key_usage_oids(cert: &X509Certificate<'_>) -> Vec<String> {
    let Some(ext) = cert.extensions().iter().find(|ext| ext.oid.to_id_string() == EXT_KEY_USAGE_OID) else {
        return Vec::new();
    };
    let Ok((_, usages)) = parse_der(ext.value) else {
        log::debug!("[probe::cert] eku_unparseable: len={}", ext.value.len());
        return Vec::new();
    };
    let Ok(items) = usages.as_sequence() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.as_oid().ok())
        .map(|oid| oid.to_id_string())
        .collect()
}

/// One label per EKU OID, in the given order. Unknown OIDs map to "".
pub fn ext_key_usage_labels_for(oids: &[String]) -> Vec<String> {
    oids.iter()
        .map(|oid| {
            EXT_KEY_USAGES
                .iter()
                .find(|(known, _)| known == oid)
                .map_or("", |(_, label)| label)
                .to_string()
        })
        .collect()
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

pub fn encode_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        pem.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// Accepts any certificate so the chain can be harvested, optionally
/// recording what webpki thought of it.
#[derive(Debug)]
struct HarvestingVerifier {
    provider: Arc<CryptoProvider>,
    chain: Option<Arc<WebPkiServerVerifier>>,
    verdict: Mutex<Option<rustls::Error>>,
}

impl HarvestingVerifier {
    fn new(provider: Arc<CryptoProvider>, chain: Option<Arc<WebPkiServerVerifier>>) -> Self {
        Self {
            provider,
            chain,
            verdict: Mutex::new(None),
        }
    }

    fn take_verdict(&self) -> Option<rustls::Error> {
        self.verdict.lock().ok().and_then(|mut verdict| verdict.take())
    }
}

impl ServerCertVerifier for HarvestingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Some(chain) = &self.chain {
            if let Err(e) = chain.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now) {
                log::debug!("[probe::cert] chain_rejected: server={:?} error={}", server_name, e);
                if let Ok(mut verdict) = self.verdict.lock() {
                    *verdict = Some(e);
                }
            }
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

struct Session {
    peer: SocketAddr,
    leaf: CertificateDer<'static>,
    verdict: Option<rustls::Error>,
}

/// TLS handshake plus certificate harvest for one host.
#[derive(Debug, Clone)]
pub struct CertificateInspector {
    dial_timeout: Duration,
    handshake_timeout: Duration,
    expiry_warning: chrono::Duration,
    verify_chain: bool,
    provider: Arc<CryptoProvider>,
    roots: Arc<RootCertStore>,
    target: String,
}

impl Default for CertificateInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateInspector {
    pub fn new() -> Self {
        log::debug!("[probe::cert] new: dial_timeout={}s handshake_timeout={}s",
            DEFAULT_DIAL_TIMEOUT_SECS, DEFAULT_HANDSHAKE_TIMEOUT_SECS);
        Self {
            dial_timeout: Duration::from_secs(DEFAULT_DIAL_TIMEOUT_SECS),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            expiry_warning: chrono::Duration::days(DEFAULT_EXPIRY_WARNING_DAYS),
            verify_chain: false,
            provider: Arc::new(rustls::crypto::ring::default_provider()),
            roots: Arc::new(RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned())),
            target: String::new(),
        }
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_expiry_warning(mut self, warning: chrono::Duration) -> Self {
        self.expiry_warning = warning;
        self
    }

    pub fn with_verify_chain(mut self, verify_chain: bool) -> Self {
        self.verify_chain = verify_chain;
        self
    }

    /// Replaces the trust anchors used when `verify_chain` is on.
    pub fn with_roots(mut self, roots: RootCertStore) -> Self {
        self.roots = Arc::new(roots);
        self
    }

    /// Target text stamped on every result.
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub async fn inspect(&self, host: &str, port: u16) -> ProbeResult {
        log::debug!("[probe::cert] inspect: host={} port={} verify_chain={}", host, port, self.verify_chain);
        let started = Started::now();
        let target = if self.target.is_empty() { host.to_string() } else { self.target.clone() };

        let result = match timeout(self.handshake_timeout, self.handshake(host, port)).await {
            Ok(Ok(session)) => self.harvest(target, &started, session, port),
            Ok(Err(e)) => {
                let status = classify_io_error(&e);
                log::debug!("[probe::cert] handshake_failed: host={} port={} status={} error={}", host, port, status, e);
                ProbeResult::failed(target, CheckKind::Certificate, &started, status, format!("tls handshake with {host}:{port}: {e}"))
                    .at(None, Some(port))
            }
            Err(_) => {
                log::debug!("[probe::cert] handshake_timeout: host={} port={} timeout={}ms", host, port, self.handshake_timeout.as_millis());
                ProbeResult::failed(
                    target,
                    CheckKind::Certificate,
                    &started,
                    Status::Unresponsive,
                    format!("tls handshake with {host}:{port}: timed out after {}ms", self.handshake_timeout.as_millis()),
                )
                .at(None, Some(port))
            }
        };

        log::trace!("[probe::cert] inspect_completed: host={} status={} latency={}ms",
            host, result.status, result.latency_millis);
        result
    }

    fn chain_verifier(&self) -> Option<Arc<WebPkiServerVerifier>> {
        if !self.verify_chain {
            return None;
        }
        match WebPkiServerVerifier::builder_with_provider(self.roots.clone(), self.provider.clone()).build() {
            Ok(verifier) => Some(verifier),
            Err(e) => {
                log::warn!("[probe::cert] chain_verifier_unavailable: error={}", e);
                None
            }
        }
    }

    async fn handshake(&self, host: &str, port: u16) -> io::Result<Session> {
        let verifier = Arc::new(HarvestingVerifier::new(self.provider.clone(), self.chain_verifier()));
        let config = ClientConfig::builder_with_provider(self.provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(io::Error::other)?
            .dangerous()
            .with_custom_certificate_verifier(verifier.clone())
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let socket = match timeout(self.dial_timeout, TcpStream::connect((host, port))).await {
            Ok(socket) => socket?,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {}ms", self.dial_timeout.as_millis()),
                ));
            }
        };
        let peer = socket.peer_addr()?;

        let stream = connector.connect(server_name, socket).await?;
        let leaf = stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, rustls::Error::NoCertificatesPresented))?;

        Ok(Session {
            peer,
            leaf,
            verdict: verifier.take_verdict(),
        })
    }

    fn harvest(&self, target: String, started: &Started, session: Session, port: u16) -> ProbeResult {
        let peer_ip = Some(session.peer.ip());
        let details = match CertificateDetails::from_der(session.leaf.as_ref()) {
            Ok(details) => details,
            Err(e) => {
                log::warn!("[probe::cert] harvest_failed: peer={} error={}", session.peer, e);
                return ProbeResult::failed(target, CheckKind::Certificate, started, Status::Invalid, format!("certificate from {}: {e}", session.peer))
                    .at(peer_ip, Some(port));
            }
        };

        let mut result = ProbeResult::new(target, CheckKind::Certificate, started).at(peer_ip, Some(port));
        result.status = classify_expiry(details.not_after, self.expiry_warning);
        if result.status != Status::Expired {
            if let Some(verdict) = session.verdict {
                result.status = Status::Invalid;
                result.error = Some(format!("tls: failed to verify certificate: {verdict}"));
            }
        }

        result.issuer = details.issuer;
        result.expires = Some(details.not_after);
        result.signature_algorithm = details.signature_algorithm;
        result.public_key_algorithm = details.public_key_algorithm;
        result.signature = details.signature;
        result.public_key_fingerprint = details.public_key_fingerprint;
        result.dns_names = details.dns_names.join(", ");
        result.key_usage = details.key_usage;
        result.ext_key_usages = details.ext_key_usages;
        result.encoded_pem = details.encoded_pem;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose};
    use rustls::ServerConfig;
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    struct TestCert {
        der: CertificateDer<'static>,
        key: Vec<u8>,
    }

    fn self_signed(names: &[&str]) -> TestCert {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let certified = rcgen::generate_simple_self_signed(names).expect("generate cert");
        TestCert {
            der: certified.cert.der().clone(),
            key: certified.key_pair.serialize_der(),
        }
    }

    fn with_usages() -> TestCert {
        let mut params = CertificateParams::new(vec!["probe.test".to_string()]).expect("params");
        params.key_usages = vec![KeyUsagePurpose::KeyEncipherment, KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth, ExtendedKeyUsagePurpose::ServerAuth];
        let key = KeyPair::generate().expect("key");
        let cert = params.self_signed(&key).expect("self sign");
        TestCert {
            der: cert.der().clone(),
            key: key.serialize_der(),
        }
    }

    /// Serves one TLS handshake on 127.0.0.1 and returns the port.
    async fn serve_once(cert: &TestCert) -> u16 {
        let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![cert.der.clone()],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.key.clone())),
            )
            .expect("server config");
        let acceptor = TlsAcceptor::from(Arc::new(config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut tls) = acceptor.accept(stream).await {
                    let _ = tls.shutdown().await;
                }
            }
        });
        port
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(sha1_hex(b"").len(), 40);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(signature_algorithm_name("1.2.840.113549.1.1.11"), "SHA256-RSA");
        assert_eq!(signature_algorithm_name("1.2.840.10045.4.3.2"), "ECDSA-SHA256");
        assert_eq!(signature_algorithm_name("1.2.3.4"), "1.2.3.4");
        assert_eq!(public_key_algorithm_name("1.2.840.10045.2.1"), "ECDSA");
        assert_eq!(public_key_algorithm_name("1.2.840.113549.1.1.1"), "RSA");
        assert_eq!(public_key_algorithm_name("1.2.3.4"), "unknown");
    }

    #[test]
    fn test_ext_key_usage_table() {
        let oids = vec![
            "1.3.6.1.5.5.7.3.2".to_string(),
            "1.2.3.4.5".to_string(),
            "1.3.6.1.5.5.7.3.1".to_string(),
            "1.3.6.1.5.5.7.3.6".to_string(),
        ];
        assert_eq!(
            ext_key_usage_labels_for(&oids),
            vec!["client auth", "", "server auth", "IPS SEC tunnel"]
        );
        assert!(ext_key_usage_labels_for(&[]).is_empty());
    }

    #[test]
    fn test_pem_round_trips_through_pemfile() {
        let cert = self_signed(&["probe.test"]);
        let pem = encode_pem(cert.der.as_ref());
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        assert!(pem.lines().all(|line| line.len() <= PEM_LINE_WIDTH));

        let parsed: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem.as_bytes())
            .collect::<Result<_, _>>()
            .expect("pem parses");
        assert_eq!(parsed, vec![cert.der.clone()]);
    }

    #[test]
    fn test_details_from_self_signed() {
        let cert = self_signed(&["probe.test", "www.probe.test", "localhost", "*.probe.test"]);
        let details = CertificateDetails::from_der(cert.der.as_ref()).unwrap();

        // rcgen's default CN has spaces and single-label/wildcard SANs are dropped
        assert_eq!(details.dns_names, vec!["probe.test", "www.probe.test"]);
        assert_eq!(details.public_key_algorithm, "ECDSA");
        assert_eq!(details.signature_algorithm, "ECDSA-SHA256");
        assert_eq!(details.signature.len(), 40);
        assert_eq!(details.public_key_fingerprint.len(), 40);
        assert_ne!(details.signature, details.public_key_fingerprint);
        assert_eq!(details.key_usage, DEFAULT_KEY_USAGE);
        assert!(details.ext_key_usages.is_empty());
        assert!(details.not_after > Utc::now());
    }

    #[test]
    fn test_details_key_usages() {
        let cert = with_usages();
        let details = CertificateDetails::from_der(cert.der.as_ref()).unwrap();
        assert_eq!(details.key_usage, "digital signature");
        // certificate order, not table order
        assert_eq!(details.ext_key_usages, vec!["client auth", "server auth"]);
    }

    #[test]
    fn test_details_keep_cn_repeated_in_sans() {
        let mut params = CertificateParams::new(vec!["probe.test".to_string(), "www.probe.test".to_string()]).expect("params");
        params.distinguished_name.push(DnType::CommonName, "probe.test");
        let key = KeyPair::generate().expect("key");
        let cert = params.self_signed(&key).expect("self sign");

        let details = CertificateDetails::from_der(cert.der().as_ref()).unwrap();
        assert_eq!(details.dns_names, vec!["probe.test", "probe.test", "www.probe.test"]);
    }

    #[test]
    fn test_signature_fingerprint_is_stable() {
        let cert = self_signed(&["probe.test"]);
        let first = CertificateDetails::from_der(cert.der.as_ref()).unwrap();
        let second = CertificateDetails::from_der(cert.der.as_ref()).unwrap();
        assert_eq!(first.signature, second.signature);

        let other = self_signed(&["probe.test"]);
        let third = CertificateDetails::from_der(other.der.as_ref()).unwrap();
        assert_ne!(first.signature, third.signature);
    }

    #[test]
    fn test_garbage_der_is_an_error() {
        assert!(matches!(CertificateDetails::from_der(b"not a certificate"), Err(HarvestError::Parse(_))));
        assert!(matches!(CertificateDetails::from_der(&[0x30, 0x00]), Err(HarvestError::Parse(_))));
        assert!(matches!(CertificateDetails::from_der(&[]), Err(HarvestError::Parse(_))));
    }

    #[tokio::test]
    async fn test_inspect_local_server() {
        let cert = self_signed(&["probe.test"]);
        let port = serve_once(&cert).await;

        let inspector = CertificateInspector::new().with_handshake_timeout(Duration::from_secs(5));
        let result = inspector.inspect("127.0.0.1", port).await;

        assert_eq!(result.status, Status::Healthy, "error: {:?}", result.error);
        assert_eq!(result.check, CheckKind::Certificate);
        assert_eq!(result.dns_names, "probe.test");
        assert_eq!(result.server_ip, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(result.port, Some(port));
        assert_eq!(result.encoded_pem, encode_pem(cert.der.as_ref()));
        assert!(result.expires.is_some());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_inspect_with_chain_verification_marks_invalid() {
        let cert = self_signed(&["probe.test"]);
        let port = serve_once(&cert).await;

        let inspector = CertificateInspector::new()
            .with_handshake_timeout(Duration::from_secs(5))
            .with_verify_chain(true);
        let result = inspector.inspect("127.0.0.1", port).await;

        assert_eq!(result.status, Status::Invalid);
        assert!(result.error.as_deref().unwrap_or_default().contains("failed to verify"));
        // fields are still harvested
        assert_eq!(result.dns_names, "probe.test");
    }

    #[tokio::test]
    async fn test_inspect_expiry_window() {
        let cert = self_signed(&["probe.test"]);
        let port = serve_once(&cert).await;

        // rcgen certificates are valid until 4096, so a huge window flags them
        let inspector = CertificateInspector::new()
            .with_handshake_timeout(Duration::from_secs(5))
            .with_expiry_warning(chrono::Duration::days(365 * 5000));
        let result = inspector.inspect("127.0.0.1", port).await;
        assert_eq!(result.status, Status::ExpiresSoon);
    }

    #[tokio::test]
    async fn test_inspect_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = CertificateInspector::new().inspect("127.0.0.1", port).await;
        assert_eq!(result.status, Status::Offline);
        assert!(result.error.is_some());
        assert!(result.dns_names.is_empty());
        assert!(result.expires.is_none());
    }

    #[tokio::test]
    async fn test_inspect_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hold = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = CertificateInspector::new()
            .with_handshake_timeout(Duration::from_millis(200))
            .inspect("127.0.0.1", port)
            .await;
        assert_eq!(result.status, Status::Unresponsive);
        assert!(result.error.as_deref().unwrap_or_default().contains("timed out"));
        hold.abort();
    }

    #[tokio::test]
    #[ignore = "requires internet access"]
    async fn test_inspect_example_com() {
        let result = CertificateInspector::new().with_verify_chain(true).inspect("example.com", 443).await;
        assert_eq!(result.status, Status::Healthy);
        assert!(!result.dns_names.is_empty());
        assert!(!result.issuer.is_empty());
    }
}
