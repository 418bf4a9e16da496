//! Server certificate checks for Gemini capsules.
//!
//! Gemini servers almost always present self-signed certificates, so there is
//! no chain to a trusted root. By default the end-entity certificate must be
//! inside its validity period and name the requested host. Insecure mode skips
//! both checks. Handshake signatures are verified in either mode.

use std::net::IpAddr;
use std::sync::Arc;

use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, CertificateError, DigitallySignedStruct, SignatureScheme};
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::time::ASN1Time;

#[derive(Debug)]
pub(crate) struct CapsuleCertVerifier {
    provider: Arc<CryptoProvider>,
    insecure: bool,
}

impl CapsuleCertVerifier {
    pub(crate) fn new(provider: Arc<CryptoProvider>, insecure: bool) -> Self {
        Self { provider, insecure }
    }
}

impl ServerCertVerifier for CapsuleCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.insecure {
            return Ok(ServerCertVerified::assertion());
        }
        let host = server_name.to_str();
        check_certificate(end_entity, &host, now).inspect_err(|e| {
            warn!(host = %host, error = %e, "server certificate rejected");
        })?;
        debug!(host = %host, "server certificate accepted");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn check_certificate(der: &CertificateDer<'_>, host: &str, now: UnixTime) -> Result<(), rustls::Error> {
    let (_, cert) = x509_parser::parse_x509_certificate(der.as_ref())
        .map_err(|_| rustls::Error::InvalidCertificate(CertificateError::BadEncoding))?;

    let now = i64::try_from(now.as_secs())
        .ok()
        .and_then(|secs| ASN1Time::from_timestamp(secs).ok())
        .ok_or(rustls::Error::InvalidCertificate(CertificateError::BadEncoding))?;
    let validity = cert.validity();
    if now < validity.not_before {
        return Err(rustls::Error::InvalidCertificate(CertificateError::NotValidYet));
    }
    if now > validity.not_after {
        return Err(rustls::Error::InvalidCertificate(CertificateError::Expired));
    }

    if names_host(&cert, host) {
        Ok(())
    } else {
        Err(rustls::Error::InvalidCertificate(CertificateError::NotValidForName))
    }
}

/// Subject alternative names win; the common name is only consulted when the
/// certificate carries none, which is common for hand-made capsule certificates.
fn names_host(cert: &X509Certificate<'_>, host: &str) -> bool {
    let host_ip = host.parse::<IpAddr>().ok();

    if let Ok(Some(san)) = cert.subject_alternative_name() {
        if !san.value.general_names.is_empty() {
            return san.value.general_names.iter().any(|name| match name {
                GeneralName::DNSName(dns) => host_ip.is_none() && dns_name_matches(dns, host),
                GeneralName::IPAddress(bytes) => host_ip.is_some_and(|ip| ip_matches(bytes, ip)),
                _ => false,
            });
        }
    }

    cert.subject()
        .iter_common_name()
        .filter_map(|cn| cn.as_str().ok())
        .any(|cn| match host_ip {
            Some(ip) => cn.parse::<IpAddr>().is_ok_and(|cn_ip| cn_ip == ip),
            None => dns_name_matches(cn, host),
        })
}

fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.');
    let host = host.trim_end_matches('.');
    match pattern.strip_prefix("*.") {
        // a wildcard covers exactly one leftmost label
        Some(suffix) => host
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest.eq_ignore_ascii_case(suffix)),
        None => pattern.eq_ignore_ascii_case(host),
    }
}

fn ip_matches(bytes: &[u8], ip: IpAddr) -> bool {
    match (ip, bytes.len()) {
        (IpAddr::V4(v4), 4) => v4.octets() == bytes,
        (IpAddr::V6(v6), 16) => v6.octets() == bytes,
        _ => false,
    }
}
