//! TLS contexts for pairing and STLS-upgraded sessions.
//!
//! Certificate verification is intentionally absent on both directions:
//! trust is rooted in the pairing step (the daemon remembers our public
//! key), not in PKI. The certificate exists only so the handshake can
//! complete with mutual-authentication semantics.

use super::identity::AdbIdentity;
use super::CryptoError;
use crate::error::AdbLinkError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, ServerConfig};
use std::sync::Arc;

/// RFC 5705 export label. The embedded NUL is part of the label.
pub const EXPORT_LABEL: &[u8] = b"adb-label\0";

/// Exported keying material length.
pub const EXPORT_LEN: usize = 64;

/// The identity's certificate and key in TLS form.
pub struct TlsIdentity {
    certificate: CertificateDer<'static>,
    key: PrivateKeyDer<'static>,
}

impl TlsIdentity {
    /// Wrap the signing identity in a self-signed X.509 certificate
    /// (CN=`00`, serial 1, fixed validity window).
    ///
    /// # Errors
    ///
    /// Returns `CertificateFailed` when the key cannot be loaded by the
    /// certificate generator.
    pub fn from_identity(identity: &AdbIdentity) -> Result<Self, CryptoError> {
        let key_pair = rcgen::KeyPair::try_from(identity.pkcs8_der())
            .map_err(|e| CryptoError::CertificateFailed(e.to_string()))?;

        let mut params = rcgen::CertificateParams::default();
        params.distinguished_name = rcgen::DistinguishedName::new();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, "00");
        params.serial_number = Some(rcgen::SerialNumber::from(1u64));
        params.not_before = rcgen::date_time_ymd(2024, 1, 1);
        params.not_after = rcgen::date_time_ymd(2049, 12, 31);

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| CryptoError::CertificateFailed(e.to_string()))?;

        Ok(Self {
            certificate: cert.der().clone(),
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(identity.pkcs8_der().to_vec())),
        })
    }

    /// The certificate in DER form.
    #[must_use]
    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.certificate
    }

    /// Client config presenting our certificate and accepting any peer.
    /// TLS 1.3 is preferred with a 1.2 fallback (rustls default ordering).
    ///
    /// # Errors
    ///
    /// Returns `CertificateFailed` when the key is rejected by the TLS
    /// stack.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>, CryptoError> {
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_client_auth_cert(vec![self.certificate.clone()], self.key.clone_key())
            .map_err(|e| CryptoError::CertificateFailed(e.to_string()))?;

        Ok(Arc::new(config))
    }

    /// Server config for in-crate mock daemons.
    ///
    /// # Errors
    ///
    /// Returns `CertificateFailed` when the key is rejected by the TLS
    /// stack.
    pub fn server_config(&self) -> Result<Arc<ServerConfig>, CryptoError> {
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![self.certificate.clone()], self.key.clone_key())
            .map_err(|e| CryptoError::CertificateFailed(e.to_string()))?;

        Ok(Arc::new(config))
    }
}

/// Export the pairing keying material from a completed handshake.
///
/// # Errors
///
/// Returns `TlsExport` when the stack refuses the export (e.g. TLS 1.2
/// without the extended-master-secret extension). Pairing is impossible in
/// that case.
pub fn export_keying_material<Data>(
    connection: &rustls::ConnectionCommon<Data>,
) -> Result<[u8; EXPORT_LEN], AdbLinkError> {
    connection
        .export_keying_material([0u8; EXPORT_LEN], EXPORT_LABEL, None)
        .map_err(|_| AdbLinkError::TlsExport)
}

/// Accepts any server certificate; see the module note on trust.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &rustls::crypto::ring::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
