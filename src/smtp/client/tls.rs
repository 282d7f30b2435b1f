use std::{
    fmt::{self, Debug, Display},
    sync::Arc,
};

use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider},
    pki_types::{self, UnixTime},
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use x509_parser::{extensions::GeneralName, prelude::parse_x509_certificate};

use crate::smtp::error::{self, Error};

/// How to apply TLS to a client connection
#[derive(Clone)]
#[allow(missing_copy_implementations)]
pub enum Tls {
    /// Insecure (plaintext) connection only.
    ///
    /// Credentials and message travel in clear, only use it for trusted
    /// local relays such as a MailHog instance.
    None,
    /// Begin with a plaintext connection and require `STARTTLS` for security.
    ///
    /// The connection fails before any credential is sent when the server
    /// does not advertise `STARTTLS`.
    Required(TlsParameters),
    /// Use TLS from the first byte (implicit TLS, usually on port 465)
    Wrapper(TlsParameters),
}

impl Debug for Tls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            Self::None => f.pad("None"),
            Self::Required(_) => f.pad("Required"),
            Self::Wrapper(_) => f.pad("Wrapper"),
        }
    }
}

/// Parameters to use for secure clients
#[derive(Clone)]
pub struct TlsParameters {
    pub(super) connector: Arc<ClientConfig>,
    pub(super) server_name: pki_types::ServerName<'static>,
    domain: String,
}

/// Builder for `TlsParameters`
#[derive(Debug, Clone)]
pub struct TlsParametersBuilder {
    domain: String,
    accept_invalid_certs: bool,
}

impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            accept_invalid_certs: false,
        }
    }

    /// Controls whether certificates with an invalid chain, an expired
    /// validity window or a mismatching host name are accepted
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// You should think very carefully before using this method.
    /// Any certificate, including a forged one, will be trusted for use.
    pub fn dangerous_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Creates a new `TlsParameters` using rustls with the provided configuration
    pub fn build(self) -> Result<TlsParameters, Error> {
        let crypto_provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = ClientConfig::builder_with_provider(Arc::clone(&crypto_provider))
            .with_protocol_versions(rustls::ALL_VERSIONS)
            .map_err(error::tls)?;

        let tls = if self.accept_invalid_certs {
            tls.dangerous()
                .with_custom_certificate_verifier(Arc::new(InvalidCertsVerifier { crypto_provider }))
        } else {
            tls.with_root_certificates(root_cert_store())
        };

        let server_name = pki_types::ServerName::try_from(self.domain.as_str())
            .map_err(error::tls)?
            .to_owned();

        Ok(TlsParameters {
            connector: Arc::new(tls.with_no_client_auth()),
            server_name,
            domain: self.domain,
        })
    }
}

impl TlsParameters {
    /// Creates a new `TlsParameters` using the default options
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// The name the server certificate is checked against, also sent as SNI
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Platform roots, or the bundled Mozilla roots when none could be loaded
fn root_cert_store() -> RootCertStore {
    let mut root_cert_store = RootCertStore::empty();

    let rustls_native_certs::CertificateResult { certs, errors, .. } =
        rustls_native_certs::load_native_certs();
    let errors_len = errors.len();

    let (added, ignored) = root_cert_store.add_parsable_certificates(certs);
    tracing::debug!(
        "loaded platform certs with {errors_len} failing to load, {added} valid and {ignored} ignored (invalid) certs"
    );

    if root_cert_store.is_empty() {
        tracing::debug!("no platform certs available, using bundled webpki roots");
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    root_cert_store
}

/// Accepts any server certificate while still checking handshake signatures
#[derive(Debug)]
struct InvalidCertsVerifier {
    crypto_provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InvalidCertsVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &pki_types::CertificateDer<'_>,
        _intermediates: &[pki_types::CertificateDer<'_>],
        _server_name: &pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &pki_types::CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.crypto_provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &pki_types::CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.crypto_provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.crypto_provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Negotiated parameters of an established TLS session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInfo {
    /// Protocol version, e.g. `TLSv1_3`
    pub protocol: Option<String>,
    /// Cipher suite, e.g. `TLS13_AES_256_GCM_SHA384`
    pub cipher_suite: Option<String>,
    /// Name sent as SNI and verified against the certificate
    pub server_name: String,
    /// Leaf certificate presented by the server
    pub peer_certificate: Option<CertificateInfo>,
}

impl TlsInfo {
    pub(super) fn from_connection(connection: &ClientConnection, server_name: &str) -> Self {
        TlsInfo {
            protocol: connection.protocol_version().map(|v| format!("{v:?}")),
            cipher_suite: connection
                .negotiated_cipher_suite()
                .map(|s| format!("{:?}", s.suite())),
            server_name: server_name.to_owned(),
            peer_certificate: connection
                .peer_certificates()
                .and_then(|chain| chain.first())
                .and_then(|leaf| CertificateInfo::from_der(leaf.as_ref())),
        }
    }
}

impl Display for TlsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "protocol={} cipher={} sni={}",
            self.protocol.as_deref().unwrap_or("unknown"),
            self.cipher_suite.as_deref().unwrap_or("unknown"),
            self.server_name
        )?;
        if let Some(cert) = &self.peer_certificate {
            write!(f, " {cert}")?;
        }
        Ok(())
    }
}

/// The parts of an X.509 certificate worth showing to an operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Start of the validity window (RFC 2822)
    pub not_before: String,
    /// End of the validity window (RFC 2822)
    pub not_after: String,
    /// DNS entries of the subject alternative name extension
    pub dns_names: Vec<String>,
}

impl CertificateInfo {
    /// Parses a DER encoded certificate, `None` if it can't be read
    pub fn from_der(der: &[u8]) -> Option<Self> {
        let (_, cert) = parse_x509_certificate(der).ok()?;
        let validity = cert.validity();

        let dns_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_owned()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Some(CertificateInfo {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before: validity
                .not_before
                .to_rfc2822()
                .unwrap_or_else(|_| validity.not_before.to_string()),
            not_after: validity
                .not_after
                .to_rfc2822()
                .unwrap_or_else(|_| validity.not_after.to_string()),
            dns_names,
        })
    }
}

impl Display for CertificateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subject=\"{}\" issuer=\"{}\" not_before=\"{}\" not_after=\"{}\" dns=[{}]",
            self.subject,
            self.issuer,
            self.not_before,
            self.not_after,
            self.dns_names.join(", ")
        )
    }
}
