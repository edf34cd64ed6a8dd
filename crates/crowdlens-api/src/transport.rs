// Shared transport configuration for building reqwest::Client instances
// and the rustls connector used by the push WebSocket.
//
// The REST client, the long-polling push fallback, and the WebSocket
// transport share TLS and timeout settings through this module.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_tungstenite::Connector;

use crate::error::Error;

const USER_AGENT: &str = concat!("crowdlens/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for both REST and push connections.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed development backends).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a client for long-poll requests.
    ///
    /// A poll is held open by the server until it has packets or a ping is
    /// due, so the request timeout must outlast the server's ping cycle.
    pub fn build_polling_client(&self, hold: Duration) -> Result<reqwest::Client, Error> {
        self.builder()?
            .timeout(self.timeout.max(hold))
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Connector for `wss://` push sessions.
    ///
    /// `None` means tokio-tungstenite's default (bundled webpki roots).
    pub fn websocket_connector(&self) -> Result<Option<Connector>, Error> {
        let config = match &self.tls {
            TlsMode::System => return Ok(None),
            TlsMode::CustomCa(path) => {
                let mut roots = RootCertStore::empty();
                for cert in read_ca_certs(path)? {
                    roots
                        .add(cert)
                        .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                }
                tls_builder()?
                    .with_root_certificates(roots)
                    .with_no_client_auth()
            }
            TlsMode::DangerAcceptInvalid => tls_builder()?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(crypto_provider())))
                .with_no_client_auth(),
        };
        Ok(Some(Connector::Rustls(Arc::new(config))))
    }

    fn builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}

// ── rustls plumbing ──────────────────────────────────────────────────

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
}

fn tls_builder() -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, Error> {
    ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("failed to build TLS config: {e}")))
}

fn read_ca_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let pem =
        std::fs::read(path).map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
    let certs = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
    if certs.is_empty() {
        return Err(Error::Tls(format!(
            "invalid CA cert: no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Skips chain and hostname checks but still verifies handshake signatures.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
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
            &self.0.signature_verification_algorithms,
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
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
