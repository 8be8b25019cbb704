use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::errors::{ContainerResult, TlsError};

/// Subject alternative names of generated certificates
pub const GENERATED_CERTIFICATE_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// Self-signed certificate and key, both PEM encoded
#[derive(Debug, Clone)]
pub struct GeneratedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

/// Generate a self-signed certificate valid for the docker host as seen from tests
pub fn generate_self_signed() -> Result<GeneratedCertificate, TlsError> {
    let names = GENERATED_CERTIFICATE_NAMES
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>();

    let certificate =
        rcgen::generate_simple_self_signed(names).map_err(|e| TlsError::Generation {
            reason: e.to_string(),
        })?;

    let certificate_pem = certificate
        .serialize_pem()
        .map_err(|e| TlsError::Generation {
            reason: e.to_string(),
        })?;

    Ok(GeneratedCertificate {
        certificate_pem,
        private_key_pem: certificate.serialize_private_key_pem(),
    })
}

/// Material the admin client uses to trust the server certificate
#[derive(Debug, Clone)]
pub enum ServerTrust {
    /// One or more PEM certificates
    Pem { source: PathBuf, pem: Vec<u8> },
    /// A PKCS#12 keystore; every certificate bag becomes a root
    Pkcs12 {
        source: PathBuf,
        der: Vec<u8>,
        password: String,
    },
}

impl ServerTrust {
    pub fn source(&self) -> &Path {
        match self {
            ServerTrust::Pem { source, .. } | ServerTrust::Pkcs12 { source, .. } => source,
        }
    }

    /// DER encoded certificates contained in the trust material
    pub fn certificate_ders(&self) -> Result<Vec<Vec<u8>>, TlsError> {
        match self {
            ServerTrust::Pem { source, pem } => pem_certificates(source, pem),
            ServerTrust::Pkcs12 {
                source,
                der,
                password,
            } => pkcs12_certificates(source, der, password),
        }
    }

    pub fn root_certificates(&self) -> Result<Vec<reqwest::Certificate>, TlsError> {
        self.certificate_ders()?
            .iter()
            .map(|der| {
                reqwest::Certificate::from_der(der).map_err(|e| TlsError::InvalidCertificate {
                    path: self.source().to_path_buf(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

fn pem_certificates(source: &Path, pem: &[u8]) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut reader = pem;
    let certificates = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::InvalidCertificate {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

    if certificates.is_empty() {
        return Err(TlsError::NoCertificates {
            path: source.to_path_buf(),
        });
    }

    Ok(certificates)
}

fn pkcs12_certificates(
    source: &Path,
    der: &[u8],
    password: &str,
) -> Result<Vec<Vec<u8>>, TlsError> {
    let pfx = p12::PFX::parse(der).map_err(|e| TlsError::Keystore {
        path: source.to_path_buf(),
        reason: format!("not a PKCS#12 keystore ({e:?})"),
    })?;

    if !pfx.verify_mac(password) {
        return Err(TlsError::KeystorePassword {
            path: source.to_path_buf(),
        });
    }

    let certificates = pfx.cert_bags(password).map_err(|e| TlsError::Keystore {
        path: source.to_path_buf(),
        reason: format!("{e:?}"),
    })?;

    if certificates.is_empty() {
        return Err(TlsError::NoCertificates {
            path: source.to_path_buf(),
        });
    }

    Ok(certificates)
}

/// HTTP client trusting the server certificate, if any
pub fn https_client(
    trust: Option<&ServerTrust>,
    timeout: Duration,
) -> ContainerResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Some(trust) = trust {
        for certificate in trust.root_certificates()? {
            builder = builder.add_root_certificate(certificate);
        }
    }

    Ok(builder.build()?)
}

/// HTTP client for readiness probes against a certificate nobody verifies
pub fn insecure_client() -> ContainerResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?)
}
