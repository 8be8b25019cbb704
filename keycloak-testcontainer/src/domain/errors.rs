use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while configuring, starting or talking to a Keycloak container
#[derive(Error, Debug)]
pub enum KeycloakContainerError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provider packaging failed for {location}: {message}")]
    Provider { location: PathBuf, message: String },

    #[error("TLS error: {message}")]
    Tls { message: String },

    #[error("Invalid realm import file {path}: {message}")]
    RealmImport { path: PathBuf, message: String },

    #[error("Admin login failed with HTTP {status}: {message}")]
    Authentication { status: u16, message: String },

    #[error("Container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("Keycloak admin API error: {0}")]
    Admin(#[from] keycloak::KeycloakError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, KeycloakContainerError>;

impl KeycloakContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KeycloakContainerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<ConfigError> for KeycloakContainerError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingRequired { key } => KeycloakContainerError::Configuration {
                message: format!("Missing required configuration: {key}"),
            },
            ConfigError::InvalidValue { key, message } => KeycloakContainerError::Configuration {
                message: format!("Invalid value for {key}: {message}"),
            },
        }
    }
}

/// Certificate and keystore errors
#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Certificate generation failed: {reason}")]
    Generation { reason: String },

    #[error("No certificates found in {path}")]
    NoCertificates { path: PathBuf },

    #[error("Invalid certificate in {path}: {reason}")]
    InvalidCertificate { path: PathBuf, reason: String },

    #[error("Unreadable keystore {path}: {reason}")]
    Keystore { path: PathBuf, reason: String },

    #[error("Wrong password for keystore {path}")]
    KeystorePassword { path: PathBuf },
}

impl From<TlsError> for KeycloakContainerError {
    fn from(err: TlsError) -> Self {
        KeycloakContainerError::Tls {
            message: err.to_string(),
        }
    }
}

/// Provider JAR packaging errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Walking {path} failed: {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("Archive error for {path}: {reason}")]
    Archive { path: PathBuf, reason: String },
}

impl From<ProviderError> for KeycloakContainerError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Walk { path, reason } => KeycloakContainerError::Provider {
                location: path,
                message: reason,
            },
            ProviderError::Archive { path, reason } => KeycloakContainerError::Provider {
                location: path,
                message: format!("archive: {reason}"),
            },
        }
    }
}
