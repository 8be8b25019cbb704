use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const KEYCLOAK_IMAGE: &str = "quay.io/keycloak/keycloak";
pub const KEYCLOAK_VERSION: &str = "26.0";
pub const NIGHTLY_TAG: &str = "nightly";
/// Version reported by nightly builds
pub const NIGHTLY_VERSION: &str = "999.0.0-SNAPSHOT";

pub const MASTER_REALM: &str = "master";
pub const ADMIN_CLI_CLIENT: &str = "admin-cli";

pub const KEYCLOAK_PORT_HTTP: u16 = 8080;
pub const KEYCLOAK_PORT_HTTPS: u16 = 8443;
pub const KEYCLOAK_PORT_MGMT: u16 = 9000;
pub const KEYCLOAK_PORT_DEBUG: u16 = 8787;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_INITIAL_RAM_PERCENTAGE: u8 = 1;
pub const DEFAULT_MAX_RAM_PERCENTAGE: u8 = 5;

pub const KEYCLOAK_ADMIN_USER: &str = "admin";
pub const KEYCLOAK_ADMIN_PASSWORD: &str = "admin";
pub const KEYCLOAK_CONTEXT_PATH: &str = "";

pub const KEYCLOAK_HOME_DIR: &str = "/opt/keycloak";
pub const KEYCLOAK_CONF_DIR: &str = "/opt/keycloak/conf";
pub const DEFAULT_PROVIDERS_NAME: &str = "providers.jar";
pub const DEFAULT_PROVIDERS_LOCATION: &str = "/opt/keycloak/providers";
pub const DEFAULT_PROVIDER_CLASSES: &str = "target/classes";
pub const REALM_IMPORT_LOCATION: &str = "/opt/keycloak/data/import/";

pub const KEYSTORE_FILE_IN_CONTAINER: &str = "/opt/keycloak/conf/server.keystore";
pub const TRUSTSTORE_FILE_IN_CONTAINER: &str = "/opt/keycloak/conf/server.truststore";
pub const TLS_CERT_FILE_IN_CONTAINER: &str = "/opt/keycloak/conf/tls.crt";
pub const TLS_KEY_FILE_IN_CONTAINER: &str = "/opt/keycloak/conf/tls.key";

/// Max-age of static theme resources when caching stays on (30 days)
pub const THEME_STATIC_MAX_AGE_SECONDS: u32 = 2_592_000;

/// Line Keycloak prints once the dev-mode server is up
pub const DEV_MODE_STARTED_MESSAGE: &str =
    "Running the server in development mode. DO NOT use this configuration in production.";

/// Client certificate policy of the HTTPS listener
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpsClientAuth {
    #[default]
    None,
    Request,
    Required,
}

impl std::fmt::Display for HttpsClientAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpsClientAuth::None => write!(f, "none"),
            HttpsClientAuth::Request => write!(f, "request"),
            HttpsClientAuth::Required => write!(f, "required"),
        }
    }
}

impl std::str::FromStr for HttpsClientAuth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(HttpsClientAuth::None),
            "request" => Ok(HttpsClientAuth::Request),
            "required" => Ok(HttpsClientAuth::Required),
            _ => Err(format!("Invalid https client auth: {s}")),
        }
    }
}

/// Server certificate source for the HTTPS listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCertificate {
    /// PEM certificate and private key files on the host
    Files { certificate: PathBuf, key: PathBuf },
    /// Keystore file (PKCS#12 or JKS) and its password
    Keystore { file: PathBuf, password: String },
    /// Self-signed certificate generated when the container is rendered
    Generated,
}

/// Truststore handed to the server for client certificate checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truststore {
    pub file: PathBuf,
    pub password: String,
}

/// Everything TLS-related the builder collects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub enabled: bool,
    pub server_certificate: Option<ServerCertificate>,
    pub truststore: Option<Truststore>,
    pub trusted_certificates: Vec<PathBuf>,
    pub client_auth: HttpsClientAuth,
}

/// Remote JVM debugging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebugSettings {
    #[default]
    Disabled,
    /// Debug port published on a random host port
    RandomPort { suspend: bool },
    /// Debug port bound to a fixed host port
    FixedPort { host_port: u16, suspend: bool },
}

impl DebugSettings {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DebugSettings::Disabled)
    }

    pub fn suspend(&self) -> bool {
        match self {
            DebugSettings::Disabled => false,
            DebugSettings::RandomPort { suspend } | DebugSettings::FixedPort { suspend, .. } => {
                *suspend
            }
        }
    }

    pub fn fixed_host_port(&self) -> Option<u16> {
        match self {
            DebugSettings::FixedPort { host_port, .. } => Some(*host_port),
            _ => None,
        }
    }
}

/// JVM heap sizing passed through `JAVA_OPTS_KC_HEAP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamPercentage {
    pub initial: u8,
    pub max: u8,
}

impl Default for RamPercentage {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_RAM_PERCENTAGE,
            max: DEFAULT_MAX_RAM_PERCENTAGE,
        }
    }
}

impl RamPercentage {
    pub fn java_opts(&self) -> String {
        format!(
            "-XX:InitialRAMPercentage={} -XX:MaxRAMPercentage={}",
            self.initial, self.max
        )
    }
}

pub(crate) fn is_not_blank(s: &str) -> bool {
    !s.trim().is_empty()
}
