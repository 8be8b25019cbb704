use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use testcontainers::core::WaitFor;
use testcontainers::ContainerRequest;

use crate::application::ports::TestcontainerConfig;
use crate::domain::errors::ContainerResult;
use crate::domain::settings::*;
use crate::infrastructure::adapters::container::KeycloakContainer;
use crate::infrastructure::adapters::image::KeycloakImage;

/// Fluent configuration for a Keycloak test container.
///
/// Every setter consumes and returns the builder, so configuration reads as
/// one chain ending in [`start`](Self::start):
///
/// ```no_run
/// # async fn run() -> keycloak_testcontainer::ContainerResult<()> {
/// use keycloak_testcontainer::KeycloakContainerBuilder;
///
/// let keycloak = KeycloakContainerBuilder::new()
///     .with_admin_username("root")
///     .with_admin_password("s3cret")
///     .with_realm_import_file("tests/resources/test-realm.json")
///     .start()
///     .await?;
///
/// println!("Keycloak is up at {}", keycloak.auth_server_url().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KeycloakContainerBuilder {
    pub(crate) image: String,
    pub(crate) tag: String,
    pub(crate) admin_username: String,
    pub(crate) admin_password: String,
    pub(crate) bootstrap_admin: bool,
    pub(crate) context_path: String,
    pub(crate) ram: RamPercentage,
    pub(crate) import_files: Vec<PathBuf>,
    pub(crate) tls: TlsSettings,
    pub(crate) disabled_caching: bool,
    pub(crate) metrics_enabled: bool,
    pub(crate) verbose: bool,
    pub(crate) production_mode: bool,
    pub(crate) optimized: bool,
    pub(crate) features_enabled: Option<Vec<String>>,
    pub(crate) features_disabled: Option<Vec<String>>,
    pub(crate) startup_timeout: Duration,
    pub(crate) wait_strategy: Option<WaitFor>,
    pub(crate) provider_class_locations: Vec<PathBuf>,
    pub(crate) provider_libs: Vec<PathBuf>,
    pub(crate) custom_command_parts: Vec<String>,
    pub(crate) debug: DebugSettings,
    pub(crate) resource_root: PathBuf,
    pub(crate) extra_env: BTreeMap<String, String>,
    pub(crate) container_logs: bool,
}

impl Default for KeycloakContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeycloakContainerBuilder {
    /// Builder for the default image, honouring `KEYCLOAK_IMAGE`/`KEYCLOAK_VERSION`
    pub fn new() -> Self {
        Self::from_config(&TestcontainerConfig::from_env_or_default())
    }

    pub fn from_config(config: &TestcontainerConfig) -> Self {
        Self {
            image: config.image.clone(),
            tag: config.tag.clone(),
            admin_username: KEYCLOAK_ADMIN_USER.to_string(),
            admin_password: KEYCLOAK_ADMIN_PASSWORD.to_string(),
            bootstrap_admin: true,
            context_path: KEYCLOAK_CONTEXT_PATH.to_string(),
            ram: RamPercentage::default(),
            import_files: Vec::new(),
            tls: TlsSettings::default(),
            disabled_caching: false,
            metrics_enabled: false,
            verbose: false,
            production_mode: false,
            optimized: false,
            features_enabled: None,
            features_disabled: None,
            startup_timeout: config.startup_timeout(),
            wait_strategy: None,
            provider_class_locations: Vec::new(),
            provider_libs: Vec::new(),
            custom_command_parts: Vec::new(),
            debug: DebugSettings::Disabled,
            resource_root: default_resource_root(),
            extra_env: BTreeMap::new(),
            container_logs: config.container_logs,
        }
    }

    /// Builder for a full image reference, e.g. `quay.io/keycloak/keycloak` + `25.0`
    pub fn from_image(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            image: name.into(),
            tag: tag.into(),
            ..Self::new()
        }
    }

    pub fn with_nightly(mut self) -> Self {
        self.tag = NIGHTLY_TAG.to_string();
        self
    }

    pub fn with_admin_username(mut self, username: impl Into<String>) -> Self {
        self.admin_username = username.into();
        self
    }

    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = password.into();
        self
    }

    /// Skip creating the temporary bootstrap admin, e.g. when importing a master realm
    pub fn with_bootstrap_admin_disabled(mut self) -> Self {
        self.bootstrap_admin = false;
        self
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_ram_percentage(mut self, initial: u8, max: u8) -> Self {
        self.ram = RamPercentage { initial, max };
        self
    }

    /// Adds a realm JSON file to import on startup. Duplicates are ignored.
    pub fn with_realm_import_file(mut self, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        if !self.import_files.contains(&file) {
            self.import_files.push(file);
        }
        self
    }

    pub fn with_realm_import_files<I, P>(self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        files
            .into_iter()
            .fold(self, |builder, file| builder.with_realm_import_file(file))
    }

    /// Serves HTTPS with a self-signed certificate for `localhost`
    pub fn use_tls(mut self) -> Self {
        self.tls.server_certificate = Some(ServerCertificate::Generated);
        self.tls.enabled = true;
        self
    }

    /// Serves HTTPS with a PEM certificate and key from the host
    pub fn use_tls_certificate(
        mut self,
        certificate: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        self.tls.server_certificate = Some(ServerCertificate::Files {
            certificate: certificate.into(),
            key: key.into(),
        });
        self.tls.enabled = true;
        self
    }

    pub fn use_tls_keystore(
        mut self,
        file: impl Into<PathBuf>,
        password: impl Into<String>,
    ) -> Self {
        self.tls.server_certificate = Some(ServerCertificate::Keystore {
            file: file.into(),
            password: password.into(),
        });
        self.tls.enabled = true;
        self
    }

    #[deprecated(note = "use `with_trusted_certificates` and `with_https_client_auth` instead")]
    pub fn use_mutual_tls(
        mut self,
        truststore: impl Into<PathBuf>,
        password: impl Into<String>,
        client_auth: HttpsClientAuth,
    ) -> Self {
        self.tls.truststore = Some(Truststore {
            file: truststore.into(),
            password: password.into(),
        });
        self.tls.client_auth = client_auth;
        self.tls.enabled = true;
        self
    }

    /// PKCS#12 or PEM files (or directories of them) used as the server's system truststore
    pub fn with_trusted_certificates<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.tls.trusted_certificates = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_https_client_auth(mut self, client_auth: HttpsClientAuth) -> Self {
        self.tls.client_auth = client_auth;
        self.tls.enabled = true;
        self
    }

    pub fn with_verbose_output(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn with_features_enabled<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features_enabled = Some(features.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_features_disabled<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features_disabled = Some(features.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_disabled_caching(mut self) -> Self {
        self.disabled_caching = true;
        self
    }

    pub fn with_enabled_metrics(mut self) -> Self {
        self.metrics_enabled = true;
        self
    }

    /// Runs `start` instead of `start-dev`
    pub fn with_production_mode(mut self) -> Self {
        self.production_mode = true;
        self
    }

    /// Passes `--optimized`, for images that already ran `kc.sh build`
    pub fn with_optimized_flag(mut self) -> Self {
        self.optimized = true;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Replaces the default health-endpoint readiness check
    pub fn with_wait_strategy(mut self, wait_for: WaitFor) -> Self {
        self.wait_strategy = Some(wait_for);
        self
    }

    /// Packages each directory as an exploded `providers.jar` deployment
    pub fn with_provider_classes_from<I, P>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.provider_class_locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_provider_classes(self) -> Self {
        self.with_provider_classes_from([DEFAULT_PROVIDER_CLASSES])
    }

    /// Copies ready-made JARs (e.g. provider dependencies) into the providers folder
    pub fn with_provider_libs_from<I, P>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.provider_libs = libs.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a raw argument to the `kc.sh` command line.
    ///
    /// Nothing checks these against the rest of the configuration.
    pub fn with_custom_command(mut self, part: impl Into<String>) -> Self {
        self.custom_command_parts.push(part.into());
        self
    }

    /// Enables remote debugging on a random host port
    pub fn with_debug(mut self) -> Self {
        self.debug = DebugSettings::RandomPort { suspend: false };
        self
    }

    /// Enables remote debugging on `host_port`; `suspend` makes the JVM wait for a debugger
    pub fn with_debug_fixed_port(mut self, host_port: u16, suspend: bool) -> Self {
        self.debug = if host_port == 0 {
            DebugSettings::RandomPort { suspend }
        } else {
            DebugSettings::FixedPort { host_port, suspend }
        };
        self
    }

    /// Directory relative file paths are resolved against
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    /// Sets a raw environment variable; applied after everything the builder derives
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }

    /// Forward container stdout/stderr to `tracing`
    pub fn with_container_logs(mut self, enabled: bool) -> Self {
        self.container_logs = enabled;
        self
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.enabled
    }

    pub fn tls(&self) -> &TlsSettings {
        &self.tls
    }

    pub fn debug(&self) -> DebugSettings {
        self.debug
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    pub fn keycloak_default_version(&self) -> &str {
        if self.tag == NIGHTLY_TAG {
            NIGHTLY_VERSION
        } else {
            &self.tag
        }
    }

    /// Resolves `path` against the resource root unless it is absolute
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.resource_root.join(path)
        }
    }

    /// Renders the configuration and starts the container
    pub async fn start(self) -> ContainerResult<KeycloakContainer> {
        KeycloakContainer::start(self, |request| request).await
    }

    /// Like [`start`](Self::start), passing the testcontainers request through
    /// `customize` first, e.g. to join a network or name the container:
    ///
    /// ```no_run
    /// # async fn run() -> keycloak_testcontainer::ContainerResult<()> {
    /// use keycloak_testcontainer::KeycloakContainerBuilder;
    /// use testcontainers::ImageExt;
    ///
    /// let keycloak = KeycloakContainerBuilder::new()
    ///     .start_with(|request| {
    ///         request
    ///             .with_network("integration")
    ///             .with_container_name("keycloak")
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start_with<F>(self, customize: F) -> ContainerResult<KeycloakContainer>
    where
        F: FnOnce(ContainerRequest<KeycloakImage>) -> ContainerRequest<KeycloakImage>,
    {
        KeycloakContainer::start(self, customize).await
    }

    /// The testcontainers request [`start`](Self::start) would run, for callers
    /// that drive the container lifecycle themselves
    pub fn container_request(&self) -> ContainerResult<ContainerRequest<KeycloakImage>> {
        let (request, _) = KeycloakContainer::prepare(self)?;
        Ok(request)
    }
}

fn default_resource_root() -> PathBuf {
    std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
