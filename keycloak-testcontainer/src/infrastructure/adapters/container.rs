use std::time::Duration;

use keycloak::KeycloakAdmin;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, ImageExt};
use tracing::info;

use crate::application::builder::KeycloakContainerBuilder;
use crate::application::services::render::{normalize_context_path, render};
use crate::domain::errors::ContainerResult;
use crate::domain::settings::*;
use crate::infrastructure::adapters::admin_client::{self, AdminLogin};
use crate::infrastructure::adapters::image::KeycloakImage;
use crate::infrastructure::adapters::logging::forward_container_log;
use crate::infrastructure::adapters::tls::{self, ServerTrust};

/// Timeout of HTTP calls made by the admin client
pub const ADMIN_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// A started Keycloak server.
///
/// The container is removed when this value is dropped.
pub struct KeycloakContainer {
    container: ContainerAsync<KeycloakImage>,
    settings: KeycloakContainerBuilder,
    server_trust: Option<ServerTrust>,
}

impl KeycloakContainer {
    /// Renders `settings` into the testcontainers request plus the trust material
    /// for talking to the server once it runs
    pub(crate) fn prepare(
        settings: &KeycloakContainerBuilder,
    ) -> ContainerResult<(ContainerRequest<KeycloakImage>, Option<ServerTrust>)> {
        let plan = render(settings)?;

        let mut request: ContainerRequest<KeycloakImage> =
            KeycloakImage::from(&plan).with_startup_timeout(plan.startup_timeout);
        for binding in &plan.port_bindings {
            request = request.with_mapped_port(binding.host, binding.container.tcp());
        }
        if settings.container_logs {
            request = request.with_log_consumer(forward_container_log);
        }

        info!(
            "Prepared Keycloak container {}:{} (timeout {:?})",
            plan.image, plan.tag, plan.startup_timeout
        );
        Ok((request, plan.server_trust))
    }

    pub(crate) async fn start<F>(
        settings: KeycloakContainerBuilder,
        customize: F,
    ) -> ContainerResult<Self>
    where
        F: FnOnce(ContainerRequest<KeycloakImage>) -> ContainerRequest<KeycloakImage>,
    {
        let (request, server_trust) = Self::prepare(&settings)?;

        let container = customize(request).start().await?;
        info!("Keycloak container {} is ready", container.id());

        Ok(Self {
            container,
            settings,
            server_trust,
        })
    }

    pub fn id(&self) -> &str {
        self.container.id()
    }

    /// Underlying testcontainers handle
    pub fn container(&self) -> &ContainerAsync<KeycloakImage> {
        &self.container
    }

    pub async fn host(&self) -> ContainerResult<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn http_port(&self) -> ContainerResult<u16> {
        self.mapped_port(KEYCLOAK_PORT_HTTP).await
    }

    pub async fn https_port(&self) -> ContainerResult<u16> {
        self.mapped_port(KEYCLOAK_PORT_HTTPS).await
    }

    pub async fn http_management_port(&self) -> ContainerResult<u16> {
        self.mapped_port(KEYCLOAK_PORT_MGMT).await
    }

    /// Host port of the JVM debugger, `None` unless debugging was enabled
    pub async fn debug_port(&self) -> ContainerResult<Option<u16>> {
        if !self.settings.debug.is_enabled() {
            return Ok(None);
        }
        Ok(Some(self.mapped_port(KEYCLOAK_PORT_DEBUG).await?))
    }

    async fn mapped_port(&self, port: u16) -> ContainerResult<u16> {
        Ok(self.container.get_host_port_ipv4(port.tcp()).await?)
    }

    pub fn protocol(&self) -> &'static str {
        if self.settings.tls.enabled {
            "https"
        } else {
            "http"
        }
    }

    /// Base URL of the server including the context path
    pub async fn auth_server_url(&self) -> ContainerResult<String> {
        let port = if self.settings.tls.enabled {
            self.https_port().await?
        } else {
            self.http_port().await?
        };
        Ok(self.url_for(&self.host().await?, port))
    }

    /// Base URL of the management interface (health, metrics)
    pub async fn management_server_url(&self) -> ContainerResult<String> {
        let port = self.http_management_port().await?;
        Ok(self.url_for(&self.host().await?, port))
    }

    fn url_for(&self, host: &str, port: u16) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol(),
            host,
            port,
            self.context_path()
        )
    }

    pub fn admin_username(&self) -> &str {
        &self.settings.admin_username
    }

    pub fn admin_password(&self) -> &str {
        &self.settings.admin_password
    }

    /// Changes the password later admin logins use, e.g. after importing a master realm
    pub fn with_admin_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.settings.admin_password = password.into();
        self
    }

    pub fn with_admin_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.settings.admin_username = username.into();
        self
    }

    pub fn context_path(&self) -> String {
        normalize_context_path(&self.settings.context_path)
    }

    pub fn startup_timeout(&self) -> Duration {
        self.settings.startup_timeout
    }

    pub fn keycloak_default_version(&self) -> &str {
        self.settings.keycloak_default_version()
    }

    /// Configuration the container was started with
    pub fn settings(&self) -> &KeycloakContainerBuilder {
        &self.settings
    }

    /// HTTP client that trusts this server's certificate
    pub fn http_client(&self) -> ContainerResult<reqwest::Client> {
        tls::https_client(self.server_trust.as_ref(), ADMIN_CLIENT_TIMEOUT)
    }

    /// Admin API client logged in as the configured admin user
    pub async fn admin_client(&self) -> ContainerResult<KeycloakAdmin> {
        let server_url = self.auth_server_url().await?;
        let login = AdminLogin {
            server_url: &server_url,
            username: self.admin_username(),
            password: self.admin_password(),
        };
        admin_client::admin_client(&login, self.http_client()?).await
    }

    /// Access token of the configured admin user
    pub async fn admin_access_token(&self) -> ContainerResult<String> {
        let server_url = self.auth_server_url().await?;
        let login = AdminLogin {
            server_url: &server_url,
            username: self.admin_username(),
            password: self.admin_password(),
        };
        admin_client::access_token(&login, &self.http_client()?).await
    }

    /// Everything the server wrote to stdout and stderr so far
    pub async fn logs(&self) -> ContainerResult<String> {
        let mut logs = self.container.stdout_to_vec().await?;
        logs.extend(self.container.stderr_to_vec().await?);
        Ok(String::from_utf8_lossy(&logs).into_owned())
    }

    pub async fn stop(&self) -> ContainerResult<()> {
        info!("Stopping Keycloak container {}", self.id());
        Ok(self.container.stop().await?)
    }

    /// Stops and removes the container right away instead of on drop
    pub async fn remove(self) -> ContainerResult<()> {
        Ok(self.container.rm().await?)
    }
}

impl std::fmt::Debug for KeycloakContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakContainer")
            .field("id", &self.container.id())
            .field("image", &self.settings.image)
            .field("tag", &self.settings.tag)
            .field("tls", &self.settings.tls.enabled)
            .finish()
    }
}
