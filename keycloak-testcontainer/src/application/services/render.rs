use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use testcontainers::core::wait::HttpWaitStrategy;
use testcontainers::core::{IntoContainerPort, WaitFor};
use tracing::{debug, info, warn};

use crate::application::builder::KeycloakContainerBuilder;
use crate::domain::errors::{ConfigError, ContainerResult, KeycloakContainerError};
use crate::domain::settings::*;
use crate::infrastructure::adapters::provider_jar;
use crate::infrastructure::adapters::tls::{self, ServerTrust};

/// Where the bytes of a copied file come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopySource {
    HostPath(PathBuf),
    Bytes(Vec<u8>),
}

/// A file placed into the container before it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: CopySource,
    pub target: String,
}

/// Host port bound to a container port; host port 0 picks a free one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub host: u16,
    pub container: u16,
}

/// Fully resolved container configuration, ready to hand to testcontainers
#[derive(Debug, Clone)]
pub struct ContainerPlan {
    pub image: String,
    pub tag: String,
    pub cmd: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub copies: Vec<PlannedCopy>,
    pub exposed_ports: Vec<u16>,
    pub port_bindings: Vec<PortBinding>,
    pub wait_for: WaitFor,
    pub startup_timeout: Duration,
    pub server_trust: Option<ServerTrust>,
}

impl ContainerPlan {
    pub fn copy_targets(&self) -> Vec<&str> {
        self.copies.iter().map(|c| c.target.as_str()).collect()
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

/// Context path with a leading slash and no trailing one; empty for the root
pub fn normalize_context_path(context_path: &str) -> String {
    let trimmed = context_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Turns builder settings into command, environment, files and ports.
///
/// Reads every referenced host file so that missing files fail here rather
/// than inside the docker daemon.
pub fn render(builder: &KeycloakContainerBuilder) -> ContainerResult<ContainerPlan> {
    let mut cmd = Vec::new();
    let mut env = BTreeMap::new();
    let mut copies = Vec::new();

    if builder.verbose {
        cmd.push("--verbose".to_string());
    }
    cmd.push(if builder.production_mode { "start" } else { "start-dev" }.to_string());
    if builder.optimized {
        cmd.push("--optimized".to_string());
    }

    let context_path = normalize_context_path(&builder.context_path);
    if !context_path.is_empty() {
        env.insert("KC_HTTP_RELATIVE_PATH".to_string(), context_path.clone());
    }

    if let Some(features) = &builder.features_enabled {
        env.insert("KC_FEATURES".to_string(), features.join(","));
    }
    if let Some(features) = &builder.features_disabled {
        env.insert("KC_FEATURES_DISABLED".to_string(), features.join(","));
    }

    if builder.bootstrap_admin {
        for key in ["KC_BOOTSTRAP_ADMIN_USERNAME", "KEYCLOAK_ADMIN"] {
            env.insert(key.to_string(), builder.admin_username.clone());
        }
        for key in ["KC_BOOTSTRAP_ADMIN_PASSWORD", "KEYCLOAK_ADMIN_PASSWORD"] {
            env.insert(key.to_string(), builder.admin_password.clone());
        }
    }
    env.insert("JAVA_OPTS_KC_HEAP".to_string(), builder.ram.java_opts());

    let server_trust = render_tls(builder, &mut env, &mut copies)?;

    env.insert("KC_METRICS_ENABLED".to_string(), builder.metrics_enabled.to_string());
    env.insert("KC_HEALTH_ENABLED".to_string(), true.to_string());

    let wait_for = match &builder.wait_strategy {
        Some(custom) => custom.clone(),
        None => default_wait_strategy(&context_path, builder.tls.enabled)?,
    };

    render_providers(builder, &mut copies)?;

    cmd.push("--import-realm".to_string());
    render_realm_imports(builder, &mut copies)?;

    // dev mode turns theme caching off; keep it on unless asked otherwise
    if !builder.disabled_caching {
        env.insert("KC_SPI_THEME_CACHE_THEMES".to_string(), true.to_string());
        env.insert("KC_SPI_THEME_CACHE_TEMPLATES".to_string(), true.to_string());
        env.insert(
            "KC_SPI_THEME_STATIC_MAX_AGE".to_string(),
            THEME_STATIC_MAX_AGE_SECONDS.to_string(),
        );
    }

    let mut exposed_ports = vec![KEYCLOAK_PORT_HTTP, KEYCLOAK_PORT_HTTPS, KEYCLOAK_PORT_MGMT];
    let mut port_bindings = Vec::new();

    if builder.debug.is_enabled() {
        env.insert("DEBUG".to_string(), true.to_string());
        env.insert("DEBUG_PORT".to_string(), format!("*:{KEYCLOAK_PORT_DEBUG}"));
        if builder.debug.suspend() {
            env.insert("DEBUG_SUSPEND".to_string(), "y".to_string());
        }

        match builder.debug.fixed_host_port() {
            Some(host_port) => {
                // explicit bindings turn off publish-all, so the other ports need one too
                port_bindings = exposed_ports
                    .iter()
                    .map(|&container| PortBinding { host: 0, container })
                    .collect();
                port_bindings.push(PortBinding {
                    host: host_port,
                    container: KEYCLOAK_PORT_DEBUG,
                });
            }
            None => exposed_ports.push(KEYCLOAK_PORT_DEBUG),
        }
    }

    if !builder.custom_command_parts.is_empty() {
        warn!(
            "Using custom command parts {:?}. Container behavior and configuration may be \
             corrupted; correct behavior is up to the caller",
            builder.custom_command_parts
        );
        cmd.extend(builder.custom_command_parts.iter().cloned());
    }

    for (key, value) in &builder.extra_env {
        env.insert(key.clone(), value.clone());
    }

    let plan = ContainerPlan {
        image: builder.image.clone(),
        tag: builder.tag.clone(),
        cmd,
        env,
        copies,
        exposed_ports,
        port_bindings,
        wait_for,
        startup_timeout: builder.startup_timeout,
        server_trust,
    };

    debug!(
        "Rendered Keycloak container {}:{} with command {:?} and {} file(s) to copy",
        plan.image,
        plan.tag,
        plan.cmd,
        plan.copies.len()
    );

    Ok(plan)
}

fn default_wait_strategy(context_path: &str, use_tls: bool) -> ContainerResult<WaitFor> {
    let mut strategy = HttpWaitStrategy::new(format!("{context_path}/health/started"))
        .with_port(KEYCLOAK_PORT_MGMT.tcp())
        .with_expected_status_code(200u16);

    if use_tls {
        strategy = strategy.with_tls().with_client(tls::insecure_client()?);
    }

    Ok(WaitFor::http(strategy))
}

fn render_tls(
    builder: &KeycloakContainerBuilder,
    env: &mut BTreeMap<String, String>,
    copies: &mut Vec<PlannedCopy>,
) -> ContainerResult<Option<ServerTrust>> {
    let settings = &builder.tls;
    let mut server_trust = None;

    if settings.enabled {
        match &settings.server_certificate {
            Some(ServerCertificate::Files { certificate, key })
                if is_not_blank(&certificate.to_string_lossy()) =>
            {
                let certificate = existing_file(builder, certificate)?;
                let key = existing_file(builder, key)?;
                let pem = read(&certificate)?;

                copies.push(host_copy(key, TLS_KEY_FILE_IN_CONTAINER));
                copies.push(host_copy(certificate.clone(), TLS_CERT_FILE_IN_CONTAINER));
                server_trust = Some(ServerTrust::Pem {
                    source: certificate,
                    pem,
                });
                insert_certificate_env(env);
            }
            Some(ServerCertificate::Keystore { file, password })
                if is_not_blank(&file.to_string_lossy()) =>
            {
                let file = existing_file(builder, file)?;
                let der = read(&file)?;

                copies.push(host_copy(file.clone(), KEYSTORE_FILE_IN_CONTAINER));
                env.insert(
                    "KC_HTTPS_KEY_STORE_FILE".to_string(),
                    KEYSTORE_FILE_IN_CONTAINER.to_string(),
                );
                env.insert("KC_HTTPS_KEY_STORE_PASSWORD".to_string(), password.clone());
                server_trust = Some(ServerTrust::Pkcs12 {
                    source: file,
                    der,
                    password: password.clone(),
                });
            }
            Some(ServerCertificate::Generated) => {
                let generated = tls::generate_self_signed()?;
                info!(
                    "Generated self-signed certificate for {:?}",
                    tls::GENERATED_CERTIFICATE_NAMES
                );

                copies.push(PlannedCopy {
                    source: CopySource::Bytes(generated.private_key_pem.into_bytes()),
                    target: TLS_KEY_FILE_IN_CONTAINER.to_string(),
                });
                copies.push(PlannedCopy {
                    source: CopySource::Bytes(generated.certificate_pem.clone().into_bytes()),
                    target: TLS_CERT_FILE_IN_CONTAINER.to_string(),
                });
                server_trust = Some(ServerTrust::Pem {
                    source: PathBuf::from("<generated>"),
                    pem: generated.certificate_pem.into_bytes(),
                });
                insert_certificate_env(env);
            }
            _ => {}
        }

        if let Some(truststore) = &settings.truststore {
            if is_not_blank(&truststore.file.to_string_lossy()) {
                let file = existing_file(builder, &truststore.file)?;
                copies.push(host_copy(file, TRUSTSTORE_FILE_IN_CONTAINER));
                env.insert(
                    "KC_HTTPS_TRUST_STORE_FILE".to_string(),
                    TRUSTSTORE_FILE_IN_CONTAINER.to_string(),
                );
                env.insert(
                    "KC_HTTPS_TRUST_STORE_PASSWORD".to_string(),
                    truststore.password.clone(),
                );
            }
        }
    }

    if !settings.trusted_certificates.is_empty() {
        let mut paths = Vec::with_capacity(settings.trusted_certificates.len());
        for certificate in &settings.trusted_certificates {
            let target = trusted_certificate_target(certificate);
            let source = builder.resolve(certificate);
            if !source.exists() {
                return Err(KeycloakContainerError::io(
                    source,
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ));
            }
            copies.push(host_copy(source, &target));
            paths.push(target);
        }
        env.insert("KC_TRUSTSTORE_PATHS".to_string(), paths.join(","));
    }

    env.insert("KC_HTTPS_CLIENT_AUTH".to_string(), settings.client_auth.to_string());
    env.insert(
        "KC_HTTPS_MANAGEMENT_CLIENT_AUTH".to_string(),
        HttpsClientAuth::None.to_string(),
    );

    Ok(server_trust)
}

fn insert_certificate_env(env: &mut BTreeMap<String, String>) {
    env.insert(
        "KC_HTTPS_CERTIFICATE_FILE".to_string(),
        TLS_CERT_FILE_IN_CONTAINER.to_string(),
    );
    env.insert(
        "KC_HTTPS_CERTIFICATE_KEY_FILE".to_string(),
        TLS_KEY_FILE_IN_CONTAINER.to_string(),
    );
}

/// `conf/<relative path>`, never with a doubled slash
pub fn trusted_certificate_target(certificate: &Path) -> String {
    let relative = certificate
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{KEYCLOAK_CONF_DIR}/{relative}")
}

fn render_providers(
    builder: &KeycloakContainerBuilder,
    copies: &mut Vec<PlannedCopy>,
) -> ContainerResult<()> {
    for (index, location) in builder.provider_class_locations.iter().enumerate() {
        let resolved = builder.resolve(location);
        if !resolved.is_dir() {
            warn!(
                "Provider classes location {} does not exist, skipping",
                resolved.display()
            );
            continue;
        }

        let jar = provider_jar::package_directory(&resolved)?;
        let target = format!("{DEFAULT_PROVIDERS_LOCATION}/{index}_{DEFAULT_PROVIDERS_NAME}");
        info!("Deploying provider classes from {} as {}", resolved.display(), target);
        copies.push(PlannedCopy {
            source: CopySource::Bytes(jar),
            target,
        });
    }

    for lib in &builder.provider_libs {
        let resolved = existing_file(builder, lib)?;
        let name = file_name(&resolved)?;
        copies.push(host_copy(
            resolved,
            &format!("{DEFAULT_PROVIDERS_LOCATION}/{name}"),
        ));
    }

    Ok(())
}

fn render_realm_imports(
    builder: &KeycloakContainerBuilder,
    copies: &mut Vec<PlannedCopy>,
) -> ContainerResult<()> {
    let mut used_names = Vec::new();

    for (index, import_file) in builder.import_files.iter().enumerate() {
        let resolved = existing_file(builder, import_file)?;
        let realm = realm_name(&resolved, &read(&resolved)?)?;

        let base = file_name(&resolved)?;
        let mut name = base.clone();
        let mut prefix = index;
        while used_names.contains(&name) {
            name = format!("{prefix}_{base}");
            prefix += 1;
        }
        used_names.push(name.clone());

        info!("Importing realm {} from {}", realm, resolved.display());
        copies.push(host_copy(resolved, &format!("{REALM_IMPORT_LOCATION}{name}")));
    }

    Ok(())
}

/// Realm name declared by an import file
pub fn realm_name(path: &Path, contents: &[u8]) -> ContainerResult<String> {
    let value: serde_json::Value =
        serde_json::from_slice(contents).map_err(|e| KeycloakContainerError::RealmImport {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    value
        .get("realm")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| KeycloakContainerError::RealmImport {
            path: path.to_path_buf(),
            message: "missing \"realm\" attribute".to_string(),
        })
}

fn existing_file(builder: &KeycloakContainerBuilder, path: &Path) -> ContainerResult<PathBuf> {
    let resolved = builder.resolve(path);
    match std::fs::metadata(&resolved) {
        Ok(meta) if meta.is_file() => Ok(resolved),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: resolved.display().to_string(),
            message: "Not a regular file".to_string(),
        }
        .into()),
        Err(e) => Err(KeycloakContainerError::io(resolved, e)),
    }
}

fn read(path: &Path) -> ContainerResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| KeycloakContainerError::io(path, e))
}

fn file_name(path: &Path) -> ContainerResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ConfigError::InvalidValue {
                key: path.display().to_string(),
                message: "Path has no file name".to_string(),
            }
            .into()
        })
}

fn host_copy(source: PathBuf, target: &str) -> PlannedCopy {
    PlannedCopy {
        source: CopySource::HostPath(source),
        target: target.to_string(),
    }
}
