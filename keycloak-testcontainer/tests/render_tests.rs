use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use keycloak_testcontainer::{
    application::services::render::{render, CopySource, PortBinding},
    infrastructure::adapters::tls::generate_self_signed,
    log_wait_strategy, HttpsClientAuth, KeycloakContainerBuilder, KeycloakContainerError,
    TestcontainerConfig,
};
use tempfile::TempDir;
use testcontainers::core::WaitFor;
use testcontainers::{Image, ImageExt};

fn builder() -> KeycloakContainerBuilder {
    KeycloakContainerBuilder::from_config(&TestcontainerConfig::default())
        .with_resource_root(env!("CARGO_MANIFEST_DIR"))
}

fn builder_in(dir: &TempDir) -> KeycloakContainerBuilder {
    KeycloakContainerBuilder::from_config(&TestcontainerConfig::default())
        .with_resource_root(dir.path())
}

// ================================================================================================
// COMMAND AND ENVIRONMENT
// ================================================================================================

#[test]
fn test_default_plan() {
    let plan = render(&builder()).unwrap();

    assert_eq!(plan.image, "quay.io/keycloak/keycloak");
    assert_eq!(plan.tag, "26.0");
    assert_eq!(plan.cmd, vec!["start-dev", "--import-realm"]);
    assert_eq!(plan.exposed_ports, vec![8080, 8443, 9000]);
    assert!(plan.port_bindings.is_empty());
    assert!(plan.copies.is_empty());
    assert!(plan.server_trust.is_none());
    assert_eq!(plan.startup_timeout, Duration::from_secs(120));

    assert_eq!(plan.env_value("KC_BOOTSTRAP_ADMIN_USERNAME"), Some("admin"));
    assert_eq!(plan.env_value("KC_BOOTSTRAP_ADMIN_PASSWORD"), Some("admin"));
    assert_eq!(plan.env_value("KEYCLOAK_ADMIN"), Some("admin"));
    assert_eq!(plan.env_value("KEYCLOAK_ADMIN_PASSWORD"), Some("admin"));
    assert_eq!(
        plan.env_value("JAVA_OPTS_KC_HEAP"),
        Some("-XX:InitialRAMPercentage=1 -XX:MaxRAMPercentage=5")
    );
    assert_eq!(plan.env_value("KC_HEALTH_ENABLED"), Some("true"));
    assert_eq!(plan.env_value("KC_METRICS_ENABLED"), Some("false"));
    assert_eq!(plan.env_value("KC_HTTPS_CLIENT_AUTH"), Some("none"));
    assert_eq!(plan.env_value("KC_HTTPS_MANAGEMENT_CLIENT_AUTH"), Some("none"));
    assert_eq!(plan.env_value("KC_SPI_THEME_CACHE_THEMES"), Some("true"));
    assert_eq!(plan.env_value("KC_SPI_THEME_CACHE_TEMPLATES"), Some("true"));
    assert_eq!(plan.env_value("KC_SPI_THEME_STATIC_MAX_AGE"), Some("2592000"));

    assert_eq!(plan.env_value("KC_HTTP_RELATIVE_PATH"), None);
    assert_eq!(plan.env_value("KC_FEATURES"), None);
    assert_eq!(plan.env_value("DEBUG"), None);
    assert_eq!(plan.env_value("KC_HTTPS_CERTIFICATE_FILE"), None);
    assert!(!matches!(plan.wait_for, WaitFor::Duration { .. }));
}

#[test]
fn test_production_mode_verbose_and_optimized() {
    let plan = render(
        &builder()
            .with_production_mode()
            .with_verbose_output()
            .with_optimized_flag(),
    )
    .unwrap();

    assert_eq!(plan.cmd, vec!["--verbose", "start", "--optimized", "--import-realm"]);
}

#[test]
fn test_custom_command_parts_come_last() {
    let plan = render(
        &builder()
            .with_custom_command("--hostname=keycloak.local")
            .with_custom_command("--log-level=debug"),
    )
    .unwrap();

    assert_eq!(
        plan.cmd,
        vec![
            "start-dev",
            "--import-realm",
            "--hostname=keycloak.local",
            "--log-level=debug"
        ]
    );
}

#[test]
fn test_admin_credentials_and_bootstrap_admin() {
    let plan = render(&builder().with_admin_username("foo").with_admin_password("bar")).unwrap();
    assert_eq!(plan.env_value("KC_BOOTSTRAP_ADMIN_USERNAME"), Some("foo"));
    assert_eq!(plan.env_value("KC_BOOTSTRAP_ADMIN_PASSWORD"), Some("bar"));

    let plan = render(&builder().with_bootstrap_admin_disabled()).unwrap();
    for key in [
        "KC_BOOTSTRAP_ADMIN_USERNAME",
        "KC_BOOTSTRAP_ADMIN_PASSWORD",
        "KEYCLOAK_ADMIN",
        "KEYCLOAK_ADMIN_PASSWORD",
    ] {
        assert_eq!(plan.env_value(key), None, "{key} should not be set");
    }
}

#[test]
fn test_context_path_is_normalized_into_env() {
    let plan = render(&builder().with_context_path("auth/")).unwrap();
    assert_eq!(plan.env_value("KC_HTTP_RELATIVE_PATH"), Some("/auth"));

    let plan = render(&builder().with_context_path("/")).unwrap();
    assert_eq!(plan.env_value("KC_HTTP_RELATIVE_PATH"), None);
}

#[test]
fn test_features_are_comma_joined() {
    let plan = render(
        &builder()
            .with_features_enabled(["token-exchange", "admin-fine-grained-authz"])
            .with_features_disabled(["impersonation"]),
    )
    .unwrap();

    assert_eq!(
        plan.env_value("KC_FEATURES"),
        Some("token-exchange,admin-fine-grained-authz")
    );
    assert_eq!(plan.env_value("KC_FEATURES_DISABLED"), Some("impersonation"));
}

#[test]
fn test_toggles() {
    let plan = render(
        &builder()
            .with_disabled_caching()
            .with_enabled_metrics()
            .with_ram_percentage(10, 50),
    )
    .unwrap();

    assert_eq!(plan.env_value("KC_SPI_THEME_CACHE_THEMES"), None);
    assert_eq!(plan.env_value("KC_SPI_THEME_STATIC_MAX_AGE"), None);
    assert_eq!(plan.env_value("KC_METRICS_ENABLED"), Some("true"));
    assert_eq!(
        plan.env_value("JAVA_OPTS_KC_HEAP"),
        Some("-XX:InitialRAMPercentage=10 -XX:MaxRAMPercentage=50")
    );
}

#[test]
fn test_extra_env_overrides_derived_values() {
    let plan = render(
        &builder()
            .with_env("KC_METRICS_ENABLED", "true")
            .with_env("KC_HOSTNAME_STRICT", "false"),
    )
    .unwrap();

    assert_eq!(plan.env_value("KC_METRICS_ENABLED"), Some("true"));
    assert_eq!(plan.env_value("KC_HOSTNAME_STRICT"), Some("false"));
}

#[test]
fn test_custom_wait_strategy_replaces_health_probe() {
    let plan = render(&builder().with_wait_strategy(WaitFor::seconds(3))).unwrap();
    assert!(matches!(
        plan.wait_for,
        WaitFor::Duration { length } if length == Duration::from_secs(3)
    ));

    let plan = render(&builder().with_wait_strategy(log_wait_strategy())).unwrap();
    assert!(!matches!(plan.wait_for, WaitFor::Duration { .. }));
}

#[test]
fn test_health_probe_follows_context_path_and_tls() {
    let plan = render(&builder().with_context_path("auth")).unwrap();
    let probe = format!("{:?}", plan.wait_for);
    assert!(matches!(plan.wait_for, WaitFor::Http(_)), "unexpected wait {probe}");
    assert!(probe.contains(r#"path: "/auth/health/started""#), "unexpected wait {probe}");
    assert!(probe.contains("use_tls: false"), "unexpected wait {probe}");

    let plan = render(&builder().with_context_path("auth").use_tls()).unwrap();
    let probe = format!("{:?}", plan.wait_for);
    assert!(probe.contains(r#"path: "/auth/health/started""#), "unexpected wait {probe}");
    assert!(probe.contains("use_tls: true"), "unexpected wait {probe}");

    let plan = render(&builder()).unwrap();
    let probe = format!("{:?}", plan.wait_for);
    assert!(probe.contains(r#"path: "/health/started""#), "unexpected wait {probe}");
}

#[test]
fn test_startup_timeout_is_carried() {
    let plan = render(&builder().with_startup_timeout(Duration::from_secs(5))).unwrap();
    assert_eq!(plan.startup_timeout, Duration::from_secs(5));
}

// ================================================================================================
// DEBUGGING
// ================================================================================================

#[test]
fn test_debug_on_random_port() {
    let plan = render(&builder().with_debug()).unwrap();

    assert_eq!(plan.env_value("DEBUG"), Some("true"));
    assert_eq!(plan.env_value("DEBUG_PORT"), Some("*:8787"));
    assert_eq!(plan.env_value("DEBUG_SUSPEND"), None);
    assert_eq!(plan.exposed_ports, vec![8080, 8443, 9000, 8787]);
    assert!(plan.port_bindings.is_empty());
}

#[test]
fn test_debug_on_fixed_port() {
    let plan = render(&builder().with_debug_fixed_port(5005, true)).unwrap();

    assert_eq!(plan.env_value("DEBUG_SUSPEND"), Some("y"));
    assert_eq!(plan.exposed_ports, vec![8080, 8443, 9000]);
    assert_eq!(
        plan.port_bindings,
        vec![
            PortBinding { host: 0, container: 8080 },
            PortBinding { host: 0, container: 8443 },
            PortBinding { host: 0, container: 9000 },
            PortBinding { host: 5005, container: 8787 },
        ]
    );
}

#[test]
fn test_debug_fixed_port_zero_means_random() {
    let plan = render(&builder().with_debug_fixed_port(0, false)).unwrap();
    assert!(plan.exposed_ports.contains(&8787));
    assert!(plan.port_bindings.is_empty());
}

// ================================================================================================
// REALM IMPORTS
// ================================================================================================

#[test]
fn test_realm_imports_are_copied_by_file_name() {
    let plan = render(&builder().with_realm_import_files([
        "tests/resources/test-realm.json",
        "tests/resources/another-realm.json",
    ]))
    .unwrap();

    assert_eq!(
        plan.copy_targets(),
        vec![
            "/opt/keycloak/data/import/test-realm.json",
            "/opt/keycloak/data/import/another-realm.json"
        ]
    );
    let expected =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources/test-realm.json");
    assert_eq!(plan.copies[0].source, CopySource::HostPath(expected));
    assert!(plan.cmd.contains(&"--import-realm".to_string()));
}

#[test]
fn test_same_realm_file_is_imported_once() {
    let plan = render(
        &builder()
            .with_realm_import_file("tests/resources/test-realm.json")
            .with_realm_import_file("tests/resources/test-realm.json"),
    )
    .unwrap();

    assert_eq!(plan.copies.len(), 1);
}

#[test]
fn test_same_file_name_in_different_folders_gets_prefixed() {
    let plan = render(&builder().with_realm_import_files([
        "tests/resources/test-realm.json",
        "tests/resources/nested/test-realm.json",
    ]))
    .unwrap();

    assert_eq!(
        plan.copy_targets(),
        vec![
            "/opt/keycloak/data/import/test-realm.json",
            "/opt/keycloak/data/import/1_test-realm.json"
        ]
    );
}

#[test]
fn test_prefixed_name_never_collides_with_another_import() {
    let dir = TempDir::new().unwrap();
    for folder in ["a", "b"] {
        fs::create_dir_all(dir.path().join(folder)).unwrap();
    }
    fs::write(dir.path().join("a/realm.json"), r#"{"realm": "a"}"#).unwrap();
    fs::write(dir.path().join("2_realm.json"), r#"{"realm": "two"}"#).unwrap();
    fs::write(dir.path().join("b/realm.json"), r#"{"realm": "b"}"#).unwrap();

    let plan = render(&builder_in(&dir).with_realm_import_files([
        "a/realm.json",
        "2_realm.json",
        "b/realm.json",
    ]))
    .unwrap();

    assert_eq!(
        plan.copy_targets(),
        vec![
            "/opt/keycloak/data/import/realm.json",
            "/opt/keycloak/data/import/2_realm.json",
            "/opt/keycloak/data/import/3_realm.json"
        ]
    );
}

#[test]
fn test_missing_realm_file_fails() {
    let result = render(&builder().with_realm_import_file("tests/resources/missing.json"));
    assert!(matches!(result, Err(KeycloakContainerError::Io { .. })));
}

#[test]
fn test_realm_file_without_realm_name_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), r#"{"enabled": true}"#).unwrap();

    let result = render(&builder_in(&dir).with_realm_import_file("broken.json"));
    assert!(matches!(result, Err(KeycloakContainerError::RealmImport { .. })));
}

// ================================================================================================
// PROVIDERS
// ================================================================================================

#[test]
fn test_provider_classes_are_packaged_per_location() {
    let dir = TempDir::new().unwrap();
    let classes = dir.path().join("target/classes/org/example");
    fs::create_dir_all(&classes).unwrap();
    fs::write(classes.join("Provider.class"), [0xca, 0xfe, 0xba, 0xbe]).unwrap();

    let plan = render(
        &builder_in(&dir).with_provider_classes_from(["does/not/exist", "target/classes"]),
    )
    .unwrap();

    assert_eq!(
        plan.copy_targets(),
        vec!["/opt/keycloak/providers/1_providers.jar"]
    );
    match &plan.copies[0].source {
        CopySource::Bytes(bytes) => assert!(bytes.starts_with(b"PK")),
        other => panic!("Expected an in-memory jar, got {other:?}"),
    }
}

#[test]
fn test_default_provider_classes_location() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("target/classes/META-INF")).unwrap();
    fs::write(dir.path().join("target/classes/META-INF/beans.xml"), "<beans/>").unwrap();

    let plan = render(&builder_in(&dir).with_default_provider_classes()).unwrap();
    assert_eq!(
        plan.copy_targets(),
        vec!["/opt/keycloak/providers/0_providers.jar"]
    );
}

#[test]
fn test_provider_libs_keep_their_file_name() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("datafaker-2.0.2.jar"), b"PK\x03\x04").unwrap();

    let plan = render(&builder_in(&dir).with_provider_libs_from(["datafaker-2.0.2.jar"])).unwrap();

    assert_eq!(
        plan.copy_targets(),
        vec!["/opt/keycloak/providers/datafaker-2.0.2.jar"]
    );
    assert_eq!(
        plan.copies[0].source,
        CopySource::HostPath(dir.path().join("datafaker-2.0.2.jar"))
    );
}

#[test]
fn test_missing_provider_lib_fails() {
    let dir = TempDir::new().unwrap();
    let result = render(&builder_in(&dir).with_provider_libs_from(["missing.jar"]));
    assert!(matches!(result, Err(KeycloakContainerError::Io { .. })));
}

// ================================================================================================
// TLS
// ================================================================================================

#[test]
fn test_generated_certificate() {
    let plan = render(&builder().use_tls()).unwrap();

    assert_eq!(
        plan.env_value("KC_HTTPS_CERTIFICATE_FILE"),
        Some("/opt/keycloak/conf/tls.crt")
    );
    assert_eq!(
        plan.env_value("KC_HTTPS_CERTIFICATE_KEY_FILE"),
        Some("/opt/keycloak/conf/tls.key")
    );
    assert_eq!(plan.env_value("KC_HTTPS_KEY_STORE_FILE"), None);

    let mut targets = plan.copy_targets();
    targets.sort();
    assert_eq!(
        targets,
        vec!["/opt/keycloak/conf/tls.crt", "/opt/keycloak/conf/tls.key"]
    );
    assert!(plan
        .copies
        .iter()
        .all(|copy| matches!(copy.source, CopySource::Bytes(_))));

    let trust = plan.server_trust.expect("generated certificate should be trusted");
    assert_eq!(trust.certificate_ders().unwrap().len(), 1);
}

#[test]
fn test_certificate_files() {
    let dir = TempDir::new().unwrap();
    let generated = generate_self_signed().unwrap();
    fs::write(dir.path().join("keycloak.crt"), &generated.certificate_pem).unwrap();
    fs::write(dir.path().join("keycloak.key"), &generated.private_key_pem).unwrap();

    let builder = builder_in(&dir).use_tls_certificate("keycloak.crt", "keycloak.key");
    let plan = render(&builder).unwrap();

    assert_eq!(
        plan.env_value("KC_HTTPS_CERTIFICATE_FILE"),
        Some("/opt/keycloak/conf/tls.crt")
    );
    assert!(plan.copies.iter().any(|copy| copy.target == "/opt/keycloak/conf/tls.crt"
        && copy.source == CopySource::HostPath(dir.path().join("keycloak.crt"))));
    assert!(plan.server_trust.is_some());
}

#[test]
fn test_keystore() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tls.p12"), b"not parsed while rendering").unwrap();

    let plan = render(&builder_in(&dir).use_tls_keystore("tls.p12", "changeit")).unwrap();

    assert_eq!(
        plan.env_value("KC_HTTPS_KEY_STORE_FILE"),
        Some("/opt/keycloak/conf/server.keystore")
    );
    assert_eq!(plan.env_value("KC_HTTPS_KEY_STORE_PASSWORD"), Some("changeit"));
    assert_eq!(plan.env_value("KC_HTTPS_CERTIFICATE_FILE"), None);
    assert_eq!(plan.copy_targets(), vec!["/opt/keycloak/conf/server.keystore"]);
}

#[test]
#[allow(deprecated)]
fn test_mutual_tls_truststore() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tls.p12"), b"keystore").unwrap();
    fs::write(dir.path().join("truststore.p12"), b"truststore").unwrap();

    let plan = render(
        &builder_in(&dir)
            .use_tls_keystore("tls.p12", "changeit")
            .use_mutual_tls("truststore.p12", "secret", HttpsClientAuth::Required),
    )
    .unwrap();

    assert_eq!(
        plan.env_value("KC_HTTPS_TRUST_STORE_FILE"),
        Some("/opt/keycloak/conf/server.truststore")
    );
    assert_eq!(plan.env_value("KC_HTTPS_TRUST_STORE_PASSWORD"), Some("secret"));
    assert_eq!(plan.env_value("KC_HTTPS_CLIENT_AUTH"), Some("required"));
    assert_eq!(plan.env_value("KC_HTTPS_MANAGEMENT_CLIENT_AUTH"), Some("none"));
}

#[test]
fn test_trusted_certificates() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("certs")).unwrap();
    fs::write(dir.path().join("ca.pem"), b"ca").unwrap();
    fs::write(dir.path().join("certs/client.p12"), b"client").unwrap();

    let plan = render(
        &builder_in(&dir)
            .with_trusted_certificates(["ca.pem", "certs/client.p12"])
            .with_https_client_auth(HttpsClientAuth::Request),
    )
    .unwrap();

    assert_eq!(
        plan.env_value("KC_TRUSTSTORE_PATHS"),
        Some("/opt/keycloak/conf/ca.pem,/opt/keycloak/conf/certs/client.p12")
    );
    assert_eq!(plan.env_value("KC_HTTPS_CLIENT_AUTH"), Some("request"));
    assert_eq!(plan.env_value("KC_HTTPS_CERTIFICATE_FILE"), None);
}

#[test]
fn test_client_auth_enables_tls() {
    let builder = builder().with_https_client_auth(HttpsClientAuth::Required);
    assert!(builder.is_tls_enabled());
}

// ================================================================================================
// BUILDER ACCESSORS
// ================================================================================================

#[test]
fn test_nightly_version() {
    let builder = builder().with_nightly();
    assert_eq!(builder.tag(), "nightly");
    assert_eq!(builder.keycloak_default_version(), "999.0.0-SNAPSHOT");

    let pinned = KeycloakContainerBuilder::from_image("quay.io/keycloak/keycloak", "25.0.6");
    assert_eq!(pinned.keycloak_default_version(), "25.0.6");
}

#[test]
fn test_resolve_against_resource_root() {
    let builder = builder().with_resource_root("/srv/fixtures");
    assert_eq!(
        builder.resolve("realm.json".as_ref()),
        PathBuf::from("/srv/fixtures/realm.json")
    );
    assert_eq!(
        builder.resolve("/etc/realm.json".as_ref()),
        PathBuf::from("/etc/realm.json")
    );
}

#[test]
fn test_container_request_can_be_customized() {
    let request = builder()
        .with_context_path("auth")
        .container_request()
        .unwrap()
        .with_network("integration")
        .with_container_name("keycloak");

    assert_eq!(request.network().as_deref(), Some("integration"));
    assert_eq!(request.container_name().as_deref(), Some("keycloak"));
    assert_eq!(request.image().name(), "quay.io/keycloak/keycloak");
    assert_eq!(request.image().tag(), "26.0");
}

#[test]
fn test_container_request_reports_render_errors() {
    let result = builder()
        .with_realm_import_file("tests/resources/missing.json")
        .container_request();
    assert!(matches!(result, Err(KeycloakContainerError::Io { .. })));
}
