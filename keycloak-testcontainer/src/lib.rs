/*!
# Keycloak Testcontainer

Runs a throwaway Keycloak server in Docker for integration tests.

This crate provides:
- A fluent builder for the Keycloak image's configuration (admin credentials,
  TLS, realm imports, provider deployment, debugging, startup wait)
- Rendering of that configuration into the command line, environment and
  files the image understands
- Accessors for the running server: mapped ports, server URLs and a
  ready-to-use admin API client

Container lifecycle, port mapping and readiness polling are handled by
[`testcontainers`]; the admin client is the [`keycloak`] crate's
`KeycloakAdmin`.

## Architecture

```text
┌──────────────────────────────────────────────────────────────┐
│                     Application Layer                        │
├──────────────────────────────────────────────────────────────┤
│  • KeycloakContainerBuilder   • render() -> ContainerPlan    │
│  • TestcontainerConfig (environment defaults)                │
└──────────────────────────────────────────────────────────────┘
                              │
┌──────────────────────────────────────────────────────────────┐
│                       Domain Layer                           │
├──────────────────────────────────────────────────────────────┤
│  • Settings & constants       • KeycloakContainerError       │
└──────────────────────────────────────────────────────────────┘
                              │
┌──────────────────────────────────────────────────────────────┐
│               Infrastructure Layer (Adapters)                │
├──────────────────────────────────────────────────────────────┤
│  • KeycloakImage (testcontainers::Image)                     │
│  • KeycloakContainer          • provider JAR packaging       │
│  • TLS material               • admin client / logging       │
└──────────────────────────────────────────────────────────────┘
```

## Usage

```no_run
use keycloak_testcontainer::{init_test_tracing, KeycloakContainerBuilder};

# async fn run() -> keycloak_testcontainer::ContainerResult<()> {
init_test_tracing();

let keycloak = KeycloakContainerBuilder::new()
    .with_realm_import_file("tests/resources/test-realm.json")
    .use_tls()
    .start()
    .await?;

let admin = keycloak.admin_client().await?;
let realm = admin.realm_get("test").await?;
assert_eq!(realm.realm.as_deref(), Some("test"));
# Ok(())
# }
```
*/

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::builder::KeycloakContainerBuilder;
pub use application::ports::TestcontainerConfig;
pub use domain::errors::*;
pub use domain::settings::{
    ADMIN_CLI_CLIENT, DEV_MODE_STARTED_MESSAGE, HttpsClientAuth, MASTER_REALM,
};
pub use infrastructure::adapters::{init_test_tracing, KeycloakContainer, KeycloakImage};

use testcontainers::core::WaitFor;

/// Readiness check on the dev-mode startup log line, as an alternative to the
/// default health endpoint probe
pub fn log_wait_strategy() -> WaitFor {
    WaitFor::message_on_stdout(DEV_MODE_STARTED_MESSAGE)
}
