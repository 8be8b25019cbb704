use testcontainers::core::logs::LogFrame;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::ports::{DEFAULT_LOG_FILTER, ENV_TEST_LOG};

/// Target under which container output is logged
pub const CONTAINER_LOG_TARGET: &str = "keycloak_testcontainer::container";

/// Forwards one frame of container output to `tracing`
pub fn forward_container_log(frame: &LogFrame) {
    let text = String::from_utf8_lossy(frame.bytes());
    let line = text.trim_end();
    if line.is_empty() {
        return;
    }
    match frame {
        LogFrame::StdOut(_) => tracing::info!(target: CONTAINER_LOG_TARGET, "{}", line),
        LogFrame::StdErr(_) => tracing::warn!(target: CONTAINER_LOG_TARGET, "{}", line),
    }
}

/// Installs a fmt subscriber filtered by `KEYCLOAK_TEST_LOG`, then `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_env(ENV_TEST_LOG)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
