pub mod admin_client;
pub mod container;
pub mod image;
pub mod logging;
pub mod provider_jar;
pub mod tls;

pub use admin_client::AdminLogin;
pub use container::*;
pub use image::*;
pub use logging::*;
pub use tls::{GeneratedCertificate, ServerTrust};
