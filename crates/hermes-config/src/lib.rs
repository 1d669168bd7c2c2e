//! # Hermes Config
//!
//! Typed configuration for Hermes clients.
//!
//! Configuration is layered: built-in defaults, then a TOML or JSON file,
//! then environment variables of the form `PREFIX__SECTION__KEY`. Every
//! section rejects unknown fields so typos surface at load time.
//!
//! ```toml
//! [retry]
//! max_retries = 4
//! jitter = "decorrelated"
//!
//! [auth]
//! scheme_preference = "sigv4, httpBearerAuth"
//!
//! [endpoint]
//! url = "https://widgets.example.com"
//! region = "eu-west-1"
//!
//! [logging]
//! level = "hermes=debug"
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HermesConfig, HermesConfigBuilder};
pub use error::ConfigError;
pub use hermes_retry::{JitterMode, RetryConfig, RetryCosts};
pub use hermes_telemetry::LogConfig;
pub use loader::ConfigLoader;
pub use schema::{AuthConfig, EndpointConfig};
