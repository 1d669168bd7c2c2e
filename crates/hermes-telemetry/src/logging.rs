//! Structured logging for applications using Hermes.
//!
//! The runtime only *emits* `tracing` events and spans; it never installs a
//! subscriber. Applications that want output call [`init_logging`] once at
//! startup (or install their own subscriber).
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation = "GetWidget", "calling service");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. `"info"`, `"hermes_runtime=debug,info"`).
    pub level: String,

    /// Whether to output JSON.
    pub json_format: bool,

    /// Whether to log span open/close events (shows per-attempt timing).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output with wire-level detail.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// Checks that the filter directive parses.
    pub fn validate(&self) -> TelemetryResult<()> {
        create_env_filter(&self.level).map(|_| ())
    }
}

/// Installs a global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::LoggingInit`] if the filter is invalid or a
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Parses a filter directive.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log filter {filter:?}: {e}")))
}

/// Field names used on Hermes spans and events.
pub mod fields {
    /// Invocation id (UUID v7).
    pub const INVOCATION_ID: &str = "invocation_id";
    /// Service name.
    pub const SERVICE: &str = "service";
    /// Operation name.
    pub const OPERATION: &str = "operation";
    /// 1-based attempt number.
    pub const ATTEMPT: &str = "attempt";
    /// Retry partition (endpoint host).
    pub const PARTITION: &str = "partition";
    /// Selected auth scheme id.
    pub const AUTH_SCHEME: &str = "auth_scheme";
    /// HTTP method.
    pub const METHOD: &str = "method";
    /// Request URI.
    pub const URI: &str = "uri";
    /// Response status code.
    pub const STATUS: &str = "status";
    /// Duration in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";
    /// Retry backoff in milliseconds.
    pub const DELAY_MS: &str = "delay_ms";
    /// Error taxonomy label (`client`, `service`, `network`, `unknown_service`).
    pub const ERROR_KIND: &str = "error_kind";
    /// Retry classification (`transient`, `throttling`, ...).
    pub const ERROR_TYPE: &str = "error_type";
}
