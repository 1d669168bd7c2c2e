//! Observability for the Hermes client runtime.
//!
//! - **Logging**: opt-in `tracing` subscriber setup ([`init_logging`]) and the
//!   shared field vocabulary used on runtime spans
//! - **Metrics**: operation, attempt and retry counters through the `metrics`
//!   facade (no exporter; install your own recorder)
//! - **Clock skew**: per-host server clock offsets learned from responses
//!
//! The runtime emits events whether or not anything listens; nothing here is
//! required for a client to work.

#![warn(missing_docs)]

pub mod clock_skew;
pub mod error;
pub mod logging;
pub mod metrics;

pub use self::clock_skew::ClockSkewStore;
pub use self::error::TelemetryError;
pub use self::logging::{init_logging, LogConfig};
pub use self::metrics::{describe_metrics, Outcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
