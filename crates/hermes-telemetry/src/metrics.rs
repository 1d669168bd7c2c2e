//! Client metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder every
//! call is a no-op; exporting is the application's choice.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_operations_total` | Counter | `service`, `operation`, `outcome` | Completed invocations |
//! | `hermes_operation_duration_seconds` | Histogram | `service`, `operation` | Invocation latency, retries included |
//! | `hermes_attempts_total` | Counter | `service`, `operation` | Attempts sent |
//! | `hermes_retries_total` | Counter | `service`, `operation`, `error_type` | Retries scheduled |
//! | `hermes_retry_quota_available` | Gauge | `partition` | Retry bucket capacity left |

use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::Once;
use std::time::Duration;

/// Completed invocations.
pub const OPERATIONS_TOTAL: &str = "hermes_operations_total";
/// Invocation latency.
pub const OPERATION_DURATION_SECONDS: &str = "hermes_operation_duration_seconds";
/// Attempts sent.
pub const ATTEMPTS_TOTAL: &str = "hermes_attempts_total";
/// Retries scheduled.
pub const RETRIES_TOTAL: &str = "hermes_retries_total";
/// Retry bucket capacity.
pub const RETRY_QUOTA_AVAILABLE: &str = "hermes_retry_quota_available";

static DESCRIBE: Once = Once::new();

/// Registers descriptions for every Hermes metric with the installed recorder.
///
/// Call after installing a recorder; repeated calls are ignored.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!(OPERATIONS_TOTAL, "Total operation invocations by outcome");
        describe_histogram!(
            OPERATION_DURATION_SECONDS,
            ::metrics::Unit::Seconds,
            "Operation latency including retries and backoff"
        );
        describe_counter!(ATTEMPTS_TOTAL, "Total attempts sent, first tries included");
        describe_counter!(RETRIES_TOTAL, "Total retries scheduled by error type");
        describe_gauge!(RETRY_QUOTA_AVAILABLE, "Retry token bucket capacity left per partition");
    });
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Returned output.
    Success,
    /// Returned an error.
    Failure,
}

impl Outcome {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Records a completed invocation.
pub fn record_operation(service: &str, operation: &str, outcome: Outcome, duration: Duration) {
    counter!(
        OPERATIONS_TOTAL,
        "service" => service.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        OPERATION_DURATION_SECONDS,
        "service" => service.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records one attempt being sent.
pub fn record_attempt(service: &str, operation: &str) {
    counter!(
        ATTEMPTS_TOTAL,
        "service" => service.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Records a scheduled retry.
pub fn record_retry(service: &str, operation: &str, error_type: &str) {
    counter!(
        RETRIES_TOTAL,
        "service" => service.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Publishes the capacity left in a partition's retry bucket.
pub fn record_retry_quota(partition: &str, available: u32) {
    gauge!(RETRY_QUOTA_AVAILABLE, "partition" => partition.to_string()).set(f64::from(available));
}
