//! # Hermes Retry
//!
//! Retry machinery for the Hermes client runtime.
//!
//! Every invocation acquires a [`RetryToken`] from its partition's
//! [`TokenBucket`] before the first attempt. Failed attempts are classified by
//! the [`ErrorClassifier`]; retryable ones are charged against the bucket and
//! delayed by [`Backoff`]. The token goes back to the bucket exactly once when
//! the invocation ends, including when it is cancelled.
//!
//! ```rust,ignore
//! use hermes_retry::{RetryConfig, RetryEngine};
//!
//! let engine = RetryEngine::from_config(RetryConfig::default())?;
//! let output = engine
//!     .execute(&mut ctx, "widgets.example.com", |ctx| Box::pin(send_once(ctx)))
//!     .await?;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-retry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backoff;
mod bucket;
mod classifier;
mod config;
mod engine;
mod error;
mod strategy;
mod token;

pub use backoff::Backoff;
pub use bucket::{RetryPartitions, TokenBucket};
pub use classifier::{ErrorClassifier, THROTTLING_CODES, TRANSIENT_CODES, TRANSIENT_STATUS_CODES};
pub use config::{JitterMode, RetryConfig, RetryCosts};
pub use engine::RetryEngine;
pub use error::RetryError;
pub use strategy::{RetryInfo, RetryStrategy, StandardRetryStrategy};
pub use token::RetryToken;
