//! Test utilities for Hermes clients.
//!
//! This crate provides an in-memory [`StubTransport`] that replays scripted
//! responses and records what the runtime sent, plus a small fixture service
//! ("widgets") whose operations exercise the full pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_test::{fixtures, StubReply, StubTransport};
//!
//! let transport = StubTransport::new()
//!     .reply(StubReply::error(429, "ThrottlingException", "slow down"))
//!     .reply(StubReply::json(200, serde_json::json!({"id": "w-1", "name": "gear"})));
//!
//! let client = fixtures::client(transport.clone())?;
//! let widget = client
//!     .invoke(&fixtures::get_widget(), fixtures::GetWidgetInput::new("w-1"))
//!     .await?;
//!
//! assert_eq!(widget.name, "gear");
//! assert_eq!(transport.invocations(), 2);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod fixtures;
mod recording;
mod signing;
mod transport;

pub use error::TestError;
pub use recording::{EventLog, RecordingMiddleware, Taggable};
pub use signing::FixedSignatureCalculator;
pub use transport::{RecordedRequest, StubReply, StubTransport};
