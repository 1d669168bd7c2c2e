//! # Hermes Middleware
//!
//! The typed step pipeline every operation attempt runs through.
//!
//! ```text
//! input → Initialize → Serialize → Build → Finalize → Sign → Transmit ─┐
//!                                                                       │
//! output ← ─────────────────────────────────────────────── Deserialize ←┘
//! ```
//!
//! Each [`Step`] holds ordered [`Middleware`] for one phase. Middleware within a
//! step compose as an onion around a terminal handler supplied by the runtime.
//! The runtime chains the seven steps of an [`OperationStack`] in fixed order.
//!
//! ## Example
//!
//! ```
//! use hermes_middleware::pipeline::StepId;
//!
//! let steps = StepId::all();
//! assert_eq!(steps.len(), 7);
//! assert_eq!(steps[0].name(), "initialize");
//! assert_eq!(steps[6].name(), "deserialize");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod state;

pub use error::PipelineError;
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware, Next, Terminal};
pub use pipeline::{OperationStack, SerializeInput, Step, StepId};
pub use state::{AttemptState, ATTEMPT_STATE};
