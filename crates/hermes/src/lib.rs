//! # Hermes
//!
//! **Request-execution runtime for generated service clients**
//!
//! Generated clients describe each operation (its shapes, modeled errors, auth
//! candidates and codec closures) and hand it to Hermes, which runs every
//! invocation through the same pipeline:
//!
//! - **Staged middleware** – seven typed steps, each an onion of middleware
//!   that generated code and users can extend
//! - **Auth** – scheme selection by preference, identity resolution, SigV4 and
//!   bearer signing
//! - **Retries** – standard strategy with exponential backoff, jitter and a
//!   per-host retry quota
//! - **Errors** – modeled errors decoded through a type registry, everything
//!   else surfaced with its wire metadata
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .transport(my_transport)
//!         .endpoint_url("https://widgets.example.com")
//!         .region("us-west-2")
//!         .build()?;
//!
//!     let client = Client::new(config);
//!     let widget = client.invoke(&get_widget(), GetWidgetInput::new("w-1")).await?;
//!     println!("{widget:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! Each attempt walks the steps in order; the retry engine wraps the whole
//! attempt:
//!
//! ```text
//! Initialize → Serialize → Build → Finalize → Sign → Transmit → Deserialize
//!     │                                          │         │
//!  typed input                               auth + sign  transport
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export shared types
pub use hermes_core as core;

// Re-export the middleware pipeline
pub use hermes_middleware as middleware;

// Re-export auth schemes and signers
pub use hermes_auth as auth;

// Re-export the retry strategy
pub use hermes_retry as retry;

// Re-export the client runtime
pub use hermes_runtime as runtime;

// Re-export logging and metrics
pub use hermes_telemetry as telemetry;

// Re-export configuration loading
pub use hermes_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        ClientError, Context, ErrorFault, ErrorMetadata, HttpRequest, HttpResponse, ModeledError,
        NetworkError, OperationDescriptor, SdkError, ServiceSchema, ShapeId, Transport, TypeRegistry,
        WireError,
    };

    // Re-export middleware types
    pub use hermes_middleware::{FnMiddleware, Middleware, Next, OperationStack, SerializeInput, Step, StepId};

    // Re-export auth types
    pub use hermes_auth::{
        AuthScheme, BearerAuthScheme, CachingIdentityResolver, IdentityResolver, NoAuthScheme, SigV4AuthScheme,
        SignatureCalculator, StaticIdentityResolver,
    };

    // Re-export retry types
    pub use hermes_retry::{JitterMode, RetryConfig, RetryStrategy, StandardRetryStrategy};

    // Re-export runtime types
    pub use hermes_runtime::{Client, ClientConfig, ClientConfigBuilder, Operation, Orchestrator};

    // Re-export configuration types
    pub use hermes_config::{ConfigLoader, HermesConfig};

    // Re-export logging setup
    pub use hermes_telemetry::{init_logging, LogConfig};
}
