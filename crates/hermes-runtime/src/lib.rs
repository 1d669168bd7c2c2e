//! # Hermes Runtime
//!
//! Turns a typed operation call into signed HTTP attempts and back.
//!
//! A [`Client`] owns an immutable [`ClientConfig`]: the transport, endpoint,
//! auth schemes with their identity resolvers, and the retry engine. Generated
//! glue describes each operation as an [`Operation`] (descriptor plus codec
//! closures). The [`Orchestrator`] drives every attempt through the seven
//! pipeline steps under the retry engine:
//!
//! ```text
//! retry engine ⟹ initialize → serialize → build → finalize
//!              → sign (auth resolution + signer) → transmit → deserialize
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use hermes_runtime::{Client, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .transport(my_transport)
//!     .endpoint_url("https://widgets.example.com")
//!     .region("us-west-2")
//!     .build()?;
//!
//! let client = Client::new(config);
//! let widget = client.invoke(&get_widget, input).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-runtime/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod operation;
mod orchestrator;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder, Plugin};
pub use operation::{
    default_error_classifier, Deserializer, ErrorClassifierFn, Operation, Serializer, StackCustomizer,
    ERROR_TYPE_HEADER,
};
pub use orchestrator::Orchestrator;
