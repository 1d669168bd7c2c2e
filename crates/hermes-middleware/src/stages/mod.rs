//! Built-in middleware registered on every operation.
//!
//! | Step | Middleware | Effect |
//! |------|------------|--------|
//! | Initialize | [`IdempotencyTokenMiddleware`] | fills an empty idempotency token |
//! | Build | [`EndpointMiddleware`] | applies scheme, host and base path |
//! | Build | [`ContentLengthMiddleware`] | sets `content-length` |
//! | Build | [`InvocationIdMiddleware`] | sets `amz-sdk-invocation-id` |
//! | Finalize | [`RetryInfoMiddleware`] | sets `amz-sdk-request` |
//! | Transmit, Deserialize | [`LoggingMiddleware`] | wire-level `debug` events |
//! | Deserialize | [`ClockSkewMiddleware`] | records server clock skew |

pub mod clock_skew;
pub mod content_length;
pub mod endpoint;
pub mod idempotency_token;
pub mod invocation_id;
pub mod logging;
pub mod retry_info;

pub use clock_skew::ClockSkewMiddleware;
pub use content_length::ContentLengthMiddleware;
pub use endpoint::EndpointMiddleware;
pub use idempotency_token::IdempotencyTokenMiddleware;
pub use invocation_id::InvocationIdMiddleware;
pub use logging::LoggingMiddleware;
pub use retry_info::RetryInfoMiddleware;
