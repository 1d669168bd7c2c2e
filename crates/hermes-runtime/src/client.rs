//! The client handle generated service clients wrap.

use crate::config::ClientConfig;
use crate::operation::Operation;
use crate::orchestrator::Orchestrator;
use hermes_core::{ClientError, ModeledError, SdkError};
use hermes_telemetry::describe_metrics;
use std::sync::Arc;

/// A configured client. Cheap to clone; clones share configuration, retry
/// quota and clock skew.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
}

impl Client {
    /// Wraps a built configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        describe_metrics();
        Self {
            config: Arc::new(config),
        }
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Prepares `operation` for repeated invocation.
    ///
    /// # Errors
    ///
    /// Fails if the operation's middleware edits are rejected.
    pub fn orchestrator<I, O, E>(&self, operation: Operation<I, O, E>) -> Result<Orchestrator<I, O, E>, ClientError>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: ModeledError,
    {
        Orchestrator::new(Arc::clone(&self.config), operation)
    }

    /// Invokes `operation` once with `input`.
    pub async fn invoke<I, O, E>(&self, operation: &Operation<I, O, E>, input: I) -> Result<O, SdkError<E>>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: ModeledError,
    {
        let orchestrator = self.orchestrator(operation.clone())?;
        orchestrator.invoke(input).await
    }

    /// Closes the transport.
    pub fn close(&self) {
        tracing::debug!("closing client transport");
        self.config.transport().close();
    }
}
