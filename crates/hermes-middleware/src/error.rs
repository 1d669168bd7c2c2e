//! Pipeline configuration errors.

use crate::pipeline::StepId;
use crate::state::AttemptState;
use hermes_core::ClientError;
use thiserror::Error;

/// Errors raised while editing a step or driving the attempt state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A middleware with this id is already registered on the step.
    #[error("middleware {id:?} is already registered on the {step} step")]
    DuplicateMiddleware {
        /// The step.
        step: StepId,
        /// The duplicate id.
        id: String,
    },

    /// No middleware with this id is registered on the step.
    #[error("no middleware {id:?} on the {step} step")]
    MiddlewareNotFound {
        /// The step.
        step: StepId,
        /// The missing id.
        id: String,
    },

    /// The attempt state machine was asked to make an illegal move.
    #[error("illegal attempt state transition {from} -> {to}")]
    IllegalTransition {
        /// Current state.
        from: AttemptState,
        /// Requested state.
        to: AttemptState,
    },
}

impl From<PipelineError> for ClientError {
    fn from(err: PipelineError) -> Self {
        Self::middleware("pipeline", err.to_string())
    }
}
