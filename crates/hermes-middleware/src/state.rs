//! Per-attempt state machine.
//!
//! ```text
//! NotStarted → Initialize → Serialize → Build → Finalize → Sign
//!            → Transmitting → Deserializing → Succeeded
//!
//! any non-terminal state → Failed → NotStarted (retry)
//! ```
//!
//! The current state lives in the [`Context`] under [`ATTEMPT_STATE`].

use crate::error::PipelineError;
use hermes_core::{AttributeKey, Context};
use std::fmt;

/// Context key holding the current attempt state.
pub const ATTEMPT_STATE: AttributeKey<AttemptState> = AttributeKey::new("attempt_state");

/// Where an attempt is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttemptState {
    /// Nothing has run yet.
    #[default]
    NotStarted,
    /// Running the initialize step.
    Initialize,
    /// Running the serialize step.
    Serialize,
    /// Running the build step.
    Build,
    /// Running the finalize step.
    Finalize,
    /// Resolving auth and signing.
    Sign,
    /// Waiting on the transport.
    Transmitting,
    /// Turning the response into output or an error.
    Deserializing,
    /// The attempt produced output.
    Succeeded,
    /// The attempt failed.
    Failed,
}

impl AttemptState {
    /// Returns the state name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Initialize => "initialize",
            Self::Serialize => "serialize",
            Self::Build => "build",
            Self::Finalize => "finalize",
            Self::Sign => "sign",
            Self::Transmitting => "transmitting",
            Self::Deserializing => "deserializing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `Succeeded` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Initialize)
                | (Self::Initialize, Self::Serialize)
                | (Self::Serialize, Self::Build)
                | (Self::Build, Self::Finalize)
                | (Self::Finalize, Self::Sign)
                | (Self::Sign, Self::Transmitting)
                | (Self::Transmitting, Self::Deserializing)
                | (Self::Deserializing, Self::Succeeded)
                | (Self::Failed, Self::NotStarted)
        ) || (!self.is_terminal() && matches!(next, Self::Failed))
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the attempt state recorded in `ctx`.
#[must_use]
pub fn current(ctx: &Context) -> AttemptState {
    ctx.get(&ATTEMPT_STATE).copied().unwrap_or_default()
}

/// Moves the attempt in `ctx` to `to`, returning the previous state.
pub fn transition(ctx: &mut Context, to: AttemptState) -> Result<AttemptState, PipelineError> {
    let from = current(ctx);
    if !from.can_transition_to(to) {
        return Err(PipelineError::IllegalTransition { from, to });
    }
    tracing::trace!(from = from.name(), to = to.name(), "attempt state transition");
    ctx.set(&ATTEMPT_STATE, to);
    Ok(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [AttemptState; 8] = [
        AttemptState::Initialize,
        AttemptState::Serialize,
        AttemptState::Build,
        AttemptState::Finalize,
        AttemptState::Sign,
        AttemptState::Transmitting,
        AttemptState::Deserializing,
        AttemptState::Succeeded,
    ];

    #[test]
    fn test_happy_path() {
        let mut ctx = Context::new();
        assert_eq!(current(&ctx), AttemptState::NotStarted);
        for state in HAPPY_PATH {
            transition(&mut ctx, state).unwrap();
        }
        assert_eq!(current(&ctx), AttemptState::Succeeded);
    }

    #[test]
    fn test_skipping_a_step_is_rejected() {
        let mut ctx = Context::new();
        transition(&mut ctx, AttemptState::Initialize).unwrap();
        let err = transition(&mut ctx, AttemptState::Sign).unwrap_err();
        assert_eq!(
            err,
            PipelineError::IllegalTransition {
                from: AttemptState::Initialize,
                to: AttemptState::Sign,
            }
        );
        assert_eq!(current(&ctx), AttemptState::Initialize);
    }

    #[test]
    fn test_failure_then_retry() {
        let mut ctx = Context::new();
        transition(&mut ctx, AttemptState::Initialize).unwrap();
        transition(&mut ctx, AttemptState::Failed).unwrap();
        assert!(transition(&mut ctx, AttemptState::Failed).is_err());
        transition(&mut ctx, AttemptState::NotStarted).unwrap();
        transition(&mut ctx, AttemptState::Initialize).unwrap();
    }

    #[test]
    fn test_success_is_final() {
        assert!(!AttemptState::Succeeded.can_transition_to(AttemptState::NotStarted));
        assert!(!AttemptState::Succeeded.can_transition_to(AttemptState::Failed));
        assert!(!AttemptState::NotStarted.can_transition_to(AttemptState::Succeeded));
    }
}
