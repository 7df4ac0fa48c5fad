//! Rollout error types.

use rollgate_core::{ConfigError, Event, State};
use thiserror::Error;

/// Errors that stop the control loop before it reaches a terminal state.
#[derive(Debug, Error)]
pub enum RolloutError {
    #[error("no transition for event {event} in state {state}")]
    NoTransition { state: State, event: Event },

    #[error("transition for event {event} loops back to state {state}")]
    SelfLoop { state: State, event: Event },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

pub type RolloutResult<T> = Result<T, RolloutError>;
