//! rollgate control loop — drives one subject through the rollout FSM.
//!
//! For the current state the loop runs the matching action, turns a
//! successful result into that action's event, and feeds the event to
//! `trigger`. Failed actions are retried on a fixed poll interval until
//! the retry budget runs out, then the exhaustion policy forces a
//! transition. The loop ends in a terminal state and returns a
//! [`RolloutReport`].
//!
//! # Components
//!
//! - **`policy`** — poll interval, retry budget, exhaustion policy
//! - **`controller`** — the rollout session and its control loop
//! - **`error`** — errors that stop the loop before a terminal state

pub mod controller;
pub mod error;
pub mod policy;

pub use controller::{FailureReason, Outcome, Rollout, RolloutReport, Step};
pub use error::{RolloutError, RolloutResult};
pub use policy::RetryPolicy;
