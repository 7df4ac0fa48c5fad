//! Shared types used across rollgate crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the rollout subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Waiting to be deployed.
    Pending,
    /// Deployment issued, waiting for the startup probe.
    Deploying,
    /// Startup probe passed, waiting for the readiness probe.
    StartupSuccess,
    /// Readiness probe passed. Terminal success.
    ReadinessSuccess,
    /// Terminal failure.
    Failure,
    /// Cancelled by the operator. Terminal failure.
    Revoked,
}

impl State {
    pub const ALL: [State; 6] = [
        State::Pending,
        State::Deploying,
        State::StartupSuccess,
        State::ReadinessSuccess,
        State::Failure,
        State::Revoked,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::ReadinessSuccess | State::Failure | State::Revoked
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, State::Failure | State::Revoked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Pending => "pending",
            State::Deploying => "deploying",
            State::StartupSuccess => "startup_success",
            State::ReadinessSuccess => "readiness_success",
            State::Failure => "failure",
            State::Revoked => "revoked",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|state| state.as_str() == s.trim())
            .ok_or_else(|| format!("unknown state: {s}"))
    }
}

/// Input that drives a transition.
///
/// `Event1`..`Event3` are generic events kept for table wiring; the
/// control loop only emits the domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Event1,
    Event2,
    Event3,
    /// Deploy action succeeded.
    StartupDeploy,
    /// Startup probe succeeded.
    StartupProbe,
    /// Readiness probe succeeded (or was forced).
    ReadinessProbe,
}

impl Event {
    pub const ALL: [Event; 6] = [
        Event::Event1,
        Event::Event2,
        Event::Event3,
        Event::StartupDeploy,
        Event::StartupProbe,
        Event::ReadinessProbe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Event1 => "event1",
            Event::Event2 => "event2",
            Event::Event3 => "event3",
            Event::StartupDeploy => "startup_deploy",
            Event::StartupProbe => "startup_probe",
            Event::ReadinessProbe => "readiness_probe",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Event::ALL
            .into_iter()
            .find(|event| event.as_str() == s.trim())
            .ok_or_else(|| format!("unknown event: {s}"))
    }
}
