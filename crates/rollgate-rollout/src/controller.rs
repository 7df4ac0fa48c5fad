//! Rollout controller — drives the subject through the state machine.
//!
//! The controller owns the current state. Each turn of the loop runs the
//! action for that state and applies the resulting event through
//! `trigger`. Cancellation and the overall timeout force the subject into
//! a failure terminal from any non-terminal state.

use std::time::Instant;

use rollgate_core::{Event, ExhaustPolicy, RolloutConfig, State, TransitionTable};
use rollgate_probe::ActionSet;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{RolloutError, RolloutResult};
use crate::policy::RetryPolicy;

/// One state change recorded by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub from: State,
    /// `None` when the state was forced without going through the table.
    pub event: Option<Event>,
    pub to: State,
    pub forced: bool,
}

/// Why a rollout ended in a failure terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// The table led to (or the rollout started in) a failure state.
    TerminalState,
    /// A state used up its retry budget with `on_exhausted = fail`.
    RetriesExhausted { state: State, attempts: u32 },
    /// The shutdown signal fired.
    Cancelled,
    /// The overall timeout elapsed.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// Terminal notification handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    pub subject: String,
    pub initial_state: State,
    pub final_state: State,
    pub outcome: Outcome,
    pub steps: Vec<Step>,
    /// Total number of actions executed.
    pub polls: u32,
    pub elapsed_ms: u64,
}

/// A rollout session for a single subject.
#[derive(Debug)]
pub struct Rollout {
    subject: String,
    table: TransitionTable,
    actions: ActionSet,
    policy: RetryPolicy,
    timeout: Option<std::time::Duration>,
    initial_state: State,
    state: State,
    /// Failed attempts in the current state.
    attempts: u32,
    polls: u32,
    steps: Vec<Step>,
    failure: Option<FailureReason>,
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

impl Rollout {
    /// Create a rollout starting in `Pending`.
    pub fn new(
        subject: &str,
        table: TransitionTable,
        actions: ActionSet,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            table,
            actions,
            policy,
            timeout: None,
            initial_state: State::Pending,
            state: State::Pending,
            attempts: 0,
            polls: 0,
            steps: Vec::new(),
            failure: None,
        }
    }

    pub fn from_config(config: &RolloutConfig) -> RolloutResult<Self> {
        let rollout = Self::new(
            &config.rollout.subject,
            config.table(),
            ActionSet::from_config(&config.probes)?,
            RetryPolicy::from_section(&config.rollout)?,
        )
        .with_initial_state(config.rollout.initial_state)
        .with_timeout(config.rollout.timeout()?);
        Ok(rollout)
    }

    pub fn with_initial_state(mut self, state: State) -> Self {
        self.initial_state = state;
        self.state = state;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run without an external shutdown signal.
    pub async fn run_to_completion(&mut self) -> RolloutResult<RolloutReport> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run(shutdown_rx).await
    }

    /// Run the control loop until the subject reaches a terminal state.
    ///
    /// Setting `shutdown` to `true` revokes the rollout.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> RolloutResult<RolloutReport> {
        let started = Instant::now();
        let deadline = self
            .timeout
            .and_then(|t| tokio::time::Instant::now().checked_add(t));

        info!(subject = %self.subject, state = %self.state, "rollout started");

        while !self.state.is_terminal() {
            let interrupt = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => Some(Interrupt::Cancelled),
                _ = wait_for_deadline(deadline) => Some(Interrupt::TimedOut),
                res = self.advance() => {
                    res?;
                    None
                }
            };

            match interrupt {
                Some(Interrupt::Cancelled) => {
                    warn!(subject = %self.subject, state = %self.state, "rollout cancelled");
                    self.force(State::Revoked, FailureReason::Cancelled);
                }
                Some(Interrupt::TimedOut) => {
                    warn!(subject = %self.subject, state = %self.state, "rollout timed out");
                    self.force(State::Failure, FailureReason::TimedOut);
                }
                None => {}
            }
        }

        let report = self.report(started);
        match &report.outcome {
            Outcome::Succeeded => {
                info!(subject = %self.subject, steps = report.steps.len(), "rollout succeeded")
            }
            Outcome::Failed(reason) => {
                warn!(subject = %self.subject, state = %self.state, ?reason, "rollout failed")
            }
        }
        Ok(report)
    }

    /// Run one action for the current state and apply its result.
    ///
    /// Terminal states are left untouched.
    pub async fn advance(&mut self) -> RolloutResult<()> {
        let Some(outcome) = self.actions.dispatch(self.state).await else {
            return Ok(());
        };
        self.polls += 1;

        let event = outcome.kind.success_event();
        if outcome.success() {
            return self.fire(event, false);
        }

        tokio::time::sleep(self.policy.poll_interval).await;
        self.attempts += 1;
        debug!(
            subject = %self.subject,
            state = %self.state,
            attempt = self.attempts,
            max_retries = self.policy.max_retries,
            "action failed, polling again"
        );

        if !self.policy.exhausted(self.attempts) {
            return Ok(());
        }

        warn!(
            subject = %self.subject,
            state = %self.state,
            attempts = self.attempts,
            policy = ?self.policy.on_exhausted,
            "retries exhausted"
        );
        match self.policy.on_exhausted {
            ExhaustPolicy::ForceAdvance => self.fire(event, true),
            ExhaustPolicy::Fail => {
                let reason = FailureReason::RetriesExhausted {
                    state: self.state,
                    attempts: self.attempts,
                };
                self.force(State::Failure, reason);
                Ok(())
            }
        }
    }

    /// Apply `event` through the table. A missing row or a row back to
    /// the same state is an error; the loop would repeat the action forever.
    fn fire(&mut self, event: Event, forced: bool) -> RolloutResult<()> {
        let from = self.state;
        let to = match self.table.lookup(from, event) {
            None => return Err(RolloutError::NoTransition { state: from, event }),
            Some(to) if to == from => return Err(RolloutError::SelfLoop { state: from, event }),
            Some(to) => to,
        };

        self.steps.push(Step {
            from,
            event: Some(event),
            to,
            forced,
        });
        self.enter(to);
        Ok(())
    }

    /// Move to a failure terminal without consulting the table.
    fn force(&mut self, to: State, reason: FailureReason) {
        self.steps.push(Step {
            from: self.state,
            event: None,
            to,
            forced: true,
        });
        self.failure = Some(reason);
        self.enter(to);
    }

    fn enter(&mut self, to: State) {
        info!(subject = %self.subject, from = %self.state, %to, "state changed");
        self.state = to;
        self.attempts = 0;
    }

    fn report(&self, started: Instant) -> RolloutReport {
        let outcome = if self.state.is_failure() {
            Outcome::Failed(self.failure.clone().unwrap_or(FailureReason::TerminalState))
        } else {
            Outcome::Succeeded
        };

        RolloutReport {
            subject: self.subject.clone(),
            initial_state: self.initial_state,
            final_state: self.state,
            outcome,
            steps: self.steps.clone(),
            polls: self.polls,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Resolve once the shutdown flag is set. A dropped sender never cancels.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rollgate_core::Transition;
    use rollgate_probe::{ProbeResult, ScriptedProbe};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            poll_interval: Duration::from_millis(1),
            max_retries,
            on_exhausted: ExhaustPolicy::ForceAdvance,
        }
    }

    fn healthy_actions() -> ActionSet {
        ActionSet::new(
            Arc::new(ScriptedProbe::always(ProbeResult::Healthy)),
            Arc::new(ScriptedProbe::always(ProbeResult::Healthy)),
            Arc::new(ScriptedProbe::always(ProbeResult::Healthy)),
        )
    }

    #[tokio::test]
    async fn advance_moves_one_state() {
        let mut rollout = Rollout::new(
            "deploy/a",
            TransitionTable::standard(),
            healthy_actions(),
            fast_policy(10),
        );

        rollout.advance().await.unwrap();
        assert_eq!(rollout.state(), State::Deploying);
        assert_eq!(
            rollout.steps(),
            &[Step {
                from: State::Pending,
                event: Some(Event::StartupDeploy),
                to: State::Deploying,
                forced: false,
            }]
        );
    }

    #[tokio::test]
    async fn advance_on_terminal_state_is_noop() {
        let mut rollout = Rollout::new(
            "deploy/a",
            TransitionTable::standard(),
            healthy_actions(),
            fast_policy(10),
        )
        .with_initial_state(State::ReadinessSuccess);

        rollout.advance().await.unwrap();
        assert_eq!(rollout.state(), State::ReadinessSuccess);
        assert!(rollout.steps().is_empty());
    }

    #[tokio::test]
    async fn failed_attempts_reset_on_state_change() {
        let deploy = Arc::new(ScriptedProbe::succeed_after(2));
        let startup = Arc::new(ScriptedProbe::succeed_after(2));
        let actions = ActionSet::new(
            deploy.clone(),
            startup.clone(),
            Arc::new(ScriptedProbe::always(ProbeResult::Healthy)),
        );
        // Budget of 2 per state: each state fails twice, then succeeds.
        let mut rollout =
            Rollout::new("deploy/a", TransitionTable::standard(), actions, fast_policy(2));

        let report = rollout.run_to_completion().await.unwrap();
        assert!(report.outcome.is_success());
        assert!(report.steps.iter().all(|s| !s.forced));
        assert_eq!(deploy.calls(), 3);
        assert_eq!(startup.calls(), 3);
    }

    #[tokio::test]
    async fn table_leading_to_failure_reports_terminal_state() {
        let table = TransitionTable::new(vec![Transition::new(
            State::Pending,
            Event::StartupDeploy,
            State::Failure,
        )]);
        let mut rollout = Rollout::new("deploy/a", table, healthy_actions(), fast_policy(1));

        let report = rollout.run_to_completion().await.unwrap();
        assert_eq!(report.final_state, State::Failure);
        assert_eq!(report.outcome, Outcome::Failed(FailureReason::TerminalState));
    }

    #[test]
    fn report_serializes_outcome_tags() {
        let outcome = Outcome::Failed(FailureReason::RetriesExhausted {
            state: State::StartupSuccess,
            attempts: 3,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "retries_exhausted");
        assert_eq!(json["state"], "startup_success");
    }
}
