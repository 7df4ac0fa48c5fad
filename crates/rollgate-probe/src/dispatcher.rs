//! Action dispatch — select and run the probe for the current state.

use std::sync::Arc;

use rollgate_core::{ConfigError, ConfigResult, Event, ProbeSpec, ProbesSection, State, parse_duration};
use tracing::debug;

use crate::net::{HttpProbe, TcpProbe};
use crate::probe::{Probe, ProbeResult, StaticProbe};

/// The action attached to a non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Deploy,
    StartupProbe,
    ReadinessProbe,
}

impl ActionKind {
    /// The action for `state`, or `None` for terminal states.
    pub fn for_state(state: State) -> Option<Self> {
        match state {
            State::Pending => Some(ActionKind::Deploy),
            State::Deploying => Some(ActionKind::StartupProbe),
            State::StartupSuccess => Some(ActionKind::ReadinessProbe),
            State::ReadinessSuccess | State::Failure | State::Revoked => None,
        }
    }

    /// The event fed to the state machine when this action succeeds.
    pub fn success_event(&self) -> Event {
        match self {
            ActionKind::Deploy => Event::StartupDeploy,
            ActionKind::StartupProbe => Event::StartupProbe,
            ActionKind::ReadinessProbe => Event::ReadinessProbe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Deploy => "deploy",
            ActionKind::StartupProbe => "startup",
            ActionKind::ReadinessProbe => "readiness",
        }
    }
}

/// Outcome of one dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub result: ProbeResult,
}

impl ActionOutcome {
    pub fn success(&self) -> bool {
        self.result.is_success()
    }
}

/// One probe per action kind.
#[derive(Debug, Clone)]
pub struct ActionSet {
    deploy: Arc<dyn Probe>,
    startup: Arc<dyn Probe>,
    readiness: Arc<dyn Probe>,
}

impl ActionSet {
    pub fn new(
        deploy: Arc<dyn Probe>,
        startup: Arc<dyn Probe>,
        readiness: Arc<dyn Probe>,
    ) -> Self {
        Self {
            deploy,
            startup,
            readiness,
        }
    }

    /// Build probes from the `[probes]` config section.
    pub fn from_config(probes: &ProbesSection) -> ConfigResult<Self> {
        Ok(Self::new(
            build_probe("deploy", &probes.deploy())?,
            build_probe("startup", &probes.startup())?,
            build_probe("readiness", &probes.readiness())?,
        ))
    }

    pub fn probe(&self, kind: ActionKind) -> &Arc<dyn Probe> {
        match kind {
            ActionKind::Deploy => &self.deploy,
            ActionKind::StartupProbe => &self.startup,
            ActionKind::ReadinessProbe => &self.readiness,
        }
    }

    /// Run the action for `state`. Terminal states return `None`.
    pub async fn dispatch(&self, state: State) -> Option<ActionOutcome> {
        let kind = ActionKind::for_state(state)?;
        let probe = self.probe(kind);
        debug!(%state, action = kind.as_str(), probe = %probe.describe(), "dispatching action");
        let result = probe.exec().await;
        debug!(%state, action = kind.as_str(), ?result, "action finished");
        Some(ActionOutcome { kind, result })
    }
}

impl Default for ActionSet {
    /// Deploy and startup succeed; readiness always fails.
    fn default() -> Self {
        Self::new(
            Arc::new(StaticProbe::new("deploy", true)),
            Arc::new(StaticProbe::new("startup", true)),
            Arc::new(StaticProbe::new("readiness", false)),
        )
    }
}

fn build_probe(label: &'static str, spec: &ProbeSpec) -> ConfigResult<Arc<dyn Probe>> {
    let probe: Arc<dyn Probe> = match spec {
        ProbeSpec::Static { outcome } => Arc::new(StaticProbe::new(label, *outcome)),
        ProbeSpec::Http {
            address,
            path,
            timeout,
        } => Arc::new(HttpProbe::new(address, path, probe_timeout(label, timeout)?)),
        ProbeSpec::Tcp { address, timeout } => {
            Arc::new(TcpProbe::new(address, probe_timeout(label, timeout)?))
        }
    };
    Ok(probe)
}

fn probe_timeout(label: &'static str, raw: &str) -> ConfigResult<std::time::Duration> {
    parse_duration(raw).ok_or_else(|| ConfigError::Duration {
        field: label,
        value: raw.to_string(),
    })
}
