//! The probe capability and the in-process probe implementations.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// Result of a single probe execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The action succeeded.
    Healthy,
    /// The action ran but reported failure (non-2xx, explicit `false`).
    Unhealthy,
    /// The action could not be executed (connection error, timeout).
    Failed,
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Healthy)
    }
}

impl From<bool> for ProbeResult {
    fn from(ok: bool) -> Self {
        if ok {
            ProbeResult::Healthy
        } else {
            ProbeResult::Unhealthy
        }
    }
}

pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>>;

/// A single action: execute and report the outcome.
///
/// Real deployment APIs and health checks plug in here without the
/// control loop knowing about them.
pub trait Probe: Send + Sync + fmt::Debug {
    /// Short label used in logs.
    fn describe(&self) -> String;

    fn exec(&self) -> ProbeFuture<'_>;
}

/// Probe with a fixed outcome. It only logs that it ran.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    label: String,
    outcome: bool,
}

impl StaticProbe {
    pub fn new(label: &str, outcome: bool) -> Self {
        Self {
            label: label.to_string(),
            outcome,
        }
    }
}

impl Probe for StaticProbe {
    fn describe(&self) -> String {
        format!("static:{}", self.label)
    }

    fn exec(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            info!(probe = %self.label, outcome = self.outcome, "running static probe");
            ProbeResult::from(self.outcome)
        })
    }
}

/// Replays a fixed sequence of results, repeating the last one forever.
///
/// An empty script always reports `Unhealthy`.
#[derive(Debug)]
pub struct ScriptedProbe {
    script: Vec<ProbeResult>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: Vec<ProbeResult>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail `failures` times, then succeed.
    pub fn succeed_after(failures: usize) -> Self {
        let mut script = vec![ProbeResult::Unhealthy; failures];
        script.push(ProbeResult::Healthy);
        Self::new(script)
    }

    pub fn always(result: ProbeResult) -> Self {
        Self::new(vec![result])
    }

    /// Number of times the probe has been executed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for ScriptedProbe {
    fn describe(&self) -> String {
        format!("scripted:{}", self.script.len())
    }

    fn exec(&self) -> ProbeFuture<'_> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .script
            .get(call)
            .or(self.script.last())
            .copied()
            .unwrap_or(ProbeResult::Unhealthy);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_probe_reports_outcome() {
        assert_eq!(StaticProbe::new("deploy", true).exec().await, ProbeResult::Healthy);
        assert_eq!(
            StaticProbe::new("readiness", false).exec().await,
            ProbeResult::Unhealthy
        );
    }

    #[tokio::test]
    async fn scripted_probe_repeats_last() {
        let probe = ScriptedProbe::succeed_after(2);
        assert_eq!(probe.exec().await, ProbeResult::Unhealthy);
        assert_eq!(probe.exec().await, ProbeResult::Unhealthy);
        assert_eq!(probe.exec().await, ProbeResult::Healthy);
        assert_eq!(probe.exec().await, ProbeResult::Healthy);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn empty_script_is_unhealthy() {
        let probe = ScriptedProbe::new(Vec::new());
        assert_eq!(probe.exec().await, ProbeResult::Unhealthy);
    }

    #[test]
    fn only_healthy_is_success() {
        assert!(ProbeResult::Healthy.is_success());
        assert!(!ProbeResult::Unhealthy.is_success());
        assert!(!ProbeResult::Failed.is_success());
    }
}
