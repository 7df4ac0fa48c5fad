use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use rollgate_core::{ExhaustPolicy, RolloutConfig, State};
use rollgate_rollout::{FailureReason, Outcome, Rollout, RolloutReport};
use tokio::sync::watch;
use tracing::info;

use crate::OutputFormat;

/// Command-line overrides for the `[rollout]` section.
#[derive(Debug, Default, clap::Args)]
pub struct Overrides {
    /// Name of the subject being rolled out.
    #[arg(long)]
    pub subject: Option<String>,
    /// State to start from.
    #[arg(long)]
    pub initial_state: Option<State>,
    /// Pause between failed attempts (e.g. 2s, 500ms).
    #[arg(long)]
    pub poll_interval: Option<String>,
    /// Failed attempts allowed per state before the forced transition.
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// force_advance or fail.
    #[arg(long)]
    pub on_exhausted: Option<ExhaustPolicy>,
    /// Overall deadline; the rollout fails when it elapses.
    #[arg(long)]
    pub timeout: Option<String>,
}

impl Overrides {
    pub fn apply(self, config: &mut RolloutConfig) {
        let section = &mut config.rollout;
        if let Some(subject) = self.subject {
            section.subject = subject;
        }
        if let Some(state) = self.initial_state {
            section.initial_state = state;
        }
        if let Some(interval) = self.poll_interval {
            section.poll_interval = interval;
        }
        if let Some(max_retries) = self.max_retries {
            section.max_retries = max_retries;
        }
        if let Some(policy) = self.on_exhausted {
            section.on_exhausted = policy;
        }
        if let Some(timeout) = self.timeout {
            section.timeout = Some(timeout);
        }
    }
}

/// Drive the rollout. Returns whether it succeeded.
pub async fn run(
    path: Option<&Path>,
    format: OutputFormat,
    overrides: Overrides,
) -> anyhow::Result<bool> {
    let mut config = super::load_config(path)?;
    overrides.apply(&mut config);
    config.validate().context("invalid rollout settings")?;

    let mut rollout = Rollout::from_config(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = rollout.run(shutdown_rx).await?;

    match format {
        OutputFormat::Text => print!("{}", format_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(report.outcome.is_success())
}

fn format_report(report: &RolloutReport) -> String {
    let mut out = String::new();
    let result = match &report.outcome {
        Outcome::Succeeded => "succeeded".to_string(),
        Outcome::Failed(reason) => format!("failed ({})", describe_failure(reason)),
    };

    let _ = writeln!(out, "subject:  {}", report.subject);
    let _ = writeln!(out, "result:   {result}");
    let _ = writeln!(
        out,
        "state:    {} -> {}",
        report.initial_state, report.final_state
    );
    if !report.steps.is_empty() {
        let _ = writeln!(out, "steps:");
        for step in &report.steps {
            let arrow = match step.event {
                Some(event) => format!("--{event}-->"),
                None => "==>".to_string(),
            };
            let forced = if step.forced { " (forced)" } else { "" };
            let _ = writeln!(out, "  {} {arrow} {}{forced}", step.from, step.to);
        }
    }
    let _ = writeln!(out, "polls:    {}", report.polls);
    let _ = writeln!(out, "elapsed:  {}ms", report.elapsed_ms);
    out
}

fn describe_failure(reason: &FailureReason) -> String {
    match reason {
        FailureReason::TerminalState => "reached failure state".to_string(),
        FailureReason::RetriesExhausted { state, attempts } => {
            format!("{attempts} failed attempts in {state}")
        }
        FailureReason::Cancelled => "cancelled".to_string(),
        FailureReason::TimedOut => "timed out".to_string(),
    }
}
