//! rollgate.toml configuration parser.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::table::{Transition, TransitionTable};
use crate::types::State;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub rollout: RolloutSection,
    pub probes: ProbesSection,
    /// Replaces the standard table when present.
    pub transitions: Option<Vec<Transition>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutSection {
    pub subject: String,
    pub initial_state: State,
    pub poll_interval: String,
    pub max_retries: u32,
    pub on_exhausted: ExhaustPolicy,
    pub timeout: Option<String>,
}

impl Default for RolloutSection {
    fn default() -> Self {
        Self {
            subject: "default".to_string(),
            initial_state: State::Pending,
            poll_interval: "2s".to_string(),
            max_retries: 10,
            on_exhausted: ExhaustPolicy::ForceAdvance,
            timeout: None,
        }
    }
}

impl RolloutSection {
    pub fn poll_interval(&self) -> ConfigResult<Duration> {
        parse_duration(&self.poll_interval).ok_or_else(|| ConfigError::Duration {
            field: "rollout.poll_interval",
            value: self.poll_interval.clone(),
        })
    }

    pub fn timeout(&self) -> ConfigResult<Option<Duration>> {
        match &self.timeout {
            None => Ok(None),
            Some(raw) => parse_duration(raw)
                .map(Some)
                .ok_or_else(|| ConfigError::Duration {
                    field: "rollout.timeout",
                    value: raw.clone(),
                }),
        }
    }
}

/// What to do once a state has used up its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustPolicy {
    /// Fire the state's success event anyway.
    #[default]
    ForceAdvance,
    /// Move straight to `Failure`.
    Fail,
}

impl FromStr for ExhaustPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "force_advance" | "force-advance" => Ok(Self::ForceAdvance),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown exhaustion policy: {other}")),
        }
    }
}

/// Probe wiring per action. Missing entries fall back to the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesSection {
    pub deploy: Option<ProbeSpec>,
    pub startup: Option<ProbeSpec>,
    pub readiness: Option<ProbeSpec>,
}

impl ProbesSection {
    pub fn deploy(&self) -> ProbeSpec {
        self.deploy.clone().unwrap_or(ProbeSpec::Static { outcome: true })
    }

    pub fn startup(&self) -> ProbeSpec {
        self.startup.clone().unwrap_or(ProbeSpec::Static { outcome: true })
    }

    /// The readiness probe reports failure unless configured otherwise.
    pub fn readiness(&self) -> ProbeSpec {
        self.readiness
            .clone()
            .unwrap_or(ProbeSpec::Static { outcome: false })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeSpec {
    Static {
        outcome: bool,
    },
    Http {
        address: String,
        #[serde(default = "default_http_path")]
        path: String,
        #[serde(default = "default_probe_timeout")]
        timeout: String,
    },
    Tcp {
        address: String,
        #[serde(default = "default_probe_timeout")]
        timeout: String,
    },
}

fn default_http_path() -> String {
    "/healthz".to_string()
}

fn default_probe_timeout() -> String {
    "2s".to_string()
}

impl RolloutConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: RolloutConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check durations and probe addresses up front so the rollout never
    /// starts with a config it cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        self.rollout.poll_interval()?;
        self.rollout.timeout()?;

        if self.rollout.subject.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "rollout.subject",
                reason: "must not be empty".to_string(),
            });
        }

        for (field, spec) in [
            ("probes.deploy", &self.probes.deploy),
            ("probes.startup", &self.probes.startup),
            ("probes.readiness", &self.probes.readiness),
        ] {
            let Some(spec) = spec else { continue };
            match spec {
                ProbeSpec::Static { .. } => {}
                ProbeSpec::Http {
                    address, timeout, ..
                }
                | ProbeSpec::Tcp { address, timeout } => {
                    if address.trim().is_empty() {
                        return Err(ConfigError::Invalid {
                            field,
                            reason: "address must not be empty".to_string(),
                        });
                    }
                    if parse_duration(timeout).is_none() {
                        return Err(ConfigError::Duration {
                            field,
                            value: timeout.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// The configured table, or the standard one.
    pub fn table(&self) -> TransitionTable {
        match &self.transitions {
            Some(rows) => TransitionTable::new(rows.clone()),
            None => TransitionTable::standard(),
        }
    }
}

/// Parse a duration such as "500ms", "5s", "2m", "1h", or bare seconds.
///
/// Returns `None` for unknown units and for values that overflow.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}
