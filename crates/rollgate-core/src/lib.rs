pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::{
    ExhaustPolicy, ProbeSpec, ProbesSection, RolloutConfig, RolloutSection, parse_duration,
};
pub use error::{ConfigError, ConfigResult};
pub use table::{LintNote, Transition, TransitionTable, lookup, trigger};
pub use types::*;
