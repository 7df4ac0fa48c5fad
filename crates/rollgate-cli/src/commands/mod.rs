pub mod run;
pub mod table;

use std::path::Path;

use anyhow::Context;
use rollgate_core::RolloutConfig;

/// Load the config file, or fall back to defaults when none is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RolloutConfig> {
    match path {
        Some(path) => RolloutConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(RolloutConfig::default()),
    }
}
