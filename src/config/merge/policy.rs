//! Merge policy: the built-in defaults form the lowest layer.

use crate::config::BerthConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder seeded with `BerthConfig::default()`.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&BerthConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
