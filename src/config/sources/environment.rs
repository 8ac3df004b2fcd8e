//! Environment overlay: `BERTH_<SECTION>__<KEY>`
//!
//! `BERTH_PROVISIONING__READINESS_TIMEOUT_MS=250` sets `provisioning.readiness_timeout_ms`.
//! The `BERTH_LOG*` variables are read by the logging module, not here.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment};

const PREFIX: &str = "BERTH";

fn source() -> Environment {
    Environment::with_prefix(PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(source()))
}
