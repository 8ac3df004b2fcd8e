//! MergeService: orchestrates sources, applies merge policy, deserializes to BerthConfig.

use crate::config::sources::{environment, file};
use crate::config::BerthConfig;
use config::ConfigError;
use std::path::Path;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from the standard sources.
    /// Precedence: defaults (lowest) -> global file -> environment (highest).
    pub fn load() -> Result<BerthConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = file::add_global_to_builder(builder)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load config with an explicit file layered between the global file and environment.
    pub fn load_with_file(path: &Path) -> Result<BerthConfig, ConfigError> {
        let builder = policy::builder_with_defaults()?;
        let builder = file::add_global_to_builder(builder)?;
        let builder = file::add_explicit_to_builder(builder, path)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }
}
