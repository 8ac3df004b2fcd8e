//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::BerthConfig;
use crate::error::ProvisionError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<BerthConfig, ProvisionError> {
        let config = MergeService::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with a specific file layered in.
    pub fn load_from_file(path: &Path) -> Result<BerthConfig, ProvisionError> {
        let config = MergeService::load_with_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the standard sources.
    pub fn load_optional(path: Option<&Path>) -> Result<BerthConfig, ProvisionError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Create default configuration.
    pub fn default() -> BerthConfig {
        BerthConfig::default()
    }
}
