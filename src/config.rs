//! Configuration
//!
//! Layered configuration for the provisioning core. Sources are merged by
//! [`MergeService`](merge::service::MergeService); callers go through the
//! [`ConfigLoader`] facade.

mod facade;
pub mod merge;
pub mod paths;
pub mod provisioning;
pub mod sources;
pub mod storage;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use provisioning::{EnrichmentMode, ProvisioningConfig};
pub use storage::StorageConfig;

use crate::error::ProvisionError;
use crate::logging::LoggingConfig;
use crate::provider::ProviderConfig;
use crate::template::{Category, TemplateCatalog, TemplateOverride};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BerthConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// LLM connection pool settings
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Per-category template overrides
    #[serde(default)]
    pub templates: BTreeMap<Category, TemplateOverride>,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl BerthConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ProvisionError> {
        self.provider.validate().map_err(ProvisionError::ConfigError)?;
        self.provisioning
            .validate()
            .map_err(ProvisionError::ConfigError)?;
        Ok(())
    }

    /// Template catalog with configured overrides applied
    pub fn template_catalog(&self) -> TemplateCatalog {
        TemplateCatalog::with_overrides(&self.templates)
    }
}
