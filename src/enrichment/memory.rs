//! Memory setup unit and the memory-store port.

use crate::agent::{AgentEntity, MemoryConfig};
use crate::error::ProvisionError;
use crate::types::ConfigMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

pub const MEMORY_ENABLED_KEY: &str = "memory_enabled";
const MEMORY_KEY_PREFIX: &str = "memory_";

/// Applies memory-related configuration for an agent
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn apply(
        &self,
        current: &MemoryConfig,
        settings: &ConfigMap,
    ) -> Result<MemoryConfig, ProvisionError>;
}

/// Memory keys from a spec config, or `None` unless `memory_enabled` is `true`
pub fn memory_settings(config: &ConfigMap) -> Option<ConfigMap> {
    if config.get(MEMORY_ENABLED_KEY) != Some(&Value::Bool(true)) {
        return None;
    }
    Some(
        config
            .iter()
            .filter(|(key, _)| key.starts_with(MEMORY_KEY_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}

/// Outcome of the memory setup unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySetup {
    Applied,
    /// Memory was not requested
    NotRequested,
}

/// Run memory setup for `entity` against `store`.
pub async fn setup_memory(
    entity: &AgentEntity,
    store: &dyn MemoryStore,
    config: &ConfigMap,
) -> Result<MemorySetup, ProvisionError> {
    let Some(settings) = memory_settings(config) else {
        return Ok(MemorySetup::NotRequested);
    };

    let current = entity.memory();
    let updated = store.apply(&current, &settings).await?;
    entity.set_memory(updated);
    Ok(MemorySetup::Applied)
}

/// Store that merges settings in-process and remembers every request
#[derive(Default)]
pub struct InMemoryStore {
    applied: Mutex<Vec<ConfigMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings passed to `apply`, in call order
    pub fn applied(&self) -> Vec<ConfigMap> {
        self.applied.lock().clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn apply(
        &self,
        current: &MemoryConfig,
        settings: &ConfigMap,
    ) -> Result<MemoryConfig, ProvisionError> {
        self.applied.lock().push(settings.clone());

        let mut updated = current.clone();
        updated.enabled = true;
        for (key, value) in settings {
            if key != MEMORY_ENABLED_KEY {
                updated.settings.insert(key.clone(), value.clone());
            }
        }
        Ok(updated)
    }
}
