//! Test doubles and fixtures shared by the provisioning suites

use async_trait::async_trait;
use berth::agent::{AgentRepository, AgentSnapshot, MemoryConfig, ToolBinding};
use berth::config::{BerthConfig, EnrichmentMode, ProvisioningConfig};
use berth::enrichment::{CatalogError, MemoryStore, ToolCatalog};
use berth::provider::{LlmPool, ProviderConfig};
use berth::readiness::{GateInitializer, ReadinessGate};
use berth::template::{Category, TemplateCatalog, TemplateOverride};
use berth::types::ConfigMap;
use berth::{ProvisionError, Provisioner};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Builds the pool after `delay`, counting calls; fails instead when `fail` is set
pub struct CountingInitializer {
    pub calls: AtomicUsize,
    delay: Duration,
    fail: bool,
    templates: TemplateCatalog,
}

impl CountingInitializer {
    pub fn new(delay: Duration) -> Arc<Self> {
        Self::with_templates(delay, TemplateCatalog::builtin())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: true,
            templates: TemplateCatalog::builtin(),
        })
    }

    pub fn with_templates(delay: Duration, templates: TemplateCatalog) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
            templates,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GateInitializer<LlmPool> for CountingInitializer {
    async fn initialize(&self) -> Result<LlmPool, ProvisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ProvisionError::ProviderNotConfigured(
                "endpoint refused connection".to_string(),
            ));
        }
        LlmPool::build(ProviderConfig::default(), self.templates.clone())
    }
}

pub fn gate(initializer: &Arc<CountingInitializer>) -> Arc<ReadinessGate<LlmPool>> {
    ReadinessGate::new(Arc::clone(initializer) as Arc<dyn GateInitializer<LlmPool>>)
}

/// Catalog that cannot answer any lookup
pub struct DownCatalog;

#[async_trait]
impl ToolCatalog for DownCatalog {
    async fn resolve(&self, _tool_id: &str) -> Result<ToolBinding, CatalogError> {
        Err(CatalogError::Unavailable("catalog offline".to_string()))
    }
}

/// Memory store that answers only after `delay`
pub struct SlowMemoryStore {
    pub delay: Duration,
}

#[async_trait]
impl MemoryStore for SlowMemoryStore {
    async fn apply(
        &self,
        current: &MemoryConfig,
        settings: &ConfigMap,
    ) -> Result<MemoryConfig, ProvisionError> {
        tokio::time::sleep(self.delay).await;
        let mut updated = current.clone();
        updated.enabled = true;
        updated.settings.extend(settings.clone());
        Ok(updated)
    }
}

/// Repository whose every call fails, counting save attempts
#[derive(Default)]
pub struct BrokenRepository {
    pub saves: AtomicUsize,
}

impl BrokenRepository {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl AgentRepository for BrokenRepository {
    fn save(&self, _snapshot: &AgentSnapshot) -> Result<(), ProvisionError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(ProvisionError::Persistence("disk full".to_string()))
    }

    fn load(&self, _agent_id: &str) -> Result<Option<AgentSnapshot>, ProvisionError> {
        Err(ProvisionError::Persistence("disk full".to_string()))
    }

    fn list(&self) -> Result<Vec<AgentSnapshot>, ProvisionError> {
        Err(ProvisionError::Persistence("disk full".to_string()))
    }

    fn delete(&self, _agent_id: &str) -> Result<bool, ProvisionError> {
        Err(ProvisionError::Persistence("disk full".to_string()))
    }
}

pub fn config(readiness_timeout_ms: u64, mode: EnrichmentMode) -> BerthConfig {
    BerthConfig {
        provisioning: ProvisioningConfig {
            readiness_timeout_ms,
            enrichment_mode: mode,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Catalog whose Default role is blank, so construction from it fails
pub fn blank_default_templates() -> BTreeMap<Category, TemplateOverride> {
    let mut templates = BTreeMap::new();
    templates.insert(
        Category::Default,
        TemplateOverride {
            role: Some("   ".into()),
            ..Default::default()
        },
    );
    templates
}

/// Provisioner over a pool that opens after `delay`
pub fn provisioner(config: BerthConfig, initializer: &Arc<CountingInitializer>) -> Provisioner {
    Provisioner::builder(config).gate(gate(initializer)).build()
}

pub fn memory_config() -> ConfigMap {
    let mut config = ConfigMap::new();
    config.insert("memory_enabled".into(), true.into());
    config.insert("memory_provider".into(), "local".into());
    config
}
