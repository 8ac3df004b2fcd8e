//! Degradation Chain
//!
//! `Provisioner::provision` validates, classifies, then walks the tier ladder
//! Optimized → Fallback → Emergency until a tier builds an entity. Only
//! validation can fail the call; Emergency cannot fail.

use super::tier::{Escalation, Tier, TierOutcome};
use crate::agent::{
    construct, validate_spec, AgentEntity, AgentRegistry, AgentRepository, AgentSpec, AgentStatus,
};
use crate::config::{BerthConfig, EnrichmentMode, ProvisioningConfig};
use crate::enrichment::{
    EnrichmentOrchestrator, EnrichmentOutcome, InMemoryStore, MemoryStore, StaticToolCatalog,
    ToolCatalog,
};
use crate::error::{ProvisionError, ValidationError};
use crate::latency::{LatencyClock, LatencyMonitor, LatencyRecord, LatencySummary, Stage};
use crate::provider::{HttpPoolInitializer, LlmHandle, LlmPool};
use crate::readiness::{GatePhase, Readiness, ReadinessGate};
use crate::template::{Category, KeywordTable, TemplateCatalog};
use crate::types::AgentId;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of the persistence write that follows provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "error")]
pub enum PersistenceStatus {
    Saved,
    Failed(String),
    /// No repository configured
    Disabled,
    /// Runs after detached enrichment; see [`Enrichment::Pending`]
    Pending,
}

/// What detached background work produced
#[derive(Debug)]
pub struct BackgroundCompletion {
    pub enrichment: EnrichmentOutcome,
    pub persistence: PersistenceStatus,
}

/// Enrichment state at return time
#[derive(Debug)]
pub enum Enrichment {
    /// Joined before returning
    Completed(EnrichmentOutcome),
    /// Still running on the runtime; the entity is mutated in place
    Pending(JoinHandle<BackgroundCompletion>),
    /// Degraded tiers skip enrichment
    Skipped,
}

/// A provisioned agent and how it was produced
#[derive(Debug)]
pub struct Provisioned {
    pub entity: Arc<AgentEntity>,
    pub latency_ms: u64,
    pub tier: Tier,
    pub latency: LatencyRecord,
    pub escalations: Vec<Escalation>,
    pub enrichment: Enrichment,
    pub persistence: PersistenceStatus,
}

impl Provisioned {
    /// Wait for detached work, if any, and return the final enrichment and persistence state.
    pub async fn settle(self) -> (Option<EnrichmentOutcome>, PersistenceStatus) {
        match self.enrichment {
            Enrichment::Completed(outcome) => (Some(outcome), self.persistence),
            Enrichment::Skipped => (None, self.persistence),
            Enrichment::Pending(handle) => match handle.await {
                Ok(done) => (Some(done.enrichment), done.persistence),
                Err(e) => (
                    None,
                    PersistenceStatus::Failed(format!("background enrichment aborted: {}", e)),
                ),
            },
        }
    }
}

/// Gate state plus latency summary
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub gate: GatePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_init_ms: Option<u64>,
    pub agents: usize,
    pub latency: LatencySummary,
}

/// Builder for [`Provisioner`]; every collaborator has a working default
pub struct ProvisionerBuilder {
    config: BerthConfig,
    gate: Option<Arc<ReadinessGate<LlmPool>>>,
    catalog: Option<Arc<dyn ToolCatalog>>,
    memory: Option<Arc<dyn MemoryStore>>,
    repository: Option<Arc<dyn AgentRepository>>,
    keywords: Option<KeywordTable>,
}

impl ProvisionerBuilder {
    pub fn gate(mut self, gate: Arc<ReadinessGate<LlmPool>>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn tool_catalog(mut self, catalog: Arc<dyn ToolCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn memory_store(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn AgentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn keywords(mut self, keywords: KeywordTable) -> Self {
        self.keywords = Some(keywords);
        self
    }

    pub fn build(self) -> Provisioner {
        let templates = self.config.template_catalog();
        let gate = self.gate.unwrap_or_else(|| {
            ReadinessGate::new(Arc::new(HttpPoolInitializer::new(
                self.config.provider.clone(),
                templates.clone(),
            )))
        });
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(StaticToolCatalog::builtin()));
        let memory = self.memory.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let enrichment = EnrichmentOrchestrator::new(catalog, memory, &self.config.provisioning);
        let provisioning = &self.config.provisioning;
        if provisioning.may_exceed_budget() {
            warn!(
                mode = ?provisioning.enrichment_mode,
                worst_case_ms = provisioning.worst_case_return_ms(),
                budget_ms = provisioning.latency_budget_ms,
                "Cold-start provisioning can overrun the latency budget"
            );
        }
        let registry = Arc::new(AgentRegistry::with_capacity(provisioning.registry_capacity));

        Provisioner {
            monitor: Arc::new(LatencyMonitor::new(self.config.provisioning.latency_budget())),
            config: self.config.provisioning,
            default_model: self.config.provider.default_model,
            gate,
            templates,
            keywords: self.keywords.unwrap_or_else(KeywordTable::builtin),
            enrichment,
            repository: self.repository,
            registry,
        }
    }
}

/// Provisioning core
pub struct Provisioner {
    config: ProvisioningConfig,
    default_model: String,
    gate: Arc<ReadinessGate<LlmPool>>,
    templates: TemplateCatalog,
    keywords: KeywordTable,
    enrichment: EnrichmentOrchestrator,
    repository: Option<Arc<dyn AgentRepository>>,
    registry: Arc<AgentRegistry>,
    monitor: Arc<LatencyMonitor>,
}

impl Provisioner {
    pub fn builder(config: BerthConfig) -> ProvisionerBuilder {
        ProvisionerBuilder {
            config,
            gate: None,
            catalog: None,
            memory: None,
            repository: None,
            keywords: None,
        }
    }

    pub fn new(config: BerthConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<ReadinessGate<LlmPool>> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn monitor(&self) -> &Arc<LatencyMonitor> {
        &self.monitor
    }

    /// Start pool initialization without waiting. Returns whether this call started it.
    pub fn warm(&self) -> bool {
        let started = self.gate.start();
        if started {
            info!("Connection pool warm-up started");
        }
        started
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            gate: self.gate.phase(),
            gate_failure: self.gate.failure(),
            gate_init_ms: self.gate.init_elapsed().map(|d| d.as_millis() as u64),
            agents: self.registry.len(),
            latency: self.monitor.summary(),
        }
    }

    /// Provision an agent. Fails only when `spec` is invalid.
    pub async fn provision(&self, spec: AgentSpec) -> Result<Provisioned, ValidationError> {
        let mut clock = LatencyClock::start();
        validate_spec(&spec)?;
        clock.lap(Stage::Validate);

        let category = self.keywords.classify(&spec.name, spec.description.as_deref());
        clock.lap(Stage::Classify);

        let id: AgentId = spec
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        debug!(agent_id = %id, category = %category, "Provisioning agent");

        let mut tier = Tier::Optimized;
        let mut escalations = Vec::new();
        let entity = loop {
            let outcome = match tier {
                Tier::Optimized => self.optimized(&id, &spec, category, &mut clock).await,
                Tier::Fallback => self.fallback(&id, &spec, category, &mut clock),
                Tier::Emergency => break self.emergency(&id, &spec, &mut clock),
            };
            match outcome {
                TierOutcome::Built(entity) => break entity,
                TierOutcome::Escalate(cause) => {
                    warn!(agent_id = %id, tier = %tier, error = %cause, "Provisioning tier failed; escalating");
                    escalations.push(Escalation {
                        from: tier,
                        reason: cause.to_string(),
                    });
                    tier = match tier.next() {
                        Some(next) => next,
                        None => break self.emergency(&id, &spec, &mut clock),
                    };
                }
            }
        };

        let entity = Arc::new(entity);
        self.registry.register(Arc::clone(&entity));

        let (enrichment, latency, persistence) = match (tier, self.config.enrichment_mode) {
            (Tier::Optimized, EnrichmentMode::Awaited) => {
                let outcome = self.enrichment.enrich(&entity, &spec).await;
                clock.lap(Stage::Enrich);
                let latency = self.observe(&entity, tier, &clock);
                let persistence = persist(self.repository.clone(), &entity).await;
                (Enrichment::Completed(outcome), latency, persistence)
            }
            (Tier::Optimized, EnrichmentMode::Detached) => {
                let latency = self.observe(&entity, tier, &clock);
                let handle = self.spawn_enrichment(Arc::clone(&entity), spec);
                (Enrichment::Pending(handle), latency, PersistenceStatus::Pending)
            }
            (_, _) => {
                let latency = self.observe(&entity, tier, &clock);
                let persistence = persist(self.repository.clone(), &entity).await;
                (Enrichment::Skipped, latency, persistence)
            }
        };

        Ok(Provisioned {
            latency_ms: latency.elapsed_ms,
            entity,
            tier,
            latency,
            escalations,
            enrichment,
            persistence,
        })
    }

    async fn optimized(
        &self,
        id: &str,
        spec: &AgentSpec,
        category: Category,
        clock: &mut LatencyClock,
    ) -> TierOutcome {
        let readiness = self.gate.await_ready(self.config.readiness_timeout()).await;
        clock.lap(Stage::Readiness);

        let pool = match readiness {
            Readiness::Ready(pool) => pool,
            Readiness::TimedOut => {
                return TierOutcome::Escalate(ProvisionError::ReadinessTimeout(
                    self.config.readiness_timeout_ms,
                ))
            }
            Readiness::Failed(reason) => {
                return TierOutcome::Escalate(ProvisionError::ReadinessFailed(reason))
            }
        };

        let result = pool
            .handle(spec.model.as_deref(), spec.temperature, spec.max_tokens)
            .and_then(|llm| {
                construct(
                    id.to_string(),
                    spec,
                    category,
                    pool.templates().get(category),
                    llm,
                    self.config.backstory_limit,
                )
            });
        clock.lap(Stage::Construct);
        TierOutcome::from_result(result)
    }

    fn fallback(
        &self,
        id: &str,
        spec: &AgentSpec,
        category: Category,
        clock: &mut LatencyClock,
    ) -> TierOutcome {
        // Never waits on the gate; binds the pool only if it is already open.
        // Templates come from configuration, not the pool's cache.
        let llm = self
            .gate
            .try_ready()
            .and_then(|p| {
                p.handle(spec.model.as_deref(), spec.temperature, spec.max_tokens)
                    .ok()
            })
            .unwrap_or_else(|| LlmHandle::unbound(self.model_for(spec)));

        let result = construct(
            id.to_string(),
            spec,
            category,
            self.templates.get(category),
            llm,
            self.config.backstory_limit,
        );
        clock.lap(Stage::Fallback);

        if let Ok(entity) = &result {
            entity.set_status(AgentStatus::Degraded);
        }
        TierOutcome::from_result(result)
    }

    fn emergency(&self, id: &str, spec: &AgentSpec, clock: &mut LatencyClock) -> AgentEntity {
        let entity = AgentEntity::emergency(id.to_string(), spec.name.trim(), &self.default_model);
        clock.lap(Stage::Emergency);
        error!(agent_id = %id, "Emergency tier used; agent has default persona and no pooled LLM");
        entity
    }

    fn model_for(&self, spec: &AgentSpec) -> String {
        spec.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string()
    }

    fn observe(&self, entity: &AgentEntity, tier: Tier, clock: &LatencyClock) -> LatencyRecord {
        let record = self.monitor.observe(entity.id(), tier, clock);
        entity.record_latency(record.elapsed_ms);
        record
    }

    fn spawn_enrichment(
        &self,
        entity: Arc<AgentEntity>,
        spec: AgentSpec,
    ) -> JoinHandle<BackgroundCompletion> {
        let enrichment = self.enrichment.clone();
        let repository = self.repository.clone();
        tokio::spawn(async move {
            let outcome = enrichment.enrich(&entity, &spec).await;
            let persistence = persist(repository, &entity).await;
            BackgroundCompletion {
                enrichment: outcome,
                persistence,
            }
        })
    }
}

async fn persist(
    repository: Option<Arc<dyn AgentRepository>>,
    entity: &AgentEntity,
) -> PersistenceStatus {
    let Some(repository) = repository else {
        return PersistenceStatus::Disabled;
    };

    let snapshot = entity.snapshot();
    let agent_id = snapshot.id.clone();
    match tokio::task::spawn_blocking(move || repository.save(&snapshot)).await {
        Ok(Ok(())) => PersistenceStatus::Saved,
        Ok(Err(e)) => {
            warn!(agent_id = %agent_id, error = %e, "Failed to persist agent; provisioning result stands");
            PersistenceStatus::Failed(e.to_string())
        }
        Err(e) => {
            warn!(agent_id = %agent_id, error = %e, "Persistence task aborted");
            PersistenceStatus::Failed(e.to_string())
        }
    }
}
