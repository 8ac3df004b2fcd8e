//! Background Enrichment Orchestrator
//!
//! Runs the three enrichment units concurrently against one entity. Each unit
//! is bounded by the configured deadline; an overrun counts as a unit failure.
//! Failures are isolated: siblings keep running and nothing is re-raised.

use super::finalize::finalize;
use super::memory::{setup_memory, MemorySetup, MemoryStore};
use super::tools::{attach_tools, ToolCatalog};
use crate::agent::{AgentEntity, AgentSpec, AgentStatus};
use crate::config::ProvisioningConfig;
use crate::error::ProvisionError;
use crate::types::ToolId;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Enrichment unit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Tools,
    Memory,
    Finalize,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Tools => "tools",
            UnitKind::Memory => "memory",
            UnitKind::Finalize => "finalize",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Succeeded,
    /// Nothing to do for this spec
    Skipped,
    Failed,
}

/// Per-unit result recorded for observability
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub unit: UnitKind,
    pub status: UnitStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Join of all three units
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentOutcome {
    pub units: Vec<UnitReport>,
    /// Tool ids that did not resolve
    pub skipped_tools: Vec<ToolId>,
    pub elapsed_ms: u64,
}

impl EnrichmentOutcome {
    pub fn report(&self, unit: UnitKind) -> Option<&UnitReport> {
        self.units.iter().find(|r| r.unit == unit)
    }

    pub fn succeeded(&self, unit: UnitKind) -> bool {
        self.report(unit)
            .map(|r| r.status != UnitStatus::Failed)
            .unwrap_or(false)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|r| r.status == UnitStatus::Failed)
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Fans enrichment units out against a constructed entity
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    catalog: Arc<dyn ToolCatalog>,
    memory: Arc<dyn MemoryStore>,
    unit_deadline: Duration,
    max_tools: usize,
    backstory_limit: usize,
}

impl EnrichmentOrchestrator {
    pub fn new(
        catalog: Arc<dyn ToolCatalog>,
        memory: Arc<dyn MemoryStore>,
        config: &ProvisioningConfig,
    ) -> Self {
        Self {
            catalog,
            memory,
            unit_deadline: config.unit_deadline(),
            max_tools: config.max_tools,
            backstory_limit: config.backstory_limit,
        }
    }

    pub fn unit_deadline(&self) -> Duration {
        self.unit_deadline
    }

    /// Run tools, memory and finalization concurrently and join them.
    pub async fn enrich(&self, entity: &AgentEntity, spec: &AgentSpec) -> EnrichmentOutcome {
        let start = Instant::now();
        let tool_ids = spec.tool_ids(self.max_tools);

        let (tools, memory, finalized) = tokio::join!(
            self.bounded(UnitKind::Tools, attach_tools(entity, self.catalog.as_ref(), &tool_ids)),
            self.bounded(
                UnitKind::Memory,
                setup_memory(entity, self.memory.as_ref(), &spec.config)
            ),
            self.bounded(UnitKind::Finalize, async {
                finalize(entity, spec, self.backstory_limit)
            }),
        );

        let mut skipped_tools = Vec::new();
        let tools_report = match tools {
            (Ok(attachment), elapsed) => {
                let status = if tool_ids.is_empty() {
                    UnitStatus::Skipped
                } else {
                    UnitStatus::Succeeded
                };
                skipped_tools = attachment.skipped;
                report(UnitKind::Tools, status, elapsed, None)
            }
            (Err(e), elapsed) => self.failed(entity, UnitKind::Tools, elapsed, e),
        };

        let memory_report = match memory {
            (Ok(MemorySetup::Applied), elapsed) => {
                report(UnitKind::Memory, UnitStatus::Succeeded, elapsed, None)
            }
            (Ok(MemorySetup::NotRequested), elapsed) => {
                report(UnitKind::Memory, UnitStatus::Skipped, elapsed, None)
            }
            (Err(e), elapsed) => self.failed(entity, UnitKind::Memory, elapsed, e),
        };

        let finalize_report = match finalized {
            (Ok(()), elapsed) => report(UnitKind::Finalize, UnitStatus::Succeeded, elapsed, None),
            (Err(e), elapsed) => {
                // Without finalization the entity keeps its template persona
                if entity.status() == AgentStatus::Provisioning {
                    entity.set_status(AgentStatus::Degraded);
                }
                self.failed(entity, UnitKind::Finalize, elapsed, e)
            }
        };

        let outcome = EnrichmentOutcome {
            units: vec![tools_report, memory_report, finalize_report],
            skipped_tools,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            agent_id = entity.id(),
            elapsed_ms = outcome.elapsed_ms,
            failed_units = outcome.failures().count(),
            skipped_tools = outcome.skipped_tools.len(),
            status = %entity.status(),
            "Enrichment complete"
        );
        outcome
    }

    async fn bounded<T>(
        &self,
        unit: UnitKind,
        work: impl Future<Output = Result<T, ProvisionError>>,
    ) -> (Result<T, ProvisionError>, Duration) {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.unit_deadline, work).await {
            Ok(result) => result,
            Err(_) => Err(ProvisionError::UnitDeadline {
                unit: unit.to_string(),
                deadline_ms: self.unit_deadline.as_millis() as u64,
            }),
        };
        let elapsed = start.elapsed();
        debug!(unit = %unit, elapsed_ms = elapsed.as_millis() as u64, ok = result.is_ok(), "Enrichment unit finished");
        (result, elapsed)
    }

    fn failed(
        &self,
        entity: &AgentEntity,
        unit: UnitKind,
        elapsed: Duration,
        error: ProvisionError,
    ) -> UnitReport {
        warn!(
            agent_id = entity.id(),
            unit = %unit,
            error = %error,
            "Enrichment unit failed; continuing with partial configuration"
        );
        report(unit, UnitStatus::Failed, elapsed, Some(error.to_string()))
    }
}

fn report(unit: UnitKind, status: UnitStatus, elapsed: Duration, error: Option<String>) -> UnitReport {
    UnitReport {
        unit,
        status,
        elapsed_ms: elapsed.as_millis() as u64,
        error,
    }
}
