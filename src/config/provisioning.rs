//! ProvisioningConfig: readiness, latency and enrichment knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether background enrichment is joined before returning the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentMode {
    /// Join all enrichment units before returning; the entity comes back `ready`.
    Awaited,
    /// Spawn enrichment and return immediately; the entity comes back `provisioning`.
    Detached,
}

fn default_readiness_timeout_ms() -> u64 {
    500
}

fn default_latency_budget_ms() -> u64 {
    500
}

fn default_unit_deadline_ms() -> u64 {
    250
}

fn default_enrichment_mode() -> EnrichmentMode {
    EnrichmentMode::Awaited
}

fn default_max_tools() -> usize {
    10
}

fn default_backstory_limit() -> usize {
    300
}

fn default_registry_capacity() -> usize {
    1024
}

/// Provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Bounded wait on the readiness gate
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Call-start to entity-return budget. Observational only: in `awaited`
    /// mode a cold start can take up to `readiness_timeout_ms` plus
    /// `unit_deadline_ms`, see [`ProvisioningConfig::worst_case_return_ms`].
    #[serde(default = "default_latency_budget_ms")]
    pub latency_budget_ms: u64,

    /// Deadline applied to each enrichment unit
    #[serde(default = "default_unit_deadline_ms")]
    pub unit_deadline_ms: u64,

    #[serde(default = "default_enrichment_mode")]
    pub enrichment_mode: EnrichmentMode,

    /// Tool identifiers beyond this count are dropped before resolution
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Template backstories are truncated to this many characters
    #[serde(default = "default_backstory_limit")]
    pub backstory_limit: usize,

    /// Agents kept in the in-process registry; the oldest is evicted past it
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity: usize,
}

impl ProvisioningConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.latency_budget_ms)
    }

    pub fn unit_deadline(&self) -> Duration {
        Duration::from_millis(self.unit_deadline_ms)
    }

    /// Longest an Optimized-tier call can take before returning the entity.
    ///
    /// Awaited mode waits on the gate and then joins the enrichment units,
    /// which run concurrently under one shared deadline. Detached mode only
    /// waits on the gate.
    pub fn worst_case_return_ms(&self) -> u64 {
        match self.enrichment_mode {
            EnrichmentMode::Awaited => self
                .readiness_timeout_ms
                .saturating_add(self.unit_deadline_ms),
            EnrichmentMode::Detached => self.readiness_timeout_ms,
        }
    }

    /// Whether a cold start in the configured mode can overrun the latency budget
    pub fn may_exceed_budget(&self) -> bool {
        self.worst_case_return_ms() > self.latency_budget_ms
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.latency_budget_ms == 0 {
            return Err("latency_budget_ms must be positive".to_string());
        }
        if self.unit_deadline_ms == 0 {
            return Err("unit_deadline_ms must be positive".to_string());
        }
        if self.max_tools == 0 {
            return Err("max_tools must be positive".to_string());
        }
        if self.backstory_limit == 0 {
            return Err("backstory_limit must be positive".to_string());
        }
        if self.registry_capacity == 0 {
            return Err("registry_capacity must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            latency_budget_ms: default_latency_budget_ms(),
            unit_deadline_ms: default_unit_deadline_ms(),
            enrichment_mode: default_enrichment_mode(),
            max_tools: default_max_tools(),
            backstory_limit: default_backstory_limit(),
            registry_capacity: default_registry_capacity(),
        }
    }
}
