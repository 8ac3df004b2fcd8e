//! In-process index of provisioned agents.

use super::entity::{AgentEntity, AgentStatus};
use crate::types::AgentId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Agent registry keyed by agent id
///
/// Entities are shared: the registry holds the same `Arc` the caller
/// received, so in-place enrichment is visible through it. At most
/// `capacity` agents are indexed; registering past it evicts the oldest.
/// Evicted agents stay in the repository and with any caller holding them.
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Arc<AgentEntity>>>,
    capacity: usize,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

impl AgentRegistry {
    /// Unbounded registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register an agent, replacing any previous entry with the same id
    pub fn register(&self, entity: Arc<AgentEntity>) -> Option<Arc<AgentEntity>> {
        let mut agents = self.agents.write();
        if !agents.contains_key(entity.id()) && agents.len() >= self.capacity {
            let oldest = agents
                .values()
                .min_by(|a, b| {
                    a.created_at()
                        .cmp(&b.created_at())
                        .then_with(|| a.id().cmp(b.id()))
                })
                .map(|agent| agent.id().to_string());
            if let Some(oldest) = oldest {
                debug!(
                    agent_id = %oldest,
                    capacity = self.capacity,
                    "Registry full; evicting oldest agent"
                );
                agents.remove(&oldest);
            }
        }
        agents.insert(entity.id().to_string(), entity)
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<AgentEntity>> {
        self.agents.read().get(agent_id).cloned()
    }

    /// All agents, oldest first
    pub fn list(&self) -> Vec<Arc<AgentEntity>> {
        let mut agents: Vec<_> = self.agents.read().values().cloned().collect();
        agents.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        agents
    }

    /// List agents filtered by status
    pub fn list_by_status(&self, status: Option<AgentStatus>) -> Vec<Arc<AgentEntity>> {
        match status {
            Some(filter) => self
                .list()
                .into_iter()
                .filter(|agent| agent.status() == filter)
                .collect(),
            None => self.list(),
        }
    }

    pub fn remove(&self, agent_id: &str) -> Option<Arc<AgentEntity>> {
        self.agents.write().remove(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}
