use super::contract::AgentRepository;
use crate::agent::entity::AgentSnapshot;
use crate::error::ProvisionError;
use crate::types::AgentId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Process-local repository, used when no agents directory is wanted
#[derive(Default)]
pub struct InMemoryAgentRepository {
    records: RwLock<BTreeMap<AgentId, AgentSnapshot>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl AgentRepository for InMemoryAgentRepository {
    fn save(&self, snapshot: &AgentSnapshot) -> Result<(), ProvisionError> {
        self.records
            .write()
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, agent_id: &str) -> Result<Option<AgentSnapshot>, ProvisionError> {
        Ok(self.records.read().get(agent_id).cloned())
    }

    fn list(&self) -> Result<Vec<AgentSnapshot>, ProvisionError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn delete(&self, agent_id: &str) -> Result<bool, ProvisionError> {
        Ok(self.records.write().remove(agent_id).is_some())
    }
}
