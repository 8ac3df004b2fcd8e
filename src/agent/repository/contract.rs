//! Persistence port for finalized agents.

use crate::agent::entity::AgentSnapshot;
use crate::error::ProvisionError;

/// Storage for agent snapshots. Called once an entity is finalized; a failed
/// save never unwinds provisioning.
pub trait AgentRepository: Send + Sync {
    fn save(&self, snapshot: &AgentSnapshot) -> Result<(), ProvisionError>;
    fn load(&self, agent_id: &str) -> Result<Option<AgentSnapshot>, ProvisionError>;
    fn list(&self) -> Result<Vec<AgentSnapshot>, ProvisionError>;
    /// Returns whether a record was removed
    fn delete(&self, agent_id: &str) -> Result<bool, ProvisionError>;
}
