use super::contract::AgentRepository;
use crate::agent::entity::AgentSnapshot;
use crate::config::StorageConfig;
use crate::error::ProvisionError;
use std::path::{Path, PathBuf};

/// One JSON file per agent under the agents directory
pub struct XdgAgentRepository {
    agents_dir: PathBuf,
}

impl XdgAgentRepository {
    pub fn new(agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
        }
    }

    /// Repository rooted at the configured (or XDG default) agents directory
    pub fn from_config(storage: &StorageConfig) -> Result<Self, ProvisionError> {
        Ok(Self::new(storage.resolve_agents_dir()?))
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    pub fn path_for(&self, agent_id: &str) -> Result<PathBuf, ProvisionError> {
        if agent_id.is_empty()
            || agent_id.starts_with('.')
            || agent_id.contains(['/', '\\'])
        {
            return Err(ProvisionError::Persistence(format!(
                "Agent id '{}' cannot be used as a file name",
                agent_id
            )));
        }
        Ok(self.agents_dir.join(format!("{}.json", agent_id)))
    }
}

impl AgentRepository for XdgAgentRepository {
    fn save(&self, snapshot: &AgentSnapshot) -> Result<(), ProvisionError> {
        let path = self.path_for(&snapshot.id)?;

        std::fs::create_dir_all(&self.agents_dir).map_err(|e| {
            ProvisionError::Persistence(format!(
                "Failed to create agents directory {}: {}",
                self.agents_dir.display(),
                e
            ))
        })?;

        let content = serde_json::to_string_pretty(snapshot).map_err(|e| {
            ProvisionError::Persistence(format!("Failed to serialize agent {}: {}", snapshot.id, e))
        })?;

        // Write then rename so readers never see a partial record
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| {
            ProvisionError::Persistence(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            ProvisionError::Persistence(format!(
                "Failed to move agent record into {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(agent_id = %snapshot.id, path = %path.display(), "Agent saved");
        Ok(())
    }

    fn load(&self, agent_id: &str) -> Result<Option<AgentSnapshot>, ProvisionError> {
        let path = self.path_for(agent_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ProvisionError::Persistence(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let snapshot = serde_json::from_str(&content).map_err(|e| {
            ProvisionError::Persistence(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(snapshot))
    }

    fn list(&self) -> Result<Vec<AgentSnapshot>, ProvisionError> {
        if !self.agents_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.agents_dir).map_err(|e| {
            ProvisionError::Persistence(format!(
                "Failed to read agents directory {}: {}",
                self.agents_dir.display(),
                e
            ))
        })?;

        let mut loaded = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(
                        "Failed to read directory entry in {}: {}",
                        self.agents_dir.display(),
                        e
                    );
                    continue;
                }
            };

            let path = entry.path();
            if path.extension() != Some(std::ffi::OsStr::new("json")) {
                continue;
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to read agent record {}: {}", path.display(), e);
                    continue;
                }
            };

            match serde_json::from_str::<AgentSnapshot>(&content) {
                Ok(snapshot) => loaded.push(snapshot),
                Err(e) => {
                    tracing::error!("Failed to parse agent record {}: {}", path.display(), e);
                }
            }
        }

        loaded.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(loaded)
    }

    fn delete(&self, agent_id: &str) -> Result<bool, ProvisionError> {
        let path = self.path_for(agent_id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| {
            ProvisionError::Persistence(format!("Failed to delete {}: {}", path.display(), e))
        })?;
        Ok(true)
    }
}
