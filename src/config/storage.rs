//! StorageConfig: where finalized agent records are persisted.

use crate::config::xdg;
use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for agent records; `None` uses `$XDG_DATA_HOME/berth/agents`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the agents directory to an actual filesystem location.
    pub fn resolve_agents_dir(&self) -> Result<PathBuf, ProvisionError> {
        match &self.agents_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => xdg::agents_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let config = StorageConfig {
            agents_dir: Some(PathBuf::from("/tmp/berth-agents")),
        };
        assert_eq!(
            config.resolve_agents_dir().unwrap(),
            PathBuf::from("/tmp/berth-agents")
        );
    }
}
