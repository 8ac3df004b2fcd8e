//! Tool attachment unit and the tool-catalog port.

use crate::agent::{AgentEntity, ToolBinding};
use crate::error::ProvisionError;
use crate::types::ToolId;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Catalog lookup failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The identifier is unknown; the tool is skipped
    #[error("Tool not found: {0}")]
    NotFound(ToolId),

    /// The catalog itself cannot answer; fails the unit
    #[error("Tool catalog unavailable: {0}")]
    Unavailable(String),
}

/// Resolves tool identifiers to bindings
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn resolve(&self, tool_id: &str) -> Result<ToolBinding, CatalogError>;
}

/// Fixed, in-process catalog. Lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct StaticToolCatalog {
    tools: HashMap<String, ToolBinding>,
}

impl StaticToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the stock integrations
    pub fn builtin() -> Self {
        Self::new()
            .with_tool(
                ToolBinding::new("github", "GitHub")
                    .with_description("Repository, issue and pull request operations"),
            )
            .with_tool(
                ToolBinding::new("code_execution", "Code Execution")
                    .with_description("Run code snippets in a sandbox"),
            )
            .with_tool(
                ToolBinding::new("slack", "Slack").with_description("Send and read channel messages"),
            )
            .with_tool(
                ToolBinding::new("notion", "Notion").with_description("Read and update workspace pages"),
            )
            .with_tool(
                ToolBinding::new("web_search", "Web Search").with_description("Search the public web"),
            )
    }

    pub fn with_tool(mut self, binding: ToolBinding) -> Self {
        self.tools.insert(binding.tool_id.to_lowercase(), binding);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Bindings sorted by tool id
    pub fn bindings(&self) -> Vec<&ToolBinding> {
        let mut bindings: Vec<_> = self.tools.values().collect();
        bindings.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        bindings
    }
}

#[async_trait]
impl ToolCatalog for StaticToolCatalog {
    async fn resolve(&self, tool_id: &str) -> Result<ToolBinding, CatalogError> {
        self.tools
            .get(&tool_id.to_lowercase())
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(tool_id.to_string()))
    }
}

/// Result of the tool attachment unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolAttachment {
    pub attached: Vec<ToolId>,
    pub skipped: Vec<ToolId>,
}

/// Resolve every identifier and append the hits to the entity in request order.
///
/// Unknown identifiers are skipped. If the catalog reports itself unavailable
/// for any lookup, the bindings that did resolve are still attached and the
/// unit fails.
pub async fn attach_tools(
    entity: &AgentEntity,
    catalog: &dyn ToolCatalog,
    tool_ids: &[ToolId],
) -> Result<ToolAttachment, ProvisionError> {
    let lookups = join_all(tool_ids.iter().map(|id| catalog.resolve(id))).await;

    let mut outcome = ToolAttachment::default();
    let mut unavailable = None;
    for (tool_id, lookup) in tool_ids.iter().zip(lookups) {
        match lookup {
            Ok(binding) => {
                entity.attach_tool(binding);
                outcome.attached.push(tool_id.clone());
            }
            Err(CatalogError::NotFound(_)) => {
                debug!(agent_id = entity.id(), tool_id = %tool_id, "Unknown tool skipped");
                outcome.skipped.push(tool_id.clone());
            }
            Err(CatalogError::Unavailable(reason)) => {
                outcome.skipped.push(tool_id.clone());
                unavailable.get_or_insert(reason);
            }
        }
    }

    match unavailable {
        Some(reason) => Err(ProvisionError::ToolCatalog(format!(
            "{} ({} of {} tools attached)",
            reason,
            outcome.attached.len(),
            tool_ids.len()
        ))),
        None => Ok(outcome),
    }
}
