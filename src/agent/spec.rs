//! AgentSpec: the immutable provisioning request.

use crate::types::{AgentId, ConfigMap, SourceId, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provisioning input as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Caller-chosen identifier; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AgentId>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Persona overrides applied during finalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool identifiers, resolved in order
    #[serde(default)]
    pub tools: Vec<ToolId>,

    /// Free-form configuration; `memory_*` keys drive memory setup
    #[serde(default)]
    pub config: ConfigMap,

    #[serde(default)]
    pub rag_enabled: bool,
    #[serde(default)]
    pub rag_sources: Vec<SourceId>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<AgentId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = Some(backstory.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ToolId>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Enable knowledge retrieval over the given sources
    pub fn with_rag_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourceId>,
    {
        self.rag_enabled = true;
        self.rag_sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Tool identifiers to resolve: trimmed, blanks dropped, at most `max`
    pub fn tool_ids(&self, max: usize) -> Vec<ToolId> {
        self.tools
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .take(max)
            .map(str::to_string)
            .collect()
    }

    /// Non-blank persona override, if any
    pub(crate) fn override_for(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
