//! AgentEntity: the provisioned artifact.
//!
//! The entity is shared between the provisioning call and the enrichment
//! units that keep mutating it after return. Each mutable field group sits
//! behind its own lock and is written by exactly one owner:
//!
//! | group     | writer               |
//! |-----------|----------------------|
//! | tools     | tool attachment unit |
//! | memory    | memory setup unit    |
//! | persona, knowledge, status | finalization unit (and the tier chain) |

use crate::provider::{LlmBindingInfo, LlmHandle};
use crate::template::{Category, Template};
use crate::types::{AgentId, ConfigMap, SourceId, ToolId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EMERGENCY_ROLE: &str = "AI Assistant";
pub const EMERGENCY_GOAL: &str = "Help users with their requests";
pub const EMERGENCY_BACKSTORY: &str = "A general-purpose assistant.";

/// Entity lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Provisioning,
    Ready,
    Degraded,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Provisioning => "provisioning",
            AgentStatus::Ready => "ready",
            AgentStatus::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// A tool resolved from the catalog and attached to an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBinding {
    pub tool_id: ToolId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ToolBinding {
    pub fn new(tool_id: impl Into<ToolId>, name: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Memory configuration applied by the memory store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub enabled: bool,
    #[serde(default)]
    pub settings: ConfigMap,
}

impl MemoryConfig {
    pub fn is_empty(&self) -> bool {
        !self.enabled && self.settings.is_empty()
    }
}

/// Knowledge source an agent may search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBinding {
    pub source_id: SourceId,
    pub description: String,
}

impl KnowledgeBinding {
    pub fn for_source(source_id: impl Into<SourceId>) -> Self {
        let source_id = source_id.into();
        Self {
            description: format!("Search knowledge base: {}", source_id),
            source_id,
        }
    }
}

/// Provisioned agent
pub struct AgentEntity {
    id: AgentId,
    name: String,
    category: Category,
    llm: LlmHandle,
    created_at: DateTime<Utc>,
    persona: RwLock<Template>,
    tools: RwLock<Vec<ToolBinding>>,
    memory: RwLock<MemoryConfig>,
    knowledge: RwLock<Vec<KnowledgeBinding>>,
    status: RwLock<AgentStatus>,
    creation_latency_ms: RwLock<Option<u64>>,
}

impl AgentEntity {
    /// New entity in `provisioning` with empty tool, memory and knowledge groups
    pub(crate) fn new(
        id: AgentId,
        name: impl Into<String>,
        category: Category,
        persona: Template,
        llm: LlmHandle,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            llm,
            created_at: Utc::now(),
            persona: RwLock::new(persona),
            tools: RwLock::new(Vec::new()),
            memory: RwLock::new(MemoryConfig::default()),
            knowledge: RwLock::new(Vec::new()),
            status: RwLock::new(AgentStatus::Provisioning),
            creation_latency_ms: RwLock::new(None),
        }
    }

    /// Minimal entity from the name alone. Touches no external resource and cannot fail.
    pub fn emergency(id: AgentId, name: impl Into<String>, model: impl Into<String>) -> Self {
        let entity = Self::new(
            id,
            name,
            Category::Default,
            Template::new(EMERGENCY_ROLE, EMERGENCY_GOAL, EMERGENCY_BACKSTORY),
            LlmHandle::unbound(model),
        );
        entity.set_status(AgentStatus::Degraded);
        entity
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template category the persona was built from
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn llm(&self) -> &LlmHandle {
        &self.llm
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn persona(&self) -> Template {
        self.persona.read().clone()
    }

    pub fn role(&self) -> String {
        self.persona.read().role.clone()
    }

    pub fn goal(&self) -> String {
        self.persona.read().goal.clone()
    }

    pub fn backstory(&self) -> String {
        self.persona.read().backstory.clone()
    }

    pub fn tools(&self) -> Vec<ToolBinding> {
        self.tools.read().clone()
    }

    pub fn memory(&self) -> MemoryConfig {
        self.memory.read().clone()
    }

    pub fn knowledge(&self) -> Vec<KnowledgeBinding> {
        self.knowledge.read().clone()
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.read()
    }

    /// Wall-clock time from call start to return, once measured
    pub fn creation_latency_ms(&self) -> Option<u64> {
        *self.creation_latency_ms.read()
    }

    pub(crate) fn update_persona(&self, f: impl FnOnce(&mut Template)) {
        f(&mut self.persona.write());
    }

    pub(crate) fn attach_tool(&self, binding: ToolBinding) {
        self.tools.write().push(binding);
    }

    pub(crate) fn set_memory(&self, memory: MemoryConfig) {
        *self.memory.write() = memory;
    }

    pub(crate) fn set_knowledge(&self, knowledge: Vec<KnowledgeBinding>) {
        *self.knowledge.write() = knowledge;
    }

    pub(crate) fn set_status(&self, status: AgentStatus) {
        *self.status.write() = status;
    }

    /// Move `provisioning` to `ready`; a degraded entity stays degraded
    pub(crate) fn mark_ready(&self) -> bool {
        let mut status = self.status.write();
        if *status == AgentStatus::Provisioning {
            *status = AgentStatus::Ready;
            true
        } else {
            false
        }
    }

    pub(crate) fn record_latency(&self, elapsed_ms: u64) {
        *self.creation_latency_ms.write() = Some(elapsed_ms);
    }

    /// Point-in-time copy of every field group
    pub fn snapshot(&self) -> AgentSnapshot {
        let persona = self.persona();
        AgentSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            role: persona.role,
            goal: persona.goal,
            backstory: persona.backstory,
            llm: self.llm.describe(),
            tools: self.tools(),
            memory: self.memory(),
            knowledge: self.knowledge(),
            status: self.status(),
            created_at: self.created_at,
            creation_latency_ms: self.creation_latency_ms(),
        }
    }
}

impl fmt::Debug for AgentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("status", &self.status())
            .field("llm", &self.llm)
            .finish_non_exhaustive()
    }
}

/// Serializable view of an [`AgentEntity`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub name: String,
    pub category: Category,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub llm: LlmBindingInfo,
    #[serde(default)]
    pub tools: Vec<ToolBinding>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeBinding>,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_latency_ms: Option<u64>,
}
