//! Agent Model
//!
//! The provisioning request ([`AgentSpec`]), its validation, the provisioned
//! [`AgentEntity`] with its independently locked field groups, and the
//! registry and repository that hold finalized agents.

pub mod constructor;
pub mod entity;
pub mod registry;
pub mod repository;
pub mod spec;
pub mod validation;

pub use constructor::construct;
pub use entity::{
    AgentEntity, AgentSnapshot, AgentStatus, KnowledgeBinding, MemoryConfig, ToolBinding,
    EMERGENCY_BACKSTORY, EMERGENCY_GOAL, EMERGENCY_ROLE,
};
pub use registry::AgentRegistry;
pub use repository::{AgentRepository, InMemoryAgentRepository, XdgAgentRepository};
pub use spec::AgentSpec;
pub use validation::validate_spec;
