//! Entity Constructor
//!
//! Builds the minimal valid entity synchronously from a validated spec and
//! a selected template. No external I/O.

use super::entity::AgentEntity;
use super::spec::AgentSpec;
use super::validation::validate_spec;
use crate::error::ProvisionError;
use crate::provider::LlmHandle;
use crate::template::{Category, Template};
use crate::types::AgentId;

/// Truncate to at most `limit` characters on a char boundary
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Construct an entity in `provisioning` with empty tool and memory groups.
///
/// Validation runs first; an invalid spec never produces an entity.
pub fn construct(
    id: AgentId,
    spec: &AgentSpec,
    category: Category,
    template: &Template,
    llm: LlmHandle,
    backstory_limit: usize,
) -> Result<AgentEntity, ProvisionError> {
    validate_spec(spec)?;

    let persona = Template::new(
        template.role.trim(),
        template.goal.trim(),
        truncate_chars(template.backstory.trim(), backstory_limit),
    );
    if !persona.is_complete() {
        return Err(ProvisionError::Construction(format!(
            "template '{}' has an empty role, goal or backstory",
            category
        )));
    }

    Ok(AgentEntity::new(id, spec.name.trim(), category, persona, llm))
}
