//! Finalization unit: persona overrides, knowledge bindings, `ready`.

use crate::agent::constructor::truncate_chars;
use crate::agent::{AgentEntity, AgentSpec, KnowledgeBinding};
use crate::error::ProvisionError;

/// Reconcile spec overrides onto the persona, attach knowledge sources and
/// mark the entity ready.
pub fn finalize(
    entity: &AgentEntity,
    spec: &AgentSpec,
    backstory_limit: usize,
) -> Result<(), ProvisionError> {
    entity.update_persona(|persona| {
        if let Some(role) = AgentSpec::override_for(&spec.role) {
            persona.role = role.to_string();
        }
        if let Some(goal) = AgentSpec::override_for(&spec.goal) {
            persona.goal = goal.to_string();
        }
        if let Some(backstory) = AgentSpec::override_for(&spec.backstory) {
            persona.backstory = truncate_chars(backstory, backstory_limit);
        }
    });

    if !entity.persona().is_complete() {
        return Err(ProvisionError::Construction(
            "persona lost a field during finalization".to_string(),
        ));
    }

    if spec.rag_enabled {
        let mut knowledge: Vec<KnowledgeBinding> = Vec::new();
        for source in spec.rag_sources.iter().map(|s| s.trim()) {
            if !source.is_empty() && !knowledge.iter().any(|k| k.source_id == source) {
                knowledge.push(KnowledgeBinding::for_source(source));
            }
        }
        entity.set_knowledge(knowledge);
    }

    entity.mark_ready();
    Ok(())
}
