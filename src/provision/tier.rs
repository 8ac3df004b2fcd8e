//! Degradation tiers and their typed outcomes.

use crate::agent::AgentEntity;
use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Degradation tier, ordered from most to least external dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Optimized,
    Fallback,
    Emergency,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Optimized, Tier::Fallback, Tier::Emergency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Optimized => "optimized",
            Tier::Fallback => "fallback",
            Tier::Emergency => "emergency",
        }
    }

    /// Tier to try after this one fails; `None` past Emergency
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Optimized => Some(Tier::Fallback),
            Tier::Fallback => Some(Tier::Emergency),
            Tier::Emergency => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        *self != Tier::Optimized
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one tier
pub enum TierOutcome {
    /// The tier produced an entity
    Built(AgentEntity),
    /// The tier could not produce an entity; the chain moves to the next tier
    Escalate(ProvisionError),
}

impl TierOutcome {
    pub fn from_result(result: Result<AgentEntity, ProvisionError>) -> Self {
        match result {
            Ok(entity) => TierOutcome::Built(entity),
            Err(e) => TierOutcome::Escalate(e),
        }
    }
}

/// Why a tier was left, kept on the result for observability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Escalation {
    pub from: Tier,
    pub reason: String,
}
