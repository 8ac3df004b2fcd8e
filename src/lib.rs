//! Berth: Fast Agent Provisioning
//!
//! Provisions agent entities under a latency budget. A spec is validated and
//! classified, a readiness gate guards the shared LLM connection pool, a
//! minimal entity is constructed synchronously, and tools, memory and
//! finalization are applied concurrently. A three-tier degradation chain
//! guarantees every valid spec yields a usable entity.

pub mod agent;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod latency;
pub mod logging;
pub mod provider;
pub mod provision;
pub mod readiness;
pub mod template;
pub mod tooling;
pub mod types;

pub use agent::{AgentEntity, AgentSpec, AgentStatus};
pub use error::{ProvisionError, ValidationError};
pub use provision::{Provisioned, Provisioner, Tier};
