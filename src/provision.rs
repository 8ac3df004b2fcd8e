//! Provisioning
//!
//! The tier ladder and the [`Provisioner`] that drives a spec through it.

pub mod chain;
pub mod tier;

pub use chain::{
    BackgroundCompletion, Enrichment, HealthReport, PersistenceStatus, Provisioned, Provisioner,
    ProvisionerBuilder,
};
pub use tier::{Escalation, Tier, TierOutcome};
