//! Error Types
//!
//! `ValidationError` is the only failure a caller of the provisioning operation
//! ever observes. Everything else is a `ProvisionError`, contained at the tier
//! or enrichment-unit boundary that produced it.

use thiserror::Error;

/// Malformed agent input. Fatal to the call; no entity is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Agent name must be between {min} and {max} characters, got {actual}")]
    NameLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Agent description must be at most {max} characters, got {actual}")]
    DescriptionTooLong { max: usize, actual: usize },

    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("Max tokens must be positive")]
    InvalidMaxTokens,
}

/// Internal provisioning failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Readiness gate did not open within {0}ms")]
    ReadinessTimeout(u64),

    #[error("Connection pool initialization failed: {0}")]
    ReadinessFailed(String),

    #[error("Entity construction failed: {0}")]
    Construction(String),

    #[error("Tool catalog error: {0}")]
    ToolCatalog(String),

    #[error("Memory store error: {0}")]
    MemoryStore(String),

    #[error("Enrichment unit '{unit}' exceeded its {deadline_ms}ms deadline")]
    UnitDeadline { unit: String, deadline_ms: u64 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ProvisionError {
    fn from(err: config::ConfigError) -> Self {
        ProvisionError::ConfigError(err.to_string())
    }
}

impl ProvisionError {
    /// Whether this failure should move provisioning to the next tier.
    ///
    /// Validation never escalates: it aborts the call before any tier runs.
    pub fn escalates(&self) -> bool {
        !matches!(self, ProvisionError::Validation(_))
    }
}
