//! LLM Provider
//!
//! Endpoint configuration and the shared connection pool agents bind to.

pub mod config;
pub mod pool;

pub use config::ProviderConfig;
pub use pool::{HttpPoolInitializer, LlmBindingInfo, LlmHandle, LlmPool, LlmProfile};
