//! Core types for the agent provisioning pipeline.

/// AgentId: caller-supplied or generated identifier of a provisioned agent
pub type AgentId = String;

/// ToolId: identifier resolved against the tool catalog
pub type ToolId = String;

/// SourceId: identifier of a knowledge (RAG) source
pub type SourceId = String;

/// ConfigMap: free-form agent configuration as supplied by the caller
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;
