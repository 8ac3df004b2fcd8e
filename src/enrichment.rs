//! Background Enrichment
//!
//! Tool attachment, memory setup and finalization, plus the orchestrator that
//! runs them concurrently against a constructed entity.

pub mod finalize;
pub mod memory;
pub mod orchestrator;
pub mod tools;

pub use memory::{InMemoryStore, MemorySetup, MemoryStore};
pub use orchestrator::{EnrichmentOrchestrator, EnrichmentOutcome, UnitKind, UnitReport, UnitStatus};
pub use tools::{CatalogError, StaticToolCatalog, ToolAttachment, ToolCatalog};
