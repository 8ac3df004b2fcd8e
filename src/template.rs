//! Role Templates
//!
//! Static `{role, goal, backstory}` triples keyed by category, and the keyword
//! classifier that picks one from an agent's free-text name and description.

pub mod catalog;
pub mod classifier;

pub use catalog::{Template, TemplateCatalog, TemplateOverride};
pub use classifier::{classify, Category, KeywordTable, DEFAULT_KEYWORDS};
