//! Built-in role templates and config overrides.

use super::classifier::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role template: the persona triple an agent is constructed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

impl Template {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// All three persona fields carry visible text
    pub fn is_complete(&self) -> bool {
        !self.role.trim().is_empty()
            && !self.goal.trim().is_empty()
            && !self.backstory.trim().is_empty()
    }

    fn apply(&mut self, overrides: &TemplateOverride) {
        if let Some(role) = &overrides.role {
            self.role = role.clone();
        }
        if let Some(goal) = &overrides.goal {
            self.goal = goal.clone();
        }
        if let Some(backstory) = &overrides.backstory {
            self.backstory = backstory.clone();
        }
    }
}

/// Partial template supplied through configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backstory: Option<String>,
}

/// One template per category. Every category always has an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCatalog {
    coding: Template,
    reasoning: Template,
    default: Template,
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        Self {
            coding: Template::new(
                "AI Programming Assistant",
                "Assist with programming and technical implementation",
                "A professional software development assistant, fluent in many \
                 programming languages and their best practices.",
            ),
            reasoning: Template::new(
                "AI Reasoning Specialist",
                "Carry out complex reasoning and analysis tasks",
                "An agent trained for reasoning and problem solving, with deep \
                 logical and analytical ability.",
            ),
            default: Template::new(
                "AI Assistant",
                "Help users with a wide range of tasks",
                "A versatile assistant dedicated to professional, efficient help.",
            ),
        }
    }

    /// Built-in templates with per-category overrides layered on top
    pub fn with_overrides(overrides: &BTreeMap<Category, TemplateOverride>) -> Self {
        let mut catalog = Self::builtin();
        for (category, template_override) in overrides {
            catalog.slot_mut(*category).apply(template_override);
        }
        catalog
    }

    pub fn get(&self, category: Category) -> &Template {
        match category {
            Category::Coding => &self.coding,
            Category::Reasoning => &self.reasoning,
            Category::Default => &self.default,
        }
    }

    /// Iterate `(category, template)` in category order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Template)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    fn slot_mut(&mut self, category: Category) -> &mut Template {
        match category {
            Category::Coding => &mut self.coding,
            Category::Reasoning => &mut self.reasoning,
            Category::Default => &mut self.default,
        }
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
