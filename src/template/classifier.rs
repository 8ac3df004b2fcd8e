//! Keyword-driven template classification.
//!
//! The keyword table is plain data; extending it never touches the matcher.
//! Matching is a case-insensitive substring search over name then description,
//! walking the table in order. The first keyword found wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Template category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Coding,
    Reasoning,
    Default,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Coding, Category::Reasoning, Category::Default];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coding => "coding",
            Category::Reasoning => "reasoning",
            Category::Default => "default",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in keyword table, in match order. Keywords are stored lowercase.
pub const DEFAULT_KEYWORDS: &[(&str, Category)] = &[
    ("code", Category::Coding),
    ("programming", Category::Coding),
    ("analysis", Category::Reasoning),
    ("推理", Category::Reasoning),
    ("logic", Category::Reasoning),
    ("search", Category::Default),
    ("help", Category::Default),
];

/// Ordered keyword → category table
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(String, Category)>,
}

impl KeywordTable {
    /// Table holding the built-in keywords
    pub fn builtin() -> Self {
        Self::from_entries(DEFAULT_KEYWORDS.iter().map(|(k, c)| (k.to_string(), *c)))
    }

    /// Build a table from ordered entries. Keywords are lowercased on insert.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Category)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(k, _)| !k.trim().is_empty())
                .map(|(k, c)| (k.to_lowercase(), c))
                .collect(),
        }
    }

    /// Append a keyword at the lowest precedence
    pub fn push(&mut self, keyword: impl Into<String>, category: Category) {
        let keyword = keyword.into();
        if !keyword.trim().is_empty() {
            self.entries.push((keyword.to_lowercase(), category));
        }
    }

    pub fn entries(&self) -> &[(String, Category)] {
        &self.entries
    }

    /// Classify a name/description pair. Never fails; no match yields `Default`.
    pub fn classify(&self, name: &str, description: Option<&str>) -> Category {
        let name = name.to_lowercase();
        let description = description.map(str::to_lowercase);

        self.entries
            .iter()
            .find(|(keyword, _)| {
                name.contains(keyword.as_str())
                    || description
                        .as_deref()
                        .map(|d| d.contains(keyword.as_str()))
                        .unwrap_or(false)
            })
            .map(|(_, category)| *category)
            .unwrap_or(Category::Default)
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Classify against the built-in keyword table.
pub fn classify(name: &str, description: Option<&str>) -> Category {
    DEFAULT_KEYWORDS
        .iter()
        .find(|(keyword, _)| {
            contains_ignore_case(name, keyword)
                || description
                    .map(|d| contains_ignore_case(d, keyword))
                    .unwrap_or(false)
        })
        .map(|(_, category)| *category)
        .unwrap_or(Category::Default)
}

fn contains_ignore_case(haystack: &str, lowercase_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowercase_needle)
}
