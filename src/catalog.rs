//! The static prompt catalog
//!
//! Prompts are read-only records loaded once at startup. The built-in catalog
//! ships inside the binary; a custom one can be loaded from a JSON file with
//! the same shape.

use crate::matching::{MatchResult, Matcher};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Stable join key used by favorites, selection, chains and templates
pub type PromptId = u32;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// A single prompt-engineering technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub example: String,
    /// Editorial rating used for the default ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Prompt {
    /// Score used for sorting; unrated prompts count as zero
    pub fn sort_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Ordered, immutable collection of prompts
#[derive(Debug, Clone)]
pub struct Catalog {
    prompts: Vec<Prompt>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids
    pub fn new(prompts: Vec<Prompt>) -> Result<Self> {
        let mut seen = HashSet::new();
        for prompt in &prompts {
            if !seen.insert(prompt.id) {
                return Err(anyhow!("Duplicate prompt id {} in catalog", prompt.id));
            }
        }
        Ok(Self { prompts })
    }

    /// The catalog bundled with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CATALOG).context("Built-in catalog is malformed")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let prompts: Vec<Prompt> =
            serde_json::from_str(content).context("Failed to parse prompt catalog")?;
        Self::new(prompts)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prompt> {
        self.prompts.iter()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, id: PromptId) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Distinct categories in the order they first appear
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.prompts
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Resolve an id, title or title fragment to a prompt
    pub fn resolve(&self, query: &str) -> MatchResult<'_> {
        Matcher::new(&self.prompts).find(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.len() >= 10);
        assert!(catalog.get(1).is_some());
        assert!(catalog.categories().contains(&"reasoning"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": 1, "title": "A", "description": "", "category": "x", "example": ""},
            {"id": 1, "title": "B", "description": "", "category": "y", "example": ""}
        ]"#;
        assert!(Catalog::from_json(json).is_err());
    }

    #[test]
    fn test_categories_keep_first_seen_order() {
        let json = r#"[
            {"id": 1, "title": "A", "description": "", "category": "b", "example": ""},
            {"id": 2, "title": "B", "description": "", "category": "a", "example": ""},
            {"id": 3, "title": "C", "description": "", "category": "b", "example": ""}
        ]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.categories(), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_score_sorts_as_zero() {
        let json = r#"[{"id": 7, "title": "A", "description": "", "category": "x", "example": ""}]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.get(7).unwrap().sort_score(), 0.0);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"[{"id": 3, "title": "Only", "description": "d", "category": "c", "example": "e", "score": 1.5}]"#,
        )
        .unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(3).unwrap().score, Some(1.5));
    }
}
