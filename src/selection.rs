//! Bounded selection of prompts chosen for composition
//!
//! The selection is session-scoped and never persisted.

use crate::catalog::{Prompt, PromptId};

pub const MAX_SELECTION: usize = 5;

/// What a toggle did to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    /// The prompt was not selected and there is no room for it
    Full,
}

#[derive(Debug, Default, Clone)]
pub struct SelectionStore {
    prompts: Vec<Prompt>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, prompt: &Prompt) -> SelectionChange {
        if let Some(index) = self.prompts.iter().position(|p| p.id == prompt.id) {
            self.prompts.remove(index);
            return SelectionChange::Removed;
        }

        if !self.can_select_more() {
            return SelectionChange::Full;
        }

        self.prompts.push(prompt.clone());
        SelectionChange::Added
    }

    pub fn clear(&mut self) {
        self.prompts.clear();
    }

    pub fn is_selected(&self, id: PromptId) -> bool {
        self.prompts.iter().any(|p| p.id == id)
    }

    pub fn can_select_more(&self) -> bool {
        self.prompts.len() < MAX_SELECTION
    }

    /// Selected prompts in the order they were picked
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: PromptId) -> Prompt {
        Prompt {
            id,
            title: format!("Prompt {}", id),
            description: String::new(),
            category: "test".to_string(),
            example: String::new(),
            score: None,
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selection = SelectionStore::new();
        assert_eq!(selection.toggle(&prompt(1)), SelectionChange::Added);
        assert!(selection.is_selected(1));
        assert_eq!(selection.toggle(&prompt(1)), SelectionChange::Removed);
        assert!(!selection.is_selected(1));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut selection = SelectionStore::new();
        for id in 1..=5 {
            assert_eq!(selection.toggle(&prompt(id)), SelectionChange::Added);
        }
        assert!(!selection.can_select_more());
        assert_eq!(selection.toggle(&prompt(6)), SelectionChange::Full);
        assert_eq!(selection.len(), MAX_SELECTION);
        assert!(!selection.is_selected(6));

        // Deselecting still works when full
        assert_eq!(selection.toggle(&prompt(3)), SelectionChange::Removed);
        assert_eq!(selection.toggle(&prompt(6)), SelectionChange::Added);
    }

    #[test]
    fn test_order_is_preserved() {
        let mut selection = SelectionStore::new();
        for id in [4, 2, 9] {
            selection.toggle(&prompt(id));
        }
        let ids: Vec<PromptId> = selection.prompts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![4, 2, 9]);

        selection.clear();
        assert!(selection.is_empty());
        assert!(selection.can_select_more());
    }
}
