//! Ordered prompt chains
//!
//! A chain is a sequence of prompts that will be composed in order. Every
//! node carries its position, and after any structural change the positions
//! are renumbered so that `nodes[i].position == i`.

use crate::catalog::{Prompt, PromptId};
use crate::error::DeckError;
use crate::ledger::UsageLedger;
use crate::templates::NewTemplate;

/// Tokens per character used for the rough cost estimate
pub const TOKENS_PER_CHAR: f64 = 0.25;

/// Length at which the front end stops offering to stage more prompts
pub const STAGING_SOFT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    pub prompt: Prompt,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAdd {
    Added { position: usize },
    AlreadyPresent,
}

#[derive(Debug, Default, Clone)]
pub struct ChainComposer {
    nodes: Vec<ChainNode>,
}

impl ChainComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[ChainNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: PromptId) -> bool {
        self.nodes.iter().any(|n| n.prompt.id == id)
    }

    pub fn can_stage_more(&self) -> bool {
        self.nodes.len() < STAGING_SOFT_LIMIT
    }

    pub fn prompt_ids(&self) -> Vec<PromptId> {
        self.nodes.iter().map(|n| n.prompt.id).collect()
    }

    pub fn prompts(&self) -> Vec<&Prompt> {
        self.nodes.iter().map(|n| &n.prompt).collect()
    }

    /// Append a prompt unless it is already in the chain
    pub fn add(&mut self, prompt: &Prompt) -> ChainAdd {
        if self.contains(prompt.id) {
            return ChainAdd::AlreadyPresent;
        }

        let position = self.nodes.len();
        self.nodes.push(ChainNode {
            prompt: prompt.clone(),
            position,
        });
        ChainAdd::Added { position }
    }

    /// Remove the node at `index`, if there is one
    pub fn remove(&mut self, index: usize) -> Option<ChainNode> {
        if index >= self.nodes.len() {
            return None;
        }

        let removed = self.nodes.remove(index);
        self.renumber();
        Some(removed)
    }

    /// Move the node holding `from_id` to `to_index`
    ///
    /// `to_index` past the end moves the node to the back. Returns whether
    /// anything moved.
    pub fn reorder(&mut self, from_id: PromptId, to_index: usize) -> bool {
        let Some(from_index) = self.nodes.iter().position(|n| n.prompt.id == from_id) else {
            return false;
        };

        let to_index = to_index.min(self.nodes.len() - 1);
        if from_index == to_index {
            return false;
        }

        let node = self.nodes.remove(from_index);
        self.nodes.insert(to_index, node);
        self.renumber();
        true
    }

    /// Rough token count: a quarter token per UTF-16 unit of each example
    pub fn estimate_tokens(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| n.prompt.example.encode_utf16().count() as f64 * TOKENS_PER_CHAR)
            .sum()
    }

    /// Count a chain run against the ledger and return the node count
    pub fn execute(&self, ledger: &mut UsageLedger) -> Result<usize, DeckError> {
        if self.nodes.is_empty() {
            return Err(DeckError::EmptyChain);
        }

        ledger.build_chain();
        Ok(self.nodes.len())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Template draft for saving this chain
    pub fn to_template(
        &self,
        name: &str,
        description: Option<String>,
        is_public: bool,
    ) -> Result<NewTemplate, DeckError> {
        if self.nodes.is_empty() {
            return Err(DeckError::EmptyChain);
        }

        Ok(NewTemplate {
            name: name.trim().to_string(),
            description,
            prompt_ids: self.prompt_ids(),
            category: self.dominant_category(),
            is_public: Some(is_public),
        })
    }

    /// Most common category in the chain, earliest wins ties
    fn dominant_category(&self) -> Option<String> {
        let mut best: Option<(&str, usize)> = None;
        for node in &self.nodes {
            let category = node.prompt.category.as_str();
            let count = self
                .nodes
                .iter()
                .filter(|n| n.prompt.category == category)
                .count();
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((category, count));
            }
        }
        best.map(|(c, _)| c.to_string())
    }

    fn renumber(&mut self) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.position = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Local, TimeZone};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn prompt(id: PromptId, example_len: usize, category: &str) -> Prompt {
        Prompt {
            id,
            title: format!("Prompt {}", id),
            description: String::new(),
            category: category.to_string(),
            example: "x".repeat(example_len),
            score: None,
        }
    }

    fn chain_of(ids: &[PromptId]) -> ChainComposer {
        let mut chain = ChainComposer::new();
        for &id in ids {
            chain.add(&prompt(id, 10, "reasoning"));
        }
        chain
    }

    fn assert_invariants(chain: &ChainComposer) {
        let mut seen = HashSet::new();
        for (index, node) in chain.nodes().iter().enumerate() {
            assert_eq!(node.position, index);
            assert!(seen.insert(node.prompt.id), "duplicate id {}", node.prompt.id);
        }
    }

    fn ledger() -> UsageLedger {
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        UsageLedger::load(MemoryStore::shared(), clock)
    }

    #[test]
    fn test_add_assigns_positions_and_rejects_duplicates() {
        let mut chain = ChainComposer::new();
        assert_eq!(chain.add(&prompt(1, 0, "a")), ChainAdd::Added { position: 0 });
        assert_eq!(chain.add(&prompt(2, 0, "a")), ChainAdd::Added { position: 1 });
        assert_eq!(chain.add(&prompt(1, 0, "a")), ChainAdd::AlreadyPresent);
        assert_eq!(chain.len(), 2);
        assert_invariants(&chain);
    }

    #[test]
    fn test_remove_renumbers() {
        let mut chain = chain_of(&[1, 2, 3, 4]);
        let removed = chain.remove(1).unwrap();
        assert_eq!(removed.prompt.id, 2);
        assert_eq!(chain.prompt_ids(), vec![1, 3, 4]);
        assert_invariants(&chain);

        assert!(chain.remove(10).is_none());
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_reorder_moves_and_renumbers() {
        let mut chain = chain_of(&[1, 2, 3, 4]);
        assert!(chain.reorder(4, 0));
        assert_eq!(chain.prompt_ids(), vec![4, 1, 2, 3]);
        assert_invariants(&chain);

        assert!(chain.reorder(4, 2));
        assert_eq!(chain.prompt_ids(), vec![1, 2, 4, 3]);
        assert_invariants(&chain);
    }

    #[test]
    fn test_reorder_noops() {
        let mut chain = chain_of(&[1, 2, 3]);
        assert!(!chain.reorder(2, 1));
        assert!(!chain.reorder(99, 0));
        assert_eq!(chain.prompt_ids(), vec![1, 2, 3]);

        // Past the end clamps to the last slot
        assert!(chain.reorder(1, 50));
        assert_eq!(chain.prompt_ids(), vec![2, 3, 1]);
        assert_invariants(&chain);
    }

    #[test]
    fn test_mixed_operations_keep_invariants() {
        let mut chain = chain_of(&[5, 6, 7, 8, 9]);
        chain.reorder(9, 1);
        chain.remove(0);
        chain.add(&prompt(5, 0, "a"));
        chain.reorder(5, 0);
        chain.remove(2);
        assert_invariants(&chain);
        assert_eq!(chain.prompt_ids(), vec![5, 9, 7, 8]);
    }

    #[test]
    fn test_estimate_tokens() {
        let mut chain = ChainComposer::new();
        chain.add(&prompt(1, 40, "a"));
        chain.add(&prompt(2, 80, "a"));
        assert_eq!(chain.estimate_tokens(), 30.0);
    }

    #[test]
    fn test_estimate_tokens_counts_utf16_units() {
        let mut chain = ChainComposer::new();
        let mut p = prompt(1, 0, "a");
        p.example = "é🙂".to_string();
        chain.add(&p);
        // 1 unit for é, 2 for the emoji
        assert_eq!(chain.estimate_tokens(), 0.75);
    }

    #[test]
    fn test_execute_counts_chain_build() {
        let mut ledger = ledger();
        let empty = ChainComposer::new();
        assert!(matches!(empty.execute(&mut ledger), Err(DeckError::EmptyChain)));
        assert_eq!(ledger.state().chains_built, 0);

        let chain = chain_of(&[1, 2, 3]);
        assert_eq!(chain.execute(&mut ledger).unwrap(), 3);
        assert_eq!(ledger.state().chains_built, 1);
    }

    #[test]
    fn test_clear() {
        let mut chain = chain_of(&[1, 2]);
        chain.clear();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_template_draft() {
        let mut chain = ChainComposer::new();
        chain.add(&prompt(3, 0, "context"));
        chain.add(&prompt(1, 0, "reasoning"));
        chain.add(&prompt(2, 0, "reasoning"));

        let draft = chain.to_template("  Deep dive ", None, true).unwrap();
        assert_eq!(draft.name, "Deep dive");
        assert_eq!(draft.prompt_ids, vec![3, 1, 2]);
        assert_eq!(draft.category.as_deref(), Some("reasoning"));
        assert_eq!(draft.is_public, Some(true));

        assert!(ChainComposer::new().to_template("x", None, false).is_err());
    }
}
