//! Visible-list derivation: filter, then search or sort
//!
//! [`SearchFilterPipeline::run`] is a pure function of the catalog, the
//! favorite ids and a [`FilterState`]. The steps are:
//! 1. favorites-only view, or else a single category (never both; the
//!    favorites view ignores the category)
//! 2. a non-blank query re-ranks everything by fuzzy relevance and the sort
//!    order is ignored
//! 3. without a query, a stable sort on the prompt score

use crate::catalog::{Catalog, Prompt, PromptId};
use crate::matching::FuzzySearcher;
use clap::ValueEnum;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub favorites_only: bool,
    /// `None` shows every category
    pub category: Option<String>,
    pub query: String,
    pub sort: SortOrder,
}

impl FilterState {
    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Set the category; "all" or blank clears it
    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);
    }
}

#[derive(Default)]
pub struct SearchFilterPipeline {
    searcher: FuzzySearcher,
}

impl SearchFilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<'a>(
        &self,
        catalog: &'a Catalog,
        favorites: &HashSet<PromptId>,
        filter: &FilterState,
    ) -> Vec<&'a Prompt> {
        let filtered: Vec<&'a Prompt> = if filter.favorites_only {
            catalog
                .iter()
                .filter(|p| favorites.contains(&p.id))
                .collect()
        } else if let Some(category) = &filter.category {
            catalog.iter().filter(|p| &p.category == category).collect()
        } else {
            catalog.iter().collect()
        };

        if filter.has_query() {
            return self
                .searcher
                .search(filtered, &filter.query)
                .into_iter()
                .map(|hit| hit.prompt)
                .collect();
        }

        let mut sorted = filtered;
        match filter.sort {
            SortOrder::Desc => sorted.sort_by(|a, b| b.sort_score().total_cmp(&a.sort_score())),
            SortOrder::Asc => sorted.sort_by(|a, b| a.sort_score().total_cmp(&b.sort_score())),
        }
        sorted
    }
}
