//! Fuzzy matching over the prompt catalog
//!
//! Two matchers live here. [`Matcher`] resolves a single prompt from whatever
//! the user typed (an id, a title, or a fragment of one). [`FuzzySearcher`]
//! ranks many prompts against a free-text query using weighted fields, which
//! is what the visible list is ordered by while a search is active.

use crate::catalog::{Prompt, PromptId};
use colored::*;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Field scores above this are discarded (0.0 is a perfect match).
pub const SEARCH_THRESHOLD: f64 = 0.4;

/// Shortest contiguous run of matched characters that counts as a hit.
pub const MIN_MATCH_CHARS: usize = 2;

/// Query words shorter than this never take the typo path.
const TYPO_MIN_WORD_CHARS: usize = 4;

/// Prompt fields that take part in a search, with their relative weights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Description,
    Example,
    Category,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Description,
        SearchField::Example,
        SearchField::Category,
    ];

    pub fn weight(self) -> f64 {
        match self {
            SearchField::Title => 2.0,
            SearchField::Description => 1.5,
            SearchField::Example => 1.0,
            SearchField::Category => 0.5,
        }
    }

    fn text(self, prompt: &Prompt) -> &str {
        match self {
            SearchField::Title => &prompt.title,
            SearchField::Description => &prompt.description,
            SearchField::Example => &prompt.example,
            SearchField::Category => &prompt.category,
        }
    }
}

/// A prompt that survived the search, with its relevance (lower is better)
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub prompt: &'a Prompt,
    pub score: f64,
}

/// Weighted multi-field fuzzy search
///
/// Each field is scored independently as `1 - raw / perfect`, where `raw` is
/// the skim score of the field and `perfect` is the score the query would get
/// against itself. Fields scoring worse than the threshold, or whose longest
/// contiguous matched run is shorter than [`MIN_MATCH_CHARS`], do not count.
/// The surviving field scores are combined as a weighted product, shorter
/// fields pulling harder than long ones.
///
/// Skim only matches subsequences, so a substituted character ("thoughx")
/// would miss entirely. When that happens each query word is compared
/// against the field's words by edit distance instead. Up to one edit per
/// four characters is tolerated, and the field scores `edits / characters`.
pub struct FuzzySearcher {
    fuzzy: SkimMatcherV2,
    threshold: f64,
    min_match_chars: usize,
}

impl Default for FuzzySearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearcher {
    pub fn new() -> Self {
        Self {
            fuzzy: SkimMatcherV2::default().ignore_case(),
            threshold: SEARCH_THRESHOLD,
            min_match_chars: MIN_MATCH_CHARS,
        }
    }

    /// Rank `prompts` against `query`, best match first
    ///
    /// Ties keep the order the prompts were supplied in. Match position inside
    /// a field does not matter.
    pub fn search<'a, I>(&self, prompts: I, query: &str) -> Vec<SearchHit<'a>>
    where
        I: IntoIterator<Item = &'a Prompt>,
    {
        let pattern = query.trim().to_lowercase();
        if pattern.chars().count() < self.min_match_chars {
            return Vec::new();
        }

        let perfect = match self.fuzzy.fuzzy_match(&pattern, &pattern) {
            Some(score) if score > 0 => score,
            _ => return Vec::new(),
        };

        let total_weight: f64 = SearchField::ALL.iter().map(|f| f.weight()).sum();

        let mut hits: Vec<SearchHit<'a>> = prompts
            .into_iter()
            .filter_map(|prompt| {
                let mut matched = false;
                let mut combined = 1.0_f64;

                for field in SearchField::ALL {
                    let text = field.text(prompt);
                    if let Some(score) = self.field_score(text, &pattern, perfect) {
                        matched = true;
                        let base = if score == 0.0 { f64::EPSILON } else { score };
                        let exponent = (field.weight() / total_weight) * field_norm(text);
                        combined *= base.powf(exponent);
                    }
                }

                matched.then_some(SearchHit {
                    prompt,
                    score: combined,
                })
            })
            .collect();

        // Stable, so equal scores keep their incoming order
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits
    }

    fn field_score(&self, text: &str, pattern: &str, perfect: i64) -> Option<f64> {
        let score = match self.fuzzy.fuzzy_indices(text, pattern) {
            Some((raw, indices)) if longest_run(&indices) >= self.min_match_chars => {
                (1.0 - raw as f64 / perfect as f64).clamp(0.0, 1.0)
            }
            _ => typo_score(text, pattern)?,
        };
        (score <= self.threshold).then_some(score)
    }
}

fn typo_score(text: &str, pattern: &str) -> Option<f64> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut edits = 0;
    let mut chars = 0;
    for query_word in pattern.split_whitespace() {
        let len = query_word.chars().count();
        if len < TYPO_MIN_WORD_CHARS {
            return None;
        }
        let allowed = (len / 4).max(1);
        let best = words
            .iter()
            .filter(|w| w.chars().count().abs_diff(len) <= allowed)
            .map(|w| edit_distance(query_word, w))
            .min()?;
        if best > allowed {
            return None;
        }
        edits += best;
        chars += len;
    }

    (chars > 0).then(|| edits as f64 / chars as f64)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev, &mut row);
    }

    prev[b.len()]
}

fn longest_run(indices: &[usize]) -> usize {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<usize> = None;

    for &index in indices {
        run = match prev {
            Some(p) if index == p + 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(index);
    }

    best
}

fn field_norm(text: &str) -> f64 {
    let tokens = text.split_whitespace().count().max(1);
    1.0 / (tokens as f64).sqrt()
}

/// Resolves a single prompt from a user-supplied reference
///
/// Provides a tiered lookup: numeric id, then exact title, then fuzzy title
/// matching with heuristics that favour prefix and word-start matches.
pub struct Matcher<'a> {
    prompts: &'a [Prompt],
    fuzzy: SkimMatcherV2,
}

impl<'a> Matcher<'a> {
    pub fn new(prompts: &'a [Prompt]) -> Self {
        Self {
            prompts,
            fuzzy: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Find the best matching prompt(s) for a given query
    ///
    /// Uses a tiered matching approach:
    /// 1. Exact id match
    /// 2. Exact title match (case-insensitive)
    /// 3. Fuzzy title matching with enhanced scoring
    pub fn find(&self, query: &str) -> MatchResult<'a> {
        let query = query.trim();

        if let Ok(id) = query.parse::<PromptId>() {
            if let Some(prompt) = self.prompts.iter().find(|p| p.id == id) {
                return MatchResult::Exact(prompt);
            }
        }

        if let Some(prompt) = self
            .prompts
            .iter()
            .find(|p| p.title.eq_ignore_ascii_case(query))
        {
            return MatchResult::Exact(prompt);
        }

        let mut matches: Vec<(&'a Prompt, i64)> = self
            .prompts
            .iter()
            .filter_map(|prompt| {
                let fuzzy_score = self.fuzzy.fuzzy_match(&prompt.title, query)?;
                Some((prompt, enhanced_score(&prompt.title, query, fuzzy_score)))
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1));

        match matches.len() {
            0 => MatchResult::None,
            1 => MatchResult::Exact(matches[0].0),
            _ => {
                if matches[0].1 > matches[1].1 + 1000 {
                    MatchResult::Exact(matches[0].0)
                } else {
                    MatchResult::Multiple(matches.into_iter().map(|(p, _)| p).take(8).collect())
                }
            }
        }
    }
}

/// Combines the raw fuzzy score with relevance heuristics
fn enhanced_score(title: &str, query: &str, fuzzy_score: i64) -> i64 {
    let mut score = fuzzy_score;
    let title_lower = title.to_lowercase();
    let query_lower = query.to_lowercase();

    if title_lower.starts_with(&query_lower) {
        score += 2000;
    }

    if title_lower
        .split(['-', ' '])
        .any(|word| word.starts_with(&query_lower))
    {
        score += 1000;
    }

    if title.len() < 20 {
        score += 300;
    }

    score
}

/// Result of resolving a prompt reference
#[derive(Debug)]
pub enum MatchResult<'a> {
    /// Single match found
    Exact(&'a Prompt),
    /// Several plausible matches, ranked by relevance
    Multiple(Vec<&'a Prompt>),
    /// Nothing matched
    None,
}

impl MatchResult<'_> {
    pub fn display(&self) {
        match self {
            MatchResult::Exact(_) => {}
            MatchResult::Multiple(prompts) => {
                eprintln!("{}: Multiple matches. Did you mean:", "Error".red());
                for prompt in prompts {
                    eprintln!(
                        "  {:>3}  {:<24} {}",
                        prompt.id.to_string().dimmed(),
                        prompt.title.bold(),
                        prompt.category.cyan()
                    );
                }
            }
            MatchResult::None => {
                eprintln!("{}: No matching prompt found", "Error".red());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: PromptId, title: &str, description: &str, category: &str) -> Prompt {
        Prompt {
            id,
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            example: String::new(),
            score: None,
        }
    }

    fn sample() -> Vec<Prompt> {
        vec![
            prompt(1, "Chain of Thought", "Reason step by step", "reasoning"),
            prompt(2, "Few-Shot Examples", "Worked input and output pairs", "context"),
            prompt(3, "Role Assignment", "Give the model a persona", "role"),
            prompt(4, "Self-Critique", "Review and revise the draft", "iteration"),
        ]
    }

    #[test]
    fn test_exact_id_match() {
        let prompts = sample();
        let matcher = Matcher::new(&prompts);
        match matcher.find("3") {
            MatchResult::Exact(p) => assert_eq!(p.title, "Role Assignment"),
            other => panic!("Expected exact match, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_title_match_ignores_case() {
        let prompts = sample();
        let matcher = Matcher::new(&prompts);
        match matcher.find("few-shot examples") {
            MatchResult::Exact(p) => assert_eq!(p.id, 2),
            other => panic!("Expected exact match, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_fuzzy_match() {
        let prompts = sample();
        let matcher = Matcher::new(&prompts);
        match matcher.find("self") {
            MatchResult::Exact(p) => assert_eq!(p.id, 4),
            other => panic!("Expected exact match, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match() {
        let prompts = sample();
        let matcher = Matcher::new(&prompts);
        assert!(matches!(matcher.find("zzqxj"), MatchResult::None));
    }

    #[test]
    fn test_search_ranks_title_hit_first() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();
        let hits = searcher.search(&prompts, "chain");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].prompt.id, 1);
    }

    #[test]
    fn test_search_requires_two_characters() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();
        assert!(searcher.search(&prompts, "c").is_empty());
        assert!(searcher.search(&prompts, "   ").is_empty());
    }

    #[test]
    fn test_search_drops_unrelated_prompts() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();
        let hits = searcher.search(&prompts, "persona");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt.id, 3);
    }

    #[test]
    fn test_search_matches_anywhere_in_field() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();
        let hits = searcher.search(&prompts, "revise");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt.id, 4);
    }

    #[test]
    fn test_search_tolerates_substituted_character() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();

        let hits = searcher.search(&prompts, "thoughx");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt.id, 1);

        let hits = searcher.search(&prompts, "reasom step");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt.id, 1);
    }

    #[test]
    fn test_search_rejects_distant_typos() {
        let prompts = sample();
        let searcher = FuzzySearcher::new();
        assert!(searcher.search(&prompts, "thxxght").is_empty());
        // One edit from "by", but too short for the typo path
        assert!(searcher.search(&prompts, "bx").is_empty());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("thought", "thought"), 0);
        assert_eq!(edit_distance("thoughx", "thought"), 1);
        assert_eq!(edit_distance("though", "thought"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(&[]), 0);
        assert_eq!(longest_run(&[4]), 1);
        assert_eq!(longest_run(&[0, 2, 4]), 1);
        assert_eq!(longest_run(&[0, 1, 5, 6, 7]), 3);
    }
}
