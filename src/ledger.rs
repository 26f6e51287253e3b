//! Usage ledger: daily copy quota, usage counters and levels
//!
//! The ledger is one persisted record. It is written through after every
//! mutation and re-read only when a session starts.
//!
//! Resets are not scheduled. Whoever owns the ledger calls
//! [`UsageLedger::reset_if_needed`] when a session starts and then on a
//! regular poll; because the check compares elapsed wall-clock time, a
//! missed poll just delays the reset until the next one.

use crate::catalog::PromptId;
use crate::clock::SharedClock;
use crate::storage::{keys, load_json, save_json, SharedStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Copies allowed per reset window
pub const DAILY_COPY_LIMIT: u32 = 5;

/// Length of the quota window
pub const RESET_WINDOW_HOURS: i64 = 24;

pub type ChallengeId = String;

/// Level from the three progression counters
///
/// Rules are checked top to bottom and the first match wins:
/// - 4: at least 10 chains built and at least 5 challenges
/// - 3: at least 3 challenges
/// - 2: at least 5 chains built
/// - 1: at least 10 distinct prompts used
/// - 0: otherwise
///
/// This is recomputed from scratch on every call; levels can go down if the
/// counters ever do.
pub fn compute_level(chains_built: u32, challenges_completed: usize, prompts_used: usize) -> u8 {
    if chains_built >= 10 && challenges_completed >= 5 {
        4
    } else if challenges_completed >= 3 {
        3
    } else if chains_built >= 5 {
        2
    } else if prompts_used >= 10 {
        1
    } else {
        0
    }
}

/// In-memory ledger state
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub daily_copies_remaining: u32,
    pub copies_used_today: u32,
    pub last_reset: DateTime<Utc>,
    pub total_prompts_used: HashSet<PromptId>,
    pub prompt_usage_count: HashMap<PromptId, u32>,
    pub current_level: u8,
    pub unlocked_categories: HashSet<String>,
    pub challenges_completed: Vec<ChallengeId>,
    pub chains_built: u32,
}

impl LedgerState {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            daily_copies_remaining: DAILY_COPY_LIMIT,
            copies_used_today: 0,
            last_reset: now,
            total_prompts_used: HashSet::new(),
            prompt_usage_count: HashMap::new(),
            current_level: 0,
            unlocked_categories: HashSet::new(),
            challenges_completed: Vec::new(),
            chains_built: 0,
        }
    }

    pub fn recompute_level(&mut self) -> u8 {
        self.current_level = compute_level(
            self.chains_built,
            self.challenges_completed.len(),
            self.total_prompts_used.len(),
        );
        self.current_level
    }

    fn from_record(record: LedgerRecord, now: DateTime<Utc>) -> Self {
        let last_reset = record
            .last_reset_timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(now);

        let mut state = Self {
            daily_copies_remaining: record
                .daily_copies_remaining
                .unwrap_or(DAILY_COPY_LIMIT)
                .min(DAILY_COPY_LIMIT),
            copies_used_today: record.copies_used_today,
            last_reset,
            total_prompts_used: record.total_prompts_used.into_iter().collect(),
            prompt_usage_count: record.prompt_usage_count.into_iter().collect(),
            current_level: 0,
            unlocked_categories: record.unlocked_categories.into_iter().collect(),
            challenges_completed: record.challenges_completed,
            chains_built: record.chains_built,
        };
        state.recompute_level();
        state
    }

    fn to_record(&self) -> LedgerRecord {
        let mut total_prompts_used: Vec<PromptId> =
            self.total_prompts_used.iter().copied().collect();
        total_prompts_used.sort_unstable();

        let mut prompt_usage_count: Vec<(PromptId, u32)> = self
            .prompt_usage_count
            .iter()
            .map(|(id, count)| (*id, *count))
            .collect();
        prompt_usage_count.sort_unstable();

        let mut unlocked_categories: Vec<String> =
            self.unlocked_categories.iter().cloned().collect();
        unlocked_categories.sort();

        LedgerRecord {
            daily_copies_remaining: Some(self.daily_copies_remaining),
            copies_used_today: self.copies_used_today,
            last_reset_timestamp: Some(self.last_reset.timestamp_millis()),
            total_prompts_used,
            prompt_usage_count,
            current_level: self.current_level,
            unlocked_categories,
            challenges_completed: self.challenges_completed.clone(),
            chains_built: self.chains_built,
        }
    }
}

/// Persisted shape of the ledger
///
/// Sets are stored as arrays and maps as arrays of `[key, value]` pairs.
/// Missing fields fall back to their defaults so older records still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LedgerRecord {
    daily_copies_remaining: Option<u32>,
    copies_used_today: u32,
    /// Epoch milliseconds
    last_reset_timestamp: Option<i64>,
    total_prompts_used: Vec<PromptId>,
    prompt_usage_count: Vec<(PromptId, u32)>,
    current_level: u8,
    unlocked_categories: Vec<String>,
    challenges_completed: Vec<ChallengeId>,
    chains_built: u32,
}

pub struct UsageLedger {
    state: LedgerState,
    store: SharedStore,
    clock: SharedClock,
}

impl UsageLedger {
    /// Load the ledger, falling back to a fresh one if the record is unusable
    pub fn load(store: SharedStore, clock: SharedClock) -> Self {
        let now = clock.now().with_timezone(&Utc);
        let state = load_json::<LedgerRecord>(store.as_ref(), keys::LEDGER)
            .map(|record| LedgerState::from_record(record, now))
            .unwrap_or_else(|| LedgerState::fresh(now));

        Self {
            state,
            store,
            clock,
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn level(&self) -> u8 {
        self.state.current_level
    }

    pub fn copies_remaining(&self) -> u32 {
        self.state.daily_copies_remaining
    }

    /// Spend one copy from today's quota
    ///
    /// Returns `false` without touching anything when the quota is used up.
    pub fn use_copy(&mut self) -> bool {
        if self.state.daily_copies_remaining == 0 {
            debug!("Copy rejected, daily quota exhausted");
            return false;
        }

        self.state.daily_copies_remaining -= 1;
        self.state.copies_used_today += 1;
        self.persist();
        true
    }

    /// Record that a prompt was used and recompute the level
    pub fn use_prompt(&mut self, id: PromptId) {
        self.state.total_prompts_used.insert(id);
        *self.state.prompt_usage_count.entry(id).or_insert(0) += 1;

        let previous = self.state.current_level;
        let level = self.state.recompute_level();
        if level != previous {
            info!(from = previous, to = level, "Level changed");
        }
        self.persist();
    }

    /// Append a completed challenge; repeats are recorded as-is
    pub fn complete_challenge(&mut self, id: impl Into<ChallengeId>) {
        self.state.challenges_completed.push(id.into());
        self.persist();
    }

    pub fn build_chain(&mut self) {
        self.state.chains_built += 1;
        self.persist();
    }

    /// Merge categories into the unlocked set
    pub fn unlock_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.state.unlocked_categories.len();
        self.state
            .unlocked_categories
            .extend(categories.into_iter().map(Into::into));
        if self.state.unlocked_categories.len() != before {
            self.persist();
        }
    }

    pub fn is_category_unlocked(&self, category: &str) -> bool {
        self.state.unlocked_categories.contains(category)
    }

    pub fn usage_count(&self, id: PromptId) -> u32 {
        self.state.prompt_usage_count.get(&id).copied().unwrap_or(0)
    }

    /// Restore the daily quota once a full window has passed
    ///
    /// Returns whether a reset happened.
    pub fn reset_if_needed(&mut self) -> bool {
        let now = self.clock.now().with_timezone(&Utc);
        if now - self.state.last_reset < Duration::hours(RESET_WINDOW_HOURS) {
            return false;
        }

        self.state.daily_copies_remaining = DAILY_COPY_LIMIT;
        self.state.copies_used_today = 0;
        self.state.last_reset = now;
        info!("Daily copy quota reset");
        self.persist();
        true
    }

    /// Time left in the current window, never negative
    pub fn time_until_reset(&self) -> Duration {
        let now = self.clock.now().with_timezone(&Utc);
        let next = self.state.last_reset + Duration::hours(RESET_WINDOW_HOURS);
        (next - now).max(Duration::zero())
    }

    /// Time left formatted as `{h}h {m}m`
    pub fn format_time_until_reset(&self) -> String {
        format_reset_countdown(self.time_until_reset())
    }

    fn persist(&self) {
        save_json(self.store.as_ref(), keys::LEDGER, &self.state.to_record());
    }
}

pub fn format_reset_countdown(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
