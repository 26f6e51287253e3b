//! The session: one value that owns every store
//!
//! A [`Session`] is built once at startup with the persistence backend, the
//! clock, the template gateway and the current identity injected. Every
//! front-end action goes through it, so the cross-store rules live here:
//! architect mode bypasses the copy quota, copies record prompt usage, and
//! loading a template fills the chain.

use crate::architect::PrivilegedModeGate;
use crate::catalog::{Catalog, Prompt, PromptId};
use crate::chain::{ChainAdd, ChainComposer, ChainNode};
use crate::clock::SharedClock;
use crate::compose::compose_meta_prompt;
use crate::error::DeckError;
use crate::favorites::FavoritesStore;
use crate::identity::Identity;
use crate::layout::LayoutPrefs;
use crate::ledger::{UsageLedger, DAILY_COPY_LIMIT};
use crate::matching::MatchResult;
use crate::pipeline::{FilterState, SearchFilterPipeline};
use crate::selection::{SelectionChange, SelectionStore};
use crate::storage::SharedStore;
use crate::templates::{ChainTemplate, TemplatesGateway};
use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often a long-lived session polls for the daily quota reset
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Snapshot of the numbers shown in the status view
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub level: u8,
    pub copies_remaining: u32,
    pub daily_limit: u32,
    pub resets_in: String,
    pub architect: bool,
    pub signed_in_as: Option<String>,
    pub favorites: usize,
    pub prompts_used: usize,
    pub chains_built: u32,
    pub challenges_completed: usize,
}

pub struct Session {
    catalog: Catalog,
    favorites: FavoritesStore,
    selection: SelectionStore,
    ledger: UsageLedger,
    gate: PrivilegedModeGate,
    chain: ChainComposer,
    layout: LayoutPrefs,
    templates: TemplatesGateway,
    identity: Option<Identity>,
    pipeline: SearchFilterPipeline,
    filter: FilterState,
    clock: SharedClock,
    last_poll: Option<DateTime<Local>>,
}

impl Session {
    pub fn new(
        catalog: Catalog,
        store: SharedStore,
        clock: SharedClock,
        templates: TemplatesGateway,
        identity: Option<Identity>,
    ) -> Self {
        Self {
            catalog,
            favorites: FavoritesStore::load(store.clone()),
            selection: SelectionStore::new(),
            ledger: UsageLedger::load(store.clone(), clock.clone()),
            gate: PrivilegedModeGate::load(store.clone(), clock.clone()),
            chain: ChainComposer::new(),
            layout: LayoutPrefs::new(store),
            templates,
            identity,
            pipeline: SearchFilterPipeline::new(),
            filter: FilterState::default(),
            clock,
            last_poll: None,
        }
    }

    /// Seed the unlocked categories and apply any pending quota reset
    pub fn start(&mut self) {
        self.ledger.unlock_categories(self.catalog.categories());
        self.poll();
        debug!(
            prompts = self.catalog.len(),
            level = self.ledger.level(),
            "Session started"
        );
    }

    /// Periodic poll; returns whether the daily quota was reset
    pub fn tick(&mut self) -> bool {
        self.poll()
    }

    fn poll(&mut self) -> bool {
        self.last_poll = Some(self.clock.now());
        self.ledger.reset_if_needed()
    }

    pub fn last_poll(&self) -> Option<DateTime<Local>> {
        self.last_poll
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn chain(&self) -> &ChainComposer {
        &self.chain
    }

    pub fn layout(&self) -> &LayoutPrefs {
        &self.layout
    }

    pub fn gate(&self) -> &PrivilegedModeGate {
        &self.gate
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterState {
        &mut self.filter
    }

    pub fn is_architect(&self) -> bool {
        self.gate.is_architect(self.identity.as_ref())
    }

    /// Whether the prompt is available to the current user
    pub fn is_unlocked(&self, prompt: &Prompt) -> bool {
        self.is_architect() || self.ledger.is_category_unlocked(&prompt.category)
    }

    /// The visible list for the session's own filter
    pub fn visible_prompts(&self) -> Vec<&Prompt> {
        self.visible_prompts_for(&self.filter)
    }

    pub fn visible_prompts_for(&self, filter: &FilterState) -> Vec<&Prompt> {
        self.pipeline
            .run(&self.catalog, self.favorites.ids(), filter)
    }

    /// Resolve a query to exactly one prompt
    pub fn resolve(&self, query: &str) -> Result<&Prompt, DeckError> {
        match self.catalog.resolve(query) {
            MatchResult::Exact(prompt) => Ok(prompt),
            _ => Err(DeckError::UnknownPrompt(query.to_string())),
        }
    }

    fn prompt(&self, id: PromptId) -> Result<&Prompt, DeckError> {
        self.catalog
            .get(id)
            .ok_or_else(|| DeckError::UnknownPrompt(id.to_string()))
    }

    pub fn toggle_favorite(&mut self, id: PromptId) -> Result<bool, DeckError> {
        self.prompt(id)?;
        Ok(self.favorites.toggle(id))
    }

    pub fn toggle_selection(&mut self, id: PromptId) -> Result<SelectionChange, DeckError> {
        let prompt = self.prompt(id)?.clone();
        Ok(self.selection.toggle(&prompt))
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Compose and charge a copy of the given prompts
    ///
    /// Non-architects spend one daily copy regardless of how many prompts
    /// are composed. Every prompt is recorded as used.
    pub fn copy_prompts(&mut self, ids: &[PromptId]) -> Result<String, DeckError> {
        self.copy_prompts_with(ids, |text| Ok(text.to_string()))
    }

    /// Compose `ids` and hand the text to `deliver`
    ///
    /// The quota is checked before delivery but only charged once `deliver`
    /// succeeds, so a failed clipboard write costs nothing.
    pub fn copy_prompts_with<T, E, F>(&mut self, ids: &[PromptId], deliver: F) -> Result<T, E>
    where
        E: From<DeckError>,
        F: FnOnce(&str) -> Result<T, E>,
    {
        if ids.is_empty() {
            return Err(DeckError::EmptySelection.into());
        }

        let prompts = ids
            .iter()
            .map(|id| self.prompt(*id).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        self.check_quota()?;
        let refs: Vec<&Prompt> = prompts.iter().collect();
        let delivered = deliver(&compose_meta_prompt(&refs))?;

        self.charge_copy()?;
        for prompt in &prompts {
            self.ledger.use_prompt(prompt.id);
        }
        Ok(delivered)
    }

    pub fn copy_selection(&mut self) -> Result<String, DeckError> {
        self.copy_selection_with(|text| Ok(text.to_string()))
    }

    pub fn copy_selection_with<T, E, F>(&mut self, deliver: F) -> Result<T, E>
    where
        E: From<DeckError>,
        F: FnOnce(&str) -> Result<T, E>,
    {
        let ids: Vec<PromptId> = self.selection.prompts().iter().map(|p| p.id).collect();
        self.copy_prompts_with(&ids, deliver)
    }

    fn check_quota(&mut self) -> Result<(), DeckError> {
        if self.is_architect() {
            return Ok(());
        }

        self.ledger.reset_if_needed();
        if self.ledger.copies_remaining() > 0 {
            Ok(())
        } else {
            Err(DeckError::QuotaExhausted {
                resets_in: self.ledger.format_time_until_reset(),
            })
        }
    }

    fn charge_copy(&mut self) -> Result<(), DeckError> {
        if self.is_architect() {
            debug!("Architect copy, quota not charged");
            return Ok(());
        }

        if self.ledger.use_copy() {
            Ok(())
        } else {
            Err(DeckError::QuotaExhausted {
                resets_in: self.ledger.format_time_until_reset(),
            })
        }
    }

    pub fn complete_challenge(&mut self, id: &str) {
        self.ledger.complete_challenge(id);
    }

    pub fn chain_add(&mut self, id: PromptId) -> Result<ChainAdd, DeckError> {
        let prompt = self.prompt(id)?.clone();
        Ok(self.chain.add(&prompt))
    }

    pub fn chain_remove(&mut self, index: usize) -> Option<ChainNode> {
        self.chain.remove(index)
    }

    pub fn chain_reorder(&mut self, id: PromptId, to_index: usize) -> bool {
        self.chain.reorder(id, to_index)
    }

    pub fn chain_clear(&mut self) {
        self.chain.clear();
    }

    /// Run the chain: count it as built and return the composed text
    pub fn run_chain(&mut self) -> Result<String, DeckError> {
        let nodes = self.chain.execute(&mut self.ledger)?;
        info!(nodes = nodes, "Chain executed");
        Ok(compose_meta_prompt(&self.chain.prompts()))
    }

    pub async fn save_chain(
        &self,
        name: &str,
        description: Option<String>,
        is_public: bool,
    ) -> Result<ChainTemplate, DeckError> {
        let draft = self.chain.to_template(name, description, is_public)?;
        Ok(self
            .templates
            .create(self.identity.as_ref(), draft)
            .await?)
    }

    /// Replace the chain with a saved template's prompts
    ///
    /// Ids no longer in the catalog are skipped. Returns how many prompts
    /// were loaded.
    pub async fn load_template(&mut self, id: &str) -> Result<usize, DeckError> {
        let template = self.templates.get(id).await?;

        self.chain.clear();
        for prompt in template.resolve(&self.catalog) {
            self.chain.add(prompt);
        }

        if let Err(e) = self.templates.increment_use(id).await {
            warn!(id = id, error = %e, "Failed to record template use");
        }

        Ok(self.chain.len())
    }

    pub async fn list_templates(&self) -> Result<Vec<ChainTemplate>, DeckError> {
        Ok(self.templates.list().await?)
    }

    pub async fn get_template(&self, id: &str) -> Result<ChainTemplate, DeckError> {
        Ok(self.templates.get(id).await?)
    }

    pub async fn delete_template(&self, id: &str) -> Result<(), DeckError> {
        Ok(self.templates.delete(id).await?)
    }

    pub fn unlock(&mut self, passphrase: &str) -> bool {
        self.gate.check_password(passphrase)
    }

    pub fn lock(&mut self) {
        self.gate.logout();
    }

    pub fn show_gate(&mut self) {
        self.gate.show_gate();
    }

    pub fn hide_gate(&mut self) {
        self.gate.hide_gate();
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.ledger.state();
        SessionStatus {
            level: state.current_level,
            copies_remaining: state.daily_copies_remaining,
            daily_limit: DAILY_COPY_LIMIT,
            resets_in: self.ledger.format_time_until_reset(),
            architect: self.is_architect(),
            signed_in_as: self.identity.as_ref().map(|i| i.email.clone()),
            favorites: self.favorites.count(),
            prompts_used: state.total_prompts_used.len(),
            chains_built: state.chains_built,
            challenges_completed: state.challenges_completed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architect::ARCHITECT_EMAIL;
    use crate::clock::ManualClock;
    use crate::error::TemplateError;
    use crate::storage::MemoryStore;
    use crate::templates::LocalTemplateStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    struct Fixture {
        store: SharedStore,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::shared(),
                clock: Arc::new(ManualClock::new(
                    Local.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
                )),
            }
        }

        fn session(&self, identity: Option<Identity>) -> Session {
            let gateway = TemplatesGateway::new(Box::new(LocalTemplateStore::new(
                self.store.clone(),
                self.clock.clone(),
            )));
            let mut session = Session::new(
                Catalog::builtin().unwrap(),
                self.store.clone(),
                self.clock.clone(),
                gateway,
                identity,
            );
            session.start();
            session
        }
    }

    fn member() -> Option<Identity> {
        Some(Identity::new("u1", "ada@example.com"))
    }

    #[test]
    fn test_start_unlocks_every_category() {
        let fixture = Fixture::new();
        let session = fixture.session(None);
        for prompt in session.catalog().iter() {
            assert!(session.is_unlocked(prompt));
        }
        assert!(session.last_poll().is_some());
    }

    #[test]
    fn test_copy_quota_for_guest() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);

        for _ in 0..5 {
            session.copy_prompts(&[1]).unwrap();
        }
        let err = session.copy_prompts(&[1]).unwrap_err();
        assert!(err.is_quota_exhausted());
        assert!(err.to_string().contains("24h 0m"));
        assert_eq!(session.ledger().usage_count(1), 5);
    }

    #[test]
    fn test_copy_of_several_prompts_costs_one() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        let text = session.copy_prompts(&[1, 2, 3]).unwrap();
        assert!(text.contains("## 3."));
        assert_eq!(session.ledger().copies_remaining(), 4);
        assert_eq!(session.ledger().state().total_prompts_used.len(), 3);
    }

    #[test]
    fn test_unknown_prompt_charges_nothing() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        assert!(matches!(
            session.copy_prompts(&[1, 999]),
            Err(DeckError::UnknownPrompt(_))
        ));
        assert!(matches!(
            session.copy_prompts(&[]),
            Err(DeckError::EmptySelection)
        ));
        assert_eq!(session.ledger().copies_remaining(), 5);
    }

    #[test]
    fn test_failed_delivery_charges_nothing() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);

        let result: anyhow::Result<()> =
            session.copy_prompts_with(&[1, 8], |_| anyhow::bail!("clipboard unavailable"));
        assert!(result.is_err());
        assert_eq!(session.ledger().copies_remaining(), 5);
        assert_eq!(session.ledger().usage_count(1), 0);

        let delivered: anyhow::Result<usize> =
            session.copy_prompts_with(&[1, 8], |text| Ok(text.len()));
        assert!(delivered.unwrap() > 0);
        assert_eq!(session.ledger().copies_remaining(), 4);
        assert_eq!(session.ledger().usage_count(8), 1);
    }

    #[test]
    fn test_exhausted_quota_skips_delivery() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        for _ in 0..5 {
            session.copy_prompts(&[1]).unwrap();
        }

        let mut delivered = false;
        let result = session.copy_prompts_with(&[2], |_| {
            delivered = true;
            Ok::<_, DeckError>(())
        });
        assert!(matches!(result, Err(DeckError::QuotaExhausted { .. })));
        assert!(!delivered);
    }

    #[test]
    fn test_architect_bypasses_quota() {
        let fixture = Fixture::new();
        let mut session = fixture.session(Some(Identity::new("a", ARCHITECT_EMAIL)));
        assert!(session.is_architect());
        for _ in 0..8 {
            session.copy_prompts(&[1]).unwrap();
        }
        assert_eq!(session.ledger().copies_remaining(), 5);
        assert_eq!(session.ledger().usage_count(1), 8);
    }

    #[test]
    fn test_passphrase_unlock_and_lock() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        assert!(!session.unlock("wrong"));
        assert!(session.unlock("  RootsBeforeBranches "));
        assert!(session.is_architect());

        // Survives a restart on the same day
        let restarted = fixture.session(None);
        assert!(restarted.is_architect());

        session.lock();
        assert!(!session.is_architect());
    }

    #[test]
    fn test_tick_restores_quota_after_window() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        for _ in 0..5 {
            session.copy_prompts(&[2]).unwrap();
        }

        fixture.clock.advance(chrono::Duration::hours(23));
        assert!(!session.tick());
        assert_eq!(session.ledger().copies_remaining(), 0);

        fixture.clock.advance(chrono::Duration::hours(2));
        assert!(session.tick());
        assert_eq!(session.ledger().copies_remaining(), 5);
    }

    #[test]
    fn test_selection_and_copy_selection() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        for id in 1..=5 {
            assert_eq!(session.toggle_selection(id).unwrap(), SelectionChange::Added);
        }
        assert_eq!(session.toggle_selection(6).unwrap(), SelectionChange::Full);

        let text = session.copy_selection().unwrap();
        assert!(text.contains("## 5."));

        session.clear_selection();
        assert!(matches!(
            session.copy_selection(),
            Err(DeckError::EmptySelection)
        ));
    }

    #[test]
    fn test_favorites_view() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        assert!(session.toggle_favorite(3).unwrap());
        assert!(session.toggle_favorite(1).unwrap());
        assert!(session.toggle_favorite(999).is_err());

        session.filter_mut().favorites_only = true;
        let mut ids: Vec<PromptId> = session.visible_prompts().iter().map(|p| p.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_run_chain_counts_build() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        assert!(matches!(session.run_chain(), Err(DeckError::EmptyChain)));

        session.chain_add(1).unwrap();
        session.chain_add(8).unwrap();
        assert_eq!(session.chain_add(1).unwrap(), ChainAdd::AlreadyPresent);
        assert!(session.chain_reorder(8, 0));

        let text = session.run_chain().unwrap();
        assert!(text.contains("## 1. Self-Critique"));
        assert_eq!(session.ledger().state().chains_built, 1);
        // Running a chain does not spend the copy quota
        assert_eq!(session.ledger().copies_remaining(), 5);
    }

    #[tokio::test]
    async fn test_guest_cannot_save_chain() {
        let fixture = Fixture::new();
        let mut session = fixture.session(None);
        session.chain_add(1).unwrap();
        let err = session.save_chain("Mine", None, false).await.unwrap_err();
        assert!(matches!(
            err,
            DeckError::Template(TemplateError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_save_and_load_template() {
        let fixture = Fixture::new();
        let mut session = fixture.session(member());
        session.chain_add(4).unwrap();
        session.chain_add(2).unwrap();

        let saved = session
            .save_chain("Grounded answer", Some("demo".to_string()), true)
            .await
            .unwrap();
        assert_eq!(saved.prompt_ids, vec![4, 2]);
        assert_eq!(saved.created_by, "u1");

        session.chain_clear();
        assert_eq!(session.load_template(&saved.id).await.unwrap(), 2);
        assert_eq!(session.chain().prompt_ids(), vec![4, 2]);

        let listed = session.list_templates().await.unwrap();
        assert_eq!(listed[0].use_count, 1);

        session.delete_template(&saved.id).await.unwrap();
        assert!(session.list_templates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_template() {
        let fixture = Fixture::new();
        let mut session = fixture.session(member());
        session.chain_add(1).unwrap();
        assert!(session.load_template("nope").await.is_err());
        // Chain untouched on failure
        assert_eq!(session.chain().len(), 1);
    }

    #[test]
    fn test_status_snapshot() {
        let fixture = Fixture::new();
        let mut session = fixture.session(member());
        session.copy_prompts(&[1]).unwrap();
        session.complete_challenge("first-chain");

        let status = session.status();
        assert_eq!(status.copies_remaining, 4);
        assert_eq!(status.daily_limit, 5);
        assert_eq!(status.challenges_completed, 1);
        assert_eq!(status.signed_in_as.as_deref(), Some("ada@example.com"));
        assert!(!status.architect);
    }
}
