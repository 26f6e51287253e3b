//! Persisted set of favorite prompt ids

use crate::catalog::PromptId;
use crate::storage::{keys, load_json, save_json, SharedStore};
use std::collections::HashSet;

pub struct FavoritesStore {
    ids: HashSet<PromptId>,
    store: SharedStore,
}

impl FavoritesStore {
    /// Load favorites, starting empty when nothing usable is persisted
    pub fn load(store: SharedStore) -> Self {
        let ids = load_json::<Vec<PromptId>>(store.as_ref(), keys::FAVORITES)
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();
        Self { ids, store }
    }

    /// Flip membership and return whether `id` is now a favorite
    pub fn toggle(&mut self, id: PromptId) -> bool {
        let now_favorite = if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        };
        self.persist();
        now_favorite
    }

    pub fn is_favorite(&self, id: PromptId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &HashSet<PromptId> {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    fn persist(&self) {
        let mut ids: Vec<PromptId> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        save_json(self.store.as_ref(), keys::FAVORITES, &ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::collections::HashMap;

    #[test]
    fn test_toggle_parity() {
        let mut favorites = FavoritesStore::load(MemoryStore::shared());
        let toggles = [1, 2, 1, 3, 3, 3, 4, 4, 2, 2, 2];

        let mut counts: HashMap<PromptId, usize> = HashMap::new();
        for id in toggles {
            favorites.toggle(id);
            *counts.entry(id).or_default() += 1;
        }

        let odd = counts.values().filter(|count| *count % 2 == 1).count();
        for (id, count) in counts {
            assert_eq!(favorites.is_favorite(id), count % 2 == 1, "id {}", id);
        }
        // Only 3 was toggled an odd number of times
        assert_eq!(odd, 1);
        assert_eq!(favorites.count(), odd);
        assert!(favorites.is_favorite(3));
    }

    #[test]
    fn test_toggle_reports_membership() {
        let mut favorites = FavoritesStore::load(MemoryStore::shared());
        assert!(favorites.toggle(9));
        assert!(!favorites.toggle(9));
    }

    #[test]
    fn test_persists_across_loads() {
        let store = MemoryStore::shared();
        let mut favorites = FavoritesStore::load(store.clone());
        favorites.toggle(5);
        favorites.toggle(2);

        assert_eq!(store.get(keys::FAVORITES).as_deref(), Some("[2,5]"));

        let reloaded = FavoritesStore::load(store);
        assert!(reloaded.is_favorite(2));
        assert!(reloaded.is_favorite(5));
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let store = MemoryStore::shared();
        store.set(keys::FAVORITES, "not-a-list").unwrap();

        let favorites = FavoritesStore::load(store);
        assert_eq!(favorites.count(), 0);
    }
}
