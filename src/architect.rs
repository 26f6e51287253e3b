//! Architect mode gate
//!
//! Architect mode lifts the copy quota and unlock gating. It is granted in
//! two independent ways:
//! - the signed-in identity has the architect email (re-checked on every call)
//! - the passphrase was entered today (a local session stamped with the
//!   calendar day, dropped on the first load of a later day)
//!
//! Expiry compares calendar-day keys, not elapsed time: a session unlocked at
//! 23:59 is gone at 00:00.

use crate::clock::SharedClock;
use crate::identity::Identity;
use crate::storage::{keys, remove_key, save_raw, SharedStore};
use tracing::info;

pub const ARCHITECT_EMAIL: &str = "architect@whisperdeck.app";

/// Stored already normalized (trimmed, lowercase)
const ARCHITECT_PASSPHRASE: &str = "rootsbeforebranches";

const FLAG_SET: &str = "true";

pub struct PrivilegedModeGate {
    by_password: bool,
    show_gate: bool,
    store: SharedStore,
    clock: SharedClock,
}

impl PrivilegedModeGate {
    /// Restore the password session if it was unlocked today
    pub fn load(store: SharedStore, clock: SharedClock) -> Self {
        let flagged = store.get(keys::ARCHITECT_FLAG).as_deref() == Some(FLAG_SET);
        let stamped_today = store.get(keys::ARCHITECT_DATE) == Some(clock.today_key());

        let mut gate = Self {
            by_password: flagged && stamped_today,
            show_gate: false,
            store,
            clock,
        };

        if flagged && !stamped_today {
            info!("Architect session from a previous day expired");
            gate.clear_session();
        }

        gate
    }

    pub fn is_architect_by_email(identity: Option<&Identity>) -> bool {
        identity.is_some_and(|i| i.email == ARCHITECT_EMAIL)
    }

    pub fn is_architect_by_password(&self) -> bool {
        self.by_password
    }

    pub fn is_architect(&self, identity: Option<&Identity>) -> bool {
        Self::is_architect_by_email(identity) || self.by_password
    }

    /// Try a passphrase; on success the session is stamped with today's date
    pub fn check_password(&mut self, input: &str) -> bool {
        if normalize(input) != ARCHITECT_PASSPHRASE {
            return false;
        }

        self.by_password = true;
        self.show_gate = false;
        save_raw(self.store.as_ref(), keys::ARCHITECT_FLAG, FLAG_SET);
        save_raw(
            self.store.as_ref(),
            keys::ARCHITECT_DATE,
            &self.clock.today_key(),
        );
        info!("Architect mode unlocked by passphrase");
        true
    }

    /// End the passphrase session; an email grant is unaffected
    pub fn logout(&mut self) {
        self.clear_session();
    }

    pub fn show_gate(&mut self) {
        self.show_gate = true;
    }

    pub fn hide_gate(&mut self) {
        self.show_gate = false;
    }

    pub fn is_gate_visible(&self) -> bool {
        self.show_gate
    }

    fn clear_session(&mut self) {
        self.by_password = false;
        remove_key(self.store.as_ref(), keys::ARCHITECT_FLAG);
        remove_key(self.store.as_ref(), keys::ARCHITECT_DATE);
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{Duration, Local, TimeZone};
    use std::sync::Arc;

    fn clock_at(hour: u32, minute: u32) -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap(),
        ))
    }

    #[test]
    fn test_password_is_normalized() {
        let mut gate = PrivilegedModeGate::load(MemoryStore::shared(), clock_at(10, 0));
        assert!(gate.check_password("  RootsBeforeBranches "));
        assert!(gate.is_architect_by_password());
        assert!(gate.is_architect(None));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let store = MemoryStore::shared();
        let mut gate = PrivilegedModeGate::load(store.clone(), clock_at(10, 0));
        assert!(!gate.check_password("roots before branches"));
        assert!(!gate.is_architect(None));
        assert_eq!(store.get(keys::ARCHITECT_FLAG), None);
    }

    #[test]
    fn test_session_survives_same_day_reload() {
        let store = MemoryStore::shared();
        let clock = clock_at(10, 0);
        let mut gate = PrivilegedModeGate::load(store.clone(), clock.clone());
        gate.check_password("rootsbeforebranches");

        clock.advance(Duration::hours(13));
        let reloaded = PrivilegedModeGate::load(store, clock);
        assert!(reloaded.is_architect_by_password());
    }

    #[test]
    fn test_session_expires_at_midnight() {
        let store = MemoryStore::shared();
        let clock = clock_at(23, 59);
        let mut gate = PrivilegedModeGate::load(store.clone(), clock.clone());
        gate.check_password("rootsbeforebranches");

        clock.advance(Duration::minutes(1));
        let reloaded = PrivilegedModeGate::load(store.clone(), clock);
        assert!(!reloaded.is_architect_by_password());
        assert_eq!(store.get(keys::ARCHITECT_FLAG), None);
        assert_eq!(store.get(keys::ARCHITECT_DATE), None);
    }

    #[test]
    fn test_flag_without_date_is_dropped() {
        let store = MemoryStore::shared();
        store.set(keys::ARCHITECT_FLAG, "true").unwrap();
        let gate = PrivilegedModeGate::load(store, clock_at(10, 0));
        assert!(!gate.is_architect_by_password());
    }

    #[test]
    fn test_email_grant_is_exact_and_survives_logout() {
        let mut gate = PrivilegedModeGate::load(MemoryStore::shared(), clock_at(10, 0));
        let architect = Identity::new("u1", ARCHITECT_EMAIL);
        let shouty = Identity::new("u2", ARCHITECT_EMAIL.to_uppercase());

        assert!(gate.is_architect(Some(&architect)));
        assert!(!gate.is_architect(Some(&shouty)));

        gate.logout();
        assert!(gate.is_architect(Some(&architect)));
    }

    #[test]
    fn test_logout_clears_password_session() {
        let store = MemoryStore::shared();
        let mut gate = PrivilegedModeGate::load(store.clone(), clock_at(10, 0));
        gate.check_password("rootsbeforebranches");
        gate.logout();

        assert!(!gate.is_architect(None));
        assert_eq!(store.get(keys::ARCHITECT_FLAG), None);
    }

    #[test]
    fn test_gate_hidden_until_requested() {
        let mut gate = PrivilegedModeGate::load(MemoryStore::shared(), clock_at(10, 0));
        assert!(!gate.is_gate_visible());
        gate.show_gate();
        assert!(gate.is_gate_visible());
        gate.check_password("rootsbeforebranches");
        assert!(!gate.is_gate_visible());
    }
}
