//! Ephemeral onboarding session store
//!
//! Onboarding progress lives only in process memory, keyed by phone number.
//! A user is either mid-onboarding (an entry here) or registered (a row in
//! the users table) - never both.
//!
//! Access is serialized per phone: each phone gets its own async mutex so
//! two near-simultaneous messages from one sender cannot interleave their
//! read-modify-write, while unrelated senders proceed concurrently.
//!
//! Entries are removed on successful registration and never expire
//! otherwise; a single-instance deployment tolerates that, and anything
//! multi-instance needs an external store instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

/// Current step in the onboarding exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    AwaitingName,
    AwaitingEmail,
}

/// Partially collected onboarding fields for one phone number
#[derive(Debug, Clone)]
pub struct OnboardingState {
    pub step: OnboardingStep,
    pub name: Option<String>,
}

impl OnboardingState {
    /// Fresh session at the first step
    pub fn new() -> Self {
        Self {
            step: OnboardingStep::AwaitingName,
            name: None,
        }
    }
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self::new()
    }
}

/// One phone's slot: None = not onboarding
pub type SessionSlot = Arc<AsyncMutex<Option<OnboardingState>>>;

/// In-process session store with per-key locking
#[derive(Clone, Default)]
pub struct SessionStore {
    slots: Arc<Mutex<HashMap<String, SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (creating if needed) the slot for a phone number
    ///
    /// The caller locks the returned slot for the duration of handling one
    /// message; the outer map lock is only held long enough to clone the Arc.
    pub fn slot(&self, phone: &str) -> SessionSlot {
        let mut slots = self.slots.lock().expect("session store lock");
        slots
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    /// Number of phones with an active onboarding session (for status/tests)
    ///
    /// A slot locked by a live handler is skipped rather than guessed at, so
    /// the count never overstates; it is advisory, not a synchronization
    /// primitive.
    pub fn active_count(&self) -> usize {
        let slots = self.slots.lock().expect("session store lock");
        slots
            .values()
            .filter(|slot| {
                slot.try_lock()
                    .map(|state| state.is_some())
                    .unwrap_or(false)
            })
            .count()
    }
}

/// Standard email-shape check used at the `awaiting_email` step
///
/// Requires a non-empty local part, an "@", a domain containing a dot with
/// non-empty labels around it, and no embedded whitespace. Deliberately not
/// full RFC 5322.
pub fn is_valid_email(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs an interior dot: "b.co" yes, ".co" / "b." no
    match domain.split_once('.') {
        Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("  user.name@sub.example.com  "));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("no-domain-dot@host"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@com."));
        assert!(!is_valid_email("two words@example.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn test_slot_lifecycle() {
        let store = SessionStore::new();
        assert_eq!(store.active_count(), 0);

        let slot = store.slot("+15551234567");
        {
            let mut state = slot.lock().await;
            assert!(state.is_none());
            *state = Some(OnboardingState::new());
        }
        assert_eq!(store.active_count(), 1);

        {
            let mut state = slot.lock().await;
            *state = None;
        }
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test]
    async fn test_locked_empty_slot_not_counted() {
        let store = SessionStore::new();
        let slot = store.slot("+15553333333");

        let guard = slot.lock().await;
        assert_eq!(store.active_count(), 0);
        drop(guard);
    }

    #[tokio::test]
    async fn test_same_phone_returns_same_slot() {
        let store = SessionStore::new();
        let a = store.slot("+15551111111");
        let b = store.slot("+15551111111");
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.slot("+15552222222");
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
