//! Time-boxed memory of cards the engine chose not to claim.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::constants::PENDING_CLAIM_TTL_SECS;

/// How pending claims are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// One key space across all chats; the same claim id in two chats collides.
    Global,
    /// Keys are `(chat id, claim id)`.
    #[default]
    PerChat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfig {
    #[serde(default = "PendingConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub key_scope: KeyScope,
}

impl PendingConfig {
    const fn default_ttl_secs() -> u64 {
        PENDING_CLAIM_TTL_SECS
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            key_scope: KeyScope::default(),
        }
    }
}

/// A declined card awaiting a possible claim by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClaim {
    pub claim_id: String,
    pub chat_id: String,
    pub card_name: Option<String>,
    pub created_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClaimKey {
    chat_id: Option<String>,
    claim_id: String,
}

#[derive(Debug)]
struct Slot {
    entry: PendingClaim,
    generation: u64,
    expiry: AbortHandle,
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<ClaimKey, Slot>,
    next_generation: u64,
}

/// Pending claim store with a fixed time-to-live per entry.
///
/// All mutation goes through [`add`](Self::add), [`consume`](Self::consume)
/// and the expiry task spawned by `add`, each under one lock. Expired entries
/// are never returned even if their expiry task has not run yet.
///
/// Every stored entry owns exactly one timer task. Consuming or replacing an
/// entry aborts its timer, so live timers never outnumber stored entries.
#[derive(Debug, Clone)]
pub struct PendingClaimTracker {
    slots: Arc<Mutex<Slots>>,
    ttl: Duration,
    scope: KeyScope,
}

impl PendingClaimTracker {
    #[must_use]
    pub fn new(config: &PendingConfig) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            ttl: config.ttl(),
            scope: config.key_scope,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, chat_id: &str, claim_id: &str) -> ClaimKey {
        ClaimKey {
            chat_id: match self.scope {
                KeyScope::Global => None,
                KeyScope::PerChat => Some(chat_id.to_string()),
            },
            claim_id: claim_id.to_string(),
        }
    }

    /// Remember a declined card, replacing any entry under the same key.
    ///
    /// Must be called from inside a tokio runtime: the entry's expiry is a
    /// spawned timer. A replaced entry's timer no longer affects the new one.
    pub fn add(&self, chat_id: &str, claim_id: &str, card_name: Option<&str>) {
        let key = self.key(chat_id, claim_id);
        let entry = PendingClaim {
            claim_id: claim_id.to_string(),
            chat_id: chat_id.to_string(),
            card_name: card_name.map(str::to_string),
            created_at: Instant::now(),
        };

        let mut slots = self.slots.lock();
        let generation = slots.next_generation;
        slots.next_generation = generation.wrapping_add(1);
        let expiry = self.spawn_expiry(key.clone(), generation);
        let slot = Slot {
            entry,
            generation,
            expiry,
        };
        if let Some(replaced) = slots.entries.insert(key, slot) {
            replaced.expiry.abort();
            log::debug!("Pending claim {claim_id} replaced");
        }
    }

    fn spawn_expiry(&self, key: ClaimKey, generation: u64) -> AbortHandle {
        let slots = Arc::clone(&self.slots);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slots = slots.lock();
            if slots
                .entries
                .get(&key)
                .is_some_and(|slot| slot.generation == generation)
            {
                slots.entries.remove(&key);
                log::debug!("Pending claim {} expired", key.claim_id);
            }
        })
        .abort_handle()
    }

    /// Atomically remove and return the entry for a claim id.
    ///
    /// Returns `None` if nothing is pending under the key or the entry has
    /// outlived its TTL. Under [`KeyScope::Global`] `chat_id` is ignored.
    pub fn consume(&self, chat_id: &str, claim_id: &str) -> Option<PendingClaim> {
        let key = self.key(chat_id, claim_id);
        let slot = self.slots.lock().entries.remove(&key)?;
        slot.expiry.abort();
        (slot.entry.created_at.elapsed() < self.ttl).then_some(slot.entry)
    }

    /// Number of stored entries, including ones whose expiry is due but not yet processed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(scope: KeyScope) -> PendingClaimTracker {
        PendingClaimTracker::new(&PendingConfig {
            ttl_secs: PENDING_CLAIM_TTL_SECS,
            key_scope: scope,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn consume_returns_entry_once() {
        let tracker = tracker(KeyScope::PerChat);
        tracker.add("g1@g.us", "ABC123", Some("Nami"));

        let entry = tracker.consume("g1@g.us", "ABC123").expect("pending entry");
        assert_eq!(entry.claim_id, "ABC123");
        assert_eq!(entry.chat_id, "g1@g.us");
        assert_eq!(entry.card_name.as_deref(), Some("Nami"));
        assert!(tracker.consume("g1@g.us", "ABC123").is_none());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_lives_until_ttl_then_disappears() {
        let tracker = tracker(KeyScope::PerChat);
        tracker.add("g1@g.us", "A1", None);
        tracker.add("g1@g.us", "A2", None);

        tokio::time::sleep(tracker.ttl() - Duration::from_millis(1)).await;
        assert!(tracker.consume("g1@g.us", "A1").is_some());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(tracker.consume("g1@g.us", "A2").is_none());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_restarts_the_clock() {
        let tracker = tracker(KeyScope::PerChat);
        tracker.add("g1@g.us", "A1", Some("old"));
        tokio::time::sleep(Duration::from_secs(200)).await;
        tracker.add("g1@g.us", "A1", Some("new"));
        tokio::time::sleep(Duration::from_secs(200)).await;

        let entry = tracker.consume("g1@g.us", "A1").expect("replacement still pending");
        assert_eq!(entry.card_name.as_deref(), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn per_chat_scope_separates_chats() {
        let tracker = tracker(KeyScope::PerChat);
        tracker.add("g1@g.us", "SAME", None);
        assert!(tracker.consume("g2@g.us", "SAME").is_none());
        assert!(tracker.consume("g1@g.us", "SAME").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn global_scope_collides_across_chats() {
        let tracker = tracker(KeyScope::Global);
        tracker.add("g1@g.us", "SAME", Some("first"));
        tracker.add("g2@g.us", "SAME", Some("second"));
        assert_eq!(tracker.len(), 1);

        let entry = tracker.consume("g9@g.us", "SAME").expect("global key");
        assert_eq!(entry.chat_id, "g2@g.us");
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn consume_and_replace_cancel_expiry_timers() {
        let tracker = tracker(KeyScope::PerChat);
        tracker.add("g1@g.us", "A1", None);
        tracker.add("g1@g.us", "A1", None);
        tracker.add("g1@g.us", "A2", None);
        settle().await;
        // one handle here plus one per live timer
        assert_eq!(Arc::strong_count(&tracker.slots), 3);

        assert!(tracker.consume("g1@g.us", "A1").is_some());
        assert!(tracker.consume("g1@g.us", "A2").is_some());
        settle().await;
        assert_eq!(Arc::strong_count(&tracker.slots), 1);
    }

    #[test]
    fn key_scope_serializes_snake_case() {
        let json = serde_json::to_string(&KeyScope::PerChat).unwrap();
        assert_eq!(json, "\"per_chat\"");
        let parsed: PendingConfig = serde_json::from_str(r#"{ "key_scope": "global" }"#).unwrap();
        assert_eq!(parsed.key_scope, KeyScope::Global);
        assert_eq!(parsed.ttl_secs, PENDING_CLAIM_TTL_SECS);
    }
}
