//! Per-message entry point: spawn announcements go to the policy, and plain
//! `.claim` messages from others are checked against pending claims.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_TAUNT_TEXT, REACTION_TYPING_BASE_MS, REACTION_TYPING_SPREAD_MS, STEAL_BACK_CHANCE,
    TAUNT_CHANCE,
};
use crate::followup::FollowUpResponder;
use crate::is_group_chat;
use crate::jitter::Jitter;
use crate::pacing::{ClaimPacingQueue, ClaimTask, QueueError};
use crate::patterns::{MessageFields, claim_command};
use crate::policy::decide;
use crate::settings::{BotSettings, ConfigStore};
use crate::tracker::PendingClaimTracker;
use crate::transport::ChatTransport;

/// How the engine reacts when someone claims a card it passed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    #[serde(default = "ReactionConfig::default_steal_back_chance")]
    pub steal_back_chance: f64,
    #[serde(default = "ReactionConfig::default_taunt_chance")]
    pub taunt_chance: f64,
    #[serde(default = "ReactionConfig::default_taunt_text")]
    pub taunt_text: String,
    #[serde(default = "ReactionConfig::default_typing_base_ms")]
    pub typing_base_ms: u64,
    #[serde(default = "ReactionConfig::default_typing_spread_ms")]
    pub typing_spread_ms: u64,
}

impl ReactionConfig {
    const fn default_steal_back_chance() -> f64 {
        STEAL_BACK_CHANCE
    }

    const fn default_taunt_chance() -> f64 {
        TAUNT_CHANCE
    }

    fn default_taunt_text() -> String {
        DEFAULT_TAUNT_TEXT.to_string()
    }

    const fn default_typing_base_ms() -> u64 {
        REACTION_TYPING_BASE_MS
    }

    const fn default_typing_spread_ms() -> u64 {
        REACTION_TYPING_SPREAD_MS
    }
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            steal_back_chance: Self::default_steal_back_chance(),
            taunt_chance: Self::default_taunt_chance(),
            taunt_text: Self::default_taunt_text(),
            typing_base_ms: Self::default_typing_base_ms(),
            typing_spread_ms: Self::default_typing_spread_ms(),
        }
    }
}

/// Inbound message after transport filtering and text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    pub from_self: bool,
}

/// Which reactive sends fired after someone else's claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reaction {
    pub steal_back: bool,
    pub taunt: bool,
}

/// What the arbiter did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbitrationOutcome {
    /// The arbiter is switched off.
    Disabled,
    /// Nothing actionable: no patterns, a tier without a claim id, or our own claim.
    Ignored,
    /// Accepted and handed to the pacing queue.
    Queued(ClaimTask),
    /// Declined and remembered as pending.
    Deferred { claim_id: String, reason: String },
    /// Accepted but the queue refused it; remembered as pending instead.
    Overflowed { claim_id: String, error: QueueError },
    /// Someone else claimed; `reaction` is `None` when nothing was pending.
    OtherClaim {
        claim_id: String,
        reaction: Option<Reaction>,
    },
}

pub struct ClaimArbiter {
    config: Arc<dyn ConfigStore>,
    transport: Arc<dyn ChatTransport>,
    tracker: PendingClaimTracker,
    queue: ClaimPacingQueue,
    jitter: Jitter,
    reactions: ReactionConfig,
    enabled: AtomicBool,
}

impl ClaimArbiter {
    #[must_use]
    pub fn new(
        config: Arc<dyn ConfigStore>,
        transport: Arc<dyn ChatTransport>,
        tracker: PendingClaimTracker,
        queue: ClaimPacingQueue,
        jitter: Jitter,
        reactions: ReactionConfig,
    ) -> Self {
        Self {
            config,
            transport,
            tracker,
            queue,
            jitter,
            reactions,
            enabled: AtomicBool::new(true),
        }
    }

    /// Wire tracker, follow-up responder and pacing worker from settings.
    ///
    /// Must be called from inside a tokio runtime.
    #[must_use]
    pub fn spawn(
        settings: &BotSettings,
        config: Arc<dyn ConfigStore>,
        transport: Arc<dyn ChatTransport>,
        jitter: Jitter,
    ) -> Self {
        let follow_up = FollowUpResponder::new(
            Arc::clone(&transport),
            settings.response_pools(),
            jitter.clone(),
            settings.follow_up.clone(),
        );
        let queue = ClaimPacingQueue::spawn(
            Arc::clone(&transport),
            Some(follow_up),
            jitter.clone(),
            settings.pacing.clone(),
        );
        let tracker = PendingClaimTracker::new(&settings.pending);
        Self::new(
            config,
            transport,
            tracker,
            queue,
            jitter,
            settings.reactions.clone(),
        )
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        log::info!("Claim arbiter {}", if enabled { "enabled" } else { "disabled" });
    }

    #[must_use]
    pub const fn tracker(&self) -> &PendingClaimTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn queue(&self) -> &ClaimPacingQueue {
        &self.queue
    }

    /// Handle one inbound message from an allowed sender in a group chat.
    pub async fn on_candidate_message(&self, message: &InboundMessage) -> ArbitrationOutcome {
        if !self.is_enabled() {
            return ArbitrationOutcome::Disabled;
        }

        let MessageFields {
            tier,
            claim_id,
            card_name,
        } = MessageFields::extract(&message.text);

        match (tier, claim_id) {
            (Some(tier), Some(claim_id)) => self.arbitrate(message, &tier, claim_id, card_name),
            (Some(tier), None) => {
                log::debug!("Tier {tier} announcement without claim id ignored");
                ArbitrationOutcome::Ignored
            }
            (None, Some(claim_id)) if !message.from_self => {
                let reaction = self
                    .on_other_claim(&message.chat_id, &claim_id, &message.sender_id)
                    .await;
                ArbitrationOutcome::OtherClaim { claim_id, reaction }
            }
            _ => ArbitrationOutcome::Ignored,
        }
    }

    fn arbitrate(
        &self,
        message: &InboundMessage,
        tier: &str,
        claim_id: String,
        card_name: Option<String>,
    ) -> ArbitrationOutcome {
        let table = self.config.probability_table();
        let preferred = self.config.preferred_names();
        let decision = self
            .jitter
            .with(|rng| decide(tier, card_name.as_deref(), &preferred, &table, rng));

        if !decision.should_claim {
            log::info!(
                "Passing on {claim_id} in {} ({})",
                message.chat_id,
                decision.reason
            );
            self.tracker
                .add(&message.chat_id, &claim_id, card_name.as_deref());
            return ArbitrationOutcome::Deferred {
                claim_id,
                reason: decision.reason,
            };
        }

        let task = ClaimTask::new(
            message.chat_id.clone(),
            claim_id.clone(),
            card_name.clone(),
            decision.reason,
            self.config.claim_delay_ms(),
        );
        match self.queue.enqueue(task.clone()) {
            Ok(()) => {
                log::info!(
                    "Queued claim {claim_id} in {} ({})",
                    task.chat_id,
                    task.reason
                );
                ArbitrationOutcome::Queued(task)
            }
            Err(error) => {
                log::warn!("Could not queue claim {claim_id}: {error}");
                self.tracker
                    .add(&message.chat_id, &claim_id, card_name.as_deref());
                ArbitrationOutcome::Overflowed { claim_id, error }
            }
        }
    }

    /// React to another participant claiming `claim_id`.
    ///
    /// Returns `None` when nothing was pending for it. Both reactions are
    /// rolled independently and sent into the chat the card spawned in.
    pub async fn on_other_claim(
        &self,
        chat_id: &str,
        claim_id: &str,
        sender_id: &str,
    ) -> Option<Reaction> {
        let entry = self.tracker.consume(chat_id, claim_id)?;
        log::info!(
            "{sender_id} claimed {claim_id} ({}) that we passed on",
            entry.card_name.as_deref().unwrap_or("unknown card")
        );
        if !is_group_chat(&entry.chat_id) {
            return Some(Reaction::default());
        }

        let steal_back = self.jitter.chance(self.reactions.steal_back_chance);
        if steal_back {
            self.react(&entry.chat_id, &claim_command(claim_id)).await;
        }
        let taunt = self.jitter.chance(self.reactions.taunt_chance);
        if taunt {
            self.react(&entry.chat_id, &self.reactions.taunt_text).await;
        }
        Some(Reaction { steal_back, taunt })
    }

    async fn react(&self, chat_id: &str, text: &str) {
        if let Err(err) = self.transport.send_typing(chat_id).await {
            log::error!("Error sending {text:?} response: {err}");
            return;
        }
        let typing = self
            .jitter
            .delay(self.reactions.typing_base_ms, self.reactions.typing_spread_ms);
        tokio::time::sleep(typing).await;
        if let Err(err) = self.transport.send_text(chat_id, text).await {
            log::error!("Error sending {text:?} response: {err}");
        }
    }
}
