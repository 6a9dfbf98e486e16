//! Card Claim Engine
//!
//! Claim arbitration and pacing for chat-based collectible card games.
//! This crate decides which spawned cards to claim, paces outgoing claims
//! with human-like delays, and remembers skipped cards so it can react when
//! someone else takes them. Transport, text extraction and persistence are
//! supplied by the caller through [`ChatTransport`] and [`ConfigStore`].

pub mod arbiter;
pub mod constants;
pub mod followup;
pub mod jitter;
pub mod pacing;
pub mod patterns;
pub mod policy;
pub mod probability;
pub mod settings;
pub mod tracker;
pub mod transport;

// Re-export commonly used types
pub use arbiter::{ArbitrationOutcome, ClaimArbiter, InboundMessage, Reaction, ReactionConfig};
pub use followup::{FollowUp, FollowUpConfig, FollowUpResponder, ResponsePools};
pub use jitter::Jitter;
pub use pacing::{ClaimPacingQueue, ClaimTask, PacingConfig, QueueError};
pub use patterns::{MessageFields, claim_command};
pub use policy::{ClaimDecision, decide, is_preferred};
pub use probability::{
    ProbabilityCategory, ProbabilityError, ProbabilityTable, RawProbabilityTable, Tier,
    format_percent,
};
pub use settings::{BotSettings, ConfigStore, SettingsError, SharedSettings};
pub use tracker::{KeyScope, PendingClaim, PendingClaimTracker, PendingConfig};
pub use transport::{ChatTransport, TransportError};

/// Whether a chat id addresses a group chat.
#[must_use]
pub fn is_group_chat(chat_id: &str) -> bool {
    chat_id.ends_with(constants::GROUP_CHAT_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_chat_suffix_is_required() {
        assert!(is_group_chat("120363025@g.us"));
        assert!(!is_group_chat("5511999990000@s.whatsapp.net"));
        assert!(!is_group_chat(constants::STATUS_BROADCAST_CHAT));
    }
}
