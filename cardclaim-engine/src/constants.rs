//! Centralized timing and probability constants for claim arbitration.
//!
//! These are the defaults the settings layer falls back to. Everything an
//! operator is expected to tune is also exposed through `BotSettings`.

// Claim command ------------------------------------------------------------
pub const CLAIM_COMMAND_PREFIX: &str = ".claim";
pub const GROUP_CHAT_SUFFIX: &str = "@g.us";
pub const STATUS_BROADCAST_CHAT: &str = "status@broadcast";

// Claim pacing -------------------------------------------------------------
pub const DEFAULT_CLAIM_DELAY_MS: u64 = 1_500;
pub const CLAIM_TYPING_BASE_MS: u64 = 500;
pub const CLAIM_TYPING_SPREAD_MS: u64 = 500;
pub const CLAIM_BUFFER_FLOOR_MS: u64 = 2_000;
pub const CLAIM_BUFFER_RATIO: f64 = 0.2;

// Follow-up responses ------------------------------------------------------
pub const FOLLOW_UP_CHANCE: f64 = 0.8;
pub const FOLLOW_UP_DELAY_MIN_MS: u64 = 3_000;
pub const FOLLOW_UP_DELAY_MAX_MS: u64 = 8_000;
pub const FOLLOW_UP_TYPING_BASE_MS: u64 = 500;
pub const FOLLOW_UP_TYPING_SPREAD_MS: u64 = 1_500;
pub const FOLLOW_UP_STICKER_CHANCE: f64 = 0.5;

// Reactions to someone else's claim ----------------------------------------
pub const STEAL_BACK_CHANCE: f64 = 0.25;
pub const TAUNT_CHANCE: f64 = 0.25;
pub const DEFAULT_TAUNT_TEXT: &str = "Fuck u";
pub const REACTION_TYPING_BASE_MS: u64 = 500;
pub const REACTION_TYPING_SPREAD_MS: u64 = 500;

// Pending claims -----------------------------------------------------------
pub const PENDING_CLAIM_TTL_SECS: u64 = 5 * 60;

// Probability defaults (fresh install) -------------------------------------
pub const DEFAULT_PREFERRED_PROBABILITY: f64 = 1.0;
pub const DEFAULT_TIER_S_PROBABILITY: f64 = 0.8;
pub const DEFAULT_TIER_4_TO_6_PROBABILITY: f64 = 0.8;
pub const DEFAULT_TIER_1_TO_3_PROBABILITY: f64 = 0.45;

pub const MIN_NUMBERED_TIER: u8 = 1;
pub const MAX_NUMBERED_TIER: u8 = 6;
