//! Operator settings and the read interface the arbiter consumes.
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbiter::ReactionConfig;
use crate::constants::DEFAULT_CLAIM_DELAY_MS;
use crate::followup::{FollowUpConfig, ResponsePools};
use crate::pacing::PacingConfig;
use crate::probability::{ProbabilityCategory, ProbabilityError, ProbabilityTable, format_percent};
use crate::tracker::PendingConfig;

/// Read side of the configuration store.
pub trait ConfigStore: Send + Sync {
    fn probability_table(&self) -> ProbabilityTable;
    fn preferred_names(&self) -> Vec<String>;
    fn claim_delay_ms(&self) -> u64;
    fn is_allowed(&self, sender_id: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be between 0 and 1 (got {value})")]
    InvalidChance { field: &'static str, value: f64 },
}

/// Everything an operator can configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    #[serde(default = "BotSettings::default_claim_delay_ms")]
    pub claim_delay_ms: u64,
    #[serde(default)]
    pub probabilities: ProbabilityTable,
    #[serde(default)]
    pub preferred_card_names: Vec<String>,
    #[serde(default)]
    pub allowed_senders: Vec<String>,
    #[serde(default = "BotSettings::default_random_texts")]
    pub random_texts: Vec<String>,
    #[serde(default)]
    pub random_stickers: Vec<PathBuf>,
    #[serde(default)]
    pub reactions: ReactionConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub follow_up: FollowUpConfig,
    #[serde(default)]
    pub pending: PendingConfig,
}

impl BotSettings {
    const fn default_claim_delay_ms() -> u64 {
        DEFAULT_CLAIM_DELAY_MS
    }

    fn default_random_texts() -> Vec<String> {
        ["gg", "lol", "mine", "finally 😤", "ez"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Parse settings from JSON, filling every missing field with its default.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, a probability is out of
    /// range, or a chance outside the probability table is not in `[0, 1]`.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Pretty JSON in the per-tier probability shape.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the chances that live outside the probability table.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidChance`] for the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let chances = [
            ("reactions.steal_back_chance", self.reactions.steal_back_chance),
            ("reactions.taunt_chance", self.reactions.taunt_chance),
            ("pacing.follow_up_chance", self.pacing.follow_up_chance),
            ("follow_up.sticker_chance", self.follow_up.sticker_chance),
        ];
        for (field, value) in chances {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidChance { field, value });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn response_pools(&self) -> ResponsePools {
        ResponsePools {
            texts: self.random_texts.clone(),
            stickers: self.random_stickers.clone(),
        }
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            claim_delay_ms: Self::default_claim_delay_ms(),
            probabilities: ProbabilityTable::default(),
            preferred_card_names: Vec::new(),
            allowed_senders: Vec::new(),
            random_texts: Self::default_random_texts(),
            random_stickers: Vec::new(),
            reactions: ReactionConfig::default(),
            pacing: PacingConfig::default(),
            follow_up: FollowUpConfig::default(),
            pending: PendingConfig::default(),
        }
    }
}

/// In-memory settings shared between the arbiter and the admin surface.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<BotSettings>>,
}

impl SharedSettings {
    #[must_use]
    pub fn new(settings: BotSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> BotSettings {
        self.inner.read().clone()
    }

    #[must_use]
    pub fn probabilities(&self) -> ProbabilityTable {
        self.inner.read().probabilities
    }

    /// Replace the whole probability table.
    pub fn replace_probabilities(&self, table: ProbabilityTable) {
        self.inner.write().probabilities = table;
    }

    /// Parse an admin category and set its probability.
    ///
    /// Returns the confirmation text shown to the operator.
    ///
    /// # Errors
    ///
    /// Returns [`ProbabilityError`] for an unknown category or a value outside
    /// `[0, 1]`; settings are unchanged in that case.
    pub fn set_probability(&self, category: &str, value: f64) -> Result<String, ProbabilityError> {
        let category: ProbabilityCategory = category.parse()?;
        self.inner.write().probabilities.set(category, value)?;
        Ok(format!(
            "Set {} claim probability to {}",
            category.label(),
            format_percent(value)
        ))
    }
}

impl ConfigStore for SharedSettings {
    fn probability_table(&self) -> ProbabilityTable {
        self.probabilities()
    }

    fn preferred_names(&self) -> Vec<String> {
        self.inner.read().preferred_card_names.clone()
    }

    fn claim_delay_ms(&self) -> u64 {
        self.inner.read().claim_delay_ms
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        self.inner
            .read()
            .allowed_senders
            .iter()
            .any(|allowed| allowed == sender_id)
    }
}
